use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::beacon::{BeaconDecoder, CaptureTime, RxInfo};
use crate::config::HOP_CHANNELS;
use crate::encryption::EncryptionLabel;
use crate::error::DecodeError;
use crate::format::RecordFormatter;
use crate::mac::MacHeader;
use crate::storage::StorageSink;

// ─── Channel ──────────────────────────────────────────────────────────────────

/// Channel the radio is tuned to. One writer, one reader.
#[derive(Debug)]
pub struct CurrentChannel(AtomicU8);

impl CurrentChannel {
    pub fn new(channel: u8) -> Arc<Self> {
        Arc::new(Self(AtomicU8::new(channel)))
    }

    pub fn get(&self) -> u8 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, channel: u8) {
        self.0.store(channel, Ordering::Relaxed);
    }
}

/// Periodic channel hop over [`HOP_CHANNELS`], driven by a millisecond clock.
#[derive(Debug)]
pub struct ChannelHopper {
    channel: Arc<CurrentChannel>,
    interval_ms: u64,
    last_hop_ms: Option<u64>,
    idx: usize,
}

impl ChannelHopper {
    pub fn new(channel: Arc<CurrentChannel>, interval_ms: u64) -> Self {
        let idx = HOP_CHANNELS.iter().position(|&c| c == channel.get()).unwrap_or(0);
        Self { channel, interval_ms, last_hop_ms: None, idx }
    }

    /// Hop if at least one interval has passed since the last hop. The first
    /// call only starts the clock. Returns the new channel on a hop.
    pub fn poll(&mut self, now_ms: u64) -> Option<u8> {
        let last = match self.last_hop_ms {
            Some(t) => t,
            None => {
                self.last_hop_ms = Some(now_ms);
                return None;
            }
        };
        if now_ms.saturating_sub(last) < self.interval_ms {
            return None;
        }
        self.idx = (self.idx + 1) % HOP_CHANNELS.len();
        let next = HOP_CHANNELS[self.idx];
        self.channel.set(next);
        self.last_hop_ms = Some(now_ms);
        Some(next)
    }
}

// ─── Stats ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Serialize)]
pub struct SessionStats {
    pub frames_seen:         u64,
    pub beacons_captured:    u64,
    pub non_beacon_skipped:  u64,
    pub frames_dropped:      u64,
    pub tag_scans_truncated: u64,
    pub write_failures:      u64,
    pub bytes_written:       u64,
    pub files_rotated:       u64,
    pub open:                u64,
    pub wpa_personal:        u64,
    pub wpa2_personal:       u64,
    pub wpa3_personal:       u64,
}

impl SessionStats {
    fn count_label(&mut self, label: EncryptionLabel) {
        match label {
            EncryptionLabel::Open         => self.open += 1,
            EncryptionLabel::WpaPersonal  => self.wpa_personal += 1,
            EncryptionLabel::Wpa2Personal => self.wpa2_personal += 1,
            EncryptionLabel::Wpa3Personal => self.wpa3_personal += 1,
        }
    }

    pub fn by_label(&self, label: EncryptionLabel) -> u64 {
        match label {
            EncryptionLabel::Open         => self.open,
            EncryptionLabel::WpaPersonal  => self.wpa_personal,
            EncryptionLabel::Wpa2Personal => self.wpa2_personal,
            EncryptionLabel::Wpa3Personal => self.wpa3_personal,
        }
    }
}

/// What happened to one delivered frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Not a beacon.
    Skipped,
    /// Too short to decode.
    Dropped(DecodeError),
    Stored,
    /// Decoded, but formatting or storage failed; the bytes are gone.
    WriteFailed,
}

// ─── Session ──────────────────────────────────────────────────────────────────

pub struct CaptureSession<S: StorageSink> {
    decoder: BeaconDecoder,
    formatter: RecordFormatter,
    sink: S,
    channel: Arc<CurrentChannel>,
    max_file_size: u64,
    scratch: Vec<u8>,
    stats: SessionStats,
}

impl<S: StorageSink> CaptureSession<S> {
    pub fn new(
        decoder: BeaconDecoder,
        formatter: RecordFormatter,
        sink: S,
        channel: Arc<CurrentChannel>,
        max_file_size: u64,
    ) -> Self {
        Self {
            decoder,
            formatter,
            sink,
            channel,
            max_file_size,
            scratch: Vec::with_capacity(512),
            stats: SessionStats::default(),
        }
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_parts(self) -> (S, SessionStats) {
        (self.sink, self.stats)
    }

    /// Handle one received frame (802.11 header first, no radio prefix).
    pub fn on_frame(&mut self, frame: &[u8], rssi: i8, captured_at: CaptureTime) -> FrameOutcome {
        self.stats.frames_seen += 1;

        match MacHeader::parse(frame) {
            Ok(hdr) if !hdr.is_beacon() => {
                self.stats.non_beacon_skipped += 1;
                return FrameOutcome::Skipped;
            }
            _ => {}
        }

        let rx = RxInfo { rssi, channel: self.channel.get(), captured_at };
        let record = match self.decoder.decode(frame, rx) {
            Ok(r) => r,
            Err(e) => {
                debug!("Dropping frame: {e}");
                return self.dropped(e);
            }
        };
        if record.tags_truncated {
            self.stats.tag_scans_truncated += 1;
        }

        self.scratch.clear();
        if let Err(e) = self.formatter.encode(&record, frame, &mut self.scratch) {
            warn!(bssid = %record.bssid, "Cannot format beacon: {e}");
            self.stats.write_failures += 1;
            return FrameOutcome::WriteFailed;
        }

        if self.sink.size() > self.max_file_size {
            if let Err(e) = self.sink.rotate() {
                warn!("Rotation failed: {e}");
                self.stats.write_failures += 1;
                return FrameOutcome::WriteFailed;
            }
            self.stats.files_rotated += 1;
            info!("Rotated capture file after {} beacons", self.stats.beacons_captured);
        }

        if let Err(e) = self.sink.append(&self.scratch) {
            warn!(bssid = %record.bssid, "Write failed, beacon discarded: {e}");
            self.stats.write_failures += 1;
            return FrameOutcome::WriteFailed;
        }

        self.stats.bytes_written += self.scratch.len() as u64;
        self.stats.beacons_captured += 1;
        self.stats.count_label(record.encryption);
        debug!(
            bssid = %record.bssid,
            vendor = record.vendor,
            channel = record.channel,
            rssi = record.rssi,
            encryption = %record.encryption,
            "Beacon stored"
        );
        FrameOutcome::Stored
    }

    /// Count a frame the radio layer could not hand over intact.
    pub fn drop_frame(&mut self, e: DecodeError) -> FrameOutcome {
        self.stats.frames_seen += 1;
        self.dropped(e)
    }

    fn dropped(&mut self, e: DecodeError) -> FrameOutcome {
        self.stats.frames_dropped += 1;
        FrameOutcome::Dropped(e)
    }
}
