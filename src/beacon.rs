use std::fmt;
use std::time::Duration;

use tracing::debug;

use crate::encryption::{classify, EncryptionLabel};
use crate::error::DecodeError;
use crate::mac::{MacAddr, MacHeader};
use crate::oui::OuiTable;
use crate::tags::{self, SupportedRate};

pub const FIXED_FIELDS_LEN: usize = 12;

// ─── Fixed fields ─────────────────────────────────────────────────────────────

/// The 12 bytes that open every beacon body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeaconFixedFields {
    /// TSF counter, microseconds since the sender's radio started.
    pub timestamp: u64,
    /// In time units of 1024 microseconds.
    pub beacon_interval: u16,
    pub capability: u16,
}

impl BeaconFixedFields {
    pub fn parse(body: &[u8]) -> Result<Self, DecodeError> {
        let b = body
            .get(..FIXED_FIELDS_LEN)
            .ok_or(DecodeError::ShortFixedFields { len: body.len() })?;
        Ok(Self {
            timestamp: u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]),
            beacon_interval: u16::from_le_bytes([b[8], b[9]]),
            capability: u16::from_le_bytes([b[10], b[11]]),
        })
    }

    pub fn interval_ms(&self) -> u32 {
        tu_to_ms(self.beacon_interval)
    }

    pub fn capabilities(&self) -> CapabilityFlags {
        CapabilityFlags(self.capability)
    }
}

/// `tu * 1024 / 1000`, truncating.
pub fn tu_to_ms(tu: u16) -> u32 {
    (tu as u32 * 1024) / 1000
}

// ─── Capability bits ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityFlag {
    Privacy          = 4,
    ShortPreamble    = 5,
    Pbcc             = 6,
    ChannelAgility   = 7,
    SpectrumMgmt     = 8,
    Qos              = 9,
    ShortSlot        = 10,
    Apsd             = 11,
    RadioMeasurement = 12,
}

impl CapabilityFlag {
    /// In output column order.
    pub const ALL: [CapabilityFlag; 9] = [
        CapabilityFlag::Privacy,
        CapabilityFlag::ShortPreamble,
        CapabilityFlag::Pbcc,
        CapabilityFlag::ChannelAgility,
        CapabilityFlag::SpectrumMgmt,
        CapabilityFlag::Qos,
        CapabilityFlag::ShortSlot,
        CapabilityFlag::Apsd,
        CapabilityFlag::RadioMeasurement,
    ];

    pub fn bit(self) -> u16 {
        1 << (self as u16)
    }

    pub fn name(self) -> &'static str {
        match self {
            CapabilityFlag::Privacy          => "privacy",
            CapabilityFlag::ShortPreamble    => "short_preamble",
            CapabilityFlag::Pbcc             => "pbcc",
            CapabilityFlag::ChannelAgility   => "channel_agility",
            CapabilityFlag::SpectrumMgmt     => "spectrum_mgmt",
            CapabilityFlag::Qos              => "qos",
            CapabilityFlag::ShortSlot        => "short_slot",
            CapabilityFlag::Apsd             => "apsd",
            CapabilityFlag::RadioMeasurement => "radio_measurement",
        }
    }
}

/// Read-only projections of the raw capability word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilityFlags(u16);

impl CapabilityFlags {
    pub fn new(raw: u16) -> Self { Self(raw) }
    pub fn raw(self) -> u16 { self.0 }

    pub fn has(self, flag: CapabilityFlag) -> bool {
        self.0 & flag.bit() != 0
    }

    pub fn privacy(self)           -> bool { self.has(CapabilityFlag::Privacy) }
    pub fn short_preamble(self)    -> bool { self.has(CapabilityFlag::ShortPreamble) }
    pub fn pbcc(self)              -> bool { self.has(CapabilityFlag::Pbcc) }
    pub fn channel_agility(self)   -> bool { self.has(CapabilityFlag::ChannelAgility) }
    pub fn spectrum_mgmt(self)     -> bool { self.has(CapabilityFlag::SpectrumMgmt) }
    pub fn qos(self)               -> bool { self.has(CapabilityFlag::Qos) }
    pub fn short_slot(self)        -> bool { self.has(CapabilityFlag::ShortSlot) }
    pub fn apsd(self)              -> bool { self.has(CapabilityFlag::Apsd) }
    pub fn radio_measurement(self) -> bool { self.has(CapabilityFlag::RadioMeasurement) }

    /// `(flag, set)` pairs in column order.
    pub fn iter(self) -> impl Iterator<Item = (CapabilityFlag, bool)> {
        CapabilityFlag::ALL.into_iter().map(move |f| (f, self.has(f)))
    }
}

// ─── Capture time ─────────────────────────────────────────────────────────────

/// Receive time as written into pcap record headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct CaptureTime {
    pub secs: u32,
    pub usecs: u32,
}

impl CaptureTime {
    pub fn new(secs: u32, usecs: u32) -> Self {
        Self { secs, usecs }
    }

    /// Seconds wrap at `u32::MAX`, as in the pcap record header.
    pub fn from_duration(d: Duration) -> Self {
        Self { secs: d.as_secs() as u32, usecs: d.subsec_micros() }
    }

    pub fn as_millis(&self) -> u64 {
        self.secs as u64 * 1000 + (self.usecs / 1000) as u64
    }
}

impl fmt::Display for CaptureTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}", self.secs, self.usecs)
    }
}

// ─── Record ───────────────────────────────────────────────────────────────────

/// Everything kept from one beacon. Built once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct BeaconRecord {
    pub source: MacAddr,
    pub bssid: MacAddr,
    pub sequence_number: u16,
    pub fragment_number: u8,
    pub vendor: &'static str,
    pub capabilities: CapabilityFlags,
    pub beacon_timestamp: u64,
    pub beacon_interval_tu: u16,
    pub rates: Vec<SupportedRate>,
    pub rsn_version: Option<u16>,
    pub encryption: EncryptionLabel,
    pub tags_truncated: bool,
    pub rssi: i8,
    pub channel: u8,
    pub captured_at: CaptureTime,
}

impl BeaconRecord {
    pub fn beacon_interval_ms(&self) -> u32 {
        tu_to_ms(self.beacon_interval_tu)
    }

    /// Space-terminated `<rate>[*] ` tokens.
    pub fn rates_text(&self) -> String {
        self.rates.iter().map(|r| format!("{r} ")).collect()
    }
}

/// Radio metadata that travels with a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RxInfo {
    pub rssi: i8,
    pub channel: u8,
    pub captured_at: CaptureTime,
}

// ─── Decoder ──────────────────────────────────────────────────────────────────

/// Stateless beacon decoder. Each call uses only its own frame bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct BeaconDecoder {
    vendors: OuiTable,
}

impl BeaconDecoder {
    pub fn new(vendors: OuiTable) -> Self {
        Self { vendors }
    }

    /// Header, fixed fields, tags, classification. A short header or short
    /// fixed fields abort; a malformed tag only cuts the tag scan short.
    pub fn decode(&self, frame: &[u8], rx: RxInfo) -> Result<BeaconRecord, DecodeError> {
        let (hdr, body) = MacHeader::split(frame)?;
        let fixed = BeaconFixedFields::parse(body)?;
        let findings = tags::scan(&body[FIXED_FIELDS_LEN..]);
        let encryption = classify(&findings);

        let bssid = hdr.bssid();
        if findings.truncated {
            debug!(%bssid, "tag stream cut short, record built from partial tags");
        }

        Ok(BeaconRecord {
            source: hdr.source(),
            bssid,
            sequence_number: hdr.sequence_number(),
            fragment_number: hdr.fragment_number(),
            vendor: self.vendors.lookup_bytes(bssid.oui()),
            capabilities: fixed.capabilities(),
            beacon_timestamp: fixed.timestamp,
            beacon_interval_tu: fixed.beacon_interval,
            rates: findings.rates,
            rsn_version: findings.rsn.and_then(|r| r.version),
            encryption,
            tags_truncated: findings.truncated,
            rssi: rx.rssi,
            channel: rx.channel,
            captured_at: rx.captured_at,
        })
    }
}

#[cfg(test)]
pub(crate) fn fixed_fields(timestamp: u64, interval: u16, capability: u16) -> Vec<u8> {
    let mut f = Vec::with_capacity(FIXED_FIELDS_LEN);
    f.extend_from_slice(&timestamp.to_le_bytes());
    f.extend_from_slice(&interval.to_le_bytes());
    f.extend_from_slice(&capability.to_le_bytes());
    f
}
