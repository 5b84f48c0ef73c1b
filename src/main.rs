use anyhow::{bail, Context, Result};
use beaconcap::config::{
    CaptureConfig, DEFAULT_CAPTURE_DIR, DEFAULT_CHANNEL, DEFAULT_HOP_INTERVAL_MS, DEFAULT_MAX_FILE_SIZE,
};
use beaconcap::{
    radiotap, BeaconDecoder, CaptureSession, CaptureTime, ChannelHopper, CurrentChannel, EncryptionLabel,
    FileStorage, OuiTable, OutputFormat, RecordFormatter, SessionStats, StorageSink,
};
use clap::Parser;
use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::*;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing::{info, warn};

// ─── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(author, version, about = "Decode 802.11 beacons from a replayed capture and log them as pcap records or CSV rows.")]
struct Args {
    /// Legacy .pcap to replay (raw 802.11 or radiotap link type)
    #[arg(short, long)]
    input: PathBuf,

    /// Directory that receives the numbered capture files
    #[arg(short, long, default_value = DEFAULT_CAPTURE_DIR)]
    output_dir: PathBuf,

    /// Output encoding, one per capture
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Pcap)]
    format: OutputFormat,

    /// Start a new file once the current one grows past this many bytes
    #[arg(long, default_value_t = DEFAULT_MAX_FILE_SIZE)]
    max_file_size: u64,

    /// Channel reported before the first hop or radiotap channel field
    #[arg(long, default_value_t = DEFAULT_CHANNEL)]
    channel: u8,

    /// Milliseconds to stay on each channel
    #[arg(long, default_value_t = DEFAULT_HOP_INTERVAL_MS)]
    hop_interval_ms: u64,

    /// Stay on the initial channel
    #[arg(long, default_value_t = false)]
    no_hop: bool,

    /// Print the session summary as JSON to stdout
    #[arg(long, default_value_t = false)]
    report: bool,

    /// Enable debug logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

impl Args {
    fn config(&self) -> CaptureConfig {
        CaptureConfig {
            format: self.format,
            capture_dir: self.output_dir.clone(),
            max_file_size: self.max_file_size,
            initial_channel: self.channel,
            channel_hopping: !self.no_hop,
            hop_interval_ms: self.hop_interval_ms,
        }
    }
}

// ─── Replay ───────────────────────────────────────────────────────────────────

const LINKTYPE_IEEE802_11: i32 = 105;
const LINKTYPE_IEEE802_11_RADIOTAP: i32 = 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkKind {
    Dot11,
    Radiotap,
}

fn link_kind(network: Linktype) -> Result<LinkKind> {
    match network.0 {
        LINKTYPE_IEEE802_11 => Ok(LinkKind::Dot11),
        LINKTYPE_IEEE802_11_RADIOTAP => Ok(LinkKind::Radiotap),
        other => bail!("unsupported link type {other} (need 105 or 127)"),
    }
}

/// Hand one replayed record to the session the way a radio callback would.
fn deliver<S: StorageSink>(
    session: &mut CaptureSession<S>,
    hopper: Option<&mut ChannelHopper>,
    channel: &CurrentChannel,
    link: LinkKind,
    at: CaptureTime,
    data: &[u8],
) {
    if let Some(h) = hopper {
        h.poll(at.as_millis());
    }
    match link {
        LinkKind::Dot11 => {
            session.on_frame(data, 0, at);
        }
        LinkKind::Radiotap => match radiotap::parse(data) {
            Ok(rt) => {
                if let Some(c) = rt.channel() {
                    channel.set(c);
                }
                session.on_frame(rt.frame(data), rt.signal_dbm.unwrap_or(0), at);
            }
            Err(e) => {
                session.drop_frame(e);
            }
        },
    }
}

fn replay(args: &Args, cfg: &CaptureConfig) -> Result<SessionStats> {
    info!("Opening {:?}", args.input);
    let file = File::open(&args.input).with_context(|| format!("Cannot open {:?}", args.input))?;
    let mut reader = LegacyPcapReader::new(65536, BufReader::new(file))
        .context("Not a valid legacy pcap file")?;

    let storage = FileStorage::open(&cfg.capture_dir, cfg.format)
        .with_context(|| format!("Cannot open capture directory {:?}", cfg.capture_dir))?;
    let channel = CurrentChannel::new(cfg.initial_channel);
    let mut hopper = cfg
        .channel_hopping
        .then(|| ChannelHopper::new(channel.clone(), cfg.hop_interval_ms));
    let mut session = CaptureSession::new(
        BeaconDecoder::new(OuiTable::builtin()),
        RecordFormatter::new(cfg.format),
        storage,
        channel.clone(),
        cfg.max_file_size,
    );
    let mut link = None;

    loop {
        match reader.next() {
            Ok((offset, block)) => {
                match block {
                    PcapBlockOwned::LegacyHeader(ref hdr) => {
                        link = Some(link_kind(hdr.network)?);
                    }
                    PcapBlockOwned::Legacy(ref pkt) => {
                        let at = CaptureTime::new(pkt.ts_sec, pkt.ts_usec);
                        let kind = link.context("packet before pcap header")?;
                        deliver(&mut session, hopper.as_mut(), &channel, kind, at, pkt.data);
                    }
                    PcapBlockOwned::NG(_) => {
                        warn!("pcapng block encountered – only legacy pcap supported");
                    }
                }
                reader.consume(offset);
            }
            Err(PcapError::Eof) => break,
            Err(PcapError::Incomplete) => {
                if let Err(e) = reader.refill() {
                    return Err(anyhow::anyhow!("refill error: {:?}", e));
                }
            }
            Err(e) => return Err(anyhow::anyhow!("pcap parse error: {:?}", e)),
        }
    }

    let (mut storage, stats) = session.into_parts();
    storage.close().context("Cannot flush capture file")?;
    info!("Last capture file {:?}", storage.path());
    Ok(stats)
}

// ─── Main ─────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt().with_max_level(log_level).with_target(false).with_writer(std::io::stderr).init();

    let cfg = args.config();
    let stats = replay(&args, &cfg)?;

    if args.report {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("=== Capture Summary ===");
        println!("Frames seen:                 {}", stats.frames_seen);
        println!("Beacons captured:            {}", stats.beacons_captured);
        println!("Non-beacon frames skipped:   {}", stats.non_beacon_skipped);
        println!("Frames dropped (too short):  {}", stats.frames_dropped);
        println!("Tag scans cut short:         {}", stats.tag_scans_truncated);
        println!("Write failures:              {}", stats.write_failures);
        println!("Files rotated:               {}", stats.files_rotated);
        println!("Bytes written:               {}", stats.bytes_written);
        println!("─────────────────────────────────────────");
        for label in EncryptionLabel::ALL {
            println!("{:<29}{}", format!("{label}:"), stats.by_label(label));
        }
        println!("Output ({}):                {}", cfg.format.extension(), cfg.capture_dir.display());
    }

    Ok(())
}
