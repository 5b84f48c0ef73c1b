//! pcap records (raw frame, verbatim) or header-less CSV rows. All pcap
//! integers are little-endian.

use clap::ValueEnum;

use crate::beacon::{BeaconRecord, CaptureTime};
use crate::error::FormatError;

pub const PCAP_MAGIC: u32 = 0xa1b2c3d4;
pub const PCAP_VERSION_MAJOR: u16 = 2;
pub const PCAP_VERSION_MINOR: u16 = 4;
pub const PCAP_SNAPLEN: u32 = 65535;
/// LINKTYPE_IEEE802_11_RADIOTAP.
pub const LINKTYPE_IEEE802_11_RADIOTAP: u32 = 127;
pub const PCAP_GLOBAL_HEADER_LEN: usize = 24;
pub const PCAP_RECORD_HEADER_LEN: usize = 16;

pub const CSV_DELIMITER: u8 = b',';

/// Column names of a CSV row, in order. Rows are written without a header.
pub const CSV_COLUMNS: [&str; 18] = [
    "timestamp", "source", "bssid", "vendor", "channel", "rssi", "beacon_interval_ms",
    "privacy", "short_preamble", "pbcc", "channel_agility", "spectrum_mgmt", "qos",
    "short_slot", "apsd", "radio_measurement", "encryption", "rates",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Pcap,
    Csv,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Pcap => "pcap",
            OutputFormat::Csv  => "csv",
        }
    }

    /// Bytes every new output file must start with.
    pub fn file_preamble(self) -> Vec<u8> {
        match self {
            OutputFormat::Pcap => PcapGlobalHeader::default().to_bytes().to_vec(),
            OutputFormat::Csv  => Vec::new(),
        }
    }
}

// ─── pcap headers ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcapGlobalHeader {
    pub magic: u32,
    pub version_major: u16,
    pub version_minor: u16,
    pub thiszone: i32,
    pub sigfigs: u32,
    pub snaplen: u32,
    pub network: u32,
}

impl Default for PcapGlobalHeader {
    fn default() -> Self {
        Self {
            magic: PCAP_MAGIC,
            version_major: PCAP_VERSION_MAJOR,
            version_minor: PCAP_VERSION_MINOR,
            thiszone: 0,
            sigfigs: 0,
            snaplen: PCAP_SNAPLEN,
            network: LINKTYPE_IEEE802_11_RADIOTAP,
        }
    }
}

impl PcapGlobalHeader {
    pub fn to_bytes(&self) -> [u8; PCAP_GLOBAL_HEADER_LEN] {
        let mut b = [0u8; PCAP_GLOBAL_HEADER_LEN];
        b[0..4].copy_from_slice(&self.magic.to_le_bytes());
        b[4..6].copy_from_slice(&self.version_major.to_le_bytes());
        b[6..8].copy_from_slice(&self.version_minor.to_le_bytes());
        b[8..12].copy_from_slice(&self.thiszone.to_le_bytes());
        b[12..16].copy_from_slice(&self.sigfigs.to_le_bytes());
        b[16..20].copy_from_slice(&self.snaplen.to_le_bytes());
        b[20..24].copy_from_slice(&self.network.to_le_bytes());
        b
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcapRecordHeader {
    pub ts_sec: u32,
    pub ts_usec: u32,
    pub incl_len: u32,
    pub orig_len: u32,
}

impl PcapRecordHeader {
    /// Header for an untruncated frame: `incl_len == orig_len == len`.
    pub fn for_frame(at: CaptureTime, len: usize) -> Result<Self, FormatError> {
        let len = u32::try_from(len).map_err(|_| FormatError::FrameTooLarge { len })?;
        Ok(Self { ts_sec: at.secs, ts_usec: at.usecs, incl_len: len, orig_len: len })
    }

    pub fn to_bytes(&self) -> [u8; PCAP_RECORD_HEADER_LEN] {
        let mut b = [0u8; PCAP_RECORD_HEADER_LEN];
        b[0..4].copy_from_slice(&self.ts_sec.to_le_bytes());
        b[4..8].copy_from_slice(&self.ts_usec.to_le_bytes());
        b[8..12].copy_from_slice(&self.incl_len.to_le_bytes());
        b[12..16].copy_from_slice(&self.orig_len.to_le_bytes());
        b
    }
}

// ─── Formatter ────────────────────────────────────────────────────────────────

/// Renders records in the one encoding chosen at construction.
#[derive(Debug, Clone, Copy)]
pub struct RecordFormatter {
    format: OutputFormat,
}

impl RecordFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Append the encoding of `record` (and, for pcap, its `raw` frame) to `out`.
    pub fn encode(&self, record: &BeaconRecord, raw: &[u8], out: &mut Vec<u8>) -> Result<(), FormatError> {
        match self.format {
            OutputFormat::Pcap => encode_pcap(record, raw, out),
            OutputFormat::Csv  => encode_csv(record, out),
        }
    }
}

fn encode_pcap(record: &BeaconRecord, raw: &[u8], out: &mut Vec<u8>) -> Result<(), FormatError> {
    let hdr = PcapRecordHeader::for_frame(record.captured_at, raw.len())?;
    out.extend_from_slice(&hdr.to_bytes());
    out.extend_from_slice(raw);
    Ok(())
}

fn flag(set: bool) -> &'static str {
    if set { "1" } else { "0" }
}

/// Row fields in [`CSV_COLUMNS`] order.
pub fn csv_fields(record: &BeaconRecord) -> Vec<String> {
    let mut fields = Vec::with_capacity(CSV_COLUMNS.len());
    fields.push(record.captured_at.to_string());
    fields.push(record.source.to_string());
    fields.push(record.bssid.to_string());
    fields.push(record.vendor.to_string());
    fields.push(record.channel.to_string());
    fields.push(record.rssi.to_string());
    fields.push(record.beacon_interval_ms().to_string());
    fields.extend(record.capabilities.iter().map(|(_, set)| flag(set).to_string()));
    fields.push(record.encryption.to_string());
    fields.push(record.rates_text());
    fields
}

fn encode_csv(record: &BeaconRecord, out: &mut Vec<u8>) -> Result<(), FormatError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .delimiter(CSV_DELIMITER)
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(out);
    wtr.write_record(csv_fields(record))?;
    wtr.flush()?;
    Ok(())
}
