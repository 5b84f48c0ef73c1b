//! # beaconcap
//!
//! Decodes IEEE 802.11 beacon frames into structured records and logs each
//! one as either a pcap record or a CSV row.
//!
//! Data flows one way: raw frame bytes, then [`BeaconRecord`], then formatted
//! bytes, then a [`StorageSink`]. Decoding keeps no state between frames.

pub mod beacon;
pub mod config;
pub mod encryption;
pub mod error;
pub mod format;
pub mod mac;
pub mod oui;
pub mod radiotap;
pub mod session;
pub mod storage;
pub mod tags;

pub use beacon::{BeaconDecoder, BeaconFixedFields, BeaconRecord, CapabilityFlag, CapabilityFlags, CaptureTime, RxInfo};
pub use config::CaptureConfig;
pub use encryption::{classify, EncryptionLabel};
pub use error::{DecodeError, FormatError, StorageError};
pub use format::{OutputFormat, PcapGlobalHeader, PcapRecordHeader, RecordFormatter};
pub use mac::{MacAddr, MacHeader};
pub use oui::OuiTable;
pub use session::{CaptureSession, ChannelHopper, CurrentChannel, FrameOutcome, SessionStats};
pub use storage::{FileStorage, MemoryStorage, StorageSink};
pub use tags::{SupportedRate, TagFindings};
