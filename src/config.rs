use std::path::PathBuf;

use crate::format::OutputFormat;

pub const DEFAULT_FORMAT: OutputFormat = OutputFormat::Pcap;
pub const DEFAULT_CHANNEL: u8 = 1;
pub const DEFAULT_HOP_INTERVAL_MS: u64 = 250;
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
pub const DEFAULT_CAPTURE_DIR: &str = "captures";
pub const HOP_CHANNELS: [u8; 13] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13];

#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Exactly one encoding per capture.
    pub format: OutputFormat,
    pub capture_dir: PathBuf,
    /// Rotate once the current file grows past this many bytes.
    pub max_file_size: u64,
    pub initial_channel: u8,
    pub channel_hopping: bool,
    pub hop_interval_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            format: DEFAULT_FORMAT,
            capture_dir: PathBuf::from(DEFAULT_CAPTURE_DIR),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            initial_channel: DEFAULT_CHANNEL,
            channel_hopping: true,
            hop_interval_ms: DEFAULT_HOP_INTERVAL_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = CaptureConfig::default();
        assert_eq!(c.format, OutputFormat::Pcap);
        assert_eq!(c.max_file_size, 10_485_760);
        assert_eq!(c.capture_dir, PathBuf::from("captures"));
        assert!(HOP_CHANNELS.contains(&c.initial_channel));
    }
}
