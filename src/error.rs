use thiserror::Error;

/// A frame too short to decode. The frame is dropped, never fatal.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("frame too short for MAC header: {len} of 24 bytes")]
    ShortHeader { len: usize },

    #[error("beacon body too short for fixed fields: {len} of 12 bytes")]
    ShortFixedFields { len: usize },

    #[error("radiotap header malformed or truncated ({len} bytes)")]
    BadRadiotap { len: usize },
}

/// Failure while rendering a record into its output encoding.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame of {len} bytes does not fit a pcap length field")]
    FrameTooLarge { len: usize },
}

/// Failure reported by the storage collaborator.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no capture file is open")]
    NotOpen,
}
