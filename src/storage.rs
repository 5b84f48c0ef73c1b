use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::StorageError;
use crate::format::OutputFormat;

const FILE_STEM: &str = "beacons";

/// Append-only sink with a size the caller watches for rotation.
pub trait StorageSink {
    fn append(&mut self, bytes: &[u8]) -> Result<(), StorageError>;

    /// Bytes in the current file, preamble included.
    fn size(&self) -> u64;

    /// Close the current file and start the next one.
    fn rotate(&mut self) -> Result<(), StorageError>;
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> StorageError + '_ {
    move |source| StorageError::Io { path: path.display().to_string(), source }
}

trait Truncate: Write {
    fn truncate_to(&mut self, len: u64) -> io::Result<()>;
}

impl Truncate for File {
    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)?;
        self.seek(SeekFrom::Start(len))?;
        Ok(())
    }
}

/// Write `bytes` as one record at offset `at`. A partial write is cut away
/// so the output ends where it did before the call.
fn write_record<W: Truncate>(out: &mut W, at: u64, bytes: &[u8]) -> io::Result<()> {
    let res = out.write_all(bytes).and_then(|_| out.flush());
    if res.is_err() {
        if let Err(e) = out.truncate_to(at) {
            warn!("Cannot cut back partial record: {e}");
        }
    }
    res
}

/// Numbered capture files (`beacons_0001.pcap`, ...) in one directory.
///
/// Records go straight to the file, unbuffered, so every successful append
/// is on disk and a failed one leaves nothing behind.
pub struct FileStorage {
    dir: PathBuf,
    format: OutputFormat,
    index: u32,
    path: PathBuf,
    file: Option<File>,
    size: u64,
}

impl FileStorage {
    /// Create `dir` if needed and open the first file numbered after any
    /// capture already there.
    pub fn open(dir: impl Into<PathBuf>, format: OutputFormat) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(io_err(&dir))?;
        let index = last_index(&dir, format).map_err(io_err(&dir))?;
        let mut storage = Self { dir, format, index, path: PathBuf::new(), file: None, size: 0 };
        storage.open_next()?;
        Ok(storage)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_next(&mut self) -> Result<(), StorageError> {
        self.index += 1;
        let path = self.dir.join(format!("{FILE_STEM}_{:04}.{}", self.index, self.format.extension()));
        let mut file = OpenOptions::new().write(true).create_new(true).open(&path).map_err(io_err(&path))?;
        let preamble = self.format.file_preamble();
        write_record(&mut file, 0, &preamble).map_err(io_err(&path))?;

        info!("Opened capture file {:?}", path);
        self.size = preamble.len() as u64;
        self.file = Some(file);
        self.path = path;
        Ok(())
    }

    pub fn close(&mut self) -> Result<(), StorageError> {
        if let Some(f) = self.file.take() {
            f.sync_all().map_err(io_err(&self.path))?;
        }
        Ok(())
    }
}

impl StorageSink for FileStorage {
    fn append(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
        let f = self.file.as_mut().ok_or(StorageError::NotOpen)?;
        write_record(f, self.size, bytes).map_err(io_err(&self.path))?;
        self.size += bytes.len() as u64;
        Ok(())
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn rotate(&mut self) -> Result<(), StorageError> {
        self.close()?;
        self.open_next()
    }
}

impl Drop for FileStorage {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Highest `beacons_NNNN.<ext>` index already present in `dir`.
fn last_index(dir: &Path, format: OutputFormat) -> std::io::Result<u32> {
    let suffix = format!(".{}", format.extension());
    let prefix = format!("{FILE_STEM}_");
    let mut max = 0;
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name();
        let Some(name) = name.to_str() else { continue };
        let n = name
            .strip_prefix(&prefix)
            .and_then(|s| s.strip_suffix(&suffix))
            .and_then(|n| n.parse::<u32>().ok());
        if let Some(n) = n {
            max = max.max(n);
        }
    }
    Ok(max)
}

/// In-memory sink, for tests and dry runs. Each rotation starts a new buffer.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    pub files: Vec<Vec<u8>>,
    preamble: Vec<u8>,
    pub fail_writes: bool,
}

impl MemoryStorage {
    pub fn new(format: OutputFormat) -> Self {
        let preamble = format.file_preamble();
        Self { files: vec![preamble.clone()], preamble, fail_writes: false }
    }

    pub fn current(&self) -> &[u8] {
        self.files.last().map(Vec::as_slice).unwrap_or(&[])
    }
}

impl StorageSink for MemoryStorage {
    fn append(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Io {
                path: "<memory>".into(),
                source: io::Error::new(io::ErrorKind::Other, "write refused"),
            });
        }
        match self.files.last_mut() {
            Some(f) => f.extend_from_slice(bytes),
            None => return Err(StorageError::NotOpen),
        }
        Ok(())
    }

    fn size(&self) -> u64 {
        self.current().len() as u64
    }

    fn rotate(&mut self) -> Result<(), StorageError> {
        self.files.push(self.preamble.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::PCAP_GLOBAL_HEADER_LEN;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("beaconcap-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn pcap_file_starts_with_global_header() {
        let dir = scratch_dir("pcap");
        let mut s = FileStorage::open(&dir, OutputFormat::Pcap).unwrap();
        assert_eq!(s.size(), PCAP_GLOBAL_HEADER_LEN as u64);
        s.append(&[1, 2, 3]).unwrap();
        assert_eq!(s.size(), PCAP_GLOBAL_HEADER_LEN as u64 + 3);
        let path = s.path().to_path_buf();
        drop(s);

        let bytes = fs::read(&path).unwrap();
        assert_eq!(path.file_name().unwrap(), "beacons_0001.pcap");
        assert_eq!(&bytes[..4], &[0xd4, 0xc3, 0xb2, 0xa1]);
        assert_eq!(&bytes[PCAP_GLOBAL_HEADER_LEN..], &[1, 2, 3]);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn rotation_numbers_files() {
        let dir = scratch_dir("rotate");
        let mut s = FileStorage::open(&dir, OutputFormat::Csv).unwrap();
        assert_eq!(s.size(), 0);
        s.append(b"a,b\n").unwrap();
        s.rotate().unwrap();
        assert_eq!(s.size(), 0);
        assert_eq!(s.path().file_name().unwrap(), "beacons_0002.csv");
        s.append(b"c,d\n").unwrap();
        drop(s);

        assert_eq!(fs::read(dir.join("beacons_0001.csv")).unwrap(), b"a,b\n");
        assert_eq!(fs::read(dir.join("beacons_0002.csv")).unwrap(), b"c,d\n");
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn reopen_does_not_overwrite() {
        let dir = scratch_dir("reopen");
        drop(FileStorage::open(&dir, OutputFormat::Csv).unwrap());
        fs::write(dir.join("beacons_0007.csv"), b"old").unwrap();
        let s = FileStorage::open(&dir, OutputFormat::Csv).unwrap();
        assert_eq!(s.path().file_name().unwrap(), "beacons_0008.csv");
        drop(s);
        assert_eq!(fs::read(dir.join("beacons_0007.csv")).unwrap(), b"old");
        fs::remove_dir_all(&dir).unwrap();
    }

    /// Accepts `room` more bytes, then fails like a full disk.
    struct Cramped<W> {
        inner: W,
        room: usize,
    }

    impl<W: Write> Write for Cramped<W> {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.room == 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "no space left on device"));
            }
            let n = buf.len().min(self.room);
            self.inner.write_all(&buf[..n])?;
            self.room -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.inner.flush()
        }
    }

    impl<W: Truncate> Truncate for Cramped<W> {
        fn truncate_to(&mut self, len: u64) -> io::Result<()> {
            self.inner.truncate_to(len)
        }
    }

    #[test]
    fn failed_write_leaves_no_trace() {
        let dir = scratch_dir("full");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("beacons_0001.pcap");
        let file = OpenOptions::new().write(true).create_new(true).open(&path).unwrap();
        let mut out = Cramped { inner: file, room: 30 };

        write_record(&mut out, 0, &[0x11; 24]).unwrap();
        assert!(write_record(&mut out, 24, &[0xaa; 5000]).is_err());
        assert_eq!(fs::read(&path).unwrap(), vec![0x11; 24]);

        out.room = 100;
        write_record(&mut out, 24, &[0x22; 10]).unwrap();
        drop(out);
        let bytes = fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 34);
        assert_eq!(&bytes[24..], &[0x22; 10]);
        assert!(!bytes.contains(&0xaa));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn size_tracks_file_length() {
        let dir = scratch_dir("size");
        let mut s = FileStorage::open(&dir, OutputFormat::Pcap).unwrap();
        s.append(&[7; 100]).unwrap();
        s.append(&[8; 5]).unwrap();
        assert_eq!(fs::metadata(s.path()).unwrap().len(), s.size());
        drop(s);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn closed_storage_refuses_appends() {
        let dir = scratch_dir("closed");
        let mut s = FileStorage::open(&dir, OutputFormat::Csv).unwrap();
        s.close().unwrap();
        assert!(matches!(s.append(b"x\n"), Err(StorageError::NotOpen)));
        assert_eq!(s.size(), 0);
        drop(s);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn memory_rotation() {
        let mut m = MemoryStorage::new(OutputFormat::Pcap);
        m.append(&[9; 10]).unwrap();
        assert_eq!(m.size(), 34);
        m.rotate().unwrap();
        assert_eq!(m.files.len(), 2);
        assert_eq!(m.size(), 24);
    }
}
