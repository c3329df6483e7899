//! On-disk store image
//!
//! The store file is a fixed 40-byte header followed by the bincode image of
//! the root namespace:
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ 0..8    magic "NBOX\x00\x01\x00\x00"     │
//! │ 8..10   version major (u16 LE)           │
//! │ 10..12  version minor (u16 LE)           │
//! │ 12..16  CRC32 of payload (u32 LE)        │
//! │ 16..24  commit id (u64 LE)               │
//! │ 24..32  payload length (u64 LE)          │
//! │ 32..40  reserved                         │
//! ├──────────────────────────────────────────┤
//! │ payload: bincode(Namespace)              │
//! └──────────────────────────────────────────┘
//! ```
//!
//! Commits write a sibling `.tmp` file and rename it over the data file, so
//! the file on disk is always either the previous or the new image.

use crate::error::{NestboxError, Result};
use crate::store::namespace::Namespace;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const MAGIC: [u8; 8] = *b"NBOX\x00\x01\x00\x00";
pub const VERSION_MAJOR: u16 = 1;
pub const VERSION_MINOR: u16 = 0;
pub const HEADER_SIZE: usize = 40;

/// Store file header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub magic: [u8; 8],
    pub version_major: u16,
    pub version_minor: u16,
    /// CRC32 of the payload
    pub checksum: u32,
    /// Commit that produced this image (0 for a freshly created store)
    pub commit_id: u64,
    pub payload_len: u64,
}

impl Header {
    /// Header describing `payload` as written by `commit_id`
    pub fn new(commit_id: u64, payload: &[u8]) -> Self {
        Header {
            magic: MAGIC,
            version_major: VERSION_MAJOR,
            version_minor: VERSION_MINOR,
            checksum: crc32fast::hash(payload),
            commit_id,
            payload_len: payload.len() as u64,
        }
    }

    /// Validate the header magic and version
    pub fn validate(&self) -> Result<()> {
        if self.magic != MAGIC {
            return Err(NestboxError::InvalidMagic);
        }

        // Exact major match, any minor of the same major is readable
        if self.version_major != VERSION_MAJOR {
            return Err(NestboxError::UnsupportedVersion {
                major: self.version_major,
                minor: self.version_minor,
            });
        }

        Ok(())
    }

    /// Check a payload against the recorded length and checksum
    pub fn verify_payload(&self, payload: &[u8]) -> Result<()> {
        if payload.len() as u64 != self.payload_len {
            return Err(NestboxError::Corrupted(format!(
                "payload length {} does not match header ({})",
                payload.len(),
                self.payload_len
            )));
        }

        if crc32fast::hash(payload) != self.checksum {
            return Err(NestboxError::ChecksumMismatch);
        }

        Ok(())
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..8].copy_from_slice(&self.magic);
        buf[8..10].copy_from_slice(&self.version_major.to_le_bytes());
        buf[10..12].copy_from_slice(&self.version_minor.to_le_bytes());
        buf[12..16].copy_from_slice(&self.checksum.to_le_bytes());
        buf[16..24].copy_from_slice(&self.commit_id.to_le_bytes());
        buf[24..32].copy_from_slice(&self.payload_len.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(NestboxError::Corrupted(format!(
                "truncated header: {} bytes",
                buf.len()
            )));
        }

        let mut magic = [0u8; 8];
        magic.copy_from_slice(&buf[0..8]);

        let header = Header {
            magic,
            version_major: u16::from_le_bytes([buf[8], buf[9]]),
            version_minor: u16::from_le_bytes([buf[10], buf[11]]),
            checksum: u32::from_le_bytes(read_array(&buf[12..16])),
            commit_id: u64::from_le_bytes(read_array(&buf[16..24])),
            payload_len: u64::from_le_bytes(read_array(&buf[24..32])),
        };

        header.validate()?;
        Ok(header)
    }
}

fn read_array<const N: usize>(slice: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(slice);
    out
}

/// Disk-backed store image
pub struct StoreFile {
    path: PathBuf,
    tmp_path: PathBuf,
    sync: bool,
}

impl StoreFile {
    pub fn new<P: AsRef<Path>>(path: P, sync: bool) -> Self {
        let path = path.as_ref().to_path_buf();
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");

        StoreFile {
            path,
            tmp_path: PathBuf::from(tmp),
            sync,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read and verify the image, returning the root namespace and commit id
    pub fn read_image(&self) -> Result<(Namespace, u64)> {
        let data = fs::read(&self.path)?;
        let header = Header::from_bytes(&data)?;
        let payload = &data[HEADER_SIZE..];
        header.verify_payload(payload)?;

        let root: Namespace = bincode::deserialize(payload)?;
        Ok((root, header.commit_id))
    }

    /// Atomically replace the image, returning the number of bytes written
    pub fn write_image(&self, root: &Namespace, commit_id: u64) -> Result<u64> {
        let payload = bincode::serialize(root)?;
        let header = Header::new(commit_id, &payload);

        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&self.tmp_path)?;
            file.write_all(&header.to_bytes())?;
            file.write_all(&payload)?;
            file.flush()?;
            if self.sync {
                file.sync_all()?;
            }
        }

        fs::rename(&self.tmp_path, &self.path)?;
        if self.sync {
            self.sync_parent_dir()?;
        }

        Ok((HEADER_SIZE + payload.len()) as u64)
    }

    #[cfg(unix)]
    fn sync_parent_dir(&self) -> Result<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        File::open(parent)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_parent_dir(&self) -> Result<()> {
        Ok(())
    }
}
