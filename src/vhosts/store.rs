//! Vhost data file persistence.
//!
//! # File Layout
//! ```text
//! "VHST" | format version (u16 LE) | postcard(PersistedVhosts)
//! ```
//!
//! Only data is written. Handlers are replaced by their catalog tag (the
//! vhost `path`) and are re-attached from the catalog when the registry loads.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use crate::vhosts::binding::Vhost;
use crate::vhosts::error::{VhostError, VhostResult};
use crate::vhosts::hash::{fingerprint_pairs, Checksum};

const MAGIC: &[u8; 4] = b"VHST";
const FORMAT_VERSION: u16 = 1;
const HEADER_LEN: usize = MAGIC.len() + 2;

/// Serializable form of a single vhost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VhostRecord {
    pub hostname: String,
    pub path: String,
    pub website_id: String,
    pub last_modified: i64,
}

impl From<&Vhost> for VhostRecord {
    fn from(vhost: &Vhost) -> Self {
        Self {
            hostname: vhost.hostname.clone(),
            path: vhost.path.clone(),
            website_id: vhost.website_id.clone(),
            last_modified: vhost.last_modified,
        }
    }
}

impl From<VhostRecord> for Vhost {
    /// Loaded vhosts start on the placeholder handlers.
    fn from(record: VhostRecord) -> Self {
        let mut vhost = Vhost::unlinked(record.hostname, record.path, record.website_id);
        vhost.last_modified = record.last_modified;
        vhost
    }
}

/// Serializable form of a whole registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedVhosts {
    pub version: u64,
    pub last_modified: i64,
    pub checksum: Checksum,
    pub vhosts: Vec<VhostRecord>,
}

impl PersistedVhosts {
    /// Recompute the fingerprint over the records.
    pub fn compute_checksum(&self) -> VhostResult<Checksum> {
        fingerprint_pairs(
            self.vhosts
                .iter()
                .map(|r| (r.hostname.as_str(), r.website_id.as_str())),
        )
    }

    /// Fail with `IntegrityMismatch` unless the stored checksum matches.
    pub fn verify(&self) -> VhostResult<()> {
        let computed = self.compute_checksum()?;
        if computed != self.checksum {
            return Err(VhostError::IntegrityMismatch {
                stored: self.checksum,
                computed,
            });
        }
        Ok(())
    }
}

/// Encode a registry snapshot into the file format.
pub fn encode(data: &PersistedVhosts) -> VhostResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(HEADER_LEN + 64 * (data.vhosts.len() + 1));
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    let payload = postcard::to_stdvec(data)?;
    buf.extend_from_slice(&payload);
    Ok(buf)
}

/// Decode the file format. Does not verify the checksum.
pub fn decode(bytes: &[u8]) -> VhostResult<PersistedVhosts> {
    if bytes.len() < HEADER_LEN || &bytes[..MAGIC.len()] != MAGIC {
        return Err(VhostError::Format("missing VHST header".to_string()));
    }
    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != FORMAT_VERSION {
        return Err(VhostError::Format(format!(
            "unsupported format version {}",
            version
        )));
    }
    Ok(postcard::from_bytes(&bytes[HEADER_LEN..])?)
}

/// Write a snapshot to `path`, creating or truncating the file.
pub fn write_file(path: &Path, data: &PersistedVhosts) -> VhostResult<()> {
    let bytes = encode(data)?;
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read and verify a snapshot from `path`.
pub fn read_file(path: &Path) -> VhostResult<PersistedVhosts> {
    if !file_exists(path)? {
        return Err(VhostError::FileNotFound(path.to_path_buf()));
    }
    let mut bytes = Vec::new();
    File::open(path)?.read_to_end(&mut bytes)?;
    let data = decode(&bytes)?;
    data.verify()?;
    Ok(data)
}

/// True if something exists at `path`.
///
/// Only a missing entry yields `Ok(false)`; any other stat failure is `Io`.
pub fn file_exists(path: &Path) -> VhostResult<bool> {
    Ok(path.try_exists()?)
}
