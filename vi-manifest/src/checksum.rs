//! Content digests for stored objects
//!
//! Objects are hashed as a stream so large videos never sit in memory. A
//! failed read only costs that object its digest; callers get `None` and
//! carry on.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use tokio::io::AsyncReadExt;
use tracing::warn;
use vi_common::storage::ObjectStore;
use vi_common::{Error, Result};

/// Read buffer size (1 MiB)
const READ_CHUNK: usize = 1024 * 1024;

pub const SHA256: &str = "sha256";

/// Algorithm-tagged digest, displayed as `sha256:<hex>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest {
    algorithm: String,
    hex: String,
}

impl Digest {
    pub fn sha256_of(bytes: &[u8]) -> Self {
        Self {
            algorithm: SHA256.to_string(),
            hex: format!("{:x}", Sha256::digest(bytes)),
        }
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn hex(&self) -> &str {
        &self.hex
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

impl FromStr for Digest {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (algorithm, hex) = s
            .split_once(':')
            .ok_or_else(|| Error::InvalidInput(format!("digest {s:?} has no algorithm tag")))?;
        if algorithm.is_empty() || hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidInput(format!("malformed digest {s:?}")));
        }
        Ok(Self {
            algorithm: algorithm.to_string(),
            hex: hex.to_ascii_lowercase(),
        })
    }
}

impl TryFrom<String> for Digest {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Digest> for String {
    fn from(value: Digest) -> Self {
        value.to_string()
    }
}

/// SHA-256 of a stored object
///
/// `None` when the object is missing or could not be read; read errors are
/// logged, never returned.
pub async fn compute_checksum(store: &dyn ObjectStore, name: &str) -> Option<Digest> {
    match stream_sha256(store, name).await {
        Ok(digest) => digest,
        Err(e) => {
            warn!(bucket = %store.bucket(), object = name, error = %e, "Checksum failed");
            None
        }
    }
}

async fn stream_sha256(store: &dyn ObjectStore, name: &str) -> Result<Option<Digest>> {
    let Some(mut reader) = store.open(name).await? else {
        return Ok(None);
    };

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; READ_CHUNK];
    loop {
        let bytes_read = reader.read(&mut buffer).await?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(Some(Digest {
        algorithm: SHA256.to_string(),
        hex: format!("{:x}", hasher.finalize()),
    }))
}
