//! Content digests of pulled blobs.
//!
//! Wraps `oci_spec::image::Digest` for parsing and adds verification of
//! downloaded content against the digest announced by the registry.

use crate::error::{ChartexError, Result};
use oci_spec::image::Digest as OciDigest;
use sha2::{Digest as Sha2Digest, Sha256};
use std::fmt;
use std::str::FromStr;


/// A content digest such as `sha256:7173b809...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest(OciDigest);

impl FromStr for Digest {
    type Err = ChartexError;

    fn from_str(s: &str) -> Result<Self> {
        let oci_digest = OciDigest::from_str(s).map_err(|e| ChartexError::Validation {
            message: format!("Invalid digest format: {}", e),
            source: Some(Box::new(e)),
        })?;
        Ok(Digest(oci_digest))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<OciDigest> for Digest {
    fn from(digest: OciDigest) -> Self {
        Digest(digest)
    }
}

impl Digest {
    /// The algorithm part, e.g. `sha256`.
    pub fn algorithm(&self) -> &str {
        self.0.algorithm().as_ref()
    }

    /// The hex encoded hash.
    pub fn hex(&self) -> &str {
        self.0.digest()
    }

    /// Checks that `data` hashes to this digest.
    ///
    /// Only `sha256` digests can be verified.
    pub fn verify(&self, data: &[u8]) -> Result<()> {
        if self.algorithm() != "sha256" {
            return Err(ChartexError::validation(format!(
                "Unsupported digest algorithm: {}. Only sha256 is currently supported",
                self.algorithm()
            )));
        }

        let computed = format!("{:x}", Sha256::digest(data));
        if computed != self.hex() {
            return Err(ChartexError::validation(format!(
                "Digest mismatch: expected {}, computed sha256:{}",
                self, computed
            )));
        }

        Ok(())
    }
}
