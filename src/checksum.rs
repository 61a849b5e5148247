//! Checksum utilities for dataset integrity verification

use sha2::{Digest, Sha256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::Path;

/// SHA256 checksum of dataset content
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum(String);

impl Checksum {
    /// Compute checksum from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Compute checksum from a string
    pub fn from_str(content: &str) -> Self {
        Self::from_bytes(content.as_bytes())
    }

    /// Compute checksum of a file, streamed in 8 KiB chunks
    pub fn from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let mut file = std::fs::File::open(path)?;
        let mut hasher = Sha256::new();
        let mut buf = [0u8; 8192];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(Self(format!("{:x}", hasher.finalize())))
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Verify that content matches this checksum
    pub fn verify(&self, content: &str) -> bool {
        let computed = Self::from_str(content);
        self.0 == computed.0
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Checksum {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Checksum {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_consistency() {
        let content = r#"{"id":"S03.I01","status":"todo"}"#;
        let checksum1 = Checksum::from_str(content);
        let checksum2 = Checksum::from_str(content);
        assert_eq!(checksum1, checksum2);
    }

    #[test]
    fn test_checksum_different_content() {
        let content1 = r#"{"id":"S03.I01"}"#;
        let content2 = r#"{"id":"S03.I02"}"#;
        let checksum1 = Checksum::from_str(content1);
        let checksum2 = Checksum::from_str(content2);
        assert_ne!(checksum1, checksum2);
    }

    #[test]
    fn test_checksum_verification() {
        let content = r#"{"id":"S03"}"#;
        let checksum = Checksum::from_str(content);
        assert!(checksum.verify(content));
        assert!(!checksum.verify("different content"));
    }

    #[test]
    fn test_file_checksum_matches_string_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("issues.jsonl");
        let content = "{\"id\":\"S03.I01\",\"status\":\"todo\"}\n";
        std::fs::write(&path, content).unwrap();

        assert_eq!(Checksum::from_file(&path).unwrap(), Checksum::from_str(content));
    }
}
