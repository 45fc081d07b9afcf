//! Body checksums for the reprocessing gate.
//!
//! A stored checksum is an opaque `algorithm:hex-digest` string. The declared
//! algorithm of the stored value selects how the body is re-hashed, so files
//! written by older builds keep matching after the default changes.

use sha1::Sha1;
use sha2::{Digest, Sha256};

/// Hash algorithms understood by the checksum gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumAlgorithm {
    Sha1,
    Sha256,
    Md5,
}

impl ChecksumAlgorithm {
    /// Algorithm declared by a stored checksum, or the default (`sha1`).
    pub fn declared_by(stored: Option<&str>) -> Self {
        match stored {
            Some(s) if s.starts_with("sha256:") => Self::Sha256,
            Some(s) if s.starts_with("md5:") => Self::Md5,
            _ => Self::Sha1,
        }
    }

    /// Prefix written before the hex digest.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Md5 => "md5",
        }
    }

    /// Compute `algorithm:hex-digest` over `body`.
    pub fn checksum(&self, body: &[u8]) -> String {
        let digest = match self {
            Self::Sha1 => format!("{:x}", Sha1::digest(body)),
            Self::Sha256 => format!("{:x}", Sha256::digest(body)),
            Self::Md5 => format!("{:x}", md5::compute(body)),
        };
        format!("{}:{digest}", self.prefix())
    }
}

/// Outcome of comparing a body against its stored checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChecksumGate {
    /// The stored value matches; nothing to do.
    Match,
    /// The stored value is absent or stale; carries the fresh checksum.
    Mismatch(String),
}

/// Re-hash `body` with the algorithm `stored` declares and compare
/// case-insensitively.
pub fn verify(stored: Option<&str>, body: &[u8]) -> ChecksumGate {
    let computed = ChecksumAlgorithm::declared_by(stored).checksum(body);
    match stored {
        Some(s) if s.eq_ignore_ascii_case(&computed) => ChecksumGate::Match,
        _ => ChecksumGate::Mismatch(computed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_algorithm_is_sha1() {
        let sum = ChecksumAlgorithm::declared_by(None).checksum(b"hello");
        assert_eq!(sum, "sha1:aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d");
    }

    #[test]
    fn test_declared_algorithms() {
        assert_eq!(
            ChecksumAlgorithm::declared_by(Some("sha256:00")),
            ChecksumAlgorithm::Sha256
        );
        assert_eq!(
            ChecksumAlgorithm::declared_by(Some("md5:00")),
            ChecksumAlgorithm::Md5
        );
        assert_eq!(
            ChecksumAlgorithm::declared_by(Some("crc32:00")),
            ChecksumAlgorithm::Sha1
        );
    }

    #[test]
    fn test_checksum_deterministic() {
        for algo in [
            ChecksumAlgorithm::Sha1,
            ChecksumAlgorithm::Sha256,
            ChecksumAlgorithm::Md5,
        ] {
            assert_eq!(algo.checksum(b"body"), algo.checksum(b"body"));
            assert_ne!(algo.checksum(b"body"), algo.checksum(b"body2"));
        }
    }

    #[test]
    fn test_md5_and_sha256_digests() {
        assert_eq!(
            ChecksumAlgorithm::Md5.checksum(b"hello"),
            "md5:5d41402abc4b2a76b9719d911017c592"
        );
        assert_eq!(
            ChecksumAlgorithm::Sha256.checksum(b"hello"),
            "sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_verify_is_case_insensitive() {
        let upper = "SHA256:2CF24DBA5FB0A30E26E83B2AC5B9E29E1B161E5C1FA7425E73043362938B9824";
        // Upper-case prefix is not recognised as sha256, so it falls back to sha1.
        assert!(matches!(verify(Some(upper), b"hello"), ChecksumGate::Mismatch(_)));

        let mixed = "sha256:2CF24DBA5FB0A30E26E83B2AC5B9E29E1B161E5C1FA7425E73043362938B9824";
        assert_eq!(verify(Some(mixed), b"hello"), ChecksumGate::Match);
    }

    #[test]
    fn test_verify_absent_or_stale() {
        assert_eq!(
            verify(None, b"hello"),
            ChecksumGate::Mismatch("sha1:aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d".into())
        );
        let stale = ChecksumAlgorithm::Md5.checksum(b"old");
        assert_eq!(
            verify(Some(&stale), b"new"),
            ChecksumGate::Mismatch(ChecksumAlgorithm::Md5.checksum(b"new"))
        );
    }
}
