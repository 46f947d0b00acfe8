//! Fingerprint digest.
//!
//! The digest input is [`FingerprintRecord::canonical_form`]: compact JSON with
//! the fields in declaration order. Any server-side recomputation must use the
//! same form or hashes silently stop matching.

use super::FingerprintRecord;
use crate::error::Error;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Length of the hex digest (SHA-256).
pub const HASH_HEX_LEN: usize = 64;

/// Opaque, fixed-length lowercase hex digest of a fingerprint.
///
/// Only equality is meaningful. Holding one proves the format is correct.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FingerprintHash(String);

impl FingerprintHash {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FingerprintHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for FingerprintHash {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s.len() == HASH_HEX_LEN
            && s.bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            Ok(Self(s))
        } else {
            Err(Error::Validation(format!("invalid fingerprint hash: {s}")))
        }
    }
}

impl From<FingerprintHash> for String {
    fn from(h: FingerprintHash) -> Self {
        h.0
    }
}

/// Digests the canonical form of `record`.
#[must_use]
pub fn digest(record: &FingerprintRecord) -> FingerprintHash {
    let hash = Sha256::digest(record.canonical_form().as_bytes());
    FingerprintHash(hex::encode(hash))
}

/// Async entry point used by the login flow; the digest itself never blocks
/// for long, so it runs inline on the caller's task.
pub async fn hash(record: &FingerprintRecord) -> FingerprintHash {
    digest(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::{BrowserFamily, UNSUPPORTED};

    fn record() -> FingerprintRecord {
        FingerprintRecord {
            screen_width: 1920,
            screen_height: 1080,
            device_pixel_ratio: 1.0,
            color_depth: 24,
            timezone_offset: -480,
            locale: "zh-CN".to_string(),
            platform: "Win32".to_string(),
            browser_family: BrowserFamily::Chrome,
            browser_major: "124".to_string(),
            hardware_concurrency: 8,
            touch_support: false,
            canvas_hash: "AAAABJRU5ErkJggg==".to_string(),
            audio_hash: UNSUPPORTED.to_string(),
        }
    }

    #[tokio::test]
    async fn hash_is_deterministic() {
        let r = record();
        let first = hash(&r).await;
        let second = hash(&r.clone()).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn hash_is_fixed_length_lowercase_hex() {
        let h = hash(&record()).await;
        assert_eq!(h.as_str().len(), HASH_HEX_LEN);
        assert!(h
            .as_str()
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
    }

    #[test]
    fn any_field_change_changes_the_hash() {
        let base = digest(&record());

        let variants: Vec<FingerprintRecord> = vec![
            FingerprintRecord {
                screen_width: 1280,
                ..record()
            },
            FingerprintRecord {
                device_pixel_ratio: 1.5,
                ..record()
            },
            FingerprintRecord {
                timezone_offset: 0,
                ..record()
            },
            FingerprintRecord {
                browser_family: BrowserFamily::Edge,
                ..record()
            },
            FingerprintRecord {
                touch_support: true,
                ..record()
            },
            FingerprintRecord {
                audio_hash: "1024".to_string(),
                ..record()
            },
        ];

        for variant in variants {
            assert_ne!(digest(&variant), base, "{variant:?}");
        }
    }

    #[test]
    fn hash_matches_digest_of_canonical_form() {
        let r = record();
        let expected = hex::encode(Sha256::digest(r.canonical_form().as_bytes()));
        assert_eq!(digest(&r).as_str(), expected);
    }

    #[test]
    fn hash_rejects_malformed_input() {
        assert!(FingerprintHash::try_from("abc".to_string()).is_err());
        assert!(FingerprintHash::try_from("G".repeat(HASH_HEX_LEN)).is_err());
        assert!(FingerprintHash::try_from("A".repeat(HASH_HEX_LEN)).is_err());
        assert!(FingerprintHash::try_from("a".repeat(HASH_HEX_LEN)).is_ok());
    }

    #[test]
    fn hash_serializes_as_plain_string() {
        let h = digest(&record());
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{h}\""));
        let parsed: FingerprintHash = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, h);
    }
}
