use crate::release::AssetDigest;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum VerificationError {
    #[error("Unsupported digest algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Verification failed: expected {expected}, got {actual}")]
    VerificationFailed { expected: String, actual: String },
}

enum ContentDigestHasher {
    Sha256(Sha256),
}

/// Incremental hasher bound to the digest it must reproduce.
pub struct ContentDigestVerifier {
    hasher: ContentDigestHasher,
    expected_hex: String,
}

impl ContentDigestVerifier {
    pub fn new(expected: &AssetDigest) -> Result<Self, VerificationError> {
        if !expected.is_sha256() {
            return Err(VerificationError::UnsupportedAlgorithm(
                expected.algorithm.clone(),
            ));
        }

        Ok(Self {
            hasher: ContentDigestHasher::Sha256(Sha256::new()),
            expected_hex: expected.hex.to_ascii_lowercase(),
        })
    }

    #[inline]
    pub fn update(&mut self, data: impl AsRef<[u8]>) {
        match &mut self.hasher {
            ContentDigestHasher::Sha256(digest) => Digest::update(digest, data.as_ref()),
        }
    }

    pub fn verify(self) -> Result<(), VerificationError> {
        let actual_hex = match self.hasher {
            ContentDigestHasher::Sha256(digest) => hex::encode(digest.finalize()),
        };

        if actual_hex.eq_ignore_ascii_case(&self.expected_hex) {
            Ok(())
        } else {
            Err(VerificationError::VerificationFailed {
                expected: self.expected_hex,
                actual: actual_hex,
            })
        }
    }
}
