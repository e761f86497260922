use super::content_digest_hasher::{ContentDigestVerifier, VerificationError};
use crate::config::DEFAULT_CHUNK_SIZE;
use crate::error::FetchError;
use crate::release::ReleaseAsset;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Result of the verify step of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified,
    /// No checksum file was published; the artifact is unverified
    Unavailable,
}

/// Streams a file through SHA-256 in fixed-size chunks and compares the
/// result with the asset's digest. Reads only; repeated calls agree.
#[derive(Debug, Clone, Copy)]
pub struct Verifier {
    chunk_size: usize,
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl Verifier {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn verify(&self, asset: &ReleaseAsset, file_path: &Path) -> Result<(), FetchError> {
        let mut verifier =
            ContentDigestVerifier::new(&asset.digest).map_err(|e| map_error(asset, e))?;

        let mut file = File::open(file_path).map_err(|e| FetchError::io(file_path, e))?;
        let mut buffer = vec![0u8; self.chunk_size];

        loop {
            let bytes_read = file
                .read(&mut buffer)
                .map_err(|e| FetchError::io(file_path, e))?;
            if bytes_read == 0 {
                break;
            }
            verifier.update(&buffer[..bytes_read]);
        }

        verifier.verify().map_err(|e| map_error(asset, e))?;
        tracing::debug!(asset = %asset.name, path = %file_path.display(), "Digest verified");
        Ok(())
    }
}

fn map_error(asset: &ReleaseAsset, err: VerificationError) -> FetchError {
    match err {
        VerificationError::UnsupportedAlgorithm(algorithm) => FetchError::UnsupportedDigestAlgorithm {
            asset: asset.name.clone(),
            algorithm,
        },
        VerificationError::VerificationFailed { expected, actual } => FetchError::DigestMismatch {
            asset: asset.name.clone(),
            expected,
            actual,
        },
    }
}
