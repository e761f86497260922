mod checksum_file;
mod content_digest_hasher;
mod verifier;

pub use checksum_file::{algorithm_for_checksum_name, parse_checksum_file};
pub use content_digest_hasher::{ContentDigestVerifier, VerificationError};
pub use verifier::{VerificationOutcome, Verifier};
