mod resolver;
mod types;

pub use resolver::ReleaseResolver;
pub use types::{AssetDigest, DigestParseError, ReleaseAsset, ReleaseDetails, RepoId};
