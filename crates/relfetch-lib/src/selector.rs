use crate::config::Config;
use crate::error::FetchError;
use crate::release::{ReleaseAsset, ReleaseDetails};

/// Primary artifact of a release plus its companion checksum file, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedAssets {
    pub primary: ReleaseAsset,
    /// `None` means verification is unavailable for this job
    pub checksum: Option<ReleaseAsset>,
}

#[derive(Debug, Clone)]
pub struct AssetSelector {
    primary_suffix: String,
    checksum_suffixes: Vec<String>,
}

impl AssetSelector {
    pub fn new(primary_suffix: impl Into<String>, checksum_suffixes: Vec<String>) -> Self {
        Self {
            primary_suffix: primary_suffix.into(),
            checksum_suffixes,
        }
    }

    pub fn from_config(app_config: &Config) -> Self {
        Self::new(
            app_config.asset_suffix.clone(),
            app_config.checksum_suffixes.clone(),
        )
    }

    /// First asset (in API order) ending with the primary suffix, and the asset
    /// named exactly `<primary><checksum suffix>` for the first suffix that matches.
    pub fn select_primary_and_checksum(
        &self,
        assets: &[ReleaseAsset],
    ) -> Option<(ReleaseAsset, Option<ReleaseAsset>)> {
        let mut candidates = assets
            .iter()
            .filter(|asset| asset.name.ends_with(&self.primary_suffix));
        let primary = candidates.next()?;

        let ignored = candidates.count();
        if ignored > 0 {
            tracing::debug!(
                asset = %primary.name,
                ignored,
                "Several assets match the primary suffix, using the first one"
            );
        }

        let checksum = self.checksum_suffixes.iter().find_map(|suffix| {
            let wanted = format!("{}{}", primary.name, suffix);
            assets.iter().find(|asset| asset.name == wanted)
        });

        Some((primary.clone(), checksum.cloned()))
    }

    pub fn select(&self, release: &ReleaseDetails) -> Result<SelectedAssets, FetchError> {
        let (primary, checksum) = self
            .select_primary_and_checksum(&release.assets)
            .ok_or_else(|| FetchError::AssetNotFound {
                repo: format!("{}/{}", release.owner, release.repo),
                suffix: self.primary_suffix.clone(),
            })?;

        if checksum.is_none() {
            tracing::warn!(
                asset = %primary.name,
                "No checksum file published, verification unavailable"
            );
        }

        Ok(SelectedAssets { primary, checksum })
    }
}
