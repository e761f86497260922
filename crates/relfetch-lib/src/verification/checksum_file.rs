use crate::error::FetchError;
use crate::release::AssetDigest;

struct ChecksumLine<'a> {
    digest: AssetDigest,
    file_name: Option<&'a str>,
}

/// Hash algorithm implied by a checksum file name, e.g. `app.AppImage.sha256sum` → `sha256`.
pub fn algorithm_for_checksum_name(checksum_name: &str) -> String {
    let extension = checksum_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    let algorithm = extension.strip_suffix("sum").unwrap_or(&extension);

    if algorithm.starts_with("sha") || algorithm.starts_with("md5") || algorithm.starts_with("blake") {
        algorithm.to_string()
    } else {
        AssetDigest::SHA256.to_string()
    }
}

fn parse_line<'a>(line: &'a str, default_algorithm: &str) -> Option<ChecksumLine<'a>> {
    let mut tokens = line.split_whitespace();
    let first = tokens.next()?;
    let file_name = tokens.next().map(|name| name.trim_start_matches('*'));

    let digest = if first.contains(':') {
        first.parse::<AssetDigest>().ok()?
    } else {
        if hex::decode(first).is_err() {
            return None;
        }
        AssetDigest {
            algorithm: default_algorithm.to_string(),
            hex: first.to_ascii_lowercase(),
        }
    };

    Some(ChecksumLine { digest, file_name })
}

/// Reads the digest a checksum companion file declares for `primary_name`.
///
/// Accepts a bare hex digest, `sha256sum` output (`<hex>  [*]<file>`, one or
/// more lines) and `<algorithm>:<hex>`.
pub fn parse_checksum_file(
    checksum_name: &str,
    primary_name: &str,
    content: &str,
) -> Result<AssetDigest, FetchError> {
    let malformed = |reason: String| FetchError::MalformedChecksum {
        asset: checksum_name.to_string(),
        reason,
    };
    let default_algorithm = algorithm_for_checksum_name(checksum_name);

    let lines: Vec<ChecksumLine<'_>> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| parse_line(line, &default_algorithm))
        .collect();

    if lines.is_empty() {
        return Err(malformed("no digest found".to_string()));
    }

    if let Some(line) = lines.iter().find(|line| {
        line.file_name
            .is_some_and(|name| name == primary_name || name.rsplit('/').next() == Some(primary_name))
    }) {
        return Ok(line.digest.clone());
    }

    if lines.iter().any(|line| line.file_name.is_some()) {
        return Err(malformed(format!("no entry for {primary_name}")));
    }

    Ok(lines[0].digest.clone())
}
