use std::path::{Path, PathBuf};

/// Strips a single leading `v`/`V` from a release tag, when followed by a digit.
pub fn strip_version_prefix(tag: &str) -> &str {
    match tag.strip_prefix(['v', 'V']) {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest,
        _ => tag,
    }
}

/// Destination of an asset: its base name inside `output_dir`.
pub fn destination_path(output_dir: &Path, asset_name: &str) -> PathBuf {
    let base_name = Path::new(asset_name)
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| sanitize_file_name(asset_name).into());
    output_dir.join(base_name)
}

fn sanitize_file_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
            _ => '_',
        })
        .collect();

    if sanitized.trim_matches('.').is_empty() {
        "asset".to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_version_prefix_with_leading_v() {
        assert_eq!(strip_version_prefix("v1.2.3"), "1.2.3");
        assert_eq!(strip_version_prefix("V24.1"), "24.1");
    }

    #[test]
    fn test_strip_version_prefix_without_prefix() {
        assert_eq!(strip_version_prefix("1.2.3"), "1.2.3");
        assert_eq!(strip_version_prefix(""), "");
    }

    #[test]
    fn test_strip_version_prefix_keeps_words_starting_with_v() {
        assert_eq!(strip_version_prefix("vivaldi-7"), "vivaldi-7");
        assert_eq!(strip_version_prefix("v"), "v");
    }

    #[test]
    fn test_destination_path_uses_base_name() {
        let dir = Path::new("/tmp/out");

        assert_eq!(
            destination_path(dir, "app-1.0.AppImage"),
            PathBuf::from("/tmp/out/app-1.0.AppImage")
        );
        assert_eq!(
            destination_path(dir, "nested/dir/app.AppImage"),
            PathBuf::from("/tmp/out/app.AppImage")
        );
    }

    #[test]
    fn test_destination_path_sanitizes_names_without_base() {
        assert_eq!(destination_path(Path::new("out"), ".."), PathBuf::from("out/asset"));
        assert_eq!(destination_path(Path::new("out"), ""), PathBuf::from("out/asset"));
    }
}
