use super::Config;
use crate::error::RelfetchError;
use config::{Config as ConfigBuilder, Environment};

pub const ENV_PREFIX: &str = "RELFETCH";

/// Layers built-in defaults, an optional config file and `RELFETCH_*` environment variables.
pub fn load_config(config_path: Option<&str>) -> Result<Config, RelfetchError> {
    let mut builder = ConfigBuilder::builder().add_source(ConfigBuilder::try_from(&Config::default())?);

    if let Some(config_path) = config_path {
        tracing::debug!("Reading configuration file {}", config_path);
        builder = builder.add_source(config::File::with_name(config_path));
    }

    let app_config: Config = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("checksum_suffixes"),
        )
        .build()?
        .try_deserialize()?;

    validate_config(&app_config)?;
    Ok(app_config)
}

pub fn validate_config(app_config: &Config) -> Result<(), RelfetchError> {
    for (name, value) in [
        ("concurrency", app_config.concurrency as u64),
        ("max_attempts", u64::from(app_config.max_attempts)),
        ("chunk_size", app_config.chunk_size as u64),
        ("request_timeout_secs", app_config.request_timeout_secs),
        ("connect_timeout_secs", app_config.connect_timeout_secs),
        ("render_interval_ms", app_config.render_interval_ms),
    ] {
        if value == 0 {
            return Err(RelfetchError::CliArgumentValidation {
                details: format!("{name} must be greater than 0."),
            });
        }
    }

    if app_config.asset_suffix.is_empty() {
        return Err(RelfetchError::CliArgumentValidation {
            details: "asset_suffix cannot be empty.".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_config_without_file_uses_defaults() {
        let app_config = load_config(None).expect("defaults should load");

        assert_eq!(app_config.concurrency, 4);
        assert_eq!(app_config.max_attempts, 5);
        assert_eq!(app_config.chunk_size, 8192);
        assert_eq!(app_config.asset_suffix, ".AppImage");
    }

    #[test]
    fn test_load_config_file_overrides_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file");
        writeln!(file, "concurrency = 2\nasset_suffix = \".tar.gz\"").expect("write config");

        let app_config =
            load_config(file.path().to_str()).expect("config file should load");

        assert_eq!(app_config.concurrency, 2);
        assert_eq!(app_config.asset_suffix, ".tar.gz");
        assert_eq!(app_config.max_attempts, 5);
    }

    #[test]
    fn test_load_config_rejects_unknown_keys() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file");
        writeln!(file, "concurency = 2").expect("write config");

        assert!(load_config(file.path().to_str()).is_err());
    }

    #[test]
    fn test_validate_config_rejects_zero_concurrency() {
        let app_config = Config {
            concurrency: 0,
            ..Config::default()
        };

        let err = validate_config(&app_config).unwrap_err();
        assert!(err.to_string().contains("concurrency must be greater than 0"));
    }
}
