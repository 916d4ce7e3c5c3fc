use super::{types::Config, ConfigError};
use crate::discovery::catalog;

/// Validate configuration
/// Currently validates:
/// - base_dir is not empty
/// - timeout is not 0
/// - every converter override names a known converter
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.base_dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "base_dir cannot be empty".to_string(),
        ));
    }

    if config.timeout == 0 {
        return Err(ConfigError::ValidationError(
            "timeout cannot be 0".to_string(),
        ));
    }

    let mut unknown: Vec<&str> = config
        .converters
        .keys()
        .map(String::as_str)
        .filter(|name| catalog::find(name).is_none())
        .collect();
    if !unknown.is_empty() {
        unknown.sort_unstable();
        return Err(ConfigError::ValidationError(format!(
            "unknown converters: {}",
            unknown.join(", ")
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MetricsConfig, TimeoutUnit};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn config() -> Config {
        Config {
            base_dir: PathBuf::from("/tmp/docshift"),
            timeout: 60,
            timeout_unit: TimeoutUnit::Seconds,
            converters: HashMap::new(),
            metrics: MetricsConfig::default(),
        }
    }

    #[test]
    fn test_validate_valid_config() {
        let mut config = config();
        config.converters.insert("pandoc".to_string(), false);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_timeout_zero_fails() {
        let config = Config {
            timeout: 0,
            ..config()
        };
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_empty_base_dir_fails() {
        let config = Config {
            base_dir: PathBuf::new(),
            ..config()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_unknown_converter_fails() {
        let mut config = config();
        config.converters.insert("msword".to_string(), true);
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("msword"));
    }
}
