//! Shared error types for configuration loading

use thiserror::Error;

/// Errors raised while loading and validating service configuration.
///
/// A missing key source gets its own variant so startup code can name
/// both sources for the operator without string matching on `Config`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("no API keys configured: set GEMINI_API_KEYS or gemini.api_keys_file")]
    NoKeySource,

    #[error("config file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config file is not valid TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result alias using the shared Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_carries_its_message() {
        let err = Error::Config("gemini.timeout_secs must be greater than 0".into());
        assert_eq!(
            err.to_string(),
            "invalid configuration: gemini.timeout_secs must be greater than 0"
        );
    }

    #[test]
    fn no_key_source_names_both_sources() {
        let msg = Error::NoKeySource.to_string();
        assert!(msg.contains("GEMINI_API_KEYS"), "got: {msg}");
        assert!(msg.contains("api_keys_file"), "got: {msg}");
    }

    #[test]
    fn io_and_toml_errors_convert() {
        let io: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert!(matches!(io, Error::Io(_)));

        let toml_err = toml::from_str::<toml::Value>("not {{ toml").unwrap_err();
        let converted: Error = toml_err.into();
        assert!(
            converted
                .to_string()
                .starts_with("config file is not valid TOML"),
            "got: {converted}"
        );
    }
}
