use thiserror::Error;

/// Raised while reading process configuration at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable '{0}'")]
    Missing(&'static str),

    #[error("environment variable '{name}' has an invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}
