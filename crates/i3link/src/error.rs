//! Unified error type for the i3link client.

use i3link_session::SessionError;

use crate::ConfigError;

/// Errors returned by [`I3Client`](crate::I3Client) calls.
///
/// Transport and protocol failures stay on the network thread; the game
/// thread sees them as `Disconnected` and `Error` events instead.
#[derive(Debug, thiserror::Error)]
pub enum I3Error {
    /// Unknown or offline MUD.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The configuration file could not be read.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The action is switched off in the configuration.
    #[error("{0} is disabled")]
    FeatureDisabled(&'static str),

    /// A required argument was empty.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The client has been shut down.
    #[error("I3 client is not running")]
    NotRunning,

    /// The network thread could not be started.
    #[error("failed to start network thread: {0}")]
    ThreadSpawn(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_from_session_error() {
        let err = SessionError::UnknownMud("Nowhere".into());
        let i3_err: I3Error = err.into();
        assert!(matches!(i3_err, I3Error::Session(_)));
        assert_eq!(i3_err.to_string(), "unknown MUD: Nowhere");
    }

    #[test]
    fn test_from_config_error_keeps_path() {
        let err = ConfigError::Io {
            path: PathBuf::from("/etc/i3.conf"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        let i3_err: I3Error = err.into();
        assert!(matches!(i3_err, I3Error::Config(_)));
        assert!(i3_err.to_string().contains("/etc/i3.conf"));
    }

    #[test]
    fn test_feature_disabled_message() {
        assert_eq!(I3Error::FeatureDisabled("tell").to_string(), "tell is disabled");
    }
}
