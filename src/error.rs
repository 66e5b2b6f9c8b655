//! Error types for the bot core.
//!
//! Protocol and parse failures are never fatal to a connection; they are
//! logged and the offending line is dropped. Configuration and module errors
//! surface at startup. Handler failures are caught by the event bus.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Errors raised while framing or decoding protocol lines.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors encountered when parsing a single protocol line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MessageParseError {
    /// Line was empty.
    #[error("empty message")]
    EmptyMessage,

    /// Not enough arguments for the command.
    #[error("not enough arguments for {command}: expected {expected}, got {got}")]
    NotEnoughArguments {
        /// The command name.
        command: String,
        /// Expected number of arguments.
        expected: usize,
        /// Actual number of arguments.
        got: usize,
    },

    /// Parsing failed at a known position.
    #[error("parsing failed at position {position}: {context}")]
    ParseContext {
        /// Byte position where parsing failed.
        position: usize,
        /// Description of what was being parsed.
        context: String,
    },
}

/// Invalid or incomplete bot configuration. Fatal for the affected connection.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// No nicknames configured.
    #[error("no nicknames configured")]
    MissingNickname,

    /// No server host configured.
    #[error("no server host configured")]
    MissingHost,

    /// The configuration file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML.
    #[cfg(feature = "toml")]
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Failures loading or registering a module. Fatal for that module only.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ModuleError {
    /// No factory is registered under this identifier.
    #[error("no such module: {0}")]
    NotFound(String),

    /// The module factory refused to construct an instance.
    #[error("module {name} is invalid: {reason}")]
    Invalid {
        /// Module identifier.
        name: String,
        /// Reason reported by the factory.
        reason: String,
    },

    /// The same module type is already registered under this tag.
    #[error("module {module} is already registered for {tag}")]
    AlreadyRegistered {
        /// Module type name.
        module: &'static str,
        /// Connection tag.
        tag: String,
    },
}

/// A module handler failed while an event was being dispatched.
///
/// The bus logs these and continues with the next handler.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HandlerError {
    /// The handler returned an error.
    #[error("{module} failed handling {event}: {source}")]
    Failed {
        /// Module type name.
        module: &'static str,
        /// Event kind being dispatched.
        event: &'static str,
        /// The handler's error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The handler panicked.
    #[error("{module} panicked handling {event}: {message}")]
    Panicked {
        /// Module type name.
        module: &'static str,
        /// Event kind being dispatched.
        event: &'static str,
        /// Panic payload, if it was a string.
        message: String,
    },
}

/// Network-level failures. Always routed to the reconnection supervisor.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConnectionError {
    /// Socket failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The line codec gave up on the stream.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The server host could not be used as a connect target.
    #[error("invalid host: {0}")]
    InvalidHost(String),

    /// TLS was requested but the connector only speaks plain TCP.
    #[error("TLS requested but the connector does not support it")]
    TlsUnsupported,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MessageParseError::NotEnoughArguments {
            command: "KICK".to_string(),
            expected: 2,
            got: 1,
        };
        assert_eq!(
            format!("{}", err),
            "not enough arguments for KICK: expected 2, got 1"
        );

        let err = ModuleError::AlreadyRegistered {
            module: "Dance",
            tag: "irc.example.net:6667".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "module Dance is already registered for irc.example.net:6667"
        );
    }

    #[test]
    fn test_handler_error_keeps_source() {
        let err = HandlerError::Failed {
            module: "Quotes",
            event: "Trigger",
            source: anyhow::anyhow!("backend offline").into(),
        };
        assert_eq!(
            err.to_string(),
            "Quotes failed handling Trigger: backend offline"
        );
        let source = std::error::Error::source(&err);
        assert_eq!(source.unwrap().to_string(), "backend offline");
    }
}
