//! Error types for certificate expiry probing.
//!
//! A `ProbeError` never aborts a run: the report loop turns it into an
//! `ERROR:` line for the target that produced it.

use std::fmt;
use std::io;

/// Error type for a single expiry probe.
///
/// Returned when a target cannot be resolved, reached, handshaken with, or
/// when its certificate does not carry a usable expiry timestamp.
#[derive(Debug)]
pub enum ProbeError {
    /// DNS resolution failed for the given hostname
    DnsResolution {
        /// The hostname that failed to resolve
        hostname: String,
        /// The underlying I/O error
        source: io::Error,
    },

    /// TCP connection failed to the target address
    ConnectionFailed {
        /// The address (host:port) that connection failed to
        address: String,
        /// The underlying I/O error
        source: io::Error,
    },

    /// TLS handshake or certificate verification failed
    HandshakeFailed {
        /// Details about why the handshake failed
        details: String,
    },

    /// The peer certificate has no not-after field
    MissingNotAfter,

    /// Certificate could not be read or its expiry could not be parsed
    CertificateError {
        /// Description of what went wrong
        reason: String,
    },

    /// Network operation timeout
    Timeout {
        /// Description of which operation timed out
        operation: String,
    },

    /// OpenSSL error occurred
    OpenSSLError {
        /// The underlying OpenSSL error
        details: String,
    },

    /// Generic I/O error
    IoError {
        /// The underlying I/O error
        source: io::Error,
    },

    /// Configured port does not fit a TCP port
    InvalidPort {
        /// The port as given in the config
        port: i64,
    },
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DnsResolution { hostname, source } => {
                write!(f, "Failed to resolve hostname {}: {}", hostname, source)
            }
            Self::ConnectionFailed { address, source } => {
                write!(f, "Connection failed to {}: {}", address, source)
            }
            Self::HandshakeFailed { details } => {
                write!(f, "TLS handshake failed: {}", details)
            }
            Self::MissingNotAfter => write!(f, "Certificate missing notAfter field"),
            Self::CertificateError { reason } => {
                write!(f, "Certificate error: {}", reason)
            }
            Self::Timeout { operation } => {
                write!(f, "Operation timed out: {}", operation)
            }
            Self::OpenSSLError { details } => {
                write!(f, "OpenSSL error: {}", details)
            }
            Self::IoError { source } => {
                write!(f, "I/O error: {}", source)
            }
            Self::InvalidPort { port } => {
                write!(f, "port must be 0-65535, got {}", port)
            }
        }
    }
}

impl std::error::Error for ProbeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DnsResolution { source, .. } => Some(source),
            Self::ConnectionFailed { source, .. } => Some(source),
            Self::IoError { source } => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for ProbeError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Self::Timeout {
                operation: e.to_string(),
            },
            _ => Self::IoError { source: e },
        }
    }
}

impl From<openssl::error::ErrorStack> for ProbeError {
    fn from(e: openssl::error::ErrorStack) -> Self {
        Self::OpenSSLError {
            details: e.to_string(),
        }
    }
}

impl From<native_tls::Error> for ProbeError {
    fn from(e: native_tls::Error) -> Self {
        Self::HandshakeFailed {
            details: e.to_string(),
        }
    }
}

// A blocking socket whose read timeout expires mid-handshake surfaces as
// WouldBlock rather than as an io error.
impl<S> From<native_tls::HandshakeError<S>> for ProbeError {
    fn from(e: native_tls::HandshakeError<S>) -> Self {
        match e {
            native_tls::HandshakeError::WouldBlock(_) => Self::Timeout {
                operation: "TLS handshake".to_string(),
            },
            native_tls::HandshakeError::Failure(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_not_after_message() {
        assert_eq!(
            ProbeError::MissingNotAfter.to_string(),
            "Certificate missing notAfter field"
        );
    }

    #[test]
    fn test_io_timeout_maps_to_timeout() {
        let err: ProbeError = io::Error::new(io::ErrorKind::TimedOut, "timed out").into();
        assert!(matches!(err, ProbeError::Timeout { .. }));
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_connection_failed_carries_source() {
        let err = ProbeError::ConnectionFailed {
            address: "127.0.0.1:1".to_string(),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "Connection refused"),
        };
        assert_eq!(
            err.to_string(),
            "Connection failed to 127.0.0.1:1: Connection refused"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_invalid_port_message() {
        let err = ProbeError::InvalidPort { port: -1 };
        assert_eq!(err.to_string(), "port must be 0-65535, got -1");
    }
}
