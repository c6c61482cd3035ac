//! Certificate expiry probing.
//!
//! [`get_expiry`] connects to a host, performs a verifying TLS handshake and
//! returns the peer certificate's not-after instant in UTC. The [`config`]
//! module loads the list of targets and [`report`] prints one line per target.

use chrono::{DateTime, NaiveDateTime, Utc};
use native_tls::TlsConnector;
use openssl::nid::Nid;
use openssl::x509::{X509NameRef, X509};
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

pub mod config;
pub mod error;
pub mod report;

pub use config::{load_sites, ConfigError, Target};
pub use error::ProbeError;
pub use report::{check_sites, ProbeOutcome};

/// Default socket timeout in seconds.
pub static DEFAULT_TIMEOUT: f64 = 5.0;

/// Fields read from the peer certificate after the handshake.
///
/// Each field holds the text OpenSSL prints for it; `None` when the
/// certificate does not carry it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerCertificate {
    pub subject: Option<String>,
    pub issuer: Option<String>,
    pub not_before: Option<String>,
    pub not_after: Option<String>,
}

impl PeerCertificate {
    fn from_x509(cert: &X509) -> PeerCertificate {
        PeerCertificate {
            subject: common_name(cert.subject_name()),
            issuer: common_name(cert.issuer_name()),
            not_before: non_empty(cert.not_before().to_string()),
            not_after: non_empty(cert.not_after().to_string()),
        }
    }

    /// Returns the certificate's not-after instant.
    pub fn expiry(&self) -> Result<DateTime<Utc>, ProbeError> {
        match self.not_after.as_deref() {
            Some(not_after) => parse_not_after(not_after),
            None => Err(ProbeError::MissingNotAfter),
        }
    }
}

fn common_name(name: &X509NameRef) -> Option<String> {
    name.entries_by_nid(Nid::COMMONNAME)
        .next()
        .map(|entry| String::from_utf8_lossy(entry.data().as_slice()).into_owned())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Parses a certificate timestamp such as `Jun 15 23:59:59 2025 GMT`.
///
/// The layout is `<Mon> <day> <HH:MM:SS> <YYYY> <TZ>`, the day may be space
/// padded and the trailing zone must be a three letter abbreviation. The
/// field is defined in GMT, so the result is always attached to UTC.
pub fn parse_not_after(text: &str) -> Result<DateTime<Utc>, ProbeError> {
    let unrecognised = || ProbeError::CertificateError {
        reason: format!("unrecognised notAfter timestamp '{}'", text),
    };

    let fields: Vec<&str> = text.split_whitespace().collect();
    let (timestamp, zone) = match fields.as_slice() {
        [month, day, time, year, zone] => (format!("{} {} {} {}", month, day, time, year), *zone),
        _ => return Err(unrecognised()),
    };
    if zone.len() != 3 || !zone.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(unrecognised());
    }

    let naive = NaiveDateTime::parse_from_str(&timestamp, "%b %d %H:%M:%S %Y")
        .map_err(|_| unrecognised())?;
    Ok(naive.and_utc())
}

/// Opens a TCP connection to the first reachable address of `host:port`.
fn connect(host: &str, port: u16, timeout: Duration) -> Result<TcpStream, ProbeError> {
    let address = format!("{}:{}", host, port);
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|source| ProbeError::DnsResolution {
            hostname: host.to_string(),
            source,
        })?
        .collect();

    let mut last_error = io::Error::new(
        io::ErrorKind::AddrNotAvailable,
        "no addresses resolved",
    );
    for addr in addrs {
        tracing::debug!("connecting to {} ({})", address, addr);
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => {
                stream.set_read_timeout(Some(timeout))?;
                stream.set_write_timeout(Some(timeout))?;
                return Ok(stream);
            }
            Err(e) => last_error = e,
        }
    }

    if last_error.kind() == io::ErrorKind::TimedOut {
        return Err(ProbeError::Timeout {
            operation: format!("connect to {}", address),
        });
    }
    Err(ProbeError::ConnectionFailed {
        address,
        source: last_error,
    })
}

/// Performs the handshake and reads the peer certificate.
///
/// The socket and TLS session live only for the duration of this call.
pub fn fetch_peer_certificate(
    host: &str,
    port: u16,
    timeout: Duration,
) -> Result<PeerCertificate, ProbeError> {
    let connector = TlsConnector::new()?;
    let stream = connect(host, port, timeout)?;
    let mut tls = connector.connect(host, stream)?;

    let cert = tls.peer_certificate()?.ok_or_else(|| ProbeError::CertificateError {
        reason: "peer presented no certificate".to_string(),
    })?;
    let x509 = X509::from_der(&cert.to_der()?)?;
    let peer = PeerCertificate::from_x509(&x509);

    if let Err(e) = tls.shutdown() {
        tracing::trace!("TLS shutdown with {}:{} failed: {}", host, port, e);
    }
    Ok(peer)
}

/// Returns the not-after instant of the certificate served at `host:port`.
///
/// # Arguments
///
/// * `host` - Hostname, also used for SNI and hostname verification
/// * `port` - TCP port
/// * `timeout` - Bound for the connect and for each handshake read and write
///
/// # Example
///
/// ```no_run
/// # use std::time::Duration;
/// let expiry = certexpiry::get_expiry("example.com", 443, Duration::from_secs(5))?;
/// println!("{}", expiry);
/// # Ok::<(), certexpiry::ProbeError>(())
/// ```
pub fn get_expiry(host: &str, port: u16, timeout: Duration) -> Result<DateTime<Utc>, ProbeError> {
    let peer = fetch_peer_certificate(host, port, timeout)?;
    tracing::debug!(
        "{}:{} subject={:?} issuer={:?} not_before={:?} not_after={:?}",
        host,
        port,
        peer.subject,
        peer.issuer,
        peer.not_before,
        peer.not_after
    );
    peer.expiry()
}

/// Checks a configured target, rejecting ports outside 0..=65535 before
/// any network activity.
pub fn check_target(target: &Target, timeout: Duration) -> Result<DateTime<Utc>, ProbeError> {
    let port = u16::try_from(target.port)
        .map_err(|_| ProbeError::InvalidPort { port: target.port })?;
    get_expiry(&target.host, port, timeout)
}
