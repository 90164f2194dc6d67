use std::fmt;

/// Failure to obtain authoritative time from a time source.
#[derive(Debug)]
pub enum SyncError {
    Io(std::io::Error),
    Timeout,
    NoAddress,
    Malformed(&'static str),
    Stale,
    KissOfDeath([u8; 4]),
}

impl fmt::Display for SyncError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SyncError::Io(err) => write!(fmt, "{}", err),
            SyncError::Timeout => fmt.write_str("timed out"),
            SyncError::NoAddress => fmt.write_str("server name did not resolve"),
            SyncError::Malformed(what) => write!(fmt, "malformed reply: {}", what),
            SyncError::Stale => fmt.write_str("reply does not answer our request"),
            SyncError::KissOfDeath(code) => {
                write!(fmt, "server refused: {}", String::from_utf8_lossy(code))
            }
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Io(err)
    }
}

impl From<tokio::time::error::Elapsed> for SyncError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        SyncError::Timeout
    }
}

/// Failure to put text on a display slot.
#[derive(Debug)]
pub enum DisplayError {
    Io(std::io::Error),
}

impl fmt::Display for DisplayError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DisplayError::Io(err) => write!(fmt, "{}", err),
        }
    }
}

impl std::error::Error for DisplayError {}

impl From<std::io::Error> for DisplayError {
    fn from(err: std::io::Error) -> Self {
        DisplayError::Io(err)
    }
}

#[test]
fn test_sync_error_display() {
    assert_eq!(SyncError::Timeout.to_string(), "timed out");
    assert_eq!(
        SyncError::Stale.to_string(),
        "reply does not answer our request"
    );
    assert_eq!(
        SyncError::KissOfDeath(*b"RATE").to_string(),
        "server refused: RATE"
    );
    assert_eq!(
        SyncError::Malformed("short packet").to_string(),
        "malformed reply: short packet"
    );
}
