use thiserror::Error;

/// Failure kinds the bus transport can report.
///
/// `check_response` turns a raw mismatch into one of these before the
/// driver ever sees it; nothing above the bus layer inspects opcode bits
/// directly.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("bus I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("response field `{field}` did not echo the request")]
    ResponseMismatch { field: &'static str },

    #[error("bus reported status failure for the request")]
    StatusFailure,
}

/// Every failure the driver's public API can surface.
///
/// Diagnostic detail beyond this is logged (see the `log` calls in
/// `driver`, `cache`, and `recovery`), not returned — callers get a
/// classification, not a trace.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("allocator capacity exhausted")]
    CapacityExhausted,

    #[error("bus protocol error: {0}")]
    Bus(#[from] BusError),

    #[error("cache internal error: {0}")]
    CacheInternal(&'static str),
}

pub type Result<T> = std::result::Result<T, DriverError>;
