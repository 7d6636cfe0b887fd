//! Domain error types.

/// Top-level error type for momentum-allocator.
#[derive(Debug, thiserror::Error)]
pub enum AllocatorError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data feed error: {reason}")]
    DataFeed { reason: String },

    #[error("no data for {code} on {exchange}")]
    NoData { code: String, exchange: String },

    #[error("insufficient data for {code} on {exchange}: have {bars} bars, need {minimum}")]
    InsufficientData {
        code: String,
        exchange: String,
        bars: usize,
        minimum: usize,
    },

    #[error("order rejected for {code}: {reason}")]
    OrderRejected { code: String, reason: String },

    #[error("insufficient cash for {code}: need {needed:.2}, have {available:.2}")]
    InsufficientCash {
        code: String,
        needed: f64,
        available: f64,
    },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&AllocatorError> for std::process::ExitCode {
    fn from(err: &AllocatorError) -> Self {
        let code: u8 = match err {
            AllocatorError::Io(_) => 1,
            AllocatorError::ConfigParse { .. }
            | AllocatorError::ConfigMissing { .. }
            | AllocatorError::ConfigInvalid { .. } => 2,
            AllocatorError::DataFeed { .. } => 3,
            AllocatorError::NoData { .. } | AllocatorError::InsufficientData { .. } => 5,
            AllocatorError::OrderRejected { .. } | AllocatorError::InsufficientCash { .. } => 6,
            AllocatorError::Report { .. } => 7,
        };
        std::process::ExitCode::from(code)
    }
}
