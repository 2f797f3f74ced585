//! Domain error types.

/// Top-level error type for signaltrader.
#[derive(Debug, thiserror::Error)]
pub enum SignaltraderError {
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("no data: {reason}")]
    NoData { reason: String },

    #[error("ledger write error: {reason}")]
    StoreWrite { reason: String },

    #[error("ledger read error: {reason}")]
    StoreRead { reason: String },

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

    #[error("failed to load {path}: {reason}")]
    DataLoad { path: String, reason: String },

    #[error("unknown strategy '{name}' (available: {})", available.join(", "))]
    UnknownStrategy {
        name: String,
        available: Vec<String>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SignaltraderError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        SignaltraderError::InvalidInput {
            reason: reason.into(),
        }
    }
}

impl From<&SignaltraderError> for std::process::ExitCode {
    fn from(err: &SignaltraderError) -> Self {
        let code: u8 = match err {
            SignaltraderError::Io(_) => 1,
            SignaltraderError::ConfigParse { .. }
            | SignaltraderError::ConfigMissing { .. }
            | SignaltraderError::ConfigInvalid { .. } => 2,
            SignaltraderError::StoreWrite { .. } | SignaltraderError::StoreRead { .. } => 3,
            SignaltraderError::InvalidInput { .. }
            | SignaltraderError::DataLoad { .. }
            | SignaltraderError::UnknownStrategy { .. } => 4,
            SignaltraderError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
