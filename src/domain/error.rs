use thiserror::Error;

/// Exit status of a successful run
pub const EXIT_SUCCESS: u8 = 0;
/// Exit status reserved for usage and domain failures
pub const EXIT_EXPECTED_FAILURE: u8 = 1;
/// Exit status reserved for internal or unknown failures
pub const EXIT_INTERNAL_FAILURE: u8 = 2;

/// Shroud unified error type
#[derive(Error, Debug)]
pub enum ShroudError {
    #[error("{0}")]
    Usage(String),

    #[error("{0}")]
    Domain(String),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Registration error: {0}")]
    Registration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ShroudError {
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    pub fn domain(message: impl Into<String>) -> Self {
        Self::Domain(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this failure belongs to the operator-facing tier.
    ///
    /// Expected failures are reported on the console only. Everything else
    /// is treated as an internal fault and goes to the forensic log.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::Usage(_) | Self::Domain(_) | Self::Config { .. } | Self::Registration(_)
        )
    }

    pub fn exit_code(&self) -> u8 {
        if self.is_expected() {
            EXIT_EXPECTED_FAILURE
        } else {
            EXIT_INTERNAL_FAILURE
        }
    }
}

pub type ShroudResult<T> = Result<T, ShroudError>;
