use std::fmt;

/// Machine-readable error codes so callers can branch without string matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidConfig,
    ConfigParseError,
    NotFitted,
    AlreadyFitted,
    DuplicatePost,
    ShapeMismatch,
    NegativeWeight,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidConfig => "E1001",
            Self::ConfigParseError => "E1002",
            Self::NotFitted => "E2001",
            Self::AlreadyFitted => "E2002",
            Self::DuplicatePost => "E2003",
            Self::ShapeMismatch => "E3001",
            Self::NegativeWeight => "E3002",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::InvalidConfig => "Configuration value out of range",
            Self::ConfigParseError => "Config document parse error",
            Self::NotFitted => "Engine has not been fitted",
            Self::AlreadyFitted => "Engine is already fitted",
            Self::DuplicatePost => "Duplicate post identifier in corpus",
            Self::ShapeMismatch => "Graph shape mismatch",
            Self::NegativeWeight => "Negative combination weight",
        }
    }

    /// Optional remediation hint.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::InvalidConfig => Some("Weights must be finite and >= 0; ratios must lie in [0, 1]."),
            Self::ConfigParseError => Some("Fix the TOML syntax and retry."),
            Self::NotFitted => Some("Call `fit` with a corpus before `retrieve`."),
            Self::AlreadyFitted => Some("Construct a new engine to index a different corpus."),
            Self::DuplicatePost => Some("Deduplicate posts by identifier before fitting."),
            Self::ShapeMismatch | Self::NegativeWeight => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A configuration value outside its documented range.
///
/// Raised by the `validate` methods in [`crate::config`], which every
/// component constructor calls, so invalid values never reach an index build.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} = {value} is out of range: expected {expected}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },

    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },

    #[error("max_iterations must be at least 1")]
    ZeroIterations,

    #[error("batch_size must be at least 1")]
    ZeroBatchSize,
}

impl ConfigError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::InvalidConfig
    }
}

/// Errors from combining or comparing [`crate::SparseGraph`]s.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    #[error("graph has {actual} nodes, expected {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("combination weight {weight} is negative or not finite")]
    NegativeWeight { weight: f64 },
}

impl GraphError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::ShapeMismatch { .. } => ErrorCode::ShapeMismatch,
            Self::NegativeWeight { .. } => ErrorCode::NegativeWeight,
        }
    }
}
