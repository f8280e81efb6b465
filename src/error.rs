//! Application error type.
//!
//! Every fallible stage returns `Result<_, AppError>`. The `kind` decides the
//! process exit code and whether the pipeline aborts (input/config problems)
//! or records the failure against a single model and keeps going.

/// Failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Required dataset file is absent.
    MissingInput,
    /// Schema or category violation, or data that cannot support the design.
    DataIncompatible,
    /// Maximum-likelihood fit did not converge.
    ConvergenceFailure,
    /// Invalid configuration value.
    Config,
    /// Filesystem or rendering failure while writing artifacts.
    Io,
}

impl ErrorKind {
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::MissingInput | ErrorKind::Config => 2,
            ErrorKind::DataIncompatible => 3,
            ErrorKind::ConvergenceFailure => 4,
            ErrorKind::Io => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::MissingInput => "MissingInput",
            ErrorKind::DataIncompatible => "DataIncompatible",
            ErrorKind::ConvergenceFailure => "ConvergenceFailure",
            ErrorKind::Config => "Config",
            ErrorKind::Io => "Io",
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn missing_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingInput, message)
    }

    pub fn data(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DataIncompatible, message)
    }

    pub fn convergence(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConvergenceFailure, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn exit_code(&self) -> u8 {
        self.kind.exit_code()
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.label(), self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
