use std::fmt;

use crate::shape::TensorDims;

/// Coarse error category, used by host bindings to pick their own error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or unsupported operator parameters.
    Parameter,
    /// No accelerator for the (operator, device) pair, or a data kind the kernel
    /// does not implement.
    UnsupportedConfiguration,
    /// Graph-level inconsistency (missing params, dangling tensors, cycles).
    Model,
    /// Duplicate accelerator registration.
    Registration,
    /// Filesystem or descriptor decoding failure.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Parameter => write!(f, "parameter"),
            ErrorKind::UnsupportedConfiguration => write!(f, "unsupported configuration"),
            ErrorKind::Model => write!(f, "model"),
            ErrorKind::Registration => write!(f, "registration"),
            ErrorKind::Io => write!(f, "io"),
        }
    }
}

/// All errors produced by the runtime.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BriskError {
    #[error("parameter error: {0}")]
    Parameter(String),

    #[error("unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    #[error("model error: {0}")]
    Model(String),

    #[error("registration error: {0}")]
    Registration(String),

    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: TensorDims, got: TensorDims },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("io error: {0}")]
    Io(String),
}

impl BriskError {
    /// Category of this error.
    ///
    /// Shape mismatches are caller mistakes and report as parameter errors; storage
    /// errors come from inconsistent buffers the graph produced and report as model
    /// errors.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BriskError::Parameter(_) | BriskError::ShapeMismatch { .. } => ErrorKind::Parameter,
            BriskError::UnsupportedConfiguration(_) => ErrorKind::UnsupportedConfiguration,
            BriskError::Model(_) | BriskError::Storage(_) => ErrorKind::Model,
            BriskError::Registration(_) => ErrorKind::Registration,
            BriskError::Io(_) => ErrorKind::Io,
        }
    }
}

impl From<std::io::Error> for BriskError {
    fn from(e: std::io::Error) -> Self {
        BriskError::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(BriskError::Parameter("x".into()).kind(), ErrorKind::Parameter);
        assert_eq!(
            BriskError::ShapeMismatch {
                expected: TensorDims::new(1, 3, 4, 4),
                got: TensorDims::new(1, 3, 4, 5),
            }
            .kind(),
            ErrorKind::Parameter
        );
        assert_eq!(BriskError::Storage("x".into()).kind(), ErrorKind::Model);
        assert_eq!(
            BriskError::UnsupportedConfiguration("x".into()).kind(),
            ErrorKind::UnsupportedConfiguration
        );
    }

    #[test]
    fn test_display() {
        let e = BriskError::Parameter("pads must have 8 entries".into());
        assert_eq!(e.to_string(), "parameter error: pads must have 8 entries");
        let e = BriskError::ShapeMismatch {
            expected: TensorDims::new(1, 3, 4, 4),
            got: TensorDims::new(1, 3, 4, 5),
        };
        assert_eq!(e.to_string(), "shape mismatch: expected [1, 3, 4, 4], got [1, 3, 4, 5]");
    }
}
