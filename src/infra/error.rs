//! Error types for signature validation and SVT issuance.

use thiserror::Error;

/// Result type for validation and issuance operations
pub type SigValResult<T> = Result<T, SigValError>;

/// Comprehensive error types for signature validation operations
#[derive(Error, Debug, miette::Diagnostic)]
pub enum SigValError {
    #[error("Malformed PDF document: {0}")]
    BadPdf(String),

    #[error("Document carries no signatures")]
    NoSignatures,

    #[error("CMS parse error: {0}")]
    CmsParse(String),

    #[error("CMS verification error: {0}")]
    CmsVerify(String),

    #[error("PAdES binding failure: {0}")]
    PadesBinding(String),

    #[error("Algorithm mismatch: {0}")]
    AlgorithmMismatch(String),

    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Certificate path validation failure: {0}")]
    CertPath(String),

    #[error("Timestamp verification error: {0}")]
    TimestampVerify(String),

    #[error("SVT parse error: {0}")]
    SvtParse(String),

    #[error("SVT verification error: {0}")]
    SvtVerify(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Internal invariant violation: {0}")]
    InternalInvariant(String),
}

impl From<der::Error> for SigValError {
    fn from(error: der::Error) -> Self {
        SigValError::CmsParse(error.to_string())
    }
}

impl From<lopdf::Error> for SigValError {
    fn from(error: lopdf::Error) -> Self {
        SigValError::BadPdf(error.to_string())
    }
}

impl From<serde_json::Error> for SigValError {
    fn from(error: serde_json::Error) -> Self {
        SigValError::SvtParse(error.to_string())
    }
}

impl From<std::io::Error> for SigValError {
    fn from(error: std::io::Error) -> Self {
        SigValError::Io(error.to_string())
    }
}
