//! PAdES Signature Validation Library
//!
//! Validates digital signatures in PDF documents according to the PAdES
//! profiles, augmented with Signature Validation Tokens (SVT): signed
//! attestations of a prior full validation that allow long-term validation
//! after signing keys or CA keys have expired.
//!
//! Certificate path validation and the SVT signing key are injected as
//! traits; everything else — revision analysis, CMS verification, SVT
//! matching and issuance — lives in this crate.

pub mod domain;
pub mod infra;
pub mod services;

pub use domain::algorithms::{DigestAlgorithm, JwsAlgorithm, NamedCurve, PublicKeyType};
pub use domain::claims::{
    CertRefType, CertReferenceClaims, PolicyValidationClaims, SigReferenceClaims, SignatureClaims,
    SvtClaims, TimeValidationClaims, TimeValidationType, ValidationConclusion,
};
pub use domain::result::{
    DocumentValidationResult, DocumentVerdict, SignatureStatus, SignatureValidationResult,
};
pub use domain::svt::jws::{JwsHeader, SignedJwt};
pub use domain::trust::{
    CertValidationOutcome, CertificatePathValidator, CryptoJwsVerifier, JwsSigner, JwsVerifier,
    UnconfiguredPathValidator,
};
pub use infra::config::{ConfigManager, SigValConfiguration};
pub use infra::error::{SigValError, SigValResult};
pub use services::aggregator::aggregate;
pub use services::signature_verifier::PdfSignatureVerifier;
pub use services::svt_issuer::SvtIssuer;

/// Validate all signatures of a PDF document at the current time.
///
/// Convenience wrapper around [`PdfSignatureVerifier::validate`].
pub fn validate<P: CertificatePathValidator>(
    pdf_bytes: &[u8],
    path_validator: P,
) -> SigValResult<Vec<SignatureValidationResult>> {
    PdfSignatureVerifier::new(path_validator).validate(pdf_bytes)
}

/// True when the document carries at least one signature dictionary.
pub fn is_signed(pdf_bytes: &[u8]) -> SigValResult<bool> {
    PdfSignatureVerifier::new(UnconfiguredPathValidator).is_signed(pdf_bytes)
}
