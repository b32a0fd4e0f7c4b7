//! External collaborator seams.
//!
//! Certificate path construction and the JWS key operation are policy and
//! key-custody decisions that live outside this crate. Both are injected as
//! traits; a RustCrypto-backed JWS verifier ships here so SVT consumption
//! works without extra wiring.

use x509_cert::Certificate;

use crate::domain::algorithms::JwsAlgorithm;
use crate::domain::claims::ValidationConclusion;
use crate::domain::crypto::{self, EcSignatureFormat};
use crate::infra::error::SigValResult;

/// Outcome of external certificate path validation.
#[derive(Debug, Clone)]
pub struct CertValidationOutcome {
    /// Validated path, leaf to anchor; empty when no path was built
    pub validated_path: Vec<Certificate>,
    /// PKIX conclusion
    pub conclusion: ValidationConclusion,
    /// Optional detail message
    pub message: Option<String>,
}

impl CertValidationOutcome {
    #[must_use]
    pub fn passed(validated_path: Vec<Certificate>) -> Self {
        Self {
            validated_path,
            conclusion: ValidationConclusion::Passed,
            message: None,
        }
    }

    #[must_use]
    pub fn is_passed(&self) -> bool {
        self.conclusion == ValidationConclusion::Passed
    }
}

/// Certificate path construction and revocation checking.
///
/// Implementations may perform network I/O (CRL/OCSP); the core treats the
/// call as blocking and imposes no timeout.
pub trait CertificatePathValidator {
    /// Validate `signer` against trust anchors using the supporting `chain`.
    ///
    /// `at` is the reference time in epoch seconds; `None` means now.
    fn validate_path(
        &self,
        signer: &Certificate,
        chain: &[Certificate],
        at: Option<u64>,
    ) -> SigValResult<CertValidationOutcome>;
}

/// JWS signing primitive. May call out to a hardware key.
pub trait JwsSigner {
    /// Algorithm this signer produces.
    fn algorithm(&self) -> JwsAlgorithm;

    /// Sign the JWS signing input, returning the raw signature octets
    /// (`r||s` form for ECDSA).
    fn sign(&self, signing_input: &[u8]) -> SigValResult<Vec<u8>>;

    /// Certificates for the `x5c` header, leaf first.
    fn certificates(&self) -> &[Certificate];
}

/// JWS signature verification primitive.
pub trait JwsVerifier {
    fn verify_jws(
        &self,
        signing_input: &[u8],
        signature: &[u8],
        algorithm: JwsAlgorithm,
        signer_certificate: &Certificate,
    ) -> SigValResult<()>;
}

/// Default JWS verifier over the in-crate RSA/ECDSA routines.
#[derive(Debug, Clone, Copy, Default)]
pub struct CryptoJwsVerifier;

impl JwsVerifier for CryptoJwsVerifier {
    fn verify_jws(
        &self,
        signing_input: &[u8],
        signature: &[u8],
        algorithm: JwsAlgorithm,
        signer_certificate: &Certificate,
    ) -> SigValResult<()> {
        let prehash = algorithm.digest().digest(signing_input);
        crypto::verify_with_certificate(
            signer_certificate,
            algorithm.digest(),
            &prehash,
            signature,
            EcSignatureFormat::Fixed,
        )
    }
}

/// Path validator that builds no path and reports `indeterminate`.
///
/// For report-only runs (the CLI) and tests; never a trust decision.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredPathValidator;

impl CertificatePathValidator for UnconfiguredPathValidator {
    fn validate_path(
        &self,
        _signer: &Certificate,
        _chain: &[Certificate],
        _at: Option<u64>,
    ) -> SigValResult<CertValidationOutcome> {
        Ok(CertValidationOutcome {
            validated_path: Vec::new(),
            conclusion: ValidationConclusion::Indeterminate,
            message: Some("certificate path validation not configured".to_string()),
        })
    }
}
