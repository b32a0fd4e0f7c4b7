//! Result model for per-signature and per-document validation.

use const_oid::ObjectIdentifier;
use x509_cert::Certificate;

use crate::domain::algorithms::{NamedCurve, PublicKeyType};
use crate::domain::claims::{PolicyValidationClaims, SignatureClaims, TimeValidationClaims};
use crate::domain::cms::timestamp::TimestampToken;
use crate::domain::svt::jws::SignedJwt;
use crate::domain::trust::CertValidationOutcome;

/// Status of a single signature validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureStatus {
    Success,
    ErrorBadFormat,
    ErrorSignerInvalid,
    ErrorInvalidSignature,
}

/// Digest and signature algorithms asserted by the CMS algorithm protection
/// attribute (RFC 6211).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorithmProtection {
    pub digest_oid: ObjectIdentifier,
    pub signature_algorithm_uri: Option<String>,
}

/// One verified time with the supporting path validation outcome.
#[derive(Debug, Clone)]
pub struct TimeValidationResult {
    pub claims: TimeValidationClaims,
    pub path_outcome: Option<CertValidationOutcome>,
}

/// Validation result for one signature in a document.
#[derive(Debug, Clone, Default)]
pub struct SignatureValidationResult {
    /// Overall verdict
    pub success: bool,
    pub status: Option<SignatureStatus>,
    pub status_message: Option<String>,

    /// Certificate asserted as the signer
    pub signer_certificate: Option<Certificate>,
    /// Certificates carried in the CMS structure, document order
    pub signature_certificate_chain: Vec<Certificate>,
    /// Path from the external validator, leaf to anchor; empty if none
    pub validated_certificate_path: Vec<Certificate>,

    /// Byte range is the whole file or all later revisions are safe
    pub covers_document: bool,
    /// ESS signing-certificate attribute present but hash mismatched
    pub invalid_sign_cert: bool,
    /// ESS signing-certificate attribute present (PAdES profile)
    pub is_pades: bool,

    pub public_key_type: Option<PublicKeyType>,
    pub key_length: Option<u32>,
    pub named_curve: Option<NamedCurve>,

    /// Canonical URI of the algorithm protecting this result
    pub signature_algorithm_uri: Option<String>,
    /// Digest algorithm declared in the CMS `SignerInfo`
    pub cms_digest_algorithm: Option<ObjectIdentifier>,
    /// Signature algorithm declared in the CMS `SignerInfo`
    pub cms_signature_algorithm: Option<ObjectIdentifier>,
    /// Algorithm protection attribute contents, when present
    pub algorithm_protection: Option<AlgorithmProtection>,

    /// Claimed signing time, epoch milliseconds
    pub claimed_signing_time: Option<i64>,

    /// Verified RFC 3161 signature timestamps
    pub signature_timestamps: Vec<TimestampToken>,
    /// Verified times from timestamps or SVTs
    pub time_validation_results: Vec<TimeValidationResult>,
    /// Applied validation policies and their conclusions
    pub policy_validation_results: Vec<PolicyValidationClaims>,

    /// SVT claim record, when validation used an SVT
    pub svt_claims: Option<SignatureClaims>,
    /// The signed SVT, when applicable
    pub svt_jwt: Option<SignedJwt>,

    /// The signature value octets from the CMS `SignerInfo`
    pub signature_value: Vec<u8>,
    /// The bytes covered by the signature byte range
    pub signed_bytes: Vec<u8>,
}

impl SignatureValidationResult {
    /// Failed result with a status and message; used when a signature cannot
    /// be processed without aborting its siblings.
    #[must_use]
    pub fn error(status: SignatureStatus, message: impl Into<String>) -> Self {
        Self {
            success: false,
            status: Some(status),
            status_message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Record a failure on an existing partial result.
    pub fn fail(&mut self, status: SignatureStatus, message: impl Into<String>) {
        self.success = false;
        self.status = Some(status);
        self.status_message = Some(message.into());
    }
}

/// Document-level verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentVerdict {
    NoSignatures,
    Ok,
    SomeInvalid,
    NoneValid,
}

/// Combined result for all signatures of one document.
#[derive(Debug, Clone)]
pub struct DocumentValidationResult {
    pub signed: bool,
    pub signature_count: usize,
    pub valid_signature_count: usize,
    pub verdict: DocumentVerdict,
    pub status_message: String,
    pub results: Vec<SignatureValidationResult>,
}
