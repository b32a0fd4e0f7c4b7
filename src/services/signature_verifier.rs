//! Per-document signature verification.
//!
//! Orchestrates revision analysis, SVT matching and direct CMS validation
//! for every signature in a document. SVT-based validation is preferred;
//! signatures without a matching SVT go through full verification with the
//! injected certificate path validator.

use lopdf::Document;

use crate::domain::algorithms::{
    POLICY_PADES_BINDING, POLICY_PKIX_VALIDATION, POLICY_SVT_ALGORITHM_UNSUPPORTED,
};
use crate::domain::claims::{PolicyValidationClaims, TimeValidationClaims, TimeValidationType, ValidationConclusion};
use crate::domain::pdf::signature::{self, PdfSignature, SignatureKind};
use crate::domain::result::{SignatureStatus, SignatureValidationResult, TimeValidationResult};
use crate::domain::trust::{CertValidationOutcome, CertificatePathValidator, CryptoJwsVerifier, JwsVerifier};
use crate::infra::error::{SigValError, SigValResult};
use crate::services::cms_verifier::CmsVerifier;
use crate::services::revision_analyzer::RevisionAnalyzer;
use crate::services::svt_validator::{SvtCollection, SvtValidator};

/// A verified document timestamp providing time evidence for the bytes it
/// covers.
struct VerifiedDocTimestamp {
    coverage_end: usize,
    gen_time: u64,
    serial_hex: String,
    issuer: String,
    path_outcome: CertValidationOutcome,
}

/// Document signature verifier with injected trust collaborators.
pub struct PdfSignatureVerifier<P: CertificatePathValidator, V: JwsVerifier = CryptoJwsVerifier> {
    path_validator: P,
    jws_verifier: V,
}

impl<P: CertificatePathValidator> PdfSignatureVerifier<P, CryptoJwsVerifier> {
    /// Verifier with the in-crate JWS verification primitive.
    pub fn new(path_validator: P) -> Self {
        Self {
            path_validator,
            jws_verifier: CryptoJwsVerifier,
        }
    }
}

impl<P: CertificatePathValidator, V: JwsVerifier> PdfSignatureVerifier<P, V> {
    pub fn with_jws_verifier(path_validator: P, jws_verifier: V) -> Self {
        Self {
            path_validator,
            jws_verifier,
        }
    }

    /// True when the document carries at least one signature dictionary.
    pub fn is_signed(&self, pdf_bytes: &[u8]) -> SigValResult<bool> {
        let doc = Document::load_mem(pdf_bytes)?;
        Ok(!signature::list_signatures(&doc)?.is_empty())
    }

    /// Validate all signatures at the current time.
    pub fn validate(&self, pdf_bytes: &[u8]) -> SigValResult<Vec<SignatureValidationResult>> {
        self.validate_at(pdf_bytes, None)
    }

    /// Validate all signatures against an explicit reference time
    /// (epoch seconds).
    ///
    /// Results come back in document order. Failures scoped to one signature
    /// are captured in its result; only document-level problems error out.
    pub fn validate_at(
        &self,
        pdf_bytes: &[u8],
        reference_time: Option<u64>,
    ) -> SigValResult<Vec<SignatureValidationResult>> {
        let doc = Document::load_mem(pdf_bytes)?;
        let signatures = signature::list_signatures(&doc)?;
        if signatures.is_empty() {
            log::debug!("document carries no signature dictionaries");
            return Ok(Vec::new());
        }

        let analyzer = RevisionAnalyzer::analyze(pdf_bytes, &signatures)?;

        let (content_sigs, doc_ts_sigs): (Vec<&PdfSignature>, Vec<&PdfSignature>) = signatures
            .iter()
            .partition(|sig| sig.kind() == SignatureKind::Content);

        let svt_validator = SvtValidator::new(&self.path_validator, &self.jws_verifier);
        let doc_ts_owned: Vec<PdfSignature> = doc_ts_sigs.iter().map(|s| (*s).clone()).collect();
        let svts = svt_validator.collect(&doc_ts_owned, pdf_bytes);

        // Document timestamps also serve as time evidence for directly
        // validated signatures; verify them once.
        let verified_doc_timestamps =
            self.verify_document_timestamps(&doc_ts_owned, pdf_bytes, reference_time);

        let mut results = Vec::with_capacity(content_sigs.len());
        for sig in content_sigs {
            let mut result = match self.validate_one(
                sig,
                pdf_bytes,
                &svt_validator,
                &svts,
                &verified_doc_timestamps,
                reference_time,
            ) {
                Ok(result) => result,
                Err(e) => {
                    log::warn!("signature processing failed: {e}");
                    SignatureValidationResult::error(
                        status_for(&e),
                        format!("failed to process signature: {e}"),
                    )
                }
            };
            result.covers_document = match analyzer.covers_document(sig) {
                Ok(covers) => covers,
                Err(e) => {
                    log::warn!("coverage decision failed: {e}");
                    false
                }
            };
            results.push(result);
        }
        Ok(results)
    }

    fn validate_one(
        &self,
        sig: &PdfSignature,
        pdf_bytes: &[u8],
        svt_validator: &SvtValidator<'_, P, V>,
        svts: &SvtCollection,
        doc_timestamps: &[VerifiedDocTimestamp],
        reference_time: Option<u64>,
    ) -> SigValResult<SignatureValidationResult> {
        let summary = CmsVerifier::parse_summary(&sig.contents)?;

        if let Some((svt, claims)) = svt_validator.find_matching(svts, &summary.signature_value) {
            log::debug!("signature matched SVT {}", svt.jwt.claims().jti);
            return svt_validator.apply(svt, claims, sig, &summary, pdf_bytes);
        }

        let mut result = self.verify_direct(sig, pdf_bytes, reference_time, doc_timestamps)?;
        if !svts.unsupported_algorithms.is_empty() {
            // An SVT with an unregistered algorithm may have referenced this
            // signature; record that the fallback was not a free choice.
            result.policy_validation_results.push(
                PolicyValidationClaims::new(
                    POLICY_SVT_ALGORITHM_UNSUPPORTED,
                    ValidationConclusion::Indeterminate,
                )
                .with_message(svts.unsupported_algorithms.join("; ")),
            );
        }
        Ok(result)
    }

    fn verify_direct(
        &self,
        sig: &PdfSignature,
        pdf_bytes: &[u8],
        reference_time: Option<u64>,
        doc_timestamps: &[VerifiedDocTimestamp],
    ) -> SigValResult<SignatureValidationResult> {
        sig.check_contents_gap(pdf_bytes)?;
        let signed_bytes = sig.signed_bytes(pdf_bytes)?;

        let mut result = CmsVerifier::verify(&sig.contents, &signed_bytes)?;
        result.claimed_signing_time = result
            .claimed_signing_time
            .or(sig.dictionary_signing_time);

        if result.invalid_sign_cert {
            result.policy_validation_results.push(
                PolicyValidationClaims::new(POLICY_PADES_BINDING, ValidationConclusion::Failed)
                    .with_message("ESS signing-certificate hash mismatch"),
            );
        }

        // Embedded signature timestamps imprint the signature value.
        self.verify_signature_timestamps(sig, &mut result, reference_time);

        // Path validation at the best verified time available.
        let path_time = result
            .signature_timestamps
            .iter()
            .map(|token| token.gen_time)
            .min()
            .or(reference_time);
        let signer = result.signer_certificate.clone().ok_or_else(|| {
            SigValError::InternalInvariant("verified result without signer certificate".to_string())
        })?;
        let outcome = self.path_validator.validate_path(
            &signer,
            &result.signature_certificate_chain,
            path_time,
        )?;
        result.validated_certificate_path = outcome.validated_path.clone();
        result.policy_validation_results.push(
            match outcome.message.clone() {
                Some(message) => {
                    PolicyValidationClaims::new(POLICY_PKIX_VALIDATION, outcome.conclusion)
                        .with_message(message)
                }
                None => PolicyValidationClaims::new(POLICY_PKIX_VALIDATION, outcome.conclusion),
            },
        );
        if !outcome.is_passed() && result.success {
            result.fail(
                SignatureStatus::ErrorSignerInvalid,
                match &outcome.message {
                    Some(message) => format!("certificate path validation failed: {message}"),
                    None => "certificate path validation failed".to_string(),
                },
            );
        }

        // Document timestamps covering this signature add verified time.
        for doc_ts in doc_timestamps {
            if doc_ts.coverage_end > sig.coverage_end() {
                result.time_validation_results.push(TimeValidationResult {
                    claims: TimeValidationClaims {
                        time: doc_ts.gen_time,
                        time_type: TimeValidationType::Tsa,
                        iss: doc_ts.issuer.clone(),
                        id: doc_ts.serial_hex.clone(),
                        val: vec![PolicyValidationClaims::new(
                            POLICY_PKIX_VALIDATION,
                            doc_ts.path_outcome.conclusion,
                        )],
                    },
                    path_outcome: Some(doc_ts.path_outcome.clone()),
                });
            }
        }

        Ok(result)
    }

    fn verify_signature_timestamps(
        &self,
        sig: &PdfSignature,
        result: &mut SignatureValidationResult,
        reference_time: Option<u64>,
    ) {
        let tokens = match CmsVerifier::extract_signature_timestamps(&sig.contents) {
            Ok(tokens) => tokens,
            Err(e) => {
                log::warn!("signature timestamp extraction failed: {e}");
                return;
            }
        };
        for token in tokens {
            match CmsVerifier::verify_timestamp_token(&token, &result.signature_value) {
                Ok(tsa_certificate) => {
                    let path_outcome = match self.path_validator.validate_path(
                        &tsa_certificate,
                        &token.certificates,
                        reference_time,
                    ) {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            log::warn!("timestamp TSA path validation failed: {e}");
                            continue;
                        }
                    };
                    result.time_validation_results.push(TimeValidationResult {
                        claims: TimeValidationClaims {
                            time: token.gen_time,
                            time_type: TimeValidationType::Tsa,
                            iss: tsa_certificate.tbs_certificate.subject.to_string(),
                            id: token.serial_hex.clone(),
                            val: vec![PolicyValidationClaims::new(
                                POLICY_PKIX_VALIDATION,
                                path_outcome.conclusion,
                            )],
                        },
                        path_outcome: Some(path_outcome),
                    });
                    result.signature_timestamps.push(token);
                }
                Err(e) => {
                    log::warn!("signature timestamp rejected: {e}");
                }
            }
        }
    }

    fn verify_document_timestamps(
        &self,
        doc_ts_sigs: &[PdfSignature],
        pdf_bytes: &[u8],
        reference_time: Option<u64>,
    ) -> Vec<VerifiedDocTimestamp> {
        let mut verified = Vec::new();
        for sig in doc_ts_sigs {
            let token = match crate::domain::cms::timestamp::TimestampToken::from_der(&sig.contents)
            {
                Ok(token) => token,
                Err(e) => {
                    log::warn!("document timestamp unparsable: {e}");
                    continue;
                }
            };
            let timestamped = match sig.signed_bytes(pdf_bytes) {
                Ok(bytes) => bytes,
                Err(e) => {
                    log::warn!("document timestamp byte range invalid: {e}");
                    continue;
                }
            };
            let tsa_certificate = match CmsVerifier::verify_timestamp_token(&token, &timestamped) {
                Ok(cert) => cert,
                Err(e) => {
                    log::warn!("document timestamp rejected: {e}");
                    continue;
                }
            };
            let path_outcome = match self.path_validator.validate_path(
                &tsa_certificate,
                &token.certificates,
                reference_time,
            ) {
                Ok(outcome) => outcome,
                Err(e) => {
                    log::warn!("document timestamp TSA path validation failed: {e}");
                    continue;
                }
            };
            verified.push(VerifiedDocTimestamp {
                coverage_end: sig.coverage_end(),
                gen_time: token.gen_time,
                serial_hex: token.serial_hex.clone(),
                issuer: tsa_certificate.tbs_certificate.subject.to_string(),
                path_outcome,
            });
        }
        verified
    }
}

/// Map a processing error to the most specific status a result can carry.
fn status_for(error: &SigValError) -> SignatureStatus {
    match error {
        SigValError::CmsParse(_) | SigValError::BadPdf(_) | SigValError::Io(_) => {
            SignatureStatus::ErrorBadFormat
        }
        SigValError::PadesBinding(_) | SigValError::CertPath(_) => {
            SignatureStatus::ErrorSignerInvalid
        }
        _ => SignatureStatus::ErrorInvalidSignature,
    }
}
