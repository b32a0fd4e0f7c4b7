//! SVT collection, matching and consumption.
//!
//! Document timestamps of subfilter `ETSI.RFC3161` may transport an SVT JWS.
//! Each collected SVT is verified on its own (token imprint and CMS
//! signature, JWS signature, issuer path), then matched to content
//! signatures by the digest of their signature value. A matched signature is
//! concluded from the SVT claims instead of repeating full validation.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use x509_cert::Certificate;

use crate::domain::algorithms::{JwsAlgorithm, POLICY_PKIX_VALIDATION};
use crate::domain::claims::{
    PolicyValidationClaims, SignatureClaims, TimeValidationClaims, TimeValidationType,
    ValidationConclusion,
};
use crate::domain::cms::timestamp::TimestampToken;
use crate::domain::pdf::signature::{PdfSignature, SUBFILTER_ETSI_CADES};
use crate::domain::result::{SignatureStatus, SignatureValidationResult, TimeValidationResult};
use crate::domain::svt::jws::SignedJwt;
use crate::domain::trust::{CertificatePathValidator, JwsVerifier};
use crate::infra::error::{SigValError, SigValResult};
use crate::services::cms_verifier::{CmsSummary, CmsVerifier};

/// A fully verified SVT ready for matching.
#[derive(Debug, Clone)]
pub struct VerifiedSvt {
    pub jwt: SignedJwt,
    pub algorithm: JwsAlgorithm,
    /// SVT issuer certificate from the `x5c` header
    pub signer_certificate: Certificate,
    /// Whether JWS, token and issuer path all verified
    pub success: bool,
}

/// Result of collecting SVTs from a document's timestamps.
#[derive(Debug, Clone, Default)]
pub struct SvtCollection {
    pub svts: Vec<VerifiedSvt>,
    /// SVTs skipped because their digest algorithm is outside the registry.
    /// Surfaced as a diagnostic instead of silently masking a match.
    pub unsupported_algorithms: Vec<String>,
}

/// SVT validation service.
pub struct SvtValidator<'a, P: CertificatePathValidator, V: JwsVerifier> {
    path_validator: &'a P,
    jws_verifier: &'a V,
}

impl<'a, P: CertificatePathValidator, V: JwsVerifier> SvtValidator<'a, P, V> {
    pub fn new(path_validator: &'a P, jws_verifier: &'a V) -> Self {
        Self {
            path_validator,
            jws_verifier,
        }
    }

    /// Collect and verify the SVTs transported in `doc_timestamps`.
    ///
    /// Per-token failures are logged and skipped; a broken SVT must not
    /// prevent direct validation of the signatures it would have covered.
    pub fn collect(&self, doc_timestamps: &[PdfSignature], pdf_bytes: &[u8]) -> SvtCollection {
        let mut collection = SvtCollection::default();
        for timestamp_sig in doc_timestamps {
            match self.collect_one(timestamp_sig, pdf_bytes) {
                Ok(Some(svt)) => collection.svts.push(svt),
                Ok(None) => {}
                Err(SigValError::UnsupportedAlgorithm(message)) => {
                    log::warn!("SVT skipped, unsupported algorithm: {message}");
                    collection.unsupported_algorithms.push(message);
                }
                Err(e) => {
                    log::warn!("SVT skipped: {e}");
                }
            }
        }
        collection
    }

    fn collect_one(
        &self,
        timestamp_sig: &PdfSignature,
        pdf_bytes: &[u8],
    ) -> SigValResult<Option<VerifiedSvt>> {
        let token = TimestampToken::from_der(&timestamp_sig.contents)?;
        let Some(jws) = token.svt_jws.clone() else {
            return Ok(None);
        };

        // The transporting timestamp must itself verify over its byte range.
        let timestamped_bytes = timestamp_sig.signed_bytes(pdf_bytes)?;
        CmsVerifier::verify_timestamp_token(&token, &timestamped_bytes)?;

        let jwt = SignedJwt::parse(&jws)?;
        let algorithm = jwt.algorithm()?;
        let signer_certificate = jwt.signer_certificate()?;
        let chain = jwt.x5c_certificates()?;

        self.jws_verifier.verify_jws(
            &jwt.signing_input(),
            jwt.signature(),
            algorithm,
            &signer_certificate,
        )?;

        let path_outcome =
            self.path_validator
                .validate_path(&signer_certificate, &chain, Some(token.gen_time))?;
        if !path_outcome.is_passed() {
            log::warn!(
                "SVT issuer path validation not passed: {:?}",
                path_outcome.conclusion
            );
        }

        Ok(Some(VerifiedSvt {
            jwt,
            algorithm,
            signer_certificate,
            success: path_outcome.is_passed(),
        }))
    }

    /// Find the first SVT entry referencing `signature_value`, in SVT order.
    #[must_use]
    pub fn find_matching<'s>(
        &self,
        collection: &'s SvtCollection,
        signature_value: &[u8],
    ) -> Option<(&'s VerifiedSvt, &'s SignatureClaims)> {
        for svt in &collection.svts {
            let digest = svt.algorithm.digest();
            let hash = BASE64.encode(digest.digest(signature_value));
            for claims in &svt.jwt.claims().sig_val_claims {
                if claims.sig_ref.sig_hash == hash {
                    return Some((svt, claims));
                }
            }
        }
        None
    }

    /// Conclude a signature from its bound SVT entry.
    ///
    /// Algorithm and key parameters are replaced with the SVT signature's;
    /// the SVT is what now protects the result's integrity. Present
    /// signature timestamps are subsumed and cleared, and the transporting
    /// doc-timestamp is appended as an `svt` time-validation entry so chained
    /// issuance preserves the verified-time chain.
    pub fn apply(
        &self,
        svt: &VerifiedSvt,
        claims: &SignatureClaims,
        signature: &PdfSignature,
        summary: &CmsSummary,
        pdf_bytes: &[u8],
    ) -> SigValResult<SignatureValidationResult> {
        let mut result = SignatureValidationResult {
            signer_certificate: Some(summary.signer_certificate.clone()),
            signature_certificate_chain: summary.certificate_chain.clone(),
            is_pades: signature.sub_filter.eq_ignore_ascii_case(SUBFILTER_ETSI_CADES),
            invalid_sign_cert: false,
            claimed_signing_time: summary
                .claimed_signing_time
                .or(signature.dictionary_signing_time),
            signature_value: summary.signature_value.clone(),
            signed_bytes: signature.signed_bytes(pdf_bytes)?,
            ..SignatureValidationResult::default()
        };

        result.signature_algorithm_uri = Some(svt.algorithm.uri().to_string());
        super::cms_verifier::populate_key_parameters(&svt.signer_certificate, &mut result);

        result.svt_jwt = Some(svt.jwt.clone());
        result.svt_claims = Some(claims.clone());
        result.policy_validation_results = claims.sig_val.clone();

        let mut time_validations: Vec<TimeValidationResult> = claims
            .time_val
            .iter()
            .cloned()
            .map(|claims| TimeValidationResult {
                claims,
                path_outcome: None,
            })
            .collect();
        let jwt_claims = svt.jwt.claims();
        time_validations.push(TimeValidationResult {
            claims: TimeValidationClaims {
                time: jwt_claims.iat,
                time_type: TimeValidationType::Svt,
                iss: jwt_claims.iss.clone(),
                id: jwt_claims.jti.clone(),
                val: vec![PolicyValidationClaims::new(
                    POLICY_PKIX_VALIDATION,
                    ValidationConclusion::Passed,
                )],
            },
            path_outcome: None,
        });
        result.time_validation_results = time_validations;

        // The SVT subsumes any embedded signature timestamps.
        result.signature_timestamps = Vec::new();

        result.success = svt.success;
        if result.success {
            result.status = Some(SignatureStatus::Success);
        } else {
            result.fail(
                SignatureStatus::ErrorInvalidSignature,
                "unable to verify SVT signature",
            );
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::claims::{CertRefType, CertReferenceClaims, SigReferenceClaims, SvtClaims};
    use crate::domain::trust::{CertValidationOutcome, JwsSigner, UnconfiguredPathValidator};

    struct NullSigner;
    impl JwsSigner for NullSigner {
        fn algorithm(&self) -> JwsAlgorithm {
            JwsAlgorithm::Rs256
        }
        fn sign(&self, _signing_input: &[u8]) -> SigValResult<Vec<u8>> {
            Ok(vec![0x00])
        }
        fn certificates(&self) -> &[Certificate] {
            &[]
        }
    }

    struct AcceptAllJws;
    impl JwsVerifier for AcceptAllJws {
        fn verify_jws(
            &self,
            _signing_input: &[u8],
            _signature: &[u8],
            _algorithm: JwsAlgorithm,
            _signer_certificate: &Certificate,
        ) -> SigValResult<()> {
            Ok(())
        }
    }

    fn svt_with_hash(sig_hash: &str) -> VerifiedSvt {
        let claims = SvtClaims {
            jti: "jti-1".to_string(),
            iss: "issuer".to_string(),
            iat: 1_700_000_000,
            exp: None,
            sig_val_claims: vec![SignatureClaims {
                sig_ref: SigReferenceClaims {
                    sig_hash: sig_hash.to_string(),
                    sb_hash: String::new(),
                },
                sig_val: Vec::new(),
                time_val: Vec::new(),
                cert_ref: CertReferenceClaims {
                    ref_type: CertRefType::ChainHash,
                    reference: Vec::new(),
                },
                ext: None,
            }],
        };
        let jwt = SignedJwt::sign(claims, &NullSigner).unwrap();
        VerifiedSvt {
            jwt,
            algorithm: JwsAlgorithm::Rs256,
            signer_certificate: sample_certificate(),
            success: true,
        }
    }

    // The matcher never touches the certificate; a placeholder is enough.
    fn sample_certificate() -> Certificate {
        crate::domain::test_support::placeholder_certificate()
    }

    #[test]
    fn matcher_binds_first_svt_by_hash() {
        let signature_value = b"signature-value".to_vec();
        let hash = BASE64.encode(
            JwsAlgorithm::Rs256
                .digest()
                .digest(&signature_value),
        );
        let collection = SvtCollection {
            svts: vec![svt_with_hash("other"), svt_with_hash(&hash)],
            unsupported_algorithms: Vec::new(),
        };
        let path_validator = UnconfiguredPathValidator;
        let jws_verifier = AcceptAllJws;
        let validator = SvtValidator::new(&path_validator, &jws_verifier);

        let (bound, claims) = validator
            .find_matching(&collection, &signature_value)
            .unwrap();
        assert_eq!(claims.sig_ref.sig_hash, hash);
        assert_eq!(bound.jwt.claims().jti, "jti-1");

        assert!(validator.find_matching(&collection, b"unrelated").is_none());
        let _ = CertValidationOutcome::passed(Vec::new());
    }
}
