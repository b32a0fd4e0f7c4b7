//! SVT issuance.
//!
//! Normalizes per-signature validation results into the canonical claim set
//! and signs it with the injected JWS signer. The issuer never emits a
//! partial or unsigned token; any defect in the input surfaces as an error.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::domain::algorithms::{DigestAlgorithm, POLICY_BASIC_VALIDATION};
use crate::domain::claims::{
    PolicyValidationClaims, SigReferenceClaims, SignatureClaims, SvtClaims, ValidationConclusion,
};
use crate::domain::result::SignatureValidationResult;
use crate::domain::svt::jws::SignedJwt;
use crate::domain::trust::JwsSigner;
use crate::infra::error::{SigValError, SigValResult};
use crate::services::cert_ref;

/// SVT issuing service.
pub struct SvtIssuer<S: JwsSigner> {
    signer: S,
    issuer_id: String,
    default_basic_validation: bool,
    validity_seconds: Option<u64>,
}

impl<S: JwsSigner> SvtIssuer<S> {
    pub fn new(signer: S, issuer_id: impl Into<String>) -> Self {
        Self {
            signer,
            issuer_id: issuer_id.into(),
            default_basic_validation: false,
            validity_seconds: None,
        }
    }

    /// Inject a basic-validation policy claim when a result carries no
    /// policy outcome of its own.
    #[must_use]
    pub fn with_default_basic_validation(mut self, enabled: bool) -> Self {
        self.default_basic_validation = enabled;
        self
    }

    /// Emit an `exp` claim this many seconds after issuance.
    #[must_use]
    pub fn with_validity(mut self, seconds: u64) -> Self {
        self.validity_seconds = Some(seconds);
        self
    }

    /// Issue a signed SVT over `results`.
    pub fn issue(&self, results: &[SignatureValidationResult]) -> SigValResult<SignedJwt> {
        if results.is_empty() {
            return Err(SigValError::SvtVerify(
                "no validation results to attest".to_string(),
            ));
        }

        let digest = self.signer.algorithm().digest();
        let sig_val_claims = results
            .iter()
            .map(|result| self.signature_claims(result, digest))
            .collect::<SigValResult<Vec<SignatureClaims>>>()?;

        let iat = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| SigValError::InternalInvariant(format!("system clock: {e}")))?
            .as_secs();
        let claims = SvtClaims {
            jti: fresh_token_id(),
            iss: self.issuer_id.clone(),
            iat,
            exp: self.validity_seconds.map(|validity| iat + validity),
            sig_val_claims,
        };

        log::info!(
            "issuing SVT {} over {} signature(s)",
            claims.jti,
            claims.sig_val_claims.len()
        );
        SignedJwt::sign(claims, &self.signer)
    }

    fn signature_claims(
        &self,
        result: &SignatureValidationResult,
        digest: DigestAlgorithm,
    ) -> SigValResult<SignatureClaims> {
        if result.signature_value.is_empty() {
            return Err(SigValError::InternalInvariant(
                "validation result without signature value".to_string(),
            ));
        }
        if result.signed_bytes.is_empty() {
            return Err(SigValError::InternalInvariant(
                "validation result without signed bytes".to_string(),
            ));
        }
        let signer = result.signer_certificate.as_ref().ok_or_else(|| {
            SigValError::InternalInvariant(
                "validation result without signer certificate".to_string(),
            )
        })?;

        let sig_ref = SigReferenceClaims {
            sig_hash: BASE64.encode(digest.digest(&result.signature_value)),
            sb_hash: BASE64.encode(digest.digest(&result.signed_bytes)),
        };

        let cert_ref = cert_ref::encode_cert_ref(
            signer,
            &result.signature_certificate_chain,
            &result.validated_certificate_path,
            digest,
        )?;

        let mut sig_val = result.policy_validation_results.clone();
        if sig_val.is_empty() && self.default_basic_validation {
            log::warn!("result carries no policy outcome, recording basic validation");
            sig_val.push(PolicyValidationClaims::new(
                POLICY_BASIC_VALIDATION,
                if result.success {
                    ValidationConclusion::Passed
                } else {
                    ValidationConclusion::Failed
                },
            ));
        }

        // Only times backed by at least one passed policy are attested.
        let time_val = result
            .time_validation_results
            .iter()
            .map(|tv| tv.claims.clone())
            .filter(|claims| claims.is_verified())
            .collect();

        Ok(SignatureClaims {
            sig_ref,
            sig_val,
            time_val,
            cert_ref,
            ext: None,
        })
    }
}

fn fresh_token_id() -> String {
    let id: [u8; 16] = rand::random();
    hex::encode(id)
}
