//! Compact JWS model for SVT tokens (RFC 7515).

use base64::engine::general_purpose::{STANDARD as BASE64, URL_SAFE_NO_PAD as BASE64_URL};
use base64::Engine;
use der::Decode;
use serde::{Deserialize, Serialize};
use x509_cert::Certificate;

use crate::domain::algorithms::JwsAlgorithm;
use crate::domain::claims::SvtClaims;
use crate::domain::trust::JwsSigner;
use crate::infra::error::{SigValError, SigValResult};

/// JWS protected header for an SVT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwsHeader {
    pub alg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    /// Issuer certificate chain, standard base64 DER, leaf first
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x5c: Option<Vec<String>>,
}

/// A parsed or freshly signed compact JWS carrying SVT claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedJwt {
    header: JwsHeader,
    claims: SvtClaims,
    protected_b64: String,
    payload_b64: String,
    signature: Vec<u8>,
}

impl SignedJwt {
    /// Parse a compact serialization `header.payload.signature`.
    pub fn parse(compact: &str) -> SigValResult<Self> {
        let mut parts = compact.split('.');
        let (Some(protected_b64), Some(payload_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(SigValError::SvtParse(
                "compact JWS must have exactly three segments".to_string(),
            ));
        };

        let header_json = BASE64_URL
            .decode(protected_b64)
            .map_err(|e| SigValError::SvtParse(format!("JWS header encoding: {e}")))?;
        let header: JwsHeader = serde_json::from_slice(&header_json)?;

        let payload_json = BASE64_URL
            .decode(payload_b64)
            .map_err(|e| SigValError::SvtParse(format!("JWS payload encoding: {e}")))?;
        let claims: SvtClaims = serde_json::from_slice(&payload_json)?;

        let signature = BASE64_URL
            .decode(signature_b64)
            .map_err(|e| SigValError::SvtParse(format!("JWS signature encoding: {e}")))?;

        Ok(Self {
            header,
            claims,
            protected_b64: protected_b64.to_string(),
            payload_b64: payload_b64.to_string(),
            signature,
        })
    }

    /// Sign `claims` with the injected signer, producing a complete token.
    pub fn sign<S: JwsSigner + ?Sized>(claims: SvtClaims, signer: &S) -> SigValResult<Self> {
        let x5c = signer
            .certificates()
            .iter()
            .map(|cert| {
                use der::Encode;
                cert.to_der()
                    .map(|der| BASE64.encode(der))
                    .map_err(|e| SigValError::SvtParse(format!("x5c encoding: {e}")))
            })
            .collect::<SigValResult<Vec<String>>>()?;
        let header = JwsHeader {
            alg: signer.algorithm().name().to_string(),
            typ: Some("JWT".to_string()),
            x5c: Some(x5c),
        };

        let protected_b64 = BASE64_URL.encode(serde_json::to_vec(&header)?);
        let payload_b64 = BASE64_URL.encode(serde_json::to_vec(&claims)?);
        let signing_input = format!("{protected_b64}.{payload_b64}");
        let signature = signer.sign(signing_input.as_bytes())?;

        Ok(Self {
            header,
            claims,
            protected_b64,
            payload_b64,
            signature,
        })
    }

    #[must_use]
    pub fn header(&self) -> &JwsHeader {
        &self.header
    }

    #[must_use]
    pub fn claims(&self) -> &SvtClaims {
        &self.claims
    }

    /// The registered algorithm named in the header.
    pub fn algorithm(&self) -> SigValResult<JwsAlgorithm> {
        JwsAlgorithm::from_name(&self.header.alg)
    }

    /// The bytes the signature covers.
    #[must_use]
    pub fn signing_input(&self) -> Vec<u8> {
        format!("{}.{}", self.protected_b64, self.payload_b64).into_bytes()
    }

    #[must_use]
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// All `x5c` certificates, leaf first.
    pub fn x5c_certificates(&self) -> SigValResult<Vec<Certificate>> {
        let Some(x5c) = self.header.x5c.as_ref() else {
            return Ok(Vec::new());
        };
        x5c.iter()
            .map(|entry| {
                let der = BASE64
                    .decode(entry)
                    .map_err(|e| SigValError::SvtParse(format!("x5c entry: {e}")))?;
                Certificate::from_der(&der)
                    .map_err(|e| SigValError::SvtParse(format!("x5c certificate: {e}")))
            })
            .collect()
    }

    /// The issuer (leaf) certificate from `x5c`.
    pub fn signer_certificate(&self) -> SigValResult<Certificate> {
        self.x5c_certificates()?
            .into_iter()
            .next()
            .ok_or_else(|| SigValError::SvtVerify("JWS without x5c certificate".to_string()))
    }

    /// Compact serialization.
    #[must_use]
    pub fn serialize(&self) -> String {
        format!(
            "{}.{}.{}",
            self.protected_b64,
            self.payload_b64,
            BASE64_URL.encode(&self.signature)
        )
    }
}
