//! SVT claim-set model.
//!
//! These types are the JWS payload wire format. Field names follow the SVT
//! claim registry, so serde renames are used where Rust naming differs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Conclusion of one validation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationConclusion {
    Passed,
    Failed,
    Indeterminate,
}

/// Outcome of one validation policy applied to a signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyValidationClaims {
    /// Policy identifier
    pub pol: String,
    /// Conclusion for this policy
    pub res: ValidationConclusion,
    /// Optional message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl PolicyValidationClaims {
    #[must_use]
    pub fn new(pol: impl Into<String>, res: ValidationConclusion) -> Self {
        Self {
            pol: pol.into(),
            res,
            msg: None,
        }
    }

    #[must_use]
    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.msg = Some(msg.into());
        self
    }
}

/// How a verified time was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeValidationType {
    /// RFC 3161 timestamp issued by a TSA
    Tsa,
    /// A prior SVT transported by a document timestamp
    Svt,
}

/// One verified time together with the policies that verified it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeValidationClaims {
    /// Verified time as epoch seconds
    pub time: u64,
    /// Time evidence type
    #[serde(rename = "type")]
    pub time_type: TimeValidationType,
    /// Issuer of the time evidence
    pub iss: String,
    /// Identifier of the time evidence (timestamp serial or SVT id)
    pub id: String,
    /// Policy outcomes for the time verification itself
    pub val: Vec<PolicyValidationClaims>,
}

impl TimeValidationClaims {
    /// True when at least one policy passed for this time evidence.
    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.val
            .iter()
            .any(|p| p.res == ValidationConclusion::Passed)
    }
}

/// Reference binding an SVT entry to a signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigReferenceClaims {
    /// Base64 digest of the signature value octets
    pub sig_hash: String,
    /// Base64 digest of the signed byte range
    pub sb_hash: String,
}

/// Certificate reference form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertRefType {
    /// Full DER certificates, leaf to anchor
    Chain,
    /// Hash of the signer certificate, optionally followed by a chain hash
    ChainHash,
}

/// Compact certificate reference claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertReferenceClaims {
    #[serde(rename = "type")]
    pub ref_type: CertRefType,
    /// Base64 payloads; interpretation depends on `ref_type`
    #[serde(rename = "ref")]
    pub reference: Vec<String>,
}

/// The full claim record for one signature inside an SVT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureClaims {
    pub sig_ref: SigReferenceClaims,
    pub sig_val: Vec<PolicyValidationClaims>,
    pub time_val: Vec<TimeValidationClaims>,
    pub cert_ref: CertReferenceClaims,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext: Option<BTreeMap<String, String>>,
}

/// JWT payload of a signed SVT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SvtClaims {
    /// Unique token id
    pub jti: String,
    /// Issuer identity
    pub iss: String,
    /// Issuance time, epoch seconds
    pub iat: u64,
    /// Optional expiry, epoch seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
    /// Per-signature claim records
    pub sig_val_claims: Vec<SignatureClaims>,
}
