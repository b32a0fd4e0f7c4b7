//! Signed-attribute extraction for CMS `SignerInfo` structures.
//!
//! Covers the attributes PAdES validation depends on: messageDigest,
//! signingTime, the ESS signing-certificate binding (RFC 2634 / RFC 5035)
//! and CMS algorithm protection (RFC 6211).

use cms::signed_data::SignedAttributes;
use const_oid::ObjectIdentifier;
use der::asn1::OctetString;
use der::{Any, Decode, Encode, Sequence};
use x509_cert::attr::Attribute;
use x509_cert::spki::AlgorithmIdentifierOwned;
use x509_cert::time::Time;

use crate::domain::algorithms::{
    DigestAlgorithm, OID_CMS_ALGORITHM_PROTECTION, OID_MESSAGE_DIGEST, OID_SIGNING_CERTIFICATE,
    OID_SIGNING_CERTIFICATE_V2, OID_SIGNING_TIME,
};
use crate::infra::error::{SigValError, SigValResult};

/// `ESSCertIDv2` (RFC 5035). The hash algorithm is OPTIONAL and defaults to
/// SHA-256, so the first element is either an AlgorithmIdentifier SEQUENCE or
/// directly the certHash OCTET STRING.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct EssCertIdV2 {
    hash_algorithm: Option<AlgorithmIdentifierOwned>,
    cert_hash: OctetString,
    issuer_serial: Option<Any>,
}

/// `SigningCertificateV2` (RFC 5035).
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct SigningCertificateV2 {
    certs: Vec<EssCertIdV2>,
    policies: Option<Any>,
}

/// `ESSCertID` (RFC 2634), fixed to SHA-1.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct EssCertId {
    cert_hash: OctetString,
    issuer_serial: Option<Any>,
}

/// `SigningCertificate` (RFC 2634).
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct SigningCertificate {
    certs: Vec<EssCertId>,
    policies: Option<Any>,
}

/// `CMSAlgorithmProtection` (RFC 6211).
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct CmsAlgorithmProtection {
    digest_algorithm: AlgorithmIdentifierOwned,
    #[asn1(context_specific = "1", tag_mode = "IMPLICIT", optional = "true")]
    signature_algorithm: Option<AlgorithmIdentifierOwned>,
    #[asn1(context_specific = "2", tag_mode = "IMPLICIT", optional = "true")]
    mac_algorithm: Option<AlgorithmIdentifierOwned>,
}

/// Parsed ESS signing-certificate binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EssSigningCertificate {
    /// Digest algorithm of the stored certificate hash
    pub digest: DigestAlgorithm,
    /// The stored certificate hash
    pub cert_hash: Vec<u8>,
}

/// Parsed algorithm protection attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorithmProtectionAttribute {
    pub digest_oid: ObjectIdentifier,
    pub signature_oid: Option<ObjectIdentifier>,
}

/// Find a signed attribute by OID.
#[must_use]
pub fn find_attribute<'a>(
    attrs: &'a SignedAttributes,
    oid: &ObjectIdentifier,
) -> Option<&'a Attribute> {
    attrs.iter().find(|attr| attr.oid == *oid)
}

fn sole_value<'a>(attr: &'a Attribute, what: &str) -> SigValResult<&'a Any> {
    attr.values
        .iter()
        .next()
        .ok_or_else(|| SigValError::CmsParse(format!("{what} attribute without value")))
}

/// The messageDigest attribute value.
pub fn extract_message_digest(attrs: &SignedAttributes) -> SigValResult<Option<Vec<u8>>> {
    let Some(attr) = find_attribute(attrs, &OID_MESSAGE_DIGEST) else {
        return Ok(None);
    };
    let value = sole_value(attr, "messageDigest")?;
    let digest = value
        .decode_as::<OctetString>()
        .map_err(|e| SigValError::CmsParse(format!("messageDigest: {e}")))?;
    Ok(Some(digest.as_bytes().to_vec()))
}

/// The signingTime attribute, as epoch milliseconds.
#[must_use]
pub fn extract_signing_time(attrs: &SignedAttributes) -> Option<i64> {
    let attr = find_attribute(attrs, &OID_SIGNING_TIME)?;
    let value = attr.values.iter().next()?;
    let time_der = value.to_der().ok()?;
    let time = Time::from_der(&time_der).ok()?;
    i64::try_from(time.to_unix_duration().as_millis()).ok()
}

/// The ESS signing-certificate attribute, v2 preferred over v1.
///
/// `ESSCertIDv2` carries an optional hash algorithm defaulting to SHA-256;
/// `ESSCertID` is always SHA-1.
pub fn extract_ess_signing_certificate(
    attrs: &SignedAttributes,
) -> SigValResult<Option<EssSigningCertificate>> {
    if let Some(attr) = find_attribute(attrs, &OID_SIGNING_CERTIFICATE_V2) {
        let value = sole_value(attr, "signingCertificateV2")?;
        let parsed = value
            .decode_as::<SigningCertificateV2>()
            .map_err(|e| SigValError::CmsParse(format!("signingCertificateV2: {e}")))?;
        let first = parsed.certs.first().ok_or_else(|| {
            SigValError::CmsParse("signingCertificateV2 without ESSCertIDv2".to_string())
        })?;
        let digest = match &first.hash_algorithm {
            Some(alg) => DigestAlgorithm::from_oid(&alg.oid)?,
            None => DigestAlgorithm::Sha256,
        };
        return Ok(Some(EssSigningCertificate {
            digest,
            cert_hash: first.cert_hash.as_bytes().to_vec(),
        }));
    }

    if let Some(attr) = find_attribute(attrs, &OID_SIGNING_CERTIFICATE) {
        let value = sole_value(attr, "signingCertificate")?;
        let parsed = value
            .decode_as::<SigningCertificate>()
            .map_err(|e| SigValError::CmsParse(format!("signingCertificate: {e}")))?;
        let first = parsed.certs.first().ok_or_else(|| {
            SigValError::CmsParse("signingCertificate without ESSCertID".to_string())
        })?;
        return Ok(Some(EssSigningCertificate {
            digest: DigestAlgorithm::Sha1,
            cert_hash: first.cert_hash.as_bytes().to_vec(),
        }));
    }

    Ok(None)
}

/// The CMS algorithm protection attribute.
pub fn extract_algorithm_protection(
    attrs: &SignedAttributes,
) -> SigValResult<Option<AlgorithmProtectionAttribute>> {
    let Some(attr) = find_attribute(attrs, &OID_CMS_ALGORITHM_PROTECTION) else {
        return Ok(None);
    };
    let value = sole_value(attr, "algorithmProtection")?;
    let parsed = value
        .decode_as::<CmsAlgorithmProtection>()
        .map_err(|e| SigValError::CmsParse(format!("algorithmProtection: {e}")))?;
    Ok(Some(AlgorithmProtectionAttribute {
        digest_oid: parsed.digest_algorithm.oid,
        signature_oid: parsed.signature_algorithm.map(|alg| alg.oid),
    }))
}
