//! Algorithm registry: OID, URI and JWS identifier lookups.
//!
//! All tables are compile-time `match` tables. Lookups that fall outside the
//! registry fail with [`SigValError::UnsupportedAlgorithm`] so callers never
//! act on an algorithm the crate cannot digest or verify.

use const_oid::ObjectIdentifier;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::infra::error::{SigValError, SigValResult};

// === Digest algorithm OIDs ===

pub const OID_SHA1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.14.3.2.26");
pub const OID_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1");
pub const OID_SHA384: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.2");
pub const OID_SHA512: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.3");

// === Signature algorithm OIDs ===

pub const OID_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
pub const OID_SHA1_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.5");
pub const OID_SHA256_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");
pub const OID_SHA384_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.12");
pub const OID_SHA512_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.13");
pub const OID_EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
pub const OID_ECDSA_WITH_SHA256: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");
pub const OID_ECDSA_WITH_SHA384: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.3");
pub const OID_ECDSA_WITH_SHA512: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.4");
pub const OID_ED25519: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.112");

// === Named curve OIDs ===

pub const OID_SECP256R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
pub const OID_SECP384R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.34");
pub const OID_SECP521R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.35");

// === CMS attribute and content type OIDs ===

pub const OID_CONTENT_TYPE: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.3");
pub const OID_MESSAGE_DIGEST: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.4");
pub const OID_SIGNING_TIME: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.5");
pub const OID_CMS_ALGORITHM_PROTECTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.52");
pub const OID_SIGNING_CERTIFICATE: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.16.2.12");
pub const OID_SIGNING_CERTIFICATE_V2: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.16.2.47");
pub const OID_TIMESTAMP_TOKEN_ATTR: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.16.2.14");
pub const OID_SIGNED_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.2");
pub const OID_ID_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");
pub const OID_TST_INFO: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.16.1.4");

/// Unsigned CMS attribute transporting an SVT JWS inside a document timestamp.
pub const OID_SVT_ATTRIBUTE: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.752.201.5.1");

// === Validation policy identifiers ===

pub const POLICY_PKIX_VALIDATION: &str = "pkix-validation";
pub const POLICY_BASIC_VALIDATION: &str = "basic-validation";
pub const POLICY_PADES_BINDING: &str = "pades-binding";
pub const POLICY_SVT_ALGORITHM_UNSUPPORTED: &str = "svt-algorithm-unsupported";

/// Digest algorithms usable for claim-set hashes and CMS digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    pub fn from_oid(oid: &ObjectIdentifier) -> SigValResult<Self> {
        match *oid {
            OID_SHA1 => Ok(DigestAlgorithm::Sha1),
            OID_SHA256 => Ok(DigestAlgorithm::Sha256),
            OID_SHA384 => Ok(DigestAlgorithm::Sha384),
            OID_SHA512 => Ok(DigestAlgorithm::Sha512),
            _ => Err(SigValError::UnsupportedAlgorithm(format!(
                "digest algorithm {oid}"
            ))),
        }
    }

    #[must_use]
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            DigestAlgorithm::Sha1 => OID_SHA1,
            DigestAlgorithm::Sha256 => OID_SHA256,
            DigestAlgorithm::Sha384 => OID_SHA384,
            DigestAlgorithm::Sha512 => OID_SHA512,
        }
    }

    #[must_use]
    pub fn uri(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => "http://www.w3.org/2000/09/xmldsig#sha1",
            DigestAlgorithm::Sha256 => "http://www.w3.org/2001/04/xmlenc#sha256",
            DigestAlgorithm::Sha384 => "http://www.w3.org/2001/04/xmldsig-more#sha384",
            DigestAlgorithm::Sha512 => "http://www.w3.org/2001/04/xmlenc#sha512",
        }
    }

    /// Digest `data` with this algorithm.
    #[must_use]
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            DigestAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
            DigestAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            DigestAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            DigestAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    #[must_use]
    pub fn output_len(&self) -> usize {
        match self {
            DigestAlgorithm::Sha1 => 20,
            DigestAlgorithm::Sha256 => 32,
            DigestAlgorithm::Sha384 => 48,
            DigestAlgorithm::Sha512 => 64,
        }
    }
}

/// Public key families recognized for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicKeyType {
    Rsa,
    Ec,
    EdDsa,
    Other,
}

impl PublicKeyType {
    /// Classify from the SubjectPublicKeyInfo algorithm OID.
    #[must_use]
    pub fn from_oid(oid: &ObjectIdentifier) -> Self {
        match *oid {
            OID_RSA_ENCRYPTION => PublicKeyType::Rsa,
            OID_EC_PUBLIC_KEY => PublicKeyType::Ec,
            OID_ED25519 => PublicKeyType::EdDsa,
            _ => PublicKeyType::Other,
        }
    }
}

/// Named elliptic curves with their key lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedCurve {
    P256,
    P384,
    P521,
}

impl NamedCurve {
    pub fn from_oid(oid: &ObjectIdentifier) -> SigValResult<Self> {
        match *oid {
            OID_SECP256R1 => Ok(NamedCurve::P256),
            OID_SECP384R1 => Ok(NamedCurve::P384),
            OID_SECP521R1 => Ok(NamedCurve::P521),
            _ => Err(SigValError::UnsupportedAlgorithm(format!("curve {oid}"))),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            NamedCurve::P256 => "P-256",
            NamedCurve::P384 => "P-384",
            NamedCurve::P521 => "P-521",
        }
    }

    #[must_use]
    pub fn key_length(&self) -> u32 {
        match self {
            NamedCurve::P256 => 256,
            NamedCurve::P384 => 384,
            NamedCurve::P521 => 521,
        }
    }
}

/// Resolved signature algorithm properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureAlgorithmProperties {
    pub key_type: PublicKeyType,
    pub digest: DigestAlgorithm,
    pub uri: &'static str,
}

/// Resolve the signature algorithm stated in a CMS `SignerInfo`.
///
/// A bare `rsaEncryption` OID carries no digest; it is completed with the
/// `SignerInfo` digest algorithm, as permitted by RFC 5652.
pub fn resolve_signature_algorithm(
    sig_oid: &ObjectIdentifier,
    digest: DigestAlgorithm,
) -> SigValResult<SignatureAlgorithmProperties> {
    let props = match *sig_oid {
        OID_RSA_ENCRYPTION => SignatureAlgorithmProperties {
            key_type: PublicKeyType::Rsa,
            digest,
            uri: rsa_uri(digest)?,
        },
        OID_SHA1_WITH_RSA => rsa_props(DigestAlgorithm::Sha1)?,
        OID_SHA256_WITH_RSA => rsa_props(DigestAlgorithm::Sha256)?,
        OID_SHA384_WITH_RSA => rsa_props(DigestAlgorithm::Sha384)?,
        OID_SHA512_WITH_RSA => rsa_props(DigestAlgorithm::Sha512)?,
        OID_ECDSA_WITH_SHA256 => ec_props(DigestAlgorithm::Sha256),
        OID_ECDSA_WITH_SHA384 => ec_props(DigestAlgorithm::Sha384),
        OID_ECDSA_WITH_SHA512 => ec_props(DigestAlgorithm::Sha512),
        _ => {
            return Err(SigValError::UnsupportedAlgorithm(format!(
                "signature algorithm {sig_oid}"
            )))
        }
    };
    Ok(props)
}

fn rsa_props(digest: DigestAlgorithm) -> SigValResult<SignatureAlgorithmProperties> {
    Ok(SignatureAlgorithmProperties {
        key_type: PublicKeyType::Rsa,
        digest,
        uri: rsa_uri(digest)?,
    })
}

fn rsa_uri(digest: DigestAlgorithm) -> SigValResult<&'static str> {
    match digest {
        DigestAlgorithm::Sha1 => Ok("http://www.w3.org/2000/09/xmldsig#rsa-sha1"),
        DigestAlgorithm::Sha256 => Ok("http://www.w3.org/2001/04/xmldsig-more#rsa-sha256"),
        DigestAlgorithm::Sha384 => Ok("http://www.w3.org/2001/04/xmldsig-more#rsa-sha384"),
        DigestAlgorithm::Sha512 => Ok("http://www.w3.org/2001/04/xmldsig-more#rsa-sha512"),
    }
}

fn ec_props(digest: DigestAlgorithm) -> SignatureAlgorithmProperties {
    let uri = match digest {
        DigestAlgorithm::Sha1 => "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha1",
        DigestAlgorithm::Sha256 => "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha256",
        DigestAlgorithm::Sha384 => "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha384",
        DigestAlgorithm::Sha512 => "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha512",
    };
    SignatureAlgorithmProperties {
        key_type: PublicKeyType::Ec,
        digest,
        uri,
    }
}

/// JWS signing algorithms recognized for SVT tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JwsAlgorithm {
    Rs256,
    Rs384,
    Rs512,
    Es256,
    Es384,
}

impl JwsAlgorithm {
    pub fn from_name(name: &str) -> SigValResult<Self> {
        match name {
            "RS256" => Ok(JwsAlgorithm::Rs256),
            "RS384" => Ok(JwsAlgorithm::Rs384),
            "RS512" => Ok(JwsAlgorithm::Rs512),
            "ES256" => Ok(JwsAlgorithm::Es256),
            "ES384" => Ok(JwsAlgorithm::Es384),
            _ => Err(SigValError::UnsupportedAlgorithm(format!(
                "JWS algorithm {name}"
            ))),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            JwsAlgorithm::Rs256 => "RS256",
            JwsAlgorithm::Rs384 => "RS384",
            JwsAlgorithm::Rs512 => "RS512",
            JwsAlgorithm::Es256 => "ES256",
            JwsAlgorithm::Es384 => "ES384",
        }
    }

    /// The digest implied for all hashes inside an SVT signed by this algorithm.
    #[must_use]
    pub fn digest(&self) -> DigestAlgorithm {
        match self {
            JwsAlgorithm::Rs256 | JwsAlgorithm::Es256 => DigestAlgorithm::Sha256,
            JwsAlgorithm::Rs384 | JwsAlgorithm::Es384 => DigestAlgorithm::Sha384,
            JwsAlgorithm::Rs512 => DigestAlgorithm::Sha512,
        }
    }

    #[must_use]
    pub fn key_type(&self) -> PublicKeyType {
        match self {
            JwsAlgorithm::Rs256 | JwsAlgorithm::Rs384 | JwsAlgorithm::Rs512 => PublicKeyType::Rsa,
            JwsAlgorithm::Es256 | JwsAlgorithm::Es384 => PublicKeyType::Ec,
        }
    }

    /// The canonical URI reported for results whose integrity the SVT now carries.
    #[must_use]
    pub fn uri(&self) -> &'static str {
        match self {
            JwsAlgorithm::Rs256 => "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256",
            JwsAlgorithm::Rs384 => "http://www.w3.org/2001/04/xmldsig-more#rsa-sha384",
            JwsAlgorithm::Rs512 => "http://www.w3.org/2001/04/xmldsig-more#rsa-sha512",
            JwsAlgorithm::Es256 => "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha256",
            JwsAlgorithm::Es384 => "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha384",
        }
    }

    /// Reverse lookup from a canonical signature algorithm URI.
    pub fn from_uri(uri: &str) -> SigValResult<Self> {
        match uri {
            "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256" => Ok(JwsAlgorithm::Rs256),
            "http://www.w3.org/2001/04/xmldsig-more#rsa-sha384" => Ok(JwsAlgorithm::Rs384),
            "http://www.w3.org/2001/04/xmldsig-more#rsa-sha512" => Ok(JwsAlgorithm::Rs512),
            "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha256" => Ok(JwsAlgorithm::Es256),
            "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha384" => Ok(JwsAlgorithm::Es384),
            _ => Err(SigValError::UnsupportedAlgorithm(format!(
                "no JWS algorithm for {uri}"
            ))),
        }
    }
}
