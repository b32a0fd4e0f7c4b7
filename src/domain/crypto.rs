//! Public-key signature verification over precomputed digests.
//!
//! Shared by the CMS verifier (DER-form ECDSA signatures) and the JWS
//! verifier (fixed-size `r||s` ECDSA signatures per RFC 7518).

use der::Encode;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use signature::hazmat::PrehashVerifier;
use x509_cert::Certificate;

use crate::domain::algorithms::{DigestAlgorithm, NamedCurve, PublicKeyType};
use crate::infra::error::{SigValError, SigValResult};

/// Encoding of an ECDSA signature value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcSignatureFormat {
    /// ASN.1 DER `SEQUENCE { r, s }` (CMS)
    Der,
    /// Fixed-size `r || s` (JWS)
    Fixed,
}

/// Verify `signature` over the precomputed `prehash` with the public key of
/// `certificate`.
pub fn verify_with_certificate(
    certificate: &Certificate,
    digest: DigestAlgorithm,
    prehash: &[u8],
    signature: &[u8],
    ec_format: EcSignatureFormat,
) -> SigValResult<()> {
    let spki = &certificate.tbs_certificate.subject_public_key_info;
    let key_type = PublicKeyType::from_oid(&spki.algorithm.oid);

    match key_type {
        PublicKeyType::Rsa => {
            let spki_der = spki
                .to_der()
                .map_err(|e| SigValError::CmsVerify(format!("public key encoding: {e}")))?;
            let public_key = RsaPublicKey::from_public_key_der(&spki_der)
                .map_err(|e| SigValError::CmsVerify(format!("RSA public key: {e}")))?;
            verify_rsa(&public_key, digest, prehash, signature)
        }
        PublicKeyType::Ec => {
            let curve_oid = spki
                .algorithm
                .parameters
                .as_ref()
                .ok_or_else(|| SigValError::CmsVerify("EC key without curve parameters".into()))?
                .decode_as::<const_oid::ObjectIdentifier>()
                .map_err(|e| SigValError::CmsVerify(format!("EC curve parameters: {e}")))?;
            let curve = NamedCurve::from_oid(&curve_oid)?;
            let key_bytes = spki
                .subject_public_key
                .as_bytes()
                .ok_or_else(|| SigValError::CmsVerify("EC public key is not octet-aligned".into()))?;
            verify_ecdsa(curve, key_bytes, prehash, signature, ec_format)
        }
        PublicKeyType::EdDsa | PublicKeyType::Other => Err(SigValError::UnsupportedAlgorithm(
            format!("signature verification for key type {key_type:?}"),
        )),
    }
}

fn verify_rsa(
    public_key: &RsaPublicKey,
    digest: DigestAlgorithm,
    prehash: &[u8],
    signature: &[u8],
) -> SigValResult<()> {
    let scheme = match digest {
        DigestAlgorithm::Sha1 => Pkcs1v15Sign::new::<sha1::Sha1>(),
        DigestAlgorithm::Sha256 => Pkcs1v15Sign::new::<sha2::Sha256>(),
        DigestAlgorithm::Sha384 => Pkcs1v15Sign::new::<sha2::Sha384>(),
        DigestAlgorithm::Sha512 => Pkcs1v15Sign::new::<sha2::Sha512>(),
    };
    public_key
        .verify(scheme, prehash, signature)
        .map_err(|e| SigValError::CmsVerify(format!("RSA signature invalid: {e}")))
}

fn verify_ecdsa(
    curve: NamedCurve,
    key_bytes: &[u8],
    prehash: &[u8],
    signature: &[u8],
    ec_format: EcSignatureFormat,
) -> SigValResult<()> {
    match curve {
        NamedCurve::P256 => {
            let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(key_bytes)
                .map_err(|e| SigValError::CmsVerify(format!("P-256 public key: {e}")))?;
            let sig = match ec_format {
                EcSignatureFormat::Der => p256::ecdsa::Signature::from_der(signature),
                EcSignatureFormat::Fixed => p256::ecdsa::Signature::from_slice(signature),
            }
            .map_err(|e| SigValError::CmsVerify(format!("ECDSA signature encoding: {e}")))?;
            key.verify_prehash(prehash, &sig)
                .map_err(|e| SigValError::CmsVerify(format!("ECDSA signature invalid: {e}")))
        }
        NamedCurve::P384 => {
            let key = p384::ecdsa::VerifyingKey::from_sec1_bytes(key_bytes)
                .map_err(|e| SigValError::CmsVerify(format!("P-384 public key: {e}")))?;
            let sig = match ec_format {
                EcSignatureFormat::Der => p384::ecdsa::Signature::from_der(signature),
                EcSignatureFormat::Fixed => p384::ecdsa::Signature::from_slice(signature),
            }
            .map_err(|e| SigValError::CmsVerify(format!("ECDSA signature encoding: {e}")))?;
            key.verify_prehash(prehash, &sig)
                .map_err(|e| SigValError::CmsVerify(format!("ECDSA signature invalid: {e}")))
        }
        NamedCurve::P521 => Err(SigValError::UnsupportedAlgorithm(
            "ECDSA verification on P-521".into(),
        )),
    }
}
