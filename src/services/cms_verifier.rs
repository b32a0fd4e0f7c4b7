//! CMS `SignedData` parsing and cryptographic verification.
//!
//! Covers the PAdES obligations on the embedded CMS structure: signer
//! identification, messageDigest and signature checks over the byte range,
//! ESS signing-certificate binding, and the algorithm protection cross-check.

use cms::cert::CertificateChoices;
use cms::content_info::ContentInfo;
use cms::signed_data::{SignedData, SignerIdentifier, SignerInfo};
use const_oid::ObjectIdentifier;
use der::{Decode, Encode};
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::RsaPublicKey;
use x509_cert::Certificate;

use crate::domain::algorithms::{
    resolve_signature_algorithm, DigestAlgorithm, NamedCurve, PublicKeyType, OID_SIGNED_DATA,
};
use crate::domain::cms::attributes;
use crate::domain::cms::timestamp::TimestampToken;
use crate::domain::cms::trim_der;
use crate::domain::crypto::{verify_with_certificate, EcSignatureFormat};
use crate::domain::result::{AlgorithmProtection, SignatureStatus, SignatureValidationResult};
use crate::infra::error::{SigValError, SigValResult};

const OID_SUBJECT_KEY_IDENTIFIER: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.14");

/// Stateless CMS verification service.
pub struct CmsVerifier;

/// Parse-only view of a CMS signature, used when an SVT supersedes the
/// cryptographic checks.
#[derive(Debug, Clone)]
pub struct CmsSummary {
    pub signer_certificate: Certificate,
    pub certificate_chain: Vec<Certificate>,
    /// signingTime attribute, epoch milliseconds
    pub claimed_signing_time: Option<i64>,
    /// Signature value octets from the `SignerInfo`
    pub signature_value: Vec<u8>,
}

impl CmsVerifier {
    /// Verify the CMS structure in `contents` over `signed_bytes` and return
    /// a populated per-signature result.
    ///
    /// The returned result has a tentative `success`; certificate path
    /// validation and document coverage are layered on by the caller. A
    /// PAdES binding mismatch is reported in the result rather than as an
    /// error, so the remaining fields stay observable.
    pub fn verify(contents: &[u8], signed_bytes: &[u8]) -> SigValResult<SignatureValidationResult> {
        let der_bytes = trim_der(contents)?;
        let content_info = ContentInfo::from_der(der_bytes)
            .map_err(|e| SigValError::CmsParse(format!("ContentInfo: {e}")))?;
        if content_info.content_type != OID_SIGNED_DATA {
            return Err(SigValError::CmsParse(format!(
                "content type {} is not SignedData",
                content_info.content_type
            )));
        }
        let signed_data = content_info
            .content
            .decode_as::<SignedData>()
            .map_err(|e| SigValError::CmsParse(format!("SignedData: {e}")))?;

        let mut signer_infos = signed_data.signer_infos.0.iter();
        let signer_info = signer_infos
            .next()
            .ok_or_else(|| SigValError::CmsParse("SignedData without SignerInfo".to_string()))?;
        if signer_infos.next().is_some() {
            return Err(SigValError::CmsParse(
                "SignedData with multiple SignerInfos".to_string(),
            ));
        }

        let chain = certificate_list(&signed_data);
        let signer_certificate = find_signer_certificate(signer_info, &chain)?;

        let mut result = SignatureValidationResult {
            signature_certificate_chain: chain,
            signature_value: signer_info.signature.as_bytes().to_vec(),
            signed_bytes: signed_bytes.to_vec(),
            ..SignatureValidationResult::default()
        };

        let digest_alg = DigestAlgorithm::from_oid(&signer_info.digest_alg.oid)?;
        result.cms_digest_algorithm = Some(signer_info.digest_alg.oid);
        result.cms_signature_algorithm = Some(signer_info.signature_algorithm.oid);
        let props = resolve_signature_algorithm(&signer_info.signature_algorithm.oid, digest_alg)?;
        result.signature_algorithm_uri = Some(props.uri.to_string());

        populate_key_parameters(&signer_certificate, &mut result);

        // Cryptographic verification: over the DER SET of signed attributes
        // when present, otherwise directly over the byte range (CAdES-BES).
        match signer_info.signed_attrs.as_ref() {
            Some(signed_attrs) => {
                let message_digest = attributes::extract_message_digest(signed_attrs)?
                    .ok_or_else(|| {
                        SigValError::CmsVerify("signed attributes without messageDigest".to_string())
                    })?;
                if digest_alg.digest(signed_bytes) != message_digest {
                    return Err(SigValError::CmsVerify(
                        "messageDigest does not match signed byte range".to_string(),
                    ));
                }

                let attrs_der = signed_attrs
                    .to_der()
                    .map_err(|e| SigValError::CmsVerify(format!("signed attributes: {e}")))?;
                let prehash = props.digest.digest(&attrs_der);
                verify_with_certificate(
                    &signer_certificate,
                    props.digest,
                    &prehash,
                    signer_info.signature.as_bytes(),
                    EcSignatureFormat::Der,
                )?;

                result.claimed_signing_time = attributes::extract_signing_time(signed_attrs);

                if let Some(protection) = attributes::extract_algorithm_protection(signed_attrs)? {
                    check_algorithm_protection(&protection, signer_info, digest_alg)?;
                    result.algorithm_protection = Some(AlgorithmProtection {
                        digest_oid: protection.digest_oid,
                        signature_algorithm_uri: match protection.signature_oid {
                            Some(oid) => {
                                Some(resolve_signature_algorithm(&oid, digest_alg)?.uri.to_string())
                            }
                            None => None,
                        },
                    });
                }

                apply_pades_binding(signed_attrs, &signer_certificate, &mut result)?;
            }
            None => {
                let prehash = props.digest.digest(signed_bytes);
                verify_with_certificate(
                    &signer_certificate,
                    props.digest,
                    &prehash,
                    signer_info.signature.as_bytes(),
                    EcSignatureFormat::Der,
                )?;
                result.is_pades = false;
                result.invalid_sign_cert = false;
            }
        }

        result.signer_certificate = Some(signer_certificate);
        if result.status.is_none() {
            result.success = true;
            result.status = Some(SignatureStatus::Success);
        }
        Ok(result)
    }

    /// Parse the CMS structure without any cryptographic checks, returning
    /// the data SVT-based validation needs: signer certificate, carried
    /// chain, claimed signing time and the signature value octets.
    pub fn parse_summary(contents: &[u8]) -> SigValResult<CmsSummary> {
        let der_bytes = trim_der(contents)?;
        let content_info = ContentInfo::from_der(der_bytes)
            .map_err(|e| SigValError::CmsParse(format!("ContentInfo: {e}")))?;
        if content_info.content_type != OID_SIGNED_DATA {
            return Err(SigValError::CmsParse(format!(
                "content type {} is not SignedData",
                content_info.content_type
            )));
        }
        let signed_data = content_info
            .content
            .decode_as::<SignedData>()
            .map_err(|e| SigValError::CmsParse(format!("SignedData: {e}")))?;
        let signer_info = signed_data
            .signer_infos
            .0
            .iter()
            .next()
            .ok_or_else(|| SigValError::CmsParse("SignedData without SignerInfo".to_string()))?;

        let chain = certificate_list(&signed_data);
        let signer_certificate = find_signer_certificate(signer_info, &chain)?;
        let claimed_signing_time = signer_info
            .signed_attrs
            .as_ref()
            .and_then(attributes::extract_signing_time);

        Ok(CmsSummary {
            signer_certificate,
            certificate_chain: chain,
            claimed_signing_time,
            signature_value: signer_info.signature.as_bytes().to_vec(),
        })
    }

    /// Extract RFC 3161 signature timestamps from the unsigned attributes.
    ///
    /// Each `id-aa-timeStampToken` attribute value is a complete timestamp
    /// token imprinting the signer's signature value.
    pub fn extract_signature_timestamps(contents: &[u8]) -> SigValResult<Vec<TimestampToken>> {
        let der_bytes = trim_der(contents)?;
        let content_info = ContentInfo::from_der(der_bytes)
            .map_err(|e| SigValError::CmsParse(format!("ContentInfo: {e}")))?;
        let signed_data = content_info
            .content
            .decode_as::<SignedData>()
            .map_err(|e| SigValError::CmsParse(format!("SignedData: {e}")))?;
        let Some(signer_info) = signed_data.signer_infos.0.iter().next() else {
            return Ok(Vec::new());
        };
        let Some(unsigned) = signer_info.unsigned_attrs.as_ref() else {
            return Ok(Vec::new());
        };

        let mut tokens = Vec::new();
        for attr in unsigned.iter() {
            if attr.oid != crate::domain::algorithms::OID_TIMESTAMP_TOKEN_ATTR {
                continue;
            }
            for value in attr.values.iter() {
                let token_der = value
                    .to_der()
                    .map_err(|e| SigValError::TimestampVerify(format!("timestamp attribute: {e}")))?;
                tokens.push(TimestampToken::from_der(&token_der)?);
            }
        }
        Ok(tokens)
    }

    /// Verify an RFC 3161 token: its imprint must match `message` and its CMS
    /// signature must verify over the encapsulated `TSTInfo`.
    ///
    /// Returns the TSA certificate for path validation by the caller.
    pub fn verify_timestamp_token(
        token: &TimestampToken,
        message: &[u8],
    ) -> SigValResult<Certificate> {
        if !token.matches_imprint(message) {
            return Err(SigValError::TimestampVerify(
                "message imprint does not match timestamped data".to_string(),
            ));
        }

        let content_info = ContentInfo::from_der(token.as_der())
            .map_err(|e| SigValError::TimestampVerify(format!("token ContentInfo: {e}")))?;
        let signed_data = content_info
            .content
            .decode_as::<SignedData>()
            .map_err(|e| SigValError::TimestampVerify(format!("token SignedData: {e}")))?;
        let signer_info = signed_data
            .signer_infos
            .0
            .iter()
            .next()
            .ok_or_else(|| SigValError::TimestampVerify("token without SignerInfo".to_string()))?;

        let econtent = signed_data
            .encap_content_info
            .econtent
            .as_ref()
            .ok_or_else(|| SigValError::TimestampVerify("token without TSTInfo".to_string()))?;
        let tst_bytes = econtent
            .decode_as::<der::asn1::OctetString>()
            .map_err(|e| SigValError::TimestampVerify(format!("TSTInfo wrapper: {e}")))?;

        let chain = certificate_list(&signed_data);
        let signer_certificate = find_signer_certificate(signer_info, &chain)
            .map_err(|e| SigValError::TimestampVerify(e.to_string()))?;

        let digest_alg = DigestAlgorithm::from_oid(&signer_info.digest_alg.oid)?;
        let props = resolve_signature_algorithm(&signer_info.signature_algorithm.oid, digest_alg)?;

        let signed_attrs = signer_info.signed_attrs.as_ref().ok_or_else(|| {
            SigValError::TimestampVerify("token without signed attributes".to_string())
        })?;
        let message_digest = attributes::extract_message_digest(signed_attrs)
            .map_err(|e| SigValError::TimestampVerify(e.to_string()))?
            .ok_or_else(|| {
                SigValError::TimestampVerify("token without messageDigest attribute".to_string())
            })?;
        if digest_alg.digest(tst_bytes.as_bytes()) != message_digest {
            return Err(SigValError::TimestampVerify(
                "token messageDigest does not match TSTInfo".to_string(),
            ));
        }
        let attrs_der = signed_attrs
            .to_der()
            .map_err(|e| SigValError::TimestampVerify(format!("token attributes: {e}")))?;
        let prehash = props.digest.digest(&attrs_der);
        verify_with_certificate(
            &signer_certificate,
            props.digest,
            &prehash,
            signer_info.signature.as_bytes(),
            EcSignatureFormat::Der,
        )
        .map_err(|e| SigValError::TimestampVerify(e.to_string()))?;

        Ok(signer_certificate)
    }
}

fn certificate_list(signed_data: &SignedData) -> Vec<Certificate> {
    let Some(cert_set) = signed_data.certificates.as_ref() else {
        return Vec::new();
    };
    cert_set
        .0
        .iter()
        .filter_map(|choice| match choice {
            CertificateChoices::Certificate(cert) => Some(cert.clone()),
            _ => None,
        })
        .collect()
}

fn find_signer_certificate(
    signer_info: &SignerInfo,
    certificates: &[Certificate],
) -> SigValResult<Certificate> {
    match &signer_info.sid {
        SignerIdentifier::IssuerAndSerialNumber(sid) => certificates
            .iter()
            .find(|cert| {
                cert.tbs_certificate.serial_number == sid.serial_number
                    && cert.tbs_certificate.issuer == sid.issuer
            })
            .cloned()
            .ok_or_else(|| {
                SigValError::CmsParse("no certificate matches SignerInfo issuer/serial".to_string())
            }),
        SignerIdentifier::SubjectKeyIdentifier(skid) => certificates
            .iter()
            .find(|cert| subject_key_identifier(cert).as_deref() == Some(skid.0.as_bytes()))
            .cloned()
            .ok_or_else(|| {
                SigValError::CmsParse(
                    "no certificate matches SignerInfo subject key identifier".to_string(),
                )
            }),
    }
}

fn subject_key_identifier(certificate: &Certificate) -> Option<Vec<u8>> {
    let extensions = certificate.tbs_certificate.extensions.as_ref()?;
    let extension = extensions
        .iter()
        .find(|ext| ext.extn_id == OID_SUBJECT_KEY_IDENTIFIER)?;
    // The extension value wraps the key identifier in its own OCTET STRING.
    let inner = der::asn1::OctetString::from_der(extension.extn_value.as_bytes()).ok()?;
    Some(inner.as_bytes().to_vec())
}

pub(crate) fn populate_key_parameters(
    certificate: &Certificate,
    result: &mut SignatureValidationResult,
) {
    let spki = &certificate.tbs_certificate.subject_public_key_info;
    let key_type = PublicKeyType::from_oid(&spki.algorithm.oid);
    result.public_key_type = Some(key_type);

    match key_type {
        PublicKeyType::Rsa => {
            if let Ok(spki_der) = spki.to_der() {
                if let Ok(public_key) = RsaPublicKey::from_public_key_der(&spki_der) {
                    result.key_length = u32::try_from(public_key.size() * 8).ok();
                }
            }
        }
        PublicKeyType::Ec => {
            let curve = spki
                .algorithm
                .parameters
                .as_ref()
                .and_then(|params| params.decode_as::<ObjectIdentifier>().ok())
                .and_then(|oid| NamedCurve::from_oid(&oid).ok());
            if let Some(curve) = curve {
                result.named_curve = Some(curve);
                result.key_length = Some(curve.key_length());
            }
        }
        PublicKeyType::EdDsa => {
            result.key_length = Some(256);
        }
        PublicKeyType::Other => {}
    }
}

fn check_algorithm_protection(
    protection: &attributes::AlgorithmProtectionAttribute,
    signer_info: &SignerInfo,
    digest_alg: DigestAlgorithm,
) -> SigValResult<()> {
    if protection.digest_oid != signer_info.digest_alg.oid {
        return Err(SigValError::AlgorithmMismatch(format!(
            "algorithm protection digest {} differs from SignerInfo digest {}",
            protection.digest_oid, signer_info.digest_alg.oid
        )));
    }
    if let Some(protected_sig_oid) = protection.signature_oid {
        let declared = resolve_signature_algorithm(&signer_info.signature_algorithm.oid, digest_alg)?;
        let protected = resolve_signature_algorithm(&protected_sig_oid, digest_alg)?;
        if declared.uri != protected.uri {
            return Err(SigValError::AlgorithmMismatch(format!(
                "algorithm protection signature {} differs from SignerInfo algorithm {}",
                protected.uri, declared.uri
            )));
        }
    }
    Ok(())
}

fn apply_pades_binding(
    signed_attrs: &cms::signed_data::SignedAttributes,
    signer_certificate: &Certificate,
    result: &mut SignatureValidationResult,
) -> SigValResult<()> {
    let Some(ess) = attributes::extract_ess_signing_certificate(signed_attrs)? else {
        result.is_pades = false;
        result.invalid_sign_cert = false;
        return Ok(());
    };

    result.is_pades = true;
    let cert_der = signer_certificate
        .to_der()
        .map_err(|e| SigValError::PadesBinding(format!("signer certificate encoding: {e}")))?;
    if ess.digest.digest(&cert_der) == ess.cert_hash {
        result.invalid_sign_cert = false;
    } else {
        result.invalid_sign_cert = true;
        result.fail(
            SignatureStatus::ErrorSignerInvalid,
            "ESS signing-certificate hash does not match signer certificate",
        );
    }
    Ok(())
}
