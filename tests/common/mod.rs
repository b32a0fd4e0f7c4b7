//! Shared fixtures: RSA signing keys with self-signed certificates, CMS
//! signature assembly, RFC 3161 token assembly, and a synthetic PDF writer
//! producing classic-xref documents with incremental updates.

#![allow(dead_code)]

use std::str::FromStr;

use cms::cert::{CertificateChoices, IssuerAndSerialNumber};
use cms::content_info::ContentInfo;
use cms::signed_data::{
    CertificateSet, EncapsulatedContentInfo, SignedData, SignerIdentifier, SignerInfo, SignerInfos,
};
use der::asn1::{BitString, GeneralizedTime, Int, OctetString, SetOfVec, UtcTime, Utf8StringRef};
use der::{Any, AnyRef, DateTime, Decode, Encode};
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::EncodePublicKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use sha2::{Digest, Sha256};
use x509_cert::attr::Attribute;
use x509_cert::certificate::{Certificate, TbsCertificate, Version};
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::time::{Time, Validity};
use x509_tsp::{MessageImprint, TspVersion, TstInfo};

use pades_sigval::domain::algorithms::JwsAlgorithm;
use pades_sigval::{
    CertValidationOutcome, CertificatePathValidator, JwsSigner, SigValResult, ValidationConclusion,
};

const OID_SHA256: der::asn1::ObjectIdentifier =
    der::asn1::ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1");
const OID_RSA_ENCRYPTION: der::asn1::ObjectIdentifier =
    der::asn1::ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
const OID_SHA256_WITH_RSA: der::asn1::ObjectIdentifier =
    der::asn1::ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");
const OID_ID_DATA: der::asn1::ObjectIdentifier =
    der::asn1::ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");
const OID_SIGNED_DATA: der::asn1::ObjectIdentifier =
    der::asn1::ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.2");
const OID_CONTENT_TYPE: der::asn1::ObjectIdentifier =
    der::asn1::ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.3");
const OID_MESSAGE_DIGEST: der::asn1::ObjectIdentifier =
    der::asn1::ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.4");
const OID_SIGNING_TIME: der::asn1::ObjectIdentifier =
    der::asn1::ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.5");
const OID_SIGNING_CERTIFICATE_V2: der::asn1::ObjectIdentifier =
    der::asn1::ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.16.2.47");
const OID_TST_INFO: der::asn1::ObjectIdentifier =
    der::asn1::ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.16.1.4");
const OID_SVT_ATTRIBUTE: der::asn1::ObjectIdentifier =
    der::asn1::ObjectIdentifier::new_unwrap("1.2.752.201.5.1");

/// An RSA key with a matching self-signed certificate.
pub struct TestKey {
    pub private_key: RsaPrivateKey,
    pub certificate: Certificate,
}

impl TestKey {
    /// Generate a fresh key and self-sign a certificate for `subject`.
    pub fn generate(subject: &str) -> Self {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 1024).expect("RSA key generation");
        let certificate = self_signed_certificate(&private_key, subject);
        Self {
            private_key,
            certificate,
        }
    }

    /// PKCS#1 v1.5 SHA-256 signature over `message`.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        let signing_key = SigningKey::<Sha256>::new(self.private_key.clone());
        signing_key.sign(message).to_vec()
    }
}

fn self_signed_certificate(private_key: &RsaPrivateKey, subject: &str) -> Certificate {
    let name = Name::from_str(subject).expect("subject DN");
    let signature_algorithm = AlgorithmIdentifierOwned {
        oid: OID_SHA256_WITH_RSA,
        parameters: Some(Any::from(AnyRef::NULL)),
    };
    let public_key = private_key.to_public_key();
    let spki_der = public_key.to_public_key_der().expect("SPKI");
    let subject_public_key_info =
        SubjectPublicKeyInfoOwned::from_der(spki_der.as_bytes()).expect("SPKI decode");

    let tbs_certificate = TbsCertificate {
        version: Version::V3,
        serial_number: SerialNumber::new(&[0x01, 0x23]).expect("serial"),
        signature: signature_algorithm.clone(),
        issuer: name.clone(),
        validity: Validity {
            not_before: utc(2020, 1, 1),
            not_after: utc(2040, 1, 1),
        },
        subject: name,
        subject_public_key_info,
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: None,
    };

    let tbs_der = tbs_certificate.to_der().expect("TBS encoding");
    let signing_key = SigningKey::<Sha256>::new(private_key.clone());
    let signature = signing_key.sign(&tbs_der).to_vec();

    Certificate {
        tbs_certificate,
        signature_algorithm,
        signature: BitString::from_bytes(&signature).expect("signature bits"),
    }
}

fn utc(year: u16, month: u8, day: u8) -> Time {
    Time::UtcTime(
        UtcTime::from_date_time(DateTime::new(year, month, day, 0, 0, 0).expect("date"))
            .expect("utc time"),
    )
}

fn algorithm(oid: der::asn1::ObjectIdentifier) -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid,
        parameters: Some(Any::from(AnyRef::NULL)),
    }
}

fn attribute(oid: der::asn1::ObjectIdentifier, value: Any) -> Attribute {
    let mut values = SetOfVec::new();
    values.insert(value).expect("attribute value");
    Attribute { oid, values }
}

fn any_from<T: Encode>(value: &T) -> Any {
    Any::from_der(&value.to_der().expect("encode")).expect("re-decode")
}

/// Controls the ESS signing-certificate attribute in built signatures.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum EssMode {
    /// No ESS attribute (plain CAdES-less signature)
    Absent,
    /// ESSCertIDv2 with an explicit SHA-256 AlgorithmIdentifier
    V2Explicit,
    /// ESSCertIDv2 with the hashAlgorithm omitted (defaults to SHA-256)
    V2Default,
    /// ESSCertIDv2 whose stored hash does not match the signer certificate
    V2WrongHash,
}

fn ess_attribute(certificate: &Certificate, mode: EssMode) -> Option<Attribute> {
    if mode == EssMode::Absent {
        return None;
    }
    let cert_der = certificate.to_der().expect("certificate DER");
    let mut cert_hash = Sha256::digest(&cert_der).to_vec();
    if mode == EssMode::V2WrongHash {
        cert_hash[0] ^= 0xFF;
    }

    // SigningCertificateV2 ::= SEQUENCE { certs SEQUENCE OF ESSCertIDv2 }
    // assembled by hand so the hashAlgorithm field can be omitted.
    let hash_octets = OctetString::new(cert_hash).expect("hash octets");
    let mut ess_cert_id = Vec::new();
    if matches!(mode, EssMode::V2Explicit | EssMode::V2WrongHash) {
        ess_cert_id.extend_from_slice(&algorithm(OID_SHA256).to_der().expect("alg"));
    }
    ess_cert_id.extend_from_slice(&hash_octets.to_der().expect("octets"));
    let ess_cert_id = der_sequence(&ess_cert_id);
    let certs = der_sequence(&ess_cert_id);
    let signing_certificate_v2 = der_sequence(&certs);

    Some(attribute(
        OID_SIGNING_CERTIFICATE_V2,
        Any::from_der(&signing_certificate_v2).expect("ESS attribute"),
    ))
}

fn der_sequence(content: &[u8]) -> Vec<u8> {
    let mut out = vec![0x30];
    let len = content.len();
    if len < 128 {
        out.push(len as u8);
    } else if len < 256 {
        out.extend([0x81, len as u8]);
    } else {
        out.extend([0x82, (len >> 8) as u8, len as u8]);
    }
    out.extend_from_slice(content);
    out
}

/// Build a detached CMS `SignedData` over `signed_bytes`.
pub fn build_cms_signature(
    key: &TestKey,
    signed_bytes: &[u8],
    ess_mode: EssMode,
    signing_time: Option<DateTime>,
    unsigned_attrs: Vec<Attribute>,
) -> Vec<u8> {
    let message_digest = Sha256::digest(signed_bytes).to_vec();

    let mut signed_attrs: SetOfVec<Attribute> = SetOfVec::new();
    signed_attrs
        .insert(attribute(OID_CONTENT_TYPE, any_from(&OID_ID_DATA)))
        .expect("contentType");
    signed_attrs
        .insert(attribute(
            OID_MESSAGE_DIGEST,
            any_from(&OctetString::new(message_digest).expect("digest octets")),
        ))
        .expect("messageDigest");
    if let Some(datetime) = signing_time {
        let time = Time::UtcTime(UtcTime::from_date_time(datetime).expect("signing time"));
        signed_attrs
            .insert(attribute(OID_SIGNING_TIME, any_from(&time)))
            .expect("signingTime");
    }
    if let Some(attr) = ess_attribute(&key.certificate, ess_mode) {
        signed_attrs.insert(attr).expect("ESS attribute");
    }

    let attrs_der = signed_attrs.to_der().expect("signed attrs DER");
    let signature = key.sign(&attrs_der);

    build_signed_data(
        key,
        EncapsulatedContentInfo {
            econtent_type: OID_ID_DATA,
            econtent: None,
        },
        signed_attrs,
        signature,
        unsigned_attrs,
    )
}

fn build_signed_data(
    key: &TestKey,
    encap_content_info: EncapsulatedContentInfo,
    signed_attrs: SetOfVec<Attribute>,
    signature: Vec<u8>,
    unsigned_attrs: Vec<Attribute>,
) -> Vec<u8> {
    let sid = SignerIdentifier::IssuerAndSerialNumber(IssuerAndSerialNumber {
        issuer: key.certificate.tbs_certificate.issuer.clone(),
        serial_number: key.certificate.tbs_certificate.serial_number.clone(),
    });

    let unsigned = if unsigned_attrs.is_empty() {
        None
    } else {
        let mut set = SetOfVec::new();
        for attr in unsigned_attrs {
            set.insert(attr).expect("unsigned attribute");
        }
        Some(set)
    };

    let signer_info = SignerInfo {
        version: cms::content_info::CmsVersion::V1,
        sid,
        digest_alg: algorithm(OID_SHA256),
        signed_attrs: Some(signed_attrs),
        signature_algorithm: algorithm(OID_RSA_ENCRYPTION),
        signature: OctetString::new(signature).expect("signature octets"),
        unsigned_attrs: unsigned,
    };

    let mut digest_algorithms = SetOfVec::new();
    digest_algorithms
        .insert(algorithm(OID_SHA256))
        .expect("digest algorithms");

    let mut certificates = SetOfVec::new();
    certificates
        .insert(CertificateChoices::Certificate(key.certificate.clone()))
        .expect("certificate set");

    let mut signer_infos = SetOfVec::new();
    signer_infos.insert(signer_info).expect("signer infos");

    let signed_data = SignedData {
        version: cms::content_info::CmsVersion::V1,
        digest_algorithms,
        encap_content_info,
        certificates: Some(CertificateSet(certificates)),
        crls: None,
        signer_infos: SignerInfos(signer_infos),
    };

    let content_info = ContentInfo {
        content_type: OID_SIGNED_DATA,
        content: Any::encode_from(&signed_data).expect("SignedData content"),
    };
    content_info.to_der().expect("ContentInfo DER")
}

/// Build an RFC 3161 timestamp token imprinting `message`, optionally
/// transporting an SVT JWS as an unsigned attribute.
pub fn build_timestamp_token(
    tsa: &TestKey,
    message: &[u8],
    gen_time: DateTime,
    svt_jws: Option<&str>,
) -> Vec<u8> {
    let tst_info = TstInfo {
        version: TspVersion::V1,
        policy: der::asn1::ObjectIdentifier::new_unwrap("1.2.752.201.9.1"),
        message_imprint: MessageImprint {
            hash_algorithm: algorithm(OID_SHA256),
            hashed_message: OctetString::new(Sha256::digest(message).to_vec())
                .expect("imprint octets"),
        },
        serial_number: Int::new(&[0x07, 0x11]).expect("serial"),
        gen_time: GeneralizedTime::from_date_time(gen_time),
        accuracy: None,
        ordering: false,
        nonce: None,
        tsa: None,
        extensions: None,
    };
    let tst_der = tst_info.to_der().expect("TSTInfo DER");

    let message_digest = Sha256::digest(&tst_der).to_vec();
    let mut signed_attrs: SetOfVec<Attribute> = SetOfVec::new();
    signed_attrs
        .insert(attribute(OID_CONTENT_TYPE, any_from(&OID_TST_INFO)))
        .expect("contentType");
    signed_attrs
        .insert(attribute(
            OID_MESSAGE_DIGEST,
            any_from(&OctetString::new(message_digest).expect("digest octets")),
        ))
        .expect("messageDigest");

    let attrs_der = signed_attrs.to_der().expect("signed attrs DER");
    let signature = tsa.sign(&attrs_der);

    let mut unsigned_attrs = Vec::new();
    if let Some(jws) = svt_jws {
        let value = Utf8StringRef::new(jws).expect("SVT string");
        unsigned_attrs.push(attribute(OID_SVT_ATTRIBUTE, any_from(&value)));
    }

    build_signed_data(
        tsa,
        EncapsulatedContentInfo {
            econtent_type: OID_TST_INFO,
            econtent: Some(
                Any::from_der(
                    &OctetString::new(tst_der)
                        .expect("TSTInfo octets")
                        .to_der()
                        .expect("TSTInfo wrapper"),
                )
                .expect("eContent"),
            ),
        },
        signed_attrs,
        signature,
        unsigned_attrs,
    )
}

/// JWS signer over a [`TestKey`] (RS256).
pub struct TestJwsSigner {
    key: RsaPrivateKey,
    certificates: Vec<Certificate>,
}

impl TestJwsSigner {
    pub fn new(key: &TestKey) -> Self {
        Self {
            key: key.private_key.clone(),
            certificates: vec![key.certificate.clone()],
        }
    }
}

impl JwsSigner for TestJwsSigner {
    fn algorithm(&self) -> JwsAlgorithm {
        JwsAlgorithm::Rs256
    }

    fn sign(&self, signing_input: &[u8]) -> SigValResult<Vec<u8>> {
        let signing_key = SigningKey::<Sha256>::new(self.key.clone());
        Ok(signing_key.sign(signing_input).to_vec())
    }

    fn certificates(&self) -> &[Certificate] {
        &self.certificates
    }
}

/// Path validator that accepts every path and echoes the chain back.
pub struct AcceptingPathValidator;

impl CertificatePathValidator for AcceptingPathValidator {
    fn validate_path(
        &self,
        signer: &Certificate,
        chain: &[Certificate],
        _at: Option<u64>,
    ) -> SigValResult<CertValidationOutcome> {
        let mut path = vec![signer.clone()];
        for cert in chain {
            if cert != signer {
                path.push(cert.clone());
            }
        }
        Ok(CertValidationOutcome::passed(path))
    }
}

/// Path validator that rejects every path.
pub struct RejectingPathValidator;

impl CertificatePathValidator for RejectingPathValidator {
    fn validate_path(
        &self,
        _signer: &Certificate,
        _chain: &[Certificate],
        _at: Option<u64>,
    ) -> SigValResult<CertValidationOutcome> {
        Ok(CertValidationOutcome {
            validated_path: Vec::new(),
            conclusion: ValidationConclusion::Failed,
            message: Some("untrusted for test".to_string()),
        })
    }
}

pub mod pdf;
