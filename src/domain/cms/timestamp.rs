//! RFC 3161 timestamp token model.
//!
//! A token is a CMS `SignedData` whose encapsulated content is a `TSTInfo`.
//! Document timestamps additionally transport an SVT JWS as an unsigned
//! attribute of the token's `SignerInfo`.

use cms::cert::CertificateChoices;
use cms::content_info::ContentInfo;
use cms::signed_data::SignedData;
use der::asn1::{OctetString, Utf8StringRef};
use der::{Decode, Encode};
use x509_cert::Certificate;
use x509_tsp::TstInfo;

use crate::domain::algorithms::{DigestAlgorithm, OID_SIGNED_DATA, OID_SVT_ATTRIBUTE, OID_TST_INFO};
use crate::infra::error::{SigValError, SigValResult};

/// A parsed RFC 3161 timestamp token.
#[derive(Debug, Clone)]
pub struct TimestampToken {
    /// Complete token DER (`ContentInfo`)
    der: Vec<u8>,
    /// Timestamp genTime, epoch seconds
    pub gen_time: u64,
    /// TSTInfo serial number, lowercase hex
    pub serial_hex: String,
    /// Digest algorithm of the message imprint
    pub imprint_digest: DigestAlgorithm,
    /// The imprinted digest value
    pub imprint_value: Vec<u8>,
    /// TSA policy OID as text
    pub policy: String,
    /// Certificates carried in the token
    pub certificates: Vec<Certificate>,
    /// SVT JWS transported in the token's unsigned attributes, if any
    pub svt_jws: Option<String>,
}

impl TimestampToken {
    /// Parse a timestamp token from its DER `ContentInfo` encoding. Trailing
    /// zero padding from a PDF `/Contents` gap is tolerated.
    pub fn from_der(token_der: &[u8]) -> SigValResult<Self> {
        let token_der = super::trim_der(token_der)
            .map_err(|e| SigValError::TimestampVerify(e.to_string()))?;
        let content_info = ContentInfo::from_der(token_der)
            .map_err(|e| SigValError::TimestampVerify(format!("token ContentInfo: {e}")))?;
        if content_info.content_type != OID_SIGNED_DATA {
            return Err(SigValError::TimestampVerify(format!(
                "token content type {} is not SignedData",
                content_info.content_type
            )));
        }
        let signed_data = content_info
            .content
            .decode_as::<SignedData>()
            .map_err(|e| SigValError::TimestampVerify(format!("token SignedData: {e}")))?;

        if signed_data.encap_content_info.econtent_type != OID_TST_INFO {
            return Err(SigValError::TimestampVerify(format!(
                "encapsulated content {} is not TSTInfo",
                signed_data.encap_content_info.econtent_type
            )));
        }
        let econtent = signed_data
            .encap_content_info
            .econtent
            .as_ref()
            .ok_or_else(|| SigValError::TimestampVerify("token without TSTInfo".to_string()))?;
        let tst_bytes = econtent
            .decode_as::<OctetString>()
            .map_err(|e| SigValError::TimestampVerify(format!("TSTInfo wrapper: {e}")))?;
        let tst_info = TstInfo::from_der(tst_bytes.as_bytes())
            .map_err(|e| SigValError::TimestampVerify(format!("TSTInfo: {e}")))?;

        let imprint_digest =
            DigestAlgorithm::from_oid(&tst_info.message_imprint.hash_algorithm.oid)?;
        let gen_time = tst_info.gen_time.to_unix_duration().as_secs();

        let certificates = extract_certificates(&signed_data);
        let svt_jws = extract_svt_attribute(&signed_data)?;

        Ok(Self {
            der: token_der.to_vec(),
            gen_time,
            serial_hex: hex::encode(tst_info.serial_number.as_bytes()),
            imprint_digest,
            imprint_value: tst_info.message_imprint.hashed_message.as_bytes().to_vec(),
            policy: tst_info.policy.to_string(),
            certificates,
            svt_jws,
        })
    }

    #[must_use]
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    /// True when the token imprints exactly the digest of `message`.
    #[must_use]
    pub fn matches_imprint(&self, message: &[u8]) -> bool {
        self.imprint_digest.digest(message) == self.imprint_value
    }
}

fn extract_certificates(signed_data: &SignedData) -> Vec<Certificate> {
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

fn extract_svt_attribute(signed_data: &SignedData) -> SigValResult<Option<String>> {
    let Some(signer_info) = signed_data.signer_infos.0.iter().next() else {
        return Ok(None);
    };
    let Some(unsigned) = signer_info.unsigned_attrs.as_ref() else {
        return Ok(None);
    };
    for attr in unsigned.iter() {
        if attr.oid != OID_SVT_ATTRIBUTE {
            continue;
        }
        let value = attr.values.iter().next().ok_or_else(|| {
            SigValError::SvtParse("SVT attribute without value".to_string())
        })?;
        let jws = value
            .decode_as::<Utf8StringRef<'_>>()
            .map_err(|e| SigValError::SvtParse(format!("SVT attribute value: {e}")))?;
        return Ok(Some(jws.as_str().to_string()));
    }
    Ok(None)
}

/// Encode an SVT JWS string as the unsigned-attribute value used in
/// document timestamps. The inverse of [`extract_svt_attribute`]; mainly
/// for tests and token assembly tooling.
pub fn encode_svt_attribute_value(jws: &str) -> SigValResult<Vec<u8>> {
    let value = Utf8StringRef::new(jws)
        .map_err(|e| SigValError::SvtParse(format!("SVT attribute encoding: {e}")))?;
    value
        .to_der()
        .map_err(|e| SigValError::SvtParse(format!("SVT attribute encoding: {e}")))
}
