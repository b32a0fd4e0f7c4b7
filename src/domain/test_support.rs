//! Shared fixtures for unit tests.

use std::str::FromStr;

use der::asn1::{BitString, UtcTime};
use der::DateTime;
use x509_cert::certificate::{Certificate, TbsCertificate, Version};
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::time::{Time, Validity};

use crate::domain::algorithms::{OID_RSA_ENCRYPTION, OID_SHA256_WITH_RSA};

/// A structurally complete certificate whose key and signature are inert.
/// For tests that carry certificates around without verifying them.
pub(crate) fn placeholder_certificate() -> Certificate {
    let name = Name::from_str("CN=Placeholder").expect("test subject DN");
    let algorithm = AlgorithmIdentifierOwned {
        oid: OID_SHA256_WITH_RSA,
        parameters: None,
    };
    let not_before = Time::UtcTime(
        UtcTime::from_date_time(DateTime::new(2020, 1, 1, 0, 0, 0).expect("date")).expect("time"),
    );
    let not_after = Time::UtcTime(
        UtcTime::from_date_time(DateTime::new(2035, 1, 1, 0, 0, 0).expect("date")).expect("time"),
    );

    let tbs_certificate = TbsCertificate {
        version: Version::V3,
        serial_number: SerialNumber::new(&[1]).expect("serial"),
        signature: algorithm.clone(),
        issuer: name.clone(),
        validity: Validity {
            not_before,
            not_after,
        },
        subject: name,
        subject_public_key_info: SubjectPublicKeyInfoOwned {
            algorithm: AlgorithmIdentifierOwned {
                oid: OID_RSA_ENCRYPTION,
                parameters: None,
            },
            subject_public_key: BitString::from_bytes(&[0x30, 0x06, 0x02, 0x01, 0x03, 0x02, 0x01,
                0x03])
            .expect("key bits"),
        },
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: None,
    };

    Certificate {
        tbs_certificate,
        signature_algorithm: algorithm,
        signature: BitString::from_bytes(&[0u8; 4]).expect("signature bits"),
    }
}
