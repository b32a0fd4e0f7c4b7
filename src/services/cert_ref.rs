//! Certificate reference encoding for SVT claims.
//!
//! Emits the compact `chain_hash` form whenever the validated path is
//! contained in the certificates the signature already carries; the full
//! `chain` form is needed only when the validator used a path the document
//! did not embed.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use der::Encode;
use x509_cert::Certificate;

use crate::domain::algorithms::DigestAlgorithm;
use crate::domain::claims::{CertRefType, CertReferenceClaims};
use crate::infra::error::{SigValError, SigValResult};

/// Build the `cert_ref` claim for one signature.
///
/// * `signer` - the signer certificate
/// * `signature_chain` - certificates carried in the signature
/// * `validated_path` - path from the external validator, leaf to anchor
/// * `digest` - hash algorithm implied by the SVT signing algorithm
pub fn encode_cert_ref(
    signer: &Certificate,
    signature_chain: &[Certificate],
    validated_path: &[Certificate],
    digest: DigestAlgorithm,
) -> SigValResult<CertReferenceClaims> {
    let chain_der = encode_all(signature_chain)?;
    let path_der = encode_all(validated_path)?;

    if !validated_path.is_empty() && !is_path_contained(&path_der, &chain_der) {
        // The validator used a path the document does not embed; it must be
        // carried in full for the SVT to be reconstructable.
        let reference = path_der.iter().map(|der| BASE64.encode(der)).collect();
        return Ok(CertReferenceClaims {
            ref_type: CertRefType::Chain,
            reference,
        });
    }

    let signer_der = signer
        .to_der()
        .map_err(|e| SigValError::SvtParse(format!("signer certificate encoding: {e}")))?;
    let signer_hash = BASE64.encode(digest.digest(&signer_der));

    if signature_chain.len() < 2 {
        return Ok(CertReferenceClaims {
            ref_type: CertRefType::ChainHash,
            reference: vec![signer_hash],
        });
    }

    let mut concatenated = Vec::new();
    for der in &chain_der {
        concatenated.extend_from_slice(der);
    }
    let chain_hash = BASE64.encode(digest.digest(&concatenated));
    Ok(CertReferenceClaims {
        ref_type: CertRefType::ChainHash,
        reference: vec![signer_hash, chain_hash],
    })
}

fn encode_all(certificates: &[Certificate]) -> SigValResult<Vec<Vec<u8>>> {
    certificates
        .iter()
        .map(|cert| {
            cert.to_der()
                .map_err(|e| SigValError::SvtParse(format!("certificate encoding: {e}")))
        })
        .collect()
}

/// Set containment on DER bytes: every validated certificate must appear in
/// the signature chain.
fn is_path_contained(path_der: &[Vec<u8>], chain_der: &[Vec<u8>]) -> bool {
    if path_der.is_empty() {
        return false;
    }
    path_der.iter().all(|cert| chain_der.contains(cert))
}
