//! Document-level result reduction.

use crate::domain::result::{
    DocumentValidationResult, DocumentVerdict, SignatureValidationResult,
};

/// Combine per-signature results into a document verdict.
#[must_use]
pub fn aggregate(results: Vec<SignatureValidationResult>) -> DocumentValidationResult {
    if results.is_empty() {
        return DocumentValidationResult {
            signed: false,
            signature_count: 0,
            valid_signature_count: 0,
            verdict: DocumentVerdict::NoSignatures,
            status_message: "No signatures".to_string(),
            results,
        };
    }

    let signature_count = results.len();
    let valid_signature_count = results.iter().filter(|result| result.success).count();

    let (verdict, status_message) = if valid_signature_count == 0 {
        (DocumentVerdict::NoneValid, "No valid signatures".to_string())
    } else if valid_signature_count == signature_count {
        (DocumentVerdict::Ok, "OK".to_string())
    } else {
        (
            DocumentVerdict::SomeInvalid,
            "Some signatures are valid and some are invalid".to_string(),
        )
    };

    DocumentValidationResult {
        signed: true,
        signature_count,
        valid_signature_count,
        verdict,
        status_message,
        results,
    }
}
