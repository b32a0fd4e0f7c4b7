//! PDF revision analysis.
//!
//! Reconstructs every incremental-update revision of a document, diffs
//! cross-reference tables and the catalog across revisions, and classifies
//! each post-signature update as safe or unsafe. The safe/unsafe decision is
//! what turns "the byte range verifies" into "the signature still
//! authenticates the document you are looking at".

use lopdf::{Document, Object};

use crate::domain::pdf::object_value::ObjectValue;
use crate::domain::pdf::revision::{ObjectKey, PdfDocRevision};
use crate::domain::pdf::signature::{PdfSignature, SignatureKind};
use crate::infra::error::{SigValError, SigValResult};

const EOF_MARKER: &[u8] = b"%%EOF";
const DSS_NAME: &[u8] = b"DSS";
const ACRO_FORM_NAME: &[u8] = b"AcroForm";

/// Immutable revision analysis of one document.
pub struct RevisionAnalyzer {
    revisions: Vec<PdfDocRevision>,
}

impl RevisionAnalyzer {
    /// Analyze `pdf_bytes`, classifying revisions against `signatures`.
    pub fn analyze(pdf_bytes: &[u8], signatures: &[PdfSignature]) -> SigValResult<Self> {
        let discovered = discover_revisions(pdf_bytes, signatures);
        if discovered.is_empty() {
            return Err(SigValError::BadPdf("no %%EOF marker found".to_string()));
        }

        // Re-parse each prefix as a complete document. Prefixes that fail to
        // parse are not revisions of their own and are dropped.
        let mut revisions: Vec<PdfDocRevision> = Vec::with_capacity(discovered.len());
        for mut revision in discovered {
            match parse_revision_prefix(pdf_bytes, &mut revision) {
                Ok(()) => revisions.push(revision),
                Err(e) => {
                    log::debug!(
                        "discarding unparsable revision prefix of {} bytes: {e}",
                        revision.length
                    );
                }
            }
        }
        if revisions.is_empty() {
            return Err(SigValError::BadPdf(
                "no parsable document revision".to_string(),
            ));
        }

        revisions.sort_by_key(|revision| revision.length);

        for index in 0..revisions.len() {
            let (prior, current) = revisions.split_at_mut(index);
            compute_deltas(&mut current[0], prior.last());
        }

        Ok(Self { revisions })
    }

    #[must_use]
    pub fn revisions(&self) -> &[PdfDocRevision] {
        &self.revisions
    }

    /// Index of the revision in which `signature` was applied.
    #[must_use]
    pub fn signature_revision_index(&self, signature: &PdfSignature) -> Option<usize> {
        let coverage = signature.coverage_end();
        self.revisions
            .iter()
            .position(|revision| revision.length == coverage)
    }

    /// Whether `signature` still authenticates the whole visible document:
    /// it is the last revision, or every later revision is a safe update.
    pub fn covers_document(&self, signature: &PdfSignature) -> SigValResult<bool> {
        let index = self.signature_revision_index(signature).ok_or_else(|| {
            SigValError::InternalInvariant(
                "signature byte range matches no discovered revision".to_string(),
            )
        })?;
        Ok(self.revisions[index + 1..]
            .iter()
            .all(|revision| revision.safe_update))
    }

    /// The document bytes as they were before `signature` was applied.
    pub fn signed_document<'a>(
        &self,
        signature: &PdfSignature,
        pdf_bytes: &'a [u8],
    ) -> SigValResult<&'a [u8]> {
        let index = self.signature_revision_index(signature).ok_or_else(|| {
            SigValError::InternalInvariant(
                "signature byte range matches no discovered revision".to_string(),
            )
        })?;
        if index == 0 {
            return Err(SigValError::BadPdf(
                "no revision exists before the signature was added".to_string(),
            ));
        }
        let length = self.revisions[index - 1].length;
        pdf_bytes.get(..length).ok_or_else(|| {
            SigValError::Io(format!(
                "revision length {length} beyond document length {}",
                pdf_bytes.len()
            ))
        })
    }
}

/// Backwards `%%EOF` scan. Each marker (plus its trailing newline) closes one
/// revision; scanning continues strictly before the marker just found.
fn discover_revisions(pdf_bytes: &[u8], signatures: &[PdfSignature]) -> Vec<PdfDocRevision> {
    let mut discovered = Vec::new();
    let mut scan_end = pdf_bytes.len();

    while let Some(marker_index) = find_last_eof(&pdf_bytes[..scan_end]) {
        let mut length = marker_index + EOF_MARKER.len();
        let first = pdf_bytes.get(length).copied().unwrap_or(0);
        let second = pdf_bytes.get(length + 1).copied().unwrap_or(0);
        if first == b'\n' {
            length += 1;
        } else if first == b'\r' && second == b'\n' {
            length += 2;
        }

        let mut revision = PdfDocRevision {
            length,
            ..PdfDocRevision::default()
        };
        for signature in signatures {
            if signature.coverage_end() == length {
                revision.is_signature = true;
                revision.is_doc_timestamp = signature.kind() == SignatureKind::DocTimestamp;
            }
        }
        discovered.push(revision);
        scan_end = marker_index;
    }

    discovered
}

fn find_last_eof(haystack: &[u8]) -> Option<usize> {
    if haystack.len() < EOF_MARKER.len() {
        return None;
    }
    haystack
        .windows(EOF_MARKER.len())
        .rposition(|window| window == EOF_MARKER)
}

fn parse_revision_prefix(pdf_bytes: &[u8], revision: &mut PdfDocRevision) -> SigValResult<()> {
    let doc = Document::load_mem(&pdf_bytes[..revision.length])?;

    let root_id = match doc.trailer.get(b"Root") {
        Ok(Object::Reference(id)) => *id,
        _ => {
            return Err(SigValError::BadPdf(
                "trailer without /Root reference".to_string(),
            ))
        }
    };
    revision.root_object_id = root_id.0;
    revision.root_object = match doc.get_object(root_id) {
        Ok(Object::Dictionary(dict)) => Some(dict.clone()),
        Ok(_) => None,
        Err(e) => return Err(SigValError::BadPdf(format!("unresolvable /Root: {e}"))),
    };

    revision.xref_table = doc
        .reference_table
        .entries
        .iter()
        .filter_map(|(&number, entry)| match entry {
            lopdf::xref::XrefEntry::Normal { offset, generation } => {
                Some(((number, *generation), u64::from(*offset)))
            }
            // Compressed entries have no byte offset; key them by container
            // and index so relocation between revisions is still detected.
            lopdf::xref::XrefEntry::Compressed { container, index } => {
                Some(((number, 0), (u64::from(*container) << 32) | u64::from(*index)))
            }
            _ => None,
        })
        .collect();

    Ok(())
}

fn compute_deltas(revision: &mut PdfDocRevision, prior: Option<&PdfDocRevision>) {
    revision.legal_root_object = true;
    revision.root_update = false;
    revision.non_root_update = false;

    let empty = std::collections::BTreeMap::new();
    let last_table = prior.map_or(&empty, |p| &p.xref_table);

    let mut changed: Vec<ObjectKey> = Vec::new();
    let mut added: Vec<ObjectKey> = Vec::new();
    for (key, offset) in &revision.xref_table {
        match last_table.get(key) {
            Some(last_offset) if last_offset != offset => changed.push(*key),
            Some(_) => {}
            None => added.push(*key),
        }
    }

    for key in &changed {
        if key.0 == revision.root_object_id {
            revision.root_update = true;
        } else {
            revision.non_root_update = true;
        }
    }
    revision.changed_xref = changed;
    revision.added_xref = added;

    let mut changed_root_items: Vec<Vec<u8>> = Vec::new();
    let mut added_root_items: Vec<Vec<u8>> = Vec::new();
    if revision.root_update {
        match (&revision.root_object, prior.and_then(|p| p.root_object.as_ref())) {
            (Some(root), Some(last_root)) => {
                for (key, value) in root.iter() {
                    match last_root.get(key) {
                        Ok(last_value) => {
                            let last = ObjectValue::from(last_value);
                            if last.is_other() {
                                revision.legal_root_object = false;
                            } else if !ObjectValue::from(value).matches(&last) {
                                changed_root_items.push(key.clone());
                            }
                        }
                        Err(_) => added_root_items.push(key.clone()),
                    }
                }
            }
            _ => revision.legal_root_object = false,
        }
    }
    revision.changed_root_items = changed_root_items;
    revision.added_root_items = added_root_items;

    revision.valid_dss = revision.root_update
        && !revision.non_root_update
        && revision.legal_root_object
        && revision.changed_root_items.is_empty()
        && revision.added_root_items.len() == 1
        && revision.added_root_items[0] == DSS_NAME;

    let non_dss_or_acroform = revision
        .added_root_items
        .iter()
        .any(|name| name != DSS_NAME && name != ACRO_FORM_NAME);

    revision.safe_update = !revision.non_root_update
        && revision.legal_root_object
        && revision.changed_root_items.is_empty()
        && (revision.is_signature || revision.is_doc_timestamp || revision.valid_dss)
        && !non_dss_or_acroform;
}
