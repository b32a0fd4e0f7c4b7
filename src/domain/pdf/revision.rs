//! Revision records produced by incremental-update analysis.

use std::collections::BTreeMap;

use lopdf::Dictionary;

/// Key of an indirect object: object number and generation.
pub type ObjectKey = (u32, u16);

/// One incremental-update segment of a PDF document.
///
/// Discovered backwards from the end of the file, then populated with xref
/// and root deltas in forward order. Immutable once analysis completes.
#[derive(Debug, Clone, Default)]
pub struct PdfDocRevision {
    /// Byte offset to the exclusive end of this revision
    pub length: usize,
    /// A signature byte range ends exactly at this revision
    pub is_signature: bool,
    /// That signature is a document timestamp (`ETSI.RFC3161`)
    pub is_doc_timestamp: bool,

    /// Cross-reference table of the document prefix up to `length`
    pub xref_table: BTreeMap<ObjectKey, u64>,
    /// Object number of the catalog
    pub root_object_id: u32,
    /// The catalog dictionary; `None` when the root object is not a dictionary
    pub root_object: Option<Dictionary>,

    /// Keys present in this and the prior revision at different offsets
    pub changed_xref: Vec<ObjectKey>,
    /// Keys absent from the prior revision
    pub added_xref: Vec<ObjectKey>,
    /// The catalog is among the changed keys
    pub root_update: bool,
    /// A non-catalog object is among the changed keys
    pub non_root_update: bool,

    /// The catalog is a dictionary whose pre-existing entries are all comparable
    pub legal_root_object: bool,
    /// Names of catalog entries whose values differ from the prior revision
    pub changed_root_items: Vec<Vec<u8>>,
    /// Names of catalog entries absent from the prior revision
    pub added_root_items: Vec<Vec<u8>>,

    /// Revision adds exactly a `/DSS` store and nothing else
    pub valid_dss: bool,
    /// Revision cannot change the visible document (see analyzer rules)
    pub safe_update: bool,
}

impl PdfDocRevision {
    /// Name-set helper for classification tests.
    #[must_use]
    pub fn added_root_names(&self) -> Vec<&[u8]> {
        self.added_root_items.iter().map(Vec::as_slice).collect()
    }
}
