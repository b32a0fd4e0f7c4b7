//! Synthetic PDF writer for validation tests.
//!
//! Produces classic-xref documents with incremental updates and real
//! byte-range signatures: the signature object is written with fixed-width
//! placeholders, the revision is closed, and the CMS structure is then
//! computed over the actual byte ranges and patched into the gap.

use der::DateTime;

use super::{build_cms_signature, build_timestamp_token, EssMode, TestKey};

/// Hex characters reserved for each `/Contents` gap.
const CONTENTS_HEX_LEN: usize = 16384;
const BYTE_RANGE_PLACEHOLDER: &str =
    "[0000000000 0000000000 0000000000 0000000000]";

pub struct SyntheticPdf {
    pub bytes: Vec<u8>,
    prev_xref_offset: Option<u64>,
}

/// Object offsets collected while writing one revision.
pub struct Revision {
    entries: Vec<(u32, u64)>,
}

/// Placeholder positions of a signature awaiting its CMS contents.
pub struct PendingSignature {
    byte_range_offset: usize,
    gap_start: usize,
    gap_end: usize,
}

impl SyntheticPdf {
    pub fn new() -> Self {
        Self {
            bytes: b"%PDF-1.7\n".to_vec(),
            prev_xref_offset: None,
        }
    }

    pub fn begin_revision(&mut self) -> Revision {
        Revision {
            entries: Vec::new(),
        }
    }

    /// Write one indirect object, recording its offset.
    pub fn add_object(&mut self, revision: &mut Revision, id: u32, body: &str) {
        let offset = self.bytes.len() as u64;
        revision.entries.push((id, offset));
        self.bytes
            .extend_from_slice(format!("{id} 0 obj\n{body}\nendobj\n").as_bytes());
    }

    /// Write a signature dictionary with placeholder `/ByteRange` and
    /// `/Contents`, to be finalized after the revision is closed.
    pub fn add_signature_object(
        &mut self,
        revision: &mut Revision,
        id: u32,
        sub_filter: &str,
    ) -> PendingSignature {
        let offset = self.bytes.len() as u64;
        revision.entries.push((id, offset));

        self.bytes
            .extend_from_slice(format!("{id} 0 obj\n<< /Type /Sig /Filter /Adobe.PPKLite /SubFilter /{sub_filter} /ByteRange ").as_bytes());
        let byte_range_offset = self.bytes.len();
        self.bytes.extend_from_slice(BYTE_RANGE_PLACEHOLDER.as_bytes());
        self.bytes.extend_from_slice(b" /Contents ");
        let gap_start = self.bytes.len();
        self.bytes.push(b'<');
        self.bytes.extend(std::iter::repeat(b'0').take(CONTENTS_HEX_LEN));
        self.bytes.push(b'>');
        let gap_end = self.bytes.len();
        self.bytes.extend_from_slice(b" >>\nendobj\n");

        PendingSignature {
            byte_range_offset,
            gap_start,
            gap_end,
        }
    }

    /// Close the revision: xref table, trailer, startxref, `%%EOF`.
    pub fn end_revision(&mut self, revision: Revision, root_id: u32, size: u32) {
        let xref_offset = self.bytes.len() as u64;
        let mut entries = revision.entries;
        entries.sort_by_key(|(id, _)| *id);

        self.bytes.extend_from_slice(b"xref\n");
        if self.prev_xref_offset.is_none() {
            // The first revision carries the object 0 free-list head.
            self.bytes.extend_from_slice(b"0 1\n");
            self.bytes.extend_from_slice(b"0000000000 65535 f \n");
        }
        let mut index = 0;
        while index < entries.len() {
            let run_start = index;
            while index + 1 < entries.len() && entries[index + 1].0 == entries[index].0 + 1 {
                index += 1;
            }
            index += 1;
            let run = &entries[run_start..index];
            self.bytes
                .extend_from_slice(format!("{} {}\n", run[0].0, run.len()).as_bytes());
            for (_, offset) in run {
                self.bytes
                    .extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
            }
        }

        self.bytes.extend_from_slice(b"trailer\n");
        match self.prev_xref_offset {
            Some(prev) => self.bytes.extend_from_slice(
                format!("<< /Size {size} /Root {root_id} 0 R /Prev {prev} >>\n").as_bytes(),
            ),
            None => self
                .bytes
                .extend_from_slice(format!("<< /Size {size} /Root {root_id} 0 R >>\n").as_bytes()),
        }
        self.bytes
            .extend_from_slice(format!("startxref\n{xref_offset}\n%%EOF\n").as_bytes());
        self.prev_xref_offset = Some(xref_offset);
    }

    /// Patch the byte range and produce the signature contents over the
    /// actual signed bytes. Must run directly after `end_revision` so the
    /// revision end is the current document end.
    pub fn finalize_signature<F>(&mut self, pending: &PendingSignature, build_contents: F)
    where
        F: FnOnce(&[u8]) -> Vec<u8>,
    {
        let revision_len = self.bytes.len();
        let byte_range = format!(
            "[{:010} {:010} {:010} {:010}]",
            0,
            pending.gap_start,
            pending.gap_end,
            revision_len - pending.gap_end
        );
        assert_eq!(byte_range.len(), BYTE_RANGE_PLACEHOLDER.len());
        self.bytes[pending.byte_range_offset..pending.byte_range_offset + byte_range.len()]
            .copy_from_slice(byte_range.as_bytes());

        let mut signed_bytes = Vec::with_capacity(revision_len);
        signed_bytes.extend_from_slice(&self.bytes[..pending.gap_start]);
        signed_bytes.extend_from_slice(&self.bytes[pending.gap_end..revision_len]);

        let contents = build_contents(&signed_bytes);
        let hex_contents = hex::encode(&contents);
        assert!(
            hex_contents.len() <= CONTENTS_HEX_LEN,
            "signature of {} hex chars exceeds the reserved gap",
            hex_contents.len()
        );
        let hex_start = pending.gap_start + 1;
        self.bytes[hex_start..hex_start + hex_contents.len()]
            .copy_from_slice(hex_contents.as_bytes());
    }
}

const CATALOG_WITH_ACROFORM: &str =
    "<< /Type /Catalog /Pages 2 0 R /AcroForm << /Fields [4 0 R] /SigFlags 3 >> >>";
const CATALOG_PLAIN: &str = "<< /Type /Catalog /Pages 2 0 R >>";

/// One content signature in a single-revision document. The catalog carries
/// the AcroForm inline so later rewrites compare equal by presence.
pub fn single_signature_pdf(key: &TestKey, ess_mode: EssMode) -> SyntheticPdf {
    single_signature_pdf_with_catalog(key, ess_mode, CATALOG_WITH_ACROFORM)
}

/// Same, but the first revision's catalog has no AcroForm entry; the entry
/// is expected to arrive in a later revision.
pub fn single_signature_pdf_without_acroform(key: &TestKey, ess_mode: EssMode) -> SyntheticPdf {
    single_signature_pdf_with_catalog(key, ess_mode, CATALOG_PLAIN)
}

fn single_signature_pdf_with_catalog(
    key: &TestKey,
    ess_mode: EssMode,
    catalog: &str,
) -> SyntheticPdf {
    let mut pdf = SyntheticPdf::new();
    let mut revision = pdf.begin_revision();
    pdf.add_object(&mut revision, 1, catalog);
    pdf.add_object(&mut revision, 2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    pdf.add_object(
        &mut revision,
        3,
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>",
    );
    pdf.add_object(
        &mut revision,
        4,
        "<< /FT /Sig /T (Sig1) /V 5 0 R /Type /Annot /Subtype /Widget /Rect [0 0 0 0] /P 3 0 R >>",
    );
    let pending = pdf.add_signature_object(&mut revision, 5, "ETSI.CAdES.detached");
    pdf.end_revision(revision, 1, 6);
    pdf.finalize_signature(&pending, |signed_bytes| {
        build_cms_signature(key, signed_bytes, ess_mode, None, Vec::new())
    });
    pdf
}

/// Incremental update adding only a `/DSS` store to the catalog.
pub fn append_dss_revision(pdf: &mut SyntheticPdf) {
    let mut revision = pdf.begin_revision();
    pdf.add_object(
        &mut revision,
        1,
        "<< /Type /Catalog /Pages 2 0 R /AcroForm << /Fields [4 0 R] /SigFlags 3 >> /DSS 9 0 R >>",
    );
    pdf.add_object(&mut revision, 9, "<< /Certs [] /OCSPs [] /CRLs [] >>");
    pdf.end_revision(revision, 1, 10);
}

/// Incremental update replacing the page tree: root `/Pages` now points at a
/// new object. An appearance-changing, unsafe update.
pub fn append_page_revision(pdf: &mut SyntheticPdf) {
    let mut revision = pdf.begin_revision();
    pdf.add_object(
        &mut revision,
        1,
        "<< /Type /Catalog /Pages 11 0 R /AcroForm << /Fields [4 0 R] /SigFlags 3 >> >>",
    );
    pdf.add_object(
        &mut revision,
        10,
        "<< /Type /Page /Parent 11 0 R /MediaBox [0 0 612 792] >>",
    );
    pdf.add_object(
        &mut revision,
        11,
        "<< /Type /Pages /Kids [3 0 R 10 0 R] /Count 2 >>",
    );
    pdf.end_revision(revision, 1, 12);
}

/// Incremental update adding a second content signature whose catalog
/// rewrite introduces the `/AcroForm` entry.
pub fn append_signature_revision_adding_acroform(pdf: &mut SyntheticPdf, key: &TestKey) {
    let mut revision = pdf.begin_revision();
    pdf.add_object(
        &mut revision,
        1,
        "<< /Type /Catalog /Pages 2 0 R /AcroForm << /Fields [4 0 R 14 0 R] /SigFlags 3 >> >>",
    );
    pdf.add_object(
        &mut revision,
        14,
        "<< /FT /Sig /T (Sig2) /V 15 0 R /Type /Annot /Subtype /Widget /Rect [0 0 0 0] /P 3 0 R >>",
    );
    let pending = pdf.add_signature_object(&mut revision, 15, "ETSI.CAdES.detached");
    pdf.end_revision(revision, 1, 16);
    pdf.finalize_signature(&pending, |signed_bytes| {
        build_cms_signature(key, signed_bytes, EssMode::V2Default, None, Vec::new())
    });
}

/// Incremental update adding a document timestamp, optionally transporting
/// an SVT JWS.
pub fn append_doc_timestamp_revision(
    pdf: &mut SyntheticPdf,
    tsa: &TestKey,
    svt_jws: Option<String>,
) {
    let mut revision = pdf.begin_revision();
    pdf.add_object(
        &mut revision,
        1,
        "<< /Type /Catalog /Pages 2 0 R /AcroForm << /Fields [4 0 R 20 0 R] /SigFlags 3 >> >>",
    );
    pdf.add_object(
        &mut revision,
        20,
        "<< /FT /Sig /T (DocTs) /V 21 0 R /Type /Annot /Subtype /Widget /Rect [0 0 0 0] /P 3 0 R >>",
    );
    let pending = pdf.add_signature_object(&mut revision, 21, "ETSI.RFC3161");
    pdf.end_revision(revision, 1, 22);
    pdf.finalize_signature(&pending, |signed_bytes| {
        build_timestamp_token(
            tsa,
            signed_bytes,
            DateTime::new(2024, 6, 1, 12, 0, 0).expect("gen time"),
            svt_jws.as_deref(),
        )
    });
}
