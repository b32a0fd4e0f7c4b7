//! Signature dictionary model and extraction.

use lopdf::{Dictionary, Document, Object};

use crate::infra::error::{SigValError, SigValResult};

/// Subfilter value marking a document timestamp.
pub const SUBFILTER_ETSI_RFC3161: &str = "ETSI.RFC3161";
/// Subfilter value of a PAdES detached CMS signature.
pub const SUBFILTER_ETSI_CADES: &str = "ETSI.CAdES.detached";

/// Coarse classification of a signature dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureKind {
    /// Content signature over the document
    Content,
    /// RFC 3161 document timestamp
    DocTimestamp,
}

/// One signature dictionary with the fields validation needs.
#[derive(Debug, Clone)]
pub struct PdfSignature {
    /// Object id of the signature dictionary
    pub object_id: (u32, u16),
    /// `/SubFilter` name
    pub sub_filter: String,
    /// `/ByteRange` as `[offset1, len1, offset2, len2]`
    pub byte_range: [i64; 4],
    /// DER CMS `ContentInfo` from `/Contents`
    pub contents: Vec<u8>,
    /// `/M` dictionary date, epoch milliseconds
    pub dictionary_signing_time: Option<i64>,
}

impl PdfSignature {
    #[must_use]
    pub fn kind(&self) -> SignatureKind {
        if self.sub_filter == SUBFILTER_ETSI_RFC3161 {
            SignatureKind::DocTimestamp
        } else {
            SignatureKind::Content
        }
    }

    /// Exclusive end of the bytes this signature covers.
    #[must_use]
    pub fn coverage_end(&self) -> usize {
        (self.byte_range[2] + self.byte_range[3]) as usize
    }

    /// The bytes covered by the byte range, with the `/Contents` gap removed.
    pub fn signed_bytes(&self, pdf_bytes: &[u8]) -> SigValResult<Vec<u8>> {
        let [start, len1, offset2, len2] = self.byte_range;
        if start != 0 {
            return Err(SigValError::BadPdf(
                "signature byte range does not start at offset 0".to_string(),
            ));
        }
        if len1 < 0 || offset2 < len1 || len2 < 0 {
            return Err(SigValError::BadPdf("malformed signature byte range".to_string()));
        }
        let end = (offset2 + len2) as usize;
        if end > pdf_bytes.len() {
            return Err(SigValError::Io(format!(
                "signature byte range ends at {end} beyond document length {}",
                pdf_bytes.len()
            )));
        }

        let mut signed = Vec::with_capacity((len1 + len2) as usize);
        signed.extend_from_slice(&pdf_bytes[0..len1 as usize]);
        signed.extend_from_slice(&pdf_bytes[offset2 as usize..end]);
        Ok(signed)
    }

    /// Cross-check that the byte-range gap holds exactly the hex encoding of
    /// `/Contents`.
    pub fn check_contents_gap(&self, pdf_bytes: &[u8]) -> SigValResult<()> {
        let gap_start = self.byte_range[1] as usize;
        let gap_end = self.byte_range[2] as usize;
        if gap_end > pdf_bytes.len() || gap_start >= gap_end {
            return Err(SigValError::BadPdf("signature gap out of bounds".to_string()));
        }
        let decoded = decode_pdf_hex_string(&pdf_bytes[gap_start..gap_end]).ok_or_else(|| {
            SigValError::BadPdf("signature gap is not a hex string".to_string())
        })?;
        if decoded != self.contents {
            return Err(SigValError::BadPdf(
                "signature gap does not match /Contents".to_string(),
            ));
        }
        Ok(())
    }
}

/// List the signature dictionaries of `doc` in document order.
///
/// Walks the AcroForm field tree collecting `/FT /Sig` fields with a filled
/// `/V` dictionary.
pub fn list_signatures(doc: &Document) -> SigValResult<Vec<PdfSignature>> {
    let catalog = doc
        .catalog()
        .map_err(|e| SigValError::BadPdf(format!("missing catalog: {e}")))?;

    let acro_form = match doc.get_dict_in_dict(catalog, b"AcroForm") {
        Ok(dict) => dict,
        Err(_) => return Ok(Vec::new()),
    };

    let fields = match acro_form.get_deref(b"Fields", doc) {
        Ok(fields) => fields
            .as_array()
            .map_err(|e| SigValError::BadPdf(format!("AcroForm fields: {e}")))?,
        Err(_) => return Ok(Vec::new()),
    };

    let mut signatures = Vec::new();
    for field in fields {
        let (_, field_obj) = doc
            .dereference(field)
            .map_err(|e| SigValError::BadPdf(format!("field reference: {e}")))?;
        let field_dict = match field_obj.as_dict() {
            Ok(dict) => dict,
            Err(_) => continue,
        };
        if !is_signature_field(field_dict) {
            continue;
        }
        let value = match field_dict.get(b"V") {
            Ok(value) => value,
            Err(_) => continue,
        };
        signatures.push(parse_signature_dictionary(doc, value)?);
    }

    // Byte ranges grow with each incremental signature; sort into creation order.
    signatures.sort_by_key(PdfSignature::coverage_end);
    Ok(signatures)
}

fn is_signature_field(field: &Dictionary) -> bool {
    matches!(field.get(b"FT"), Ok(Object::Name(ft)) if ft == b"Sig")
}

fn parse_signature_dictionary(doc: &Document, reference: &Object) -> SigValResult<PdfSignature> {
    let (object_id, object) = doc
        .dereference(reference)
        .map_err(|e| SigValError::BadPdf(format!("signature reference: {e}")))?;
    let object_id =
        object_id.ok_or_else(|| SigValError::BadPdf("signature must be indirect".to_string()))?;
    let dict = object
        .as_dict()
        .map_err(|_| SigValError::BadPdf("signature value is not a dictionary".to_string()))?;

    let mut byte_range = [0i64; 4];
    let range_array = dict
        .get_deref(b"ByteRange", doc)
        .map_err(|e| SigValError::BadPdf(format!("missing ByteRange: {e}")))?
        .as_array()
        .map_err(|_| SigValError::BadPdf("ByteRange is not an array".to_string()))?;
    if range_array.len() != 4 {
        return Err(SigValError::BadPdf(format!(
            "ByteRange has {} entries, expected 4",
            range_array.len()
        )));
    }
    for (slot, entry) in byte_range.iter_mut().zip(range_array) {
        let (_, value) = doc
            .dereference(entry)
            .map_err(|e| SigValError::BadPdf(format!("ByteRange entry: {e}")))?;
        *slot = value
            .as_i64()
            .map_err(|_| SigValError::BadPdf("ByteRange entry is not an integer".to_string()))?;
    }

    let contents = dict
        .get_deref(b"Contents", doc)
        .map_err(|e| SigValError::BadPdf(format!("missing Contents: {e}")))?
        .as_str()
        .map_err(|_| SigValError::BadPdf("Contents is not a string".to_string()))?
        .to_vec();

    let sub_filter = match dict.get_deref(b"SubFilter", doc) {
        Ok(Object::Name(name)) => String::from_utf8_lossy(name).to_string(),
        _ => String::new(),
    };

    let dictionary_signing_time = match dict.get_deref(b"M", doc) {
        Ok(Object::String(date, _)) => parse_pdf_date(date),
        _ => None,
    };

    Ok(PdfSignature {
        object_id,
        sub_filter,
        byte_range,
        contents,
        dictionary_signing_time,
    })
}

/// Decode a PDF hex string including its `<`/`>` delimiters, skipping nothing:
/// any non-hex character fails the decode.
fn decode_pdf_hex_string(hex_input: &[u8]) -> Option<Vec<u8>> {
    if hex_input.first() != Some(&b'<') || hex_input.last() != Some(&b'>') {
        return None;
    }
    let inner = &hex_input[1..hex_input.len() - 1];

    let mut bytes = Vec::with_capacity(inner.len() / 2);
    let mut digits = inner.iter().map(|&b| (b as char).to_digit(16));
    while let Some(first) = digits.next() {
        let first = first? as u8;
        // An odd final digit is padded with zero per the PDF spec.
        let second = digits.next().unwrap_or(Some(0))? as u8;
        bytes.push((first << 4) | second);
    }
    Some(bytes)
}

/// Parse a PDF date string (`D:YYYYMMDDHHmmSS` with optional zone) to epoch
/// milliseconds. Returns `None` on any malformed component.
fn parse_pdf_date(date: &[u8]) -> Option<i64> {
    let text = std::str::from_utf8(date).ok()?;
    let text = text.strip_prefix("D:").unwrap_or(text);
    if text.len() < 14 {
        return None;
    }
    let year: i64 = text[0..4].parse().ok()?;
    let month: u32 = text[4..6].parse().ok()?;
    let day: u32 = text[6..8].parse().ok()?;
    let hour: u32 = text[8..10].parse().ok()?;
    let minute: u32 = text[10..12].parse().ok()?;
    let second: u32 = text[12..14].parse().ok()?;

    let mut epoch_seconds = to_unix_timestamp(year, month, day, hour, minute, second)?;

    // Zone suffix: Z, or +HH'mm' / -HH'mm'
    let rest = &text[14..];
    if let Some(sign) = rest.chars().next() {
        if sign == '+' || sign == '-' {
            let digits: String = rest[1..].chars().filter(char::is_ascii_digit).collect();
            if digits.len() >= 2 {
                let zone_hours: i64 = digits[0..2].parse().ok()?;
                let zone_minutes: i64 = if digits.len() >= 4 {
                    digits[2..4].parse().ok()?
                } else {
                    0
                };
                let offset = zone_hours * 3600 + zone_minutes * 60;
                if sign == '+' {
                    epoch_seconds -= offset;
                } else {
                    epoch_seconds += offset;
                }
            }
        }
    }
    Some(epoch_seconds * 1000)
}

fn to_unix_timestamp(
    year: i64,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
) -> Option<i64> {
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) || hour > 23 || minute > 59 || second > 59
    {
        return None;
    }
    let days_in_month = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    let is_leap = |y: i64| (y % 4 == 0 && y % 100 != 0) || y % 400 == 0;

    let mut days: i64 = 0;
    for y in 1970..year {
        days += if is_leap(y) { 366 } else { 365 };
    }
    for m in 1..month {
        days += i64::from(days_in_month[(m - 1) as usize]);
        if m == 2 && is_leap(year) {
            days += 1;
        }
    }
    days += i64::from(day) - 1;
    Some(days * 86400 + i64::from(hour) * 3600 + i64::from(minute) * 60 + i64::from(second))
}
