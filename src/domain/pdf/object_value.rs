//! Typed comparison of catalog dictionary values.
//!
//! Root-dictionary diffing is deliberately lenient: nested dictionaries
//! compare as equal by presence alone, since re-serialization of an
//! unchanged document routinely rewrites them. Values outside the modeled
//! types make the containing root update illegal.

use lopdf::Object;

/// Value abstraction over the PDF object types that can be compared
/// meaningfully across revisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectValue {
    /// Indirect reference, compared by object number
    Reference(u32),
    /// Nested dictionary or stream, compared by presence only
    Dictionary,
    /// Name, compared by exact bytes
    Name(Vec<u8>),
    /// String, compared case-insensitively
    Text(Vec<u8>),
    /// Array, compared element-wise
    Array(Vec<ObjectValue>),
    /// Anything else; presence makes the root update illegal
    Other,
}

impl From<&Object> for ObjectValue {
    fn from(object: &Object) -> Self {
        match object {
            Object::Reference((number, _generation)) => ObjectValue::Reference(*number),
            Object::Dictionary(_) | Object::Stream(_) => ObjectValue::Dictionary,
            Object::Name(name) => ObjectValue::Name(name.clone()),
            Object::String(text, _format) => ObjectValue::Text(text.clone()),
            Object::Array(items) => {
                let values: Vec<ObjectValue> = items.iter().map(ObjectValue::from).collect();
                if values.iter().any(|v| matches!(v, ObjectValue::Other)) {
                    ObjectValue::Other
                } else {
                    ObjectValue::Array(values)
                }
            }
            _ => ObjectValue::Other,
        }
    }
}

impl ObjectValue {
    #[must_use]
    pub fn is_other(&self) -> bool {
        matches!(self, ObjectValue::Other)
    }

    /// Lenient equality across revisions.
    #[must_use]
    pub fn matches(&self, other: &ObjectValue) -> bool {
        match (self, other) {
            (ObjectValue::Reference(a), ObjectValue::Reference(b)) => a == b,
            (ObjectValue::Dictionary, ObjectValue::Dictionary) => true,
            (ObjectValue::Name(a), ObjectValue::Name(b)) => a == b,
            (ObjectValue::Text(a), ObjectValue::Text(b)) => a.eq_ignore_ascii_case(b),
            (ObjectValue::Array(a), ObjectValue::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.matches(y))
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::StringFormat;

    #[test]
    fn references_compare_by_object_number() {
        let a = ObjectValue::from(&Object::Reference((12, 0)));
        let b = ObjectValue::from(&Object::Reference((12, 3)));
        let c = ObjectValue::from(&Object::Reference((13, 0)));
        assert!(a.matches(&b));
        assert!(!a.matches(&c));
    }

    #[test]
    fn nested_dictionaries_compare_by_presence() {
        let mut dict_a = lopdf::Dictionary::new();
        dict_a.set("Kind", Object::Name(b"A".to_vec()));
        let mut dict_b = lopdf::Dictionary::new();
        dict_b.set("Kind", Object::Name(b"B".to_vec()));
        let a = ObjectValue::from(&Object::Dictionary(dict_a));
        let b = ObjectValue::from(&Object::Dictionary(dict_b));
        assert!(a.matches(&b));
    }

    #[test]
    fn strings_compare_case_insensitively() {
        let a = ObjectValue::from(&Object::String(b"Value".to_vec(), StringFormat::Literal));
        let b = ObjectValue::from(&Object::String(b"vALUE".to_vec(), StringFormat::Literal));
        let c = ObjectValue::from(&Object::String(b"other".to_vec(), StringFormat::Literal));
        assert!(a.matches(&b));
        assert!(!a.matches(&c));
    }

    #[test]
    fn arrays_compare_elementwise() {
        let a = ObjectValue::from(&Object::Array(vec![
            Object::Name(b"X".to_vec()),
            Object::Reference((4, 0)),
        ]));
        let same = ObjectValue::from(&Object::Array(vec![
            Object::Name(b"X".to_vec()),
            Object::Reference((4, 0)),
        ]));
        let shorter = ObjectValue::from(&Object::Array(vec![Object::Name(b"X".to_vec())]));
        assert!(a.matches(&same));
        assert!(!a.matches(&shorter));
    }

    #[test]
    fn numbers_are_unrecognized() {
        let value = ObjectValue::from(&Object::Integer(7));
        assert!(value.is_other());
        assert!(!value.matches(&ObjectValue::from(&Object::Integer(7))));
    }

    #[test]
    fn array_with_unrecognized_element_is_other() {
        let value = ObjectValue::from(&Object::Array(vec![
            Object::Name(b"X".to_vec()),
            Object::Integer(1),
        ]));
        assert!(value.is_other());
    }
}
