//! PDF document structure: signature dictionaries and revision records.

pub mod object_value;
pub mod revision;
pub mod signature;
