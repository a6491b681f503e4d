mod adapter;
pub mod json;

pub use adapter::{parse_extraction, ExtractionAdapter, ExtractionRequest, PLACEHOLDER_DESCRIPTION, SYNTHETIC_UTP_CHARS};
pub use json::first_json_object;
