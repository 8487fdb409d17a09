//! Media handling.
//!
//! Only PDF text extraction is needed: uploads are reduced to plain text
//! before anything else touches them.

mod pdf;

pub use pdf::{PdfExtractor, TextExtractor};
