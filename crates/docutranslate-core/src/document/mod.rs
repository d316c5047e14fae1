//! Source documents: identity, download and text extraction.

mod extract;
mod fetch;
mod id;

pub use extract::{PDF_SIGNATURE, PdfText, check_upload};
pub use fetch::{DocumentFetcher, FetchedDocument};
pub use id::{DocumentId, google_export_url};
