//! Domain records handled by the document builder.

pub mod document;
pub mod position;
pub mod record_errors;
pub mod references;

pub use document::{Document, DocumentState, DocumentType};
pub use position::{Position, PositionDraft};
pub use record_errors::{ErrorMessage, RecordErrors};
pub use references::{Location, Product, User};
