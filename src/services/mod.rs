// Document assembly
pub mod document_builder;
pub mod document_management;

// Collaborators used while building
pub mod document_store;
pub mod receipt_for_release;
pub mod resource_management;
pub mod users;

pub use document_builder::{DocumentBuilder, DocumentCollaborators, InvalidDocumentStrategy};
pub use document_management::DocumentManagementService;
