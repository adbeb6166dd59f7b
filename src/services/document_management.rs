use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::UnitOfWork,
    errors::ServiceError,
    models::{Document, User},
    services::{
        document_builder::{DocumentBuilder, DocumentCollaborators, InvalidDocumentStrategy},
        document_store::{DocumentStore, SeaOrmDocumentStore},
        receipt_for_release::{ConfiguredReceiptForRelease, ReceiptDocumentForReleaseHelper},
        resource_management::{ResourceManagementService, SeaOrmResourceManagement},
        users::{OperatorUserService, UserService},
    },
};

/// Entry point for code that creates documents: holds the wired collaborators
/// and hands out builders.
#[derive(Clone)]
pub struct DocumentManagementService {
    collaborators: DocumentCollaborators,
    users: Arc<dyn UserService>,
    default_strategy: InvalidDocumentStrategy,
}

impl DocumentManagementService {
    pub fn new(
        collaborators: DocumentCollaborators,
        users: Arc<dyn UserService>,
        default_strategy: InvalidDocumentStrategy,
    ) -> Self {
        Self {
            collaborators,
            users,
            default_strategy,
        }
    }

    /// Wires the sea-orm store, resource management and the configured
    /// receipt-for-release rules.
    pub fn from_config(config: &AppConfig) -> Self {
        let store: Arc<dyn DocumentStore> = Arc::new(SeaOrmDocumentStore::new());
        let resources: Arc<dyn ResourceManagementService> = Arc::new(SeaOrmResourceManagement::new());
        let receipts: Arc<dyn ReceiptDocumentForReleaseHelper> = Arc::new(ConfiguredReceiptForRelease::new(
            config.documents.receipt_for_release.clone(),
            store.clone(),
            resources.clone(),
        ));

        Self::new(
            DocumentCollaborators::new(store, resources, receipts),
            Arc::new(OperatorUserService::from_config(config)),
            config.documents.invalid_document_strategy,
        )
    }

    pub fn default_strategy(&self) -> InvalidDocumentStrategy {
        self.default_strategy
    }

    /// Builder for a document authored by the current user.
    pub async fn document_builder(&self) -> Result<DocumentBuilder, ServiceError> {
        DocumentBuilder::for_current_user(self.collaborators.clone(), self.users.as_ref()).await
    }

    pub fn document_builder_for(&self, user: &User) -> DocumentBuilder {
        DocumentBuilder::for_user(self.collaborators.clone(), user)
    }

    /// Builds with the configured invalid-document strategy.
    pub async fn build(&self, builder: DocumentBuilder, uow: &UnitOfWork) -> Result<Document, ServiceError> {
        builder.build_with_strategy(uow, self.default_strategy).await
    }
}
