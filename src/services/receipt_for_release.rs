use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::{
    config::ReceiptForReleaseRule,
    db::UnitOfWork,
    errors::ServiceError,
    models::{Document, DocumentType, Location, PositionDraft, User},
    services::{
        document_builder::{DocumentBuilder, DocumentCollaborators},
        document_store::DocumentStore,
        resource_management::ResourceManagementService,
    },
};

/// Decides whether a saved document needs a connected receipt (PZ) and
/// builds it.
#[async_trait]
pub trait ReceiptDocumentForReleaseHelper: Send + Sync {
    async fn should_build_connected_document(
        &self,
        uow: &UnitOfWork,
        document: &Document,
    ) -> Result<bool, ServiceError>;

    async fn build_connected_document(
        &self,
        uow: &UnitOfWork,
        document: &Document,
        report_message: bool,
    ) -> Result<(), ServiceError>;
}

/// Never links anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoConnectedDocuments;

#[async_trait]
impl ReceiptDocumentForReleaseHelper for NoConnectedDocuments {
    async fn should_build_connected_document(&self, _: &UnitOfWork, _: &Document) -> Result<bool, ServiceError> {
        Ok(false)
    }

    async fn build_connected_document(&self, _: &UnitOfWork, _: &Document, _: bool) -> Result<(), ServiceError> {
        Ok(())
    }
}

/// Builds an accepted receipt for every accepted release leaving a location
/// listed in the configured rules. The receipt lands on the rule's location
/// and is written in the same unit of work as the release.
pub struct ConfiguredReceiptForRelease {
    rules: Vec<ReceiptForReleaseRule>,
    store: Arc<dyn DocumentStore>,
    resources: Arc<dyn ResourceManagementService>,
}

impl ConfiguredReceiptForRelease {
    pub fn new(
        rules: Vec<ReceiptForReleaseRule>,
        store: Arc<dyn DocumentStore>,
        resources: Arc<dyn ResourceManagementService>,
    ) -> Self {
        Self {
            rules,
            store,
            resources,
        }
    }

    fn rule_for(&self, document: &Document) -> Option<&ReceiptForReleaseRule> {
        if document.document_type != Some(DocumentType::Release) || !document.is_accepted() {
            return None;
        }
        let from = document.location_from.as_ref()?;
        self.rules.iter().find(|rule| rule.release_location_id == from.id)
    }

    fn receipt_builder(&self, release: &Document) -> DocumentBuilder {
        // Receipts are never linked further.
        let collaborators = DocumentCollaborators::new(
            self.store.clone(),
            self.resources.clone(),
            Arc::new(NoConnectedDocuments),
        );
        DocumentBuilder::for_user(collaborators, &User::new(release.user_id, ""))
    }
}

#[async_trait]
impl ReceiptDocumentForReleaseHelper for ConfiguredReceiptForRelease {
    async fn should_build_connected_document(
        &self,
        _uow: &UnitOfWork,
        document: &Document,
    ) -> Result<bool, ServiceError> {
        Ok(self.rule_for(document).is_some())
    }

    #[instrument(skip_all, fields(release_id = ?document.id, unit_of_work = %uow.id()))]
    async fn build_connected_document(
        &self,
        uow: &UnitOfWork,
        document: &Document,
        report_message: bool,
    ) -> Result<(), ServiceError> {
        let Some(rule) = self.rule_for(document) else {
            debug!("No receipt rule for document");
            return Ok(());
        };

        let mut builder = self.receipt_builder(document);
        builder.receipt(Location::new(
            rule.receipt_location_id,
            rule.receipt_location_number.clone(),
        ));
        if let Some(release_id) = document.id {
            builder.set_attribute("release_document_id", release_id.to_string());
        }
        for position in &document.positions {
            let mut draft = PositionDraft::new(position.product.clone(), position.quantity);
            draft.given_quantity = position.given_quantity;
            draft.given_unit = position.given_unit.clone();
            draft.conversion = position.conversion;
            draft.price = position.price;
            draft.batch = position.batch.clone();
            draft.production_date = position.production_date;
            draft.expiration_date = position.expiration_date;
            draft.waste = position.waste;
            builder.add_position(draft)?;
        }
        builder.set_accepted();

        let receipt = builder.build_with_entity_error(uow).await?;

        if report_message {
            info!(receipt_id = ?receipt.id, "Receipt created for release");
        } else {
            debug!(receipt_id = ?receipt.id, "Receipt created for release");
        }
        Ok(())
    }
}
