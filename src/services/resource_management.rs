use async_trait::async_trait;
use metrics::counter;
use sea_orm::{ActiveModelTrait, Set};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    db::UnitOfWork,
    entities::resource,
    errors::ServiceError,
    models::Document,
};

/// Reacts to accepted documents by materializing or consuming stock.
#[async_trait]
pub trait ResourceManagementService: Send + Sync {
    async fn create_resources(&self, uow: &UnitOfWork, document: &Document) -> Result<(), ServiceError>;
}

/// Creates one resource per position of an accepted inbound document at its
/// target location. Outbound documents leave resources untouched.
#[derive(Debug, Clone, Default)]
pub struct SeaOrmResourceManagement;

impl SeaOrmResourceManagement {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResourceManagementService for SeaOrmResourceManagement {
    #[instrument(skip_all, fields(document_id = ?document.id, document_type = ?document.document_type))]
    async fn create_resources(&self, uow: &UnitOfWork, document: &Document) -> Result<(), ServiceError> {
        let Some(document_type) = document.document_type else {
            return Err(ServiceError::InvalidInput(
                "Cannot create resources for a document without type".to_string(),
            ));
        };
        if !document_type.is_inbound() {
            return Ok(());
        }

        let document_id = document
            .id
            .ok_or_else(|| ServiceError::InvalidInput("Document must be saved before creating resources".to_string()))?;
        let location = document.location_to.as_ref().ok_or_else(|| {
            ServiceError::InvalidInput("Inbound document has no target location".to_string())
        })?;

        let db = uow.connection();
        for position in &document.positions {
            resource::ActiveModel {
                id: Set(Uuid::new_v4()),
                document_id: Set(document_id),
                position_id: Set(position.id),
                location_id: Set(location.id),
                product_id: Set(position.product.id),
                quantity: Set(position.quantity),
                given_unit: Set(position.given_unit.clone()),
                conversion: Set(position.conversion),
                price: Set(position.price),
                batch: Set(position.batch.clone()),
                production_date: Set(position.production_date),
                expiration_date: Set(position.expiration_date),
                storage_location_id: Set(position.storage_location_id),
                pallet_number_id: Set(position.pallet_number_id),
                type_of_pallet: Set(position.type_of_pallet.clone()),
                waste: Set(position.waste),
                time: Set(document.time),
            }
            .insert(db)
            .await?;
        }

        counter!(
            "material_flow.resources.created",
            document.positions.len() as u64,
            "document_type" => document_type.to_string()
        );
        info!(
            document_id = %document_id,
            location = %location.number,
            resources = document.positions.len(),
            "Resources created for accepted document"
        );
        Ok(())
    }
}
