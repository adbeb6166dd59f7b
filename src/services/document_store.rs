use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::Value as JsonValue;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::{
    db::UnitOfWork,
    entities::{document, position},
    errors::ServiceError,
    models::{Document, DocumentType, ErrorMessage, Position, RecordErrors},
};

/// Persists documents and positions, running business-rule validation first.
///
/// A record failing validation is handed back carrying its errors and is not
/// written; `Err` is reserved for infrastructure failures.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn save_document(&self, uow: &UnitOfWork, document: Document) -> Result<Document, ServiceError>;

    async fn save_position(&self, uow: &UnitOfWork, position: Position) -> Result<Position, ServiceError>;
}

/// Business rules every document must satisfy before it is written.
pub fn document_rule_errors(document: &Document) -> RecordErrors {
    let mut errors = RecordErrors::default();

    let Some(document_type) = document.document_type else {
        errors.add_field_error("document_type", ErrorMessage::new("Document type is required"));
        return errors;
    };

    if document_type.requires_location_to() && document.location_to.is_none() {
        errors.add_field_error(
            "location_to",
            ErrorMessage::with_vars(
                "Target location is required for this document type",
                vec![document_type.to_string()],
            ),
        );
    }
    if document_type.requires_location_from() && document.location_from.is_none() {
        errors.add_field_error(
            "location_from",
            ErrorMessage::with_vars(
                "Source location is required for this document type",
                vec![document_type.to_string()],
            ),
        );
    }
    if document_type == DocumentType::Transfer {
        if let (Some(from), Some(to)) = (&document.location_from, &document.location_to) {
            if from.id == to.id {
                errors.add_global_error("Transfer source and target locations must differ", false, vec![]);
            }
        }
    }

    errors
}

/// [`DocumentStore`] writing through sea-orm on the unit of work's transaction.
#[derive(Debug, Clone, Default)]
pub struct SeaOrmDocumentStore;

impl SeaOrmDocumentStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentStore for SeaOrmDocumentStore {
    #[instrument(skip_all, fields(document_type = ?document.document_type, unit_of_work = %uow.id()))]
    async fn save_document(&self, uow: &UnitOfWork, mut document: Document) -> Result<Document, ServiceError> {
        let rule_errors = document_rule_errors(&document);
        *document.errors_mut() = rule_errors;
        if !document.is_valid() {
            warn!(
                errors = document.errors().messages().count(),
                "Document rejected by validation"
            );
            return Ok(document);
        }

        let db = uow.connection();
        let id = document.id.unwrap_or_else(Uuid::new_v4);
        let attributes = if document.attributes.is_empty() {
            None
        } else {
            Some(JsonValue::Object(document.attributes.clone()))
        };

        let mut model = document::ActiveModel {
            id: Set(id),
            document_type: Set(document.document_type),
            state: Set(document.state),
            location_from_id: Set(document.location_from.as_ref().map(|l| l.id)),
            location_from_number: Set(document.location_from.as_ref().map(|l| l.number.clone())),
            location_to_id: Set(document.location_to.as_ref().map(|l| l.id)),
            location_to_number: Set(document.location_to.as_ref().map(|l| l.number.clone())),
            user_id: Set(document.user_id),
            time: Set(document.time),
            attributes: Set(attributes),
            ..Default::default()
        };

        let exists = match document.id {
            Some(id) => document::Entity::find_by_id(id).one(db).await?.is_some(),
            None => false,
        };
        if exists {
            model.update(db).await?;
        } else {
            model.created_at = Set(Utc::now());
            model.insert(db).await?;
        }

        debug!(document_id = %id, "Document saved");
        document.id = Some(id);
        Ok(document)
    }

    #[instrument(skip_all, fields(product = %position.product.number, unit_of_work = %uow.id()))]
    async fn save_position(&self, uow: &UnitOfWork, mut position: Position) -> Result<Position, ServiceError> {
        let rule_errors = position.rule_errors();
        *position.errors_mut() = rule_errors;

        let Some(document_id) = position.document_id.filter(|_| position.is_valid()) else {
            warn!(
                errors = position.errors().messages().count(),
                "Position rejected by validation"
            );
            return Ok(position);
        };

        let db = uow.connection();
        let id = position.id.unwrap_or_else(Uuid::new_v4);
        let mut model = position::ActiveModel {
            id: Set(id),
            document_id: Set(document_id),
            number: Set(position.number.unwrap_or(1)),
            product_id: Set(position.product.id),
            product_number: Set(position.product.number.clone()),
            product_unit: Set(position.product.unit.clone()),
            quantity: Set(position.quantity),
            given_quantity: Set(position.given_quantity),
            given_unit: Set(position.given_unit.clone()),
            conversion: Set(position.conversion),
            price: Set(position.price),
            batch: Set(position.batch.clone()),
            production_date: Set(position.production_date),
            expiration_date: Set(position.expiration_date),
            resource_id: Set(position.resource_id),
            storage_location_id: Set(position.storage_location_id),
            pallet_number_id: Set(position.pallet_number_id),
            type_of_pallet: Set(position.type_of_pallet.clone()),
            additional_code_id: Set(position.additional_code_id),
            waste: Set(position.waste),
            ..Default::default()
        };

        let exists = match position.id {
            Some(id) => position::Entity::find_by_id(id).one(db).await?.is_some(),
            None => false,
        };
        if exists {
            model.update(db).await?;
        } else {
            model.created_at = Set(Utc::now());
            model.insert(db).await?;
        }

        debug!(position_id = %id, document_id = %document_id, "Position saved");
        position.id = Some(id);
        Ok(position)
    }
}
