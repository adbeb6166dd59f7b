use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::{
    db::UnitOfWork,
    errors::{DocumentBuildError, ServiceError},
    models::{Document, DocumentState, DocumentType, Location, Position, PositionDraft, User},
    services::{
        document_store::DocumentStore, receipt_for_release::ReceiptDocumentForReleaseHelper,
        resource_management::ResourceManagementService, users::UserService,
    },
};

/// What a build does once the assembled document turned out invalid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidDocumentStrategy {
    /// Flag the unit of work rollback-only and hand back the invalid document
    #[default]
    #[serde(rename = "rollback_only", alias = "mark_rollback_only")]
    MarkRollbackOnly,
    /// Flag the unit of work rollback-only and fail with [`DocumentBuildError`]
    ReturnError,
}

/// Services a build talks to.
#[derive(Clone)]
pub struct DocumentCollaborators {
    pub store: Arc<dyn DocumentStore>,
    pub resources: Arc<dyn ResourceManagementService>,
    pub receipts_for_release: Arc<dyn ReceiptDocumentForReleaseHelper>,
}

impl DocumentCollaborators {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        resources: Arc<dyn ResourceManagementService>,
        receipts_for_release: Arc<dyn ReceiptDocumentForReleaseHelper>,
    ) -> Self {
        Self {
            store,
            resources,
            receipts_for_release,
        }
    }
}

/// Assembles a document and its positions, then persists them in one
/// [`UnitOfWork`].
///
/// ```rust,ignore
/// let mut builder = management.document_builder().await?;
/// builder
///     .receipt(warehouse)
///     .add_position(PositionDraft::new(product, dec!(10)))?
///     .set_accepted();
/// let document = builder.build(&uow).await?;
/// if !document.is_valid() {
///     // uow is rollback-only at this point
/// }
/// ```
pub struct DocumentBuilder {
    collaborators: DocumentCollaborators,
    document: Document,
    positions: Vec<Position>,
}

impl std::fmt::Debug for DocumentBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentBuilder")
            .field("document", &self.document)
            .field("positions", &self.positions)
            .finish_non_exhaustive()
    }
}

impl DocumentBuilder {
    /// Starts a draft document authored by `user`.
    pub fn for_user(collaborators: DocumentCollaborators, user: &User) -> Self {
        Self {
            collaborators,
            document: Document::draft(user),
            positions: Vec::new(),
        }
    }

    /// Starts a draft document authored by whoever `users` reports as current.
    pub async fn for_current_user(
        collaborators: DocumentCollaborators,
        users: &dyn UserService,
    ) -> Result<Self, ServiceError> {
        let user = users.current_user().await?;
        Ok(Self::for_user(collaborators, &user))
    }

    /// The document as assembled so far, without positions.
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_type(&self) -> Option<DocumentType> {
        self.document.document_type
    }

    /// Positions queued for the document, in the order they were added.
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    fn movement(&mut self, kind: DocumentType, from: Option<Location>, to: Option<Location>) -> &mut Self {
        self.document.document_type = Some(kind);
        self.document.location_from = from;
        self.document.location_to = to;
        self
    }

    pub fn receipt(&mut self, location_to: Location) -> &mut Self {
        self.movement(DocumentType::Receipt, None, Some(location_to))
    }

    pub fn internal_outbound(&mut self, location_from: Location) -> &mut Self {
        self.movement(DocumentType::InternalOutbound, Some(location_from), None)
    }

    pub fn internal_inbound(&mut self, location_to: Location) -> &mut Self {
        self.movement(DocumentType::InternalInbound, None, Some(location_to))
    }

    pub fn transfer(&mut self, location_to: Location, location_from: Location) -> &mut Self {
        self.movement(DocumentType::Transfer, Some(location_from), Some(location_to))
    }

    pub fn release(&mut self, location_from: Location) -> &mut Self {
        self.movement(DocumentType::Release, Some(location_from), None)
    }

    pub fn returned(&mut self, location_to: Location) -> &mut Self {
        self.movement(DocumentType::Return, None, Some(location_to))
    }

    /// Builds a position from `draft` without queueing it.
    ///
    /// # Errors
    /// `ServiceError::InvalidInput` when product or quantity is missing.
    pub fn create_position(draft: PositionDraft) -> Result<Position, ServiceError> {
        if draft.product.is_none() {
            return Err(ServiceError::missing_argument("Product"));
        }
        if draft.quantity.is_none() {
            return Err(ServiceError::missing_argument("Quantity"));
        }
        draft
            .into_position()
            .ok_or_else(|| ServiceError::InternalError("Position draft lost its required fields".to_string()))
    }

    /// Queues a position built from `draft`. Nothing is queued on error.
    pub fn add_position(&mut self, draft: PositionDraft) -> Result<&mut Self, ServiceError> {
        let position = Self::create_position(draft)?;
        self.positions.push(position);
        Ok(self)
    }

    /// Queues a previously created position as is.
    pub fn add_created_position(&mut self, position: Position) -> &mut Self {
        self.positions.push(position);
        self
    }

    pub fn set_accepted(&mut self) -> &mut Self {
        self.document.state = DocumentState::Accepted;
        self
    }

    /// Sets a document field owned by an extending module.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<JsonValue>) -> &mut Self {
        self.document.attributes.insert(name.into(), value.into());
        self
    }

    /// Saves the document. An invalid result is returned as is and `uow` is
    /// left rollback-only; check [`Document::is_valid`].
    pub async fn build(self, uow: &UnitOfWork) -> Result<Document, ServiceError> {
        self.build_with_strategy(uow, InvalidDocumentStrategy::MarkRollbackOnly)
            .await
    }

    /// Saves the document, failing with [`ServiceError::DocumentBuild`] when
    /// the result is invalid.
    pub async fn build_with_entity_error(self, uow: &UnitOfWork) -> Result<Document, ServiceError> {
        self.build_with_strategy(uow, InvalidDocumentStrategy::ReturnError)
            .await
    }

    #[instrument(
        skip_all,
        fields(
            document_type = ?self.document.document_type,
            state = %self.document.state,
            positions = self.positions.len(),
            unit_of_work = %uow.id(),
        )
    )]
    pub async fn build_with_strategy(
        self,
        uow: &UnitOfWork,
        strategy: InvalidDocumentStrategy,
    ) -> Result<Document, ServiceError> {
        let (document, invalid_positions) = match self.assemble(uow).await {
            Ok(assembled) => assembled,
            Err(e) => {
                error!(error = %e, "Document build aborted");
                uow.set_rollback_only();
                return Err(e);
            }
        };

        let kind = document
            .document_type
            .map(|t| t.to_string())
            .unwrap_or_else(|| "none".to_string());

        if document.is_valid() {
            counter!(
                "material_flow.documents.built",
                1,
                "document_type" => kind,
                "state" => document.state.to_string()
            );
            info!(document_id = ?document.id, "Document built");
            return Ok(document);
        }

        counter!("material_flow.documents.invalid", 1, "document_type" => kind);
        warn!(
            document_id = ?document.id,
            invalid_positions = invalid_positions.len(),
            errors = document.errors().messages().count(),
            "Document failed validation"
        );
        uow.set_rollback_only();

        match strategy {
            InvalidDocumentStrategy::MarkRollbackOnly => Ok(document),
            InvalidDocumentStrategy::ReturnError => {
                Err(DocumentBuildError::new(document, invalid_positions).into())
            }
        }
    }

    /// Saves document and positions and runs acceptance side effects.
    /// Returns the saved document with the positions the store rejected.
    async fn assemble(self, uow: &UnitOfWork) -> Result<(Document, Vec<Position>), ServiceError> {
        let DocumentBuilder {
            collaborators,
            document,
            positions,
        } = self;

        let mut saved = collaborators.store.save_document(uow, document).await?;

        saved.positions = positions
            .into_iter()
            .enumerate()
            .map(|(index, mut position)| {
                position.document_id = saved.id;
                position.number = Some(index as i32 + 1);
                position
            })
            .collect();

        let mut invalid_positions = Vec::new();
        if !saved.is_valid() {
            return Ok((saved, invalid_positions));
        }

        let mut persisted = Vec::with_capacity(saved.positions.len());
        for position in std::mem::take(&mut saved.positions) {
            let position = collaborators.store.save_position(uow, position).await?;
            if !position.is_valid() {
                saved.set_not_valid();
                saved.absorb_errors(position.errors());
                invalid_positions.push(position.clone());
            }
            persisted.push(position);
        }
        saved.positions = persisted;

        if saved.is_valid() && saved.is_accepted() {
            collaborators.resources.create_resources(uow, &saved).await?;

            let linker = &collaborators.receipts_for_release;
            if linker.should_build_connected_document(uow, &saved).await? {
                linker.build_connected_document(uow, &saved, false).await?;
            }
        }

        Ok((saved, invalid_positions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ErrorMessage, Product};
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use mockall::mock;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use sea_orm::{ConnectOptions, Database, DatabaseConnection};
    use uuid::Uuid;

    mock! {
        pub Store {}
        #[async_trait]
        impl DocumentStore for Store {
            async fn save_document(&self, uow: &UnitOfWork, document: Document) -> Result<Document, ServiceError>;
            async fn save_position(&self, uow: &UnitOfWork, position: Position) -> Result<Position, ServiceError>;
        }
    }

    mock! {
        pub Resources {}
        #[async_trait]
        impl ResourceManagementService for Resources {
            async fn create_resources(&self, uow: &UnitOfWork, document: &Document) -> Result<(), ServiceError>;
        }
    }

    mock! {
        pub Linker {}
        #[async_trait]
        impl ReceiptDocumentForReleaseHelper for Linker {
            async fn should_build_connected_document(&self, uow: &UnitOfWork, document: &Document) -> Result<bool, ServiceError>;
            async fn build_connected_document(&self, uow: &UnitOfWork, document: &Document, report_message: bool) -> Result<(), ServiceError>;
        }
    }

    mock! {
        pub Users {}
        #[async_trait]
        impl UserService for Users {
            async fn current_user(&self) -> Result<User, ServiceError>;
        }
    }

    async fn unit_of_work() -> (DatabaseConnection, UnitOfWork) {
        let mut opt = ConnectOptions::new("sqlite::memory:".to_string());
        opt.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Database::connect(opt).await.unwrap();
        let uow = UnitOfWork::begin(&db).await.unwrap();
        (db, uow)
    }

    /// Store that accepts every document and rejects positions with a
    /// non-positive quantity.
    fn accepting_store() -> MockStore {
        let mut store = MockStore::new();
        store.expect_save_document().returning(|_, mut document| {
            document.id = Some(Uuid::new_v4());
            Ok(document)
        });
        store.expect_save_position().returning(|_, mut position| {
            if position.quantity <= Decimal::ZERO {
                position.add_field_error("quantity", ErrorMessage::new("Quantity must be positive"));
            } else {
                position.id = Some(Uuid::new_v4());
            }
            Ok(position)
        });
        store
    }

    fn idle_resources() -> MockResources {
        let mut resources = MockResources::new();
        resources.expect_create_resources().never();
        resources
    }

    fn idle_linker() -> MockLinker {
        let mut linker = MockLinker::new();
        linker.expect_should_build_connected_document().never();
        linker.expect_build_connected_document().never();
        linker
    }

    fn collaborators(store: MockStore, resources: MockResources, linker: MockLinker) -> DocumentCollaborators {
        DocumentCollaborators::new(Arc::new(store), Arc::new(resources), Arc::new(linker))
    }

    fn user() -> User {
        User::new(Uuid::new_v4(), "admin")
    }

    fn product(number: &str) -> Product {
        Product::new(Uuid::new_v4(), number, "pcs")
    }

    fn location(number: &str) -> Location {
        Location::new(Uuid::new_v4(), number)
    }

    fn builder() -> DocumentBuilder {
        DocumentBuilder::for_user(collaborators(accepting_store(), idle_resources(), idle_linker()), &user())
    }

    #[test]
    fn new_builder_holds_a_draft_without_type() {
        let author = user();
        let builder = DocumentBuilder::for_user(
            collaborators(MockStore::new(), MockResources::new(), MockLinker::new()),
            &author,
        );

        assert_eq!(builder.document_type(), None);
        assert_eq!(builder.document().state, DocumentState::Draft);
        assert_eq!(builder.document().user_id, author.id);
        assert!(builder.positions().is_empty());
    }

    #[tokio::test]
    async fn current_user_is_looked_up_once() {
        let author = user();
        let expected = author.clone();
        let mut users = MockUsers::new();
        users
            .expect_current_user()
            .times(1)
            .returning(move || Ok(author.clone()));

        let builder = DocumentBuilder::for_current_user(
            collaborators(MockStore::new(), MockResources::new(), MockLinker::new()),
            &users,
        )
        .await
        .unwrap();

        assert_eq!(builder.document().user_id, expected.id);
    }

    #[test]
    fn each_movement_sets_its_locations() {
        let (from, to) = (location("FROM"), location("TO"));
        let mut builder = builder();

        builder.receipt(to.clone());
        assert_eq!(builder.document_type(), Some(DocumentType::Receipt));
        assert_eq!(builder.document().location_to.as_ref(), Some(&to));
        assert_eq!(builder.document().location_from, None);

        builder.internal_outbound(from.clone());
        assert_eq!(builder.document_type(), Some(DocumentType::InternalOutbound));
        assert_eq!(builder.document().location_from.as_ref(), Some(&from));

        builder.internal_inbound(to.clone());
        assert_eq!(builder.document_type(), Some(DocumentType::InternalInbound));
        assert_eq!(builder.document().location_to.as_ref(), Some(&to));

        builder.release(from.clone());
        assert_eq!(builder.document_type(), Some(DocumentType::Release));
        assert_eq!(builder.document().location_from.as_ref(), Some(&from));

        builder.returned(to.clone());
        assert_eq!(builder.document_type(), Some(DocumentType::Return));
        assert_eq!(builder.document().location_to.as_ref(), Some(&to));

        builder.transfer(to.clone(), from.clone());
        assert_eq!(builder.document_type(), Some(DocumentType::Transfer));
        assert_eq!(builder.document().location_to.as_ref(), Some(&to));
        assert_eq!(builder.document().location_from.as_ref(), Some(&from));
    }

    #[test]
    fn last_movement_wins() {
        let mut builder = builder();
        builder.release(location("A")).receipt(location("B"));

        assert_eq!(builder.document_type(), Some(DocumentType::Receipt));
        assert_eq!(builder.document().location_from, None);
        assert_eq!(builder.document().location_to.as_ref().unwrap().number, "B");
    }

    #[test]
    fn missing_product_or_quantity_is_an_argument_error() {
        let mut builder = builder();
        builder.add_position(PositionDraft::new(product("P1"), dec!(1))).unwrap();

        let no_product = PositionDraft {
            quantity: Some(dec!(5)),
            ..Default::default()
        };
        let no_quantity = PositionDraft {
            product: Some(product("P2")),
            ..Default::default()
        };

        assert_matches!(
            builder.add_position(no_product),
            Err(ServiceError::InvalidInput(msg)) if msg == "Product argument is required."
        );
        assert_matches!(
            builder.add_position(no_quantity),
            Err(ServiceError::InvalidInput(msg)) if msg == "Quantity argument is required."
        );
        assert_eq!(builder.positions().len(), 1);
    }

    #[test]
    fn attributes_are_recorded_on_the_document() {
        let mut builder = builder();
        builder.set_attribute("order_number", "ZAM-7").set_attribute("priority", 2);

        let attributes = &builder.document().attributes;
        assert_eq!(attributes["order_number"], "ZAM-7");
        assert_eq!(attributes["priority"], 2);
    }

    #[tokio::test]
    async fn accepted_receipt_creates_resources_once() {
        let (_db, uow) = unit_of_work().await;
        let warehouse = location("MAG-1");
        let bolt = product("BOLT");

        let mut resources = MockResources::new();
        resources
            .expect_create_resources()
            .withf(|_, document| document.id.is_some() && document.positions.len() == 1)
            .times(1)
            .returning(|_, _| Ok(()));
        let mut linker = MockLinker::new();
        linker
            .expect_should_build_connected_document()
            .times(1)
            .returning(|_, _| Ok(false));
        linker.expect_build_connected_document().never();

        let mut builder =
            DocumentBuilder::for_user(collaborators(accepting_store(), resources, linker), &user());
        builder
            .receipt(warehouse.clone())
            .add_position(PositionDraft::new(bolt.clone(), dec!(10)))
            .unwrap()
            .set_accepted();

        let document = builder.build(&uow).await.unwrap();

        assert!(document.is_valid());
        assert!(!uow.is_rollback_only());
        assert_eq!(document.document_type, Some(DocumentType::Receipt));
        assert_eq!(document.location_to, Some(warehouse));
        assert_eq!(document.state, DocumentState::Accepted);
        assert_eq!(document.positions.len(), 1);
        let position = &document.positions[0];
        assert_eq!(position.quantity, dec!(10));
        assert_eq!(position.given_unit.as_deref(), Some(bolt.unit.as_str()));
        assert_eq!(position.document_id, document.id);
    }

    #[tokio::test]
    async fn connected_receipt_is_built_when_linker_asks_for_it() {
        let (_db, uow) = unit_of_work().await;

        let mut resources = MockResources::new();
        resources.expect_create_resources().times(1).returning(|_, _| Ok(()));
        let mut linker = MockLinker::new();
        linker
            .expect_should_build_connected_document()
            .times(1)
            .returning(|_, _| Ok(true));
        linker
            .expect_build_connected_document()
            .withf(|_, document, report_message| {
                document.document_type == Some(DocumentType::Release) && !*report_message
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let mut builder =
            DocumentBuilder::for_user(collaborators(accepting_store(), resources, linker), &user());
        builder
            .release(location("MAG-1"))
            .add_position(PositionDraft::new(product("NUT"), dec!(4)))
            .unwrap()
            .set_accepted();

        let document = builder.build(&uow).await.unwrap();
        assert!(document.is_valid());
    }

    #[tokio::test]
    async fn positions_keep_call_order() {
        let (_db, uow) = unit_of_work().await;
        let created = DocumentBuilder::create_position(PositionDraft::new(product("B"), dec!(2))).unwrap();

        let mut builder = builder();
        builder
            .internal_inbound(location("MAG-1"))
            .add_position(PositionDraft::new(product("A"), dec!(1)))
            .unwrap()
            .add_created_position(created)
            .add_position(PositionDraft::new(product("C"), dec!(3)))
            .unwrap();

        let document = builder.build(&uow).await.unwrap();

        let order: Vec<_> = document
            .positions
            .iter()
            .map(|p| (p.product.number.as_str(), p.number))
            .collect();
        assert_eq!(order, vec![("A", Some(1)), ("B", Some(2)), ("C", Some(3))]);
    }

    #[tokio::test]
    async fn invalid_draft_position_marks_document_invalid() {
        let (_db, uow) = unit_of_work().await;

        let mut builder = builder();
        builder
            .receipt(location("MAG-1"))
            .add_position(PositionDraft::new(product("OK"), dec!(1)))
            .unwrap()
            .add_position(PositionDraft::new(product("ZERO"), dec!(0)))
            .unwrap();

        let document = builder.build(&uow).await.unwrap();

        assert!(!document.is_valid());
        assert!(uow.is_rollback_only());
        let messages: Vec<_> = document
            .errors()
            .global_errors()
            .iter()
            .map(|e| e.message.as_str())
            .collect();
        assert_eq!(messages, vec!["Quantity must be positive"]);
        assert_eq!(document.positions.len(), 2);
    }

    #[tokio::test]
    async fn invalid_position_blocks_acceptance_side_effects() {
        let (_db, uow) = unit_of_work().await;

        let mut builder = builder();
        builder
            .receipt(location("MAG-1"))
            .add_position(PositionDraft::new(product("ZERO"), dec!(0)))
            .unwrap()
            .set_accepted();

        let document = builder.build(&uow).await.unwrap();
        assert!(!document.is_valid());
    }

    #[tokio::test]
    async fn strict_build_reports_exactly_the_invalid_positions() {
        let (_db, uow) = unit_of_work().await;

        let mut builder = builder();
        builder
            .receipt(location("MAG-1"))
            .add_position(PositionDraft::new(product("OK"), dec!(1)))
            .unwrap()
            .add_position(PositionDraft::new(product("BAD"), dec!(-1)))
            .unwrap();

        let err = builder.build_with_entity_error(&uow).await.unwrap_err();

        assert!(uow.is_rollback_only());
        let failure = err.as_document_build().expect("document build failure");
        assert!(!failure.document.is_valid());
        assert_eq!(failure.invalid_positions.len(), 1);
        assert_eq!(failure.invalid_positions[0].product.number, "BAD");
        assert_eq!(failure.messages(), vec!["Quantity must be positive".to_string()]);
    }

    #[tokio::test]
    async fn rejected_document_skips_positions() {
        let (_db, uow) = unit_of_work().await;

        let mut store = MockStore::new();
        store.expect_save_document().times(1).returning(|_, mut document| {
            document.add_field_error("document_type", ErrorMessage::new("Document type is required"));
            Ok(document)
        });
        store.expect_save_position().never();

        let mut builder =
            DocumentBuilder::for_user(collaborators(store, idle_resources(), idle_linker()), &user());
        builder
            .add_position(PositionDraft::new(product("A"), dec!(1)))
            .unwrap()
            .set_accepted();

        let document = builder.build(&uow).await.unwrap();

        assert!(!document.is_valid());
        assert!(uow.is_rollback_only());
        assert_eq!(document.id, None);
        assert_eq!(document.positions.len(), 1);
        assert_eq!(document.positions[0].document_id, None);
    }

    #[tokio::test]
    async fn collaborator_failure_propagates_and_marks_rollback() {
        let (_db, uow) = unit_of_work().await;

        let mut resources = MockResources::new();
        resources
            .expect_create_resources()
            .times(1)
            .returning(|_, _| Err(ServiceError::DatabaseError(sea_orm::DbErr::Custom("resources table locked".into()))));

        let mut builder =
            DocumentBuilder::for_user(collaborators(accepting_store(), resources, idle_linker()), &user());
        builder
            .receipt(location("MAG-1"))
            .add_position(PositionDraft::new(product("A"), dec!(1)))
            .unwrap()
            .set_accepted();

        let err = builder.build(&uow).await.unwrap_err();

        assert_matches!(err, ServiceError::DatabaseError(_));
        assert!(uow.is_rollback_only());
    }
}
