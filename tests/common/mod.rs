#![allow(dead_code)]

use material_flow_documents::{
    config::{AppConfig, ReceiptForReleaseRule},
    db::{self, DbPool},
    entities::{document, position, resource},
    models::{Location, Product, User},
    services::DocumentManagementService,
};
use sea_orm::{EntityTrait, PaginatorTrait};
use uuid::Uuid;

/// In-memory SQLite database with the schema applied and a document service
/// wired against it.
pub struct TestDb {
    pub db: DbPool,
    pub documents: DocumentManagementService,
    pub user: User,
}

impl TestDb {
    pub async fn new() -> Self {
        Self::with_rules(Vec::new()).await
    }

    pub async fn with_rules(rules: Vec<ReceiptForReleaseRule>) -> Self {
        let mut cfg = AppConfig::new("sqlite::memory:".to_string(), "test".to_string());
        // A single connection keeps the in-memory database alive and shared.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.documents.receipt_for_release = rules;

        let db = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&db)
            .await
            .expect("failed to run migrations");

        Self {
            db,
            documents: DocumentManagementService::from_config(&cfg),
            user: User::new(Uuid::new_v4(), "storekeeper"),
        }
    }

    pub async fn document_count(&self) -> u64 {
        document::Entity::find().count(&self.db).await.unwrap()
    }

    pub async fn position_count(&self) -> u64 {
        position::Entity::find().count(&self.db).await.unwrap()
    }

    pub async fn resource_count(&self) -> u64 {
        resource::Entity::find().count(&self.db).await.unwrap()
    }
}

pub fn location(number: &str) -> Location {
    Location::new(Uuid::new_v4(), number)
}

pub fn product(number: &str, unit: &str) -> Product {
    Product::new(Uuid::new_v4(), number, unit)
}
