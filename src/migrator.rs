use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_documents_table::Migration),
            Box::new(m20240101_000002_create_positions_table::Migration),
            Box::new(m20240101_000003_create_resources_table::Migration),
        ]
    }
}

mod m20240101_000001_create_documents_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_documents_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Documents::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Documents::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Documents::DocumentType).string().null())
                        .col(ColumnDef::new(Documents::State).string().not_null())
                        .col(ColumnDef::new(Documents::LocationFromId).uuid().null())
                        .col(ColumnDef::new(Documents::LocationFromNumber).string().null())
                        .col(ColumnDef::new(Documents::LocationToId).uuid().null())
                        .col(ColumnDef::new(Documents::LocationToNumber).string().null())
                        .col(ColumnDef::new(Documents::UserId).uuid().not_null())
                        .col(
                            ColumnDef::new(Documents::Time)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Documents::Attributes).json().null())
                        .col(
                            ColumnDef::new(Documents::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_documents_type_state")
                        .table(Documents::Table)
                        .col(Documents::DocumentType)
                        .col(Documents::State)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Documents::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Documents {
        Table,
        Id,
        DocumentType,
        State,
        LocationFromId,
        LocationFromNumber,
        LocationToId,
        LocationToNumber,
        UserId,
        Time,
        Attributes,
        CreatedAt,
    }
}

mod m20240101_000002_create_positions_table {
    use super::m20240101_000001_create_documents_table::Documents;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_positions_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Positions::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Positions::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Positions::DocumentId).uuid().not_null())
                        .col(ColumnDef::new(Positions::Number).integer().not_null())
                        .col(ColumnDef::new(Positions::ProductId).uuid().not_null())
                        .col(ColumnDef::new(Positions::ProductNumber).string().not_null())
                        .col(ColumnDef::new(Positions::ProductUnit).string().not_null())
                        .col(ColumnDef::new(Positions::Quantity).decimal_len(16, 5).not_null())
                        .col(ColumnDef::new(Positions::GivenQuantity).decimal_len(16, 5).null())
                        .col(ColumnDef::new(Positions::GivenUnit).string().null())
                        .col(ColumnDef::new(Positions::Conversion).decimal_len(16, 5).null())
                        .col(ColumnDef::new(Positions::Price).decimal_len(16, 5).null())
                        .col(ColumnDef::new(Positions::Batch).string().null())
                        .col(ColumnDef::new(Positions::ProductionDate).date().null())
                        .col(ColumnDef::new(Positions::ExpirationDate).date().null())
                        .col(ColumnDef::new(Positions::ResourceId).uuid().null())
                        .col(ColumnDef::new(Positions::StorageLocationId).uuid().null())
                        .col(ColumnDef::new(Positions::PalletNumberId).uuid().null())
                        .col(ColumnDef::new(Positions::TypeOfPallet).string().null())
                        .col(ColumnDef::new(Positions::AdditionalCodeId).uuid().null())
                        .col(
                            ColumnDef::new(Positions::Waste)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Positions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_positions_document")
                                .from(Positions::Table, Positions::DocumentId)
                                .to(Documents::Table, Documents::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_positions_document_id")
                        .table(Positions::Table)
                        .col(Positions::DocumentId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Positions::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Positions {
        Table,
        Id,
        DocumentId,
        Number,
        ProductId,
        ProductNumber,
        ProductUnit,
        Quantity,
        GivenQuantity,
        GivenUnit,
        Conversion,
        Price,
        Batch,
        ProductionDate,
        ExpirationDate,
        ResourceId,
        StorageLocationId,
        PalletNumberId,
        TypeOfPallet,
        AdditionalCodeId,
        Waste,
        CreatedAt,
    }
}

mod m20240101_000003_create_resources_table {
    use super::m20240101_000001_create_documents_table::Documents;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_resources_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Resources::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Resources::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Resources::DocumentId).uuid().not_null())
                        .col(ColumnDef::new(Resources::PositionId).uuid().null())
                        .col(ColumnDef::new(Resources::LocationId).uuid().not_null())
                        .col(ColumnDef::new(Resources::ProductId).uuid().not_null())
                        .col(ColumnDef::new(Resources::Quantity).decimal_len(16, 5).not_null())
                        .col(ColumnDef::new(Resources::GivenUnit).string().null())
                        .col(ColumnDef::new(Resources::Conversion).decimal_len(16, 5).null())
                        .col(ColumnDef::new(Resources::Price).decimal_len(16, 5).null())
                        .col(ColumnDef::new(Resources::Batch).string().null())
                        .col(ColumnDef::new(Resources::ProductionDate).date().null())
                        .col(ColumnDef::new(Resources::ExpirationDate).date().null())
                        .col(ColumnDef::new(Resources::StorageLocationId).uuid().null())
                        .col(ColumnDef::new(Resources::PalletNumberId).uuid().null())
                        .col(ColumnDef::new(Resources::TypeOfPallet).string().null())
                        .col(
                            ColumnDef::new(Resources::Waste)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Resources::Time)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_resources_document")
                                .from(Resources::Table, Resources::DocumentId)
                                .to(Documents::Table, Documents::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_resources_location_product")
                        .table(Resources::Table)
                        .col(Resources::LocationId)
                        .col(Resources::ProductId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Resources::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Resources {
        Table,
        Id,
        DocumentId,
        PositionId,
        LocationId,
        ProductId,
        Quantity,
        GivenUnit,
        Conversion,
        Price,
        Batch,
        ProductionDate,
        ExpirationDate,
        StorageLocationId,
        PalletNumberId,
        TypeOfPallet,
        Waste,
        Time,
    }
}
