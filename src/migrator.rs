use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_customers_table::Migration),
            Box::new(m20250101_000002_create_orders_table::Migration),
            Box::new(m20250101_000003_create_payments_table::Migration),
        ]
    }
}

// Migration implementations

mod m20250101_000001_create_customers_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000001_create_customers_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Customers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Customers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Customers::Email).string().not_null())
                        .col(ColumnDef::new(Customers::Name).string().null())
                        .col(ColumnDef::new(Customers::Phone).string().null())
                        .col(ColumnDef::new(Customers::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Customers::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_customers_email")
                        .table(Customers::Table)
                        .col(Customers::Email)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Customers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Customers {
        Table,
        Id,
        Email,
        Name,
        Phone,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000002_create_orders_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000002_create_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Orders table aligned with entities::order Model
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Orders::OrderNumber).string().not_null())
                        .col(ColumnDef::new(Orders::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(Orders::ServiceType).string().not_null())
                        .col(ColumnDef::new(Orders::Status).string().not_null())
                        .col(
                            ColumnDef::new(Orders::TotalAmount)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Orders::Currency).string().not_null())
                        .col(ColumnDef::new(Orders::Payload).json().not_null())
                        .col(ColumnDef::new(Orders::Notes).string().null())
                        .col(ColumnDef::new(Orders::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Orders::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_order_number")
                        .table(Orders::Table)
                        .col(Orders::OrderNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_customer_id")
                        .table(Orders::Table)
                        .col(Orders::CustomerId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        OrderNumber,
        CustomerId,
        ServiceType,
        Status,
        TotalAmount,
        Currency,
        Payload,
        Notes,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000003_create_payments_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000003_create_payments_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Payments table - matches entities::payment Model
            manager
                .create_table(
                    Table::create()
                        .table(Payments::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Payments::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Payments::OrderId).uuid().not_null())
                        .col(ColumnDef::new(Payments::OrderNumber).string().not_null())
                        .col(ColumnDef::new(Payments::Provider).string().not_null())
                        .col(
                            ColumnDef::new(Payments::ProviderPaymentId)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Payments::Amount).big_integer().not_null())
                        .col(ColumnDef::new(Payments::Currency).string().not_null())
                        .col(ColumnDef::new(Payments::Status).string().not_null())
                        .col(ColumnDef::new(Payments::Method).string().not_null())
                        .col(ColumnDef::new(Payments::PayPlan).string().not_null())
                        .col(ColumnDef::new(Payments::PayUrl).string().not_null())
                        .col(ColumnDef::new(Payments::RequestPayload).json().not_null())
                        .col(ColumnDef::new(Payments::WebhookPayload).json().null())
                        .col(ColumnDef::new(Payments::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Payments::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_payments_provider_payment_id")
                        .table(Payments::Table)
                        .col(Payments::ProviderPaymentId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_payments_order_number")
                        .table(Payments::Table)
                        .col(Payments::OrderNumber)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_payments_status")
                        .table(Payments::Table)
                        .col(Payments::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Payments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Payments {
        Table,
        Id,
        OrderId,
        OrderNumber,
        Provider,
        ProviderPaymentId,
        Amount,
        Currency,
        Status,
        Method,
        PayPlan,
        PayUrl,
        RequestPayload,
        WebhookPayload,
        CreatedAt,
        UpdatedAt,
    }
}
