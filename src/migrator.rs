// async_trait needs the elided form to match the sea-orm-migration trait.
#![allow(elided_lifetimes_in_paths)]

use sea_orm_migration::prelude::*;

pub struct Migrator;

/// Amount column. SQLite gets REAL affinity so whole amounts are not
/// stored as INTEGER, which would not decode back into a decimal.
fn money_column<T: IntoIden>(backend: sea_orm::DbBackend, name: T) -> ColumnDef {
    let mut column = ColumnDef::new(name);
    match backend {
        sea_orm::DbBackend::Sqlite => column.double(),
        _ => column.decimal_len(12, 2),
    };
    column
}

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_orders_table::Migration),
            Box::new(m20250601_000002_create_products_table::Migration),
            Box::new(m20250601_000003_create_settings_table::Migration),
            Box::new(m20250715_000004_create_coupons_table::Migration),
        ]
    }
}

mod m20250601_000001_create_orders_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250601_000001_create_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Orders::Id)
                                .string_len(24)
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Orders::Reference).string().null())
                        .col(ColumnDef::new(Orders::Shipping).json().not_null())
                        .col(ColumnDef::new(Orders::Items).json().not_null())
                        .col(
                            super::money_column(manager.get_database_backend(), Orders::Total)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Orders::PaymentMethod).string().not_null())
                        .col(ColumnDef::new(Orders::Status).string().not_null())
                        .col(ColumnDef::new(Orders::Otp).string_len(6).not_null())
                        .col(ColumnDef::new(Orders::RazorpayOrderId).string().null())
                        .col(ColumnDef::new(Orders::RazorpayPaymentId).string().null())
                        .col(ColumnDef::new(Orders::CouponCode).string().null())
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_orders_created_at")
                        .table(Orders::Table)
                        .col(Orders::CreatedAt)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_orders_reference")
                        .table(Orders::Table)
                        .col(Orders::Reference)
                        .if_not_exists()
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
        Reference,
        Shipping,
        Items,
        Total,
        PaymentMethod,
        Status,
        Otp,
        RazorpayOrderId,
        RazorpayPaymentId,
        CouponCode,
        CreatedAt,
    }
}

mod m20250601_000002_create_products_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250601_000002_create_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Products::Id)
                                .string_len(24)
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Description).text().not_null())
                        .col(super::money_column(manager.get_database_backend(), Products::Price).not_null())
                        .col(super::money_column(manager.get_database_backend(), Products::OriginalPrice).null())
                        .col(
                            ColumnDef::new(Products::Stock)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Products::Category).string().not_null())
                        .col(ColumnDef::new(Products::Image).string().null())
                        .col(ColumnDef::new(Products::Images).json().not_null())
                        .col(ColumnDef::new(Products::Features).json().null())
                        .col(ColumnDef::new(Products::Specifications).json().null())
                        .col(ColumnDef::new(Products::Benefits).json().null())
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Products {
        Table,
        Id,
        Name,
        Description,
        Price,
        OriginalPrice,
        Stock,
        Category,
        Image,
        Images,
        Features,
        Specifications,
        Benefits,
        CreatedAt,
    }
}

mod m20250601_000003_create_settings_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250601_000003_create_settings_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Settings::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Settings::Id)
                                .integer()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Settings::Document).json().not_null())
                        .col(
                            ColumnDef::new(Settings::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Settings::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Settings {
        Table,
        Id,
        Document,
        UpdatedAt,
    }
}

mod m20250715_000004_create_coupons_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250715_000004_create_coupons_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Coupons::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Coupons::Id)
                                .string_len(24)
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Coupons::Code)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Coupons::Kind).string().not_null())
                        .col(super::money_column(manager.get_database_backend(), Coupons::Value).not_null())
                        .col(ColumnDef::new(Coupons::Description).text().not_null())
                        .col(
                            super::money_column(manager.get_database_backend(), Coupons::MinOrder)
                                .not_null()
                                .default(0),
                        )
                        .col(super::money_column(manager.get_database_backend(), Coupons::MaxDiscount).null())
                        .col(ColumnDef::new(Coupons::UsageLimit).integer().null())
                        .col(
                            ColumnDef::new(Coupons::UsageCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Coupons::StartsAt).timestamp_with_time_zone().null())
                        .col(ColumnDef::new(Coupons::EndsAt).timestamp_with_time_zone().null())
                        .col(ColumnDef::new(Coupons::Status).string().not_null())
                        .col(
                            ColumnDef::new(Coupons::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Coupons::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Coupons {
        Table,
        Id,
        Code,
        Kind,
        Value,
        Description,
        MinOrder,
        MaxDiscount,
        UsageLimit,
        UsageCount,
        StartsAt,
        EndsAt,
        Status,
        CreatedAt,
    }
}
