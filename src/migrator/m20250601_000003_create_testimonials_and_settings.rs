use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Testimonials::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Testimonials::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Testimonials::Name).string().not_null())
                    .col(ColumnDef::new(Testimonials::Message).text().not_null())
                    .col(ColumnDef::new(Testimonials::Rating).integer().not_null())
                    .col(
                        ColumnDef::new(Testimonials::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_testimonials_created_at")
                    .table(Testimonials::Table)
                    .col(Testimonials::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Settings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Settings::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Settings::BusinessName).string().not_null())
                    .col(ColumnDef::new(Settings::Website).string().not_null())
                    .col(ColumnDef::new(Settings::Phone).string().not_null())
                    .col(ColumnDef::new(Settings::InstagramUrl).string().not_null())
                    .col(ColumnDef::new(Settings::PaymentLinks).json().not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Settings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Testimonials::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Testimonials {
    Table,
    Id,
    Name,
    Message,
    Rating,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Settings {
    Table,
    Id,
    BusinessName,
    Website,
    Phone,
    InstagramUrl,
    PaymentLinks,
}
