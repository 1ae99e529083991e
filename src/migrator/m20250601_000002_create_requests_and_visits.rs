use sea_orm_migration::prelude::*;

use super::m20250601_000001_create_clients_and_pets::Clients;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Requests::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Requests::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Requests::ClientId).uuid())
                    .col(ColumnDef::new(Requests::PetIds).json().not_null())
                    .col(ColumnDef::new(Requests::ServiceType).string_len(32).not_null())
                    .col(ColumnDef::new(Requests::Date).string().not_null())
                    .col(ColumnDef::new(Requests::TimeWindow).string().not_null())
                    .col(ColumnDef::new(Requests::Notes).text().not_null())
                    .col(
                        ColumnDef::new(Requests::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Requests::ClientPhone).string().not_null())
                    .col(
                        ColumnDef::new(Requests::Version)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Requests::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_requests_client")
                            .from(Requests::Table, Requests::ClientId)
                            .to(Clients::Table, Clients::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_requests_status")
                    .table(Requests::Table)
                    .col(Requests::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Visits::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Visits::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Visits::RequestId).uuid().not_null())
                    .col(ColumnDef::new(Visits::SummaryNotes).text().not_null())
                    .col(ColumnDef::new(Visits::Photos).json().not_null())
                    .col(
                        ColumnDef::new(Visits::CompletedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_visits_request")
                            .from(Visits::Table, Visits::RequestId)
                            .to(Requests::Table, Requests::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RequestTransitions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RequestTransitions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RequestTransitions::RequestId).uuid().not_null())
                    .col(
                        ColumnDef::new(RequestTransitions::FromStatus)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RequestTransitions::ToStatus)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(RequestTransitions::Version).integer().not_null())
                    .col(ColumnDef::new(RequestTransitions::Actor).string().not_null())
                    .col(
                        ColumnDef::new(RequestTransitions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_request_transitions_request")
                            .from(RequestTransitions::Table, RequestTransitions::RequestId)
                            .to(Requests::Table, Requests::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_request_transitions_request_id")
                    .table(RequestTransitions::Table)
                    .col(RequestTransitions::RequestId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RequestTransitions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Visits::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Requests::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Requests {
    Table,
    Id,
    ClientId,
    PetIds,
    ServiceType,
    Date,
    TimeWindow,
    Notes,
    Status,
    ClientPhone,
    Version,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Visits {
    Table,
    Id,
    RequestId,
    SummaryNotes,
    Photos,
    CompletedAt,
}

#[derive(DeriveIden)]
enum RequestTransitions {
    Table,
    Id,
    RequestId,
    FromStatus,
    ToStatus,
    Version,
    Actor,
    CreatedAt,
}
