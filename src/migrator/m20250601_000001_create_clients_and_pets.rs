use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Clients::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Clients::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Clients::Name).string().not_null())
                    .col(ColumnDef::new(Clients::Phone).string().not_null())
                    .col(ColumnDef::new(Clients::Email).string().not_null())
                    .col(ColumnDef::new(Clients::Address).text().not_null())
                    .col(
                        ColumnDef::new(Clients::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Booking requests find their client by phone.
        manager
            .create_index(
                Index::create()
                    .name("idx_clients_phone")
                    .table(Clients::Table)
                    .col(Clients::Phone)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Pets::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Pets::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Pets::ClientId).uuid().not_null())
                    .col(ColumnDef::new(Pets::Name).string().not_null())
                    .col(ColumnDef::new(Pets::PetType).string().not_null())
                    .col(ColumnDef::new(Pets::Breed).string().not_null())
                    .col(ColumnDef::new(Pets::Age).string().not_null())
                    .col(ColumnDef::new(Pets::BehaviorFlags).json().not_null())
                    .col(ColumnDef::new(Pets::EntryBehavior).text().not_null())
                    .col(ColumnDef::new(Pets::Allergies).text().not_null())
                    .col(ColumnDef::new(Pets::Meds).text().not_null())
                    .col(ColumnDef::new(Pets::VetInfo).text().not_null())
                    .col(ColumnDef::new(Pets::PhotoUrl).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pets_client")
                            .from(Pets::Table, Pets::ClientId)
                            .to(Clients::Table, Clients::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_pets_client_id")
                    .table(Pets::Table)
                    .col(Pets::ClientId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Pets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Clients::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Clients {
    Table,
    Id,
    Name,
    Phone,
    Email,
    Address,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Pets {
    Table,
    Id,
    ClientId,
    Name,
    PetType,
    Breed,
    Age,
    BehaviorFlags,
    EntryBehavior,
    Allergies,
    Meds,
    VetInfo,
    PhotoUrl,
}
