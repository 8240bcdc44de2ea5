use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AccessCodes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AccessCodes::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AccessCodes::AccountId).uuid().not_null())
                    .col(ColumnDef::new(AccessCodes::Code).string().not_null())
                    .col(
                        ColumnDef::new(AccessCodes::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AccessCodes::UsedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(AccessCodes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(AccessCodes::Table, AccessCodes::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Validation looks up (account_id, code) filtered on used_at.
        manager
            .create_index(
                Index::create()
                    .table(AccessCodes::Table)
                    .col(AccessCodes::AccountId)
                    .col(AccessCodes::Code)
                    .name("idx_access_codes_account_id_code")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AccessCodes::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum AccessCodes {
    Table,
    Id,
    AccountId,
    Code,
    ExpiresAt,
    UsedAt,
    CreatedAt,
}

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
}
