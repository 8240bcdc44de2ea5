use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AccessLog::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AccessLog::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AccessLog::AccountId).uuid().not_null())
                    .col(ColumnDef::new(AccessLog::Action).string().not_null())
                    .col(ColumnDef::new(AccessLog::Method).string())
                    .col(ColumnDef::new(AccessLog::Ip).string())
                    .col(ColumnDef::new(AccessLog::UserAgent).string())
                    .col(ColumnDef::new(AccessLog::Success).boolean().not_null())
                    .col(ColumnDef::new(AccessLog::Description).string())
                    .col(
                        ColumnDef::new(AccessLog::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_access_log_account_id")
                            .from(AccessLog::Table, AccessLog::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(AccessLog::Table)
                    .col(AccessLog::AccountId)
                    .name("idx_access_log_account_id")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AccessLog::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum AccessLog {
    Table,
    Id,
    AccountId,
    Action,
    Method,
    Ip,
    UserAgent,
    Success,
    Description,
    CreatedAt,
}

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
}
