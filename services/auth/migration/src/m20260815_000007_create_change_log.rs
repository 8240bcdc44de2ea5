use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ChangeLog::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChangeLog::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ChangeLog::AccountId).uuid().not_null())
                    .col(ColumnDef::new(ChangeLog::TableName).string().not_null())
                    .col(ColumnDef::new(ChangeLog::RecordId).string())
                    .col(ColumnDef::new(ChangeLog::Action).string().not_null())
                    .col(ColumnDef::new(ChangeLog::OldValues).json_binary())
                    .col(ColumnDef::new(ChangeLog::NewValues).json_binary())
                    .col(ColumnDef::new(ChangeLog::Description).string())
                    .col(
                        ColumnDef::new(ChangeLog::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_change_log_account_id")
                            .from(ChangeLog::Table, ChangeLog::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(ChangeLog::Table)
                    .col(ChangeLog::AccountId)
                    .name("idx_change_log_account_id")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChangeLog::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ChangeLog {
    Table,
    Id,
    AccountId,
    TableName,
    RecordId,
    Action,
    OldValues,
    NewValues,
    Description,
    CreatedAt,
}

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
}
