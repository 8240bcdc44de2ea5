use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WebauthnChallenges::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WebauthnChallenges::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(WebauthnChallenges::Email).string())
                    .col(
                        ColumnDef::new(WebauthnChallenges::State)
                            .binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WebauthnChallenges::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WebauthnChallenges::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(WebauthnChallenges::Table)
                    .col(WebauthnChallenges::Email)
                    .name("idx_webauthn_challenges_email")
                    .to_owned(),
            )
            .await?;

        // In-request purge of stale rows filters on expiry.
        manager
            .create_index(
                Index::create()
                    .table(WebauthnChallenges::Table)
                    .col(WebauthnChallenges::ExpiresAt)
                    .name("idx_webauthn_challenges_expires_at")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WebauthnChallenges::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum WebauthnChallenges {
    Table,
    Id,
    Email,
    State,
    ExpiresAt,
    CreatedAt,
}
