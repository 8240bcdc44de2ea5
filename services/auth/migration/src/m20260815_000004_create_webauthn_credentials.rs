use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Keyed by email on purpose: one passkey spans every role sharing
        // that email, so no foreign key into accounts.
        manager
            .create_table(
                Table::create()
                    .table(WebauthnCredentials::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WebauthnCredentials::CredentialId)
                            .binary()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(WebauthnCredentials::Email).string().not_null())
                    .col(
                        ColumnDef::new(WebauthnCredentials::PublicKey)
                            .binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WebauthnCredentials::SignCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(WebauthnCredentials::Transports)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WebauthnCredentials::BackupEligible)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(WebauthnCredentials::BackupState)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(WebauthnCredentials::Aaguid).uuid().not_null())
                    .col(
                        ColumnDef::new(WebauthnCredentials::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(WebauthnCredentials::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WebauthnCredentials::LastUsedAt)
                            .timestamp_with_time_zone(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(WebauthnCredentials::Table)
                    .col(WebauthnCredentials::Email)
                    .col(WebauthnCredentials::Active)
                    .name("idx_webauthn_credentials_email_active")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WebauthnCredentials::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum WebauthnCredentials {
    Table,
    CredentialId,
    Email,
    PublicKey,
    SignCount,
    Transports,
    BackupEligible,
    BackupState,
    Aaguid,
    Active,
    CreatedAt,
    LastUsedAt,
}
