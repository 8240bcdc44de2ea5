use sea_orm_migration::prelude::*;

mod m20260815_000001_create_accounts;
mod m20260815_000002_create_access_codes;
mod m20260815_000003_create_sessions;
mod m20260815_000004_create_webauthn_credentials;
mod m20260815_000005_create_webauthn_challenges;
mod m20260815_000006_create_access_log;
mod m20260815_000007_create_change_log;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260815_000001_create_accounts::Migration),
            Box::new(m20260815_000002_create_access_codes::Migration),
            Box::new(m20260815_000003_create_sessions::Migration),
            Box::new(m20260815_000004_create_webauthn_credentials::Migration),
            Box::new(m20260815_000005_create_webauthn_challenges::Migration),
            Box::new(m20260815_000006_create_access_log::Migration),
            Box::new(m20260815_000007_create_change_log::Migration),
        ]
    }
}
