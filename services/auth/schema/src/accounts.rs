use sea_orm::entity::prelude::*;

/// A person acting under exactly one role.
/// `(email, role)` is unique; the same email may appear under several roles
/// as distinct rows. Registration flows create these; the auth service only
/// reads them (active check + display fields).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: i16,
    pub active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::access_codes::Entity")]
    AccessCodes,
    #[sea_orm(has_many = "super::sessions::Entity")]
    Sessions,
    #[sea_orm(has_many = "super::access_log::Entity")]
    AccessLog,
    #[sea_orm(has_many = "super::change_log::Entity")]
    ChangeLog,
}

impl Related<super::access_codes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccessCodes.def()
    }
}

impl Related<super::sessions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl Related<super::access_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccessLog.def()
    }
}

impl Related<super::change_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChangeLog.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
