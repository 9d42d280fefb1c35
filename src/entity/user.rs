use sea_orm::entity::prelude::*;

/// Registered account. `activation_token` is only present while the
/// account is pending and is cleared when it is activated. `reset_token`
/// is present between a password reset request and its redemption.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "t_user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(unique)]
    pub email: String,
    pub password_hash: String,
    pub activated: bool,
    #[sea_orm(unique)]
    pub activation_token: Option<String>,
    #[sea_orm(unique)]
    pub reset_token: Option<String>,
    pub reset_sent_at: Option<DateTimeUtc>,
    pub created: Option<DateTimeUtc>,
    pub updated: Option<DateTimeUtc>,
}

impl Model {
    pub fn is_pending(&self) -> bool {
        !self.activated && self.activation_token.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::post::Entity")]
    Post,
    #[sea_orm(has_many = "super::session::Entity")]
    Session,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Post.def()
    }
}

impl Related<super::session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
