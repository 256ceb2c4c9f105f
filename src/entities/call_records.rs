use sea_orm::entity::prelude::*;
use serde::Serialize;

/// A single telephony event. `calldate` is stored as RFC 3339 with its UTC
/// offset; `disposition` holds one of the closed storage strings and
/// `answered` is always derived from it.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "call_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub calldate: String,

    #[sea_orm(indexed)]
    pub src: String,

    #[sea_orm(indexed)]
    pub dst: String,

    pub duration: i64,

    pub billsec: i64,

    pub disposition: String,

    pub answered: bool,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
