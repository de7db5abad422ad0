//! SeaORM entity model used by the database storage backend.
//!
//! The whole key namespace lives in a single `records` table created by
//! `database_storage`: one row per key, the document serialized as JSON text.

use sea_orm::entity::prelude::*;

/// Records table entity model.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "records")]
pub struct Model {
    /// Full `/`-joined storage key
    #[sea_orm(primary_key, auto_increment = false)]
    pub record_key: String,
    /// Compact JSON payload
    pub json: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
