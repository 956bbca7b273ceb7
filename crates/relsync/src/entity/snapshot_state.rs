//! SnapshotState entity - the concurrency token of the committed snapshot.
//!
//! The table holds at most one row, keyed by [`SINGLETON_ID`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Primary key of the only row.
pub const SINGLETON_ID: i32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "snapshot_state")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,

    /// Base64 SHA-256 of the canonical snapshot serialization.
    pub checksum: String,

    pub structural_hash: i64,

    /// When the snapshot was last committed.
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
