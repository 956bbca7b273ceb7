//! FeatureRelease entity - one serialized feature release per major version.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "feature_releases")]
pub struct Model {
    /// Major version, e.g. 17.
    #[sea_orm(primary_key, auto_increment = false)]
    pub version: i64,

    /// JSON-serialized `FeatureRelease`.
    #[sea_orm(column_type = "Text")]
    pub payload: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
