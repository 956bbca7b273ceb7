//! Common re-exports for convenient entity usage.

pub use super::feature_release::{
    ActiveModel as FeatureReleaseActiveModel, Column as FeatureReleaseColumn,
    Entity as FeatureReleaseRow, Model as FeatureReleaseModel,
};
pub use super::snapshot_state::{
    ActiveModel as SnapshotStateActiveModel, Column as SnapshotStateColumn,
    Entity as SnapshotState, Model as SnapshotStateModel, SINGLETON_ID,
};
