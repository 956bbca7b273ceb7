//! SeaORM entity definitions for the relsync database schema.

pub mod feature_release;
pub mod prelude;
pub mod snapshot_state;
