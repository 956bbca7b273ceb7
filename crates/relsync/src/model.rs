//! Normalized release domain model.
//!
//! A [`Snapshot`] maps major versions to [`FeatureRelease`]s, which hold the
//! [`Release`]s of every upstream repository tracked for that version.

mod binary;
mod release;
mod snapshot;
mod vendor;
mod version;

pub use binary::{
    Architecture, Binary, BinaryKey, CLib, HeapSize, ImageType, JvmImpl, OperatingSystem, Package,
    Project,
};
pub use release::{Release, ReleaseId, ReleaseType, SourcePackage};
pub use snapshot::{FeatureRelease, Snapshot};
pub use vendor::Vendor;
pub use version::VersionData;

#[cfg(test)]
pub(crate) use release::fixtures;
