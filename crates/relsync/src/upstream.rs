//! Reading releases from the upstream repositories.
//!
//! - [`ReleaseSource`] is the seam the sync engine reads through
//! - [`GraphQlReleaseSource`] implements it over the GraphQL API, one task per repository
//! - [`ReleaseMapper`] turns raw releases into the domain model

pub mod filter;
pub mod listing;
pub mod mapping;
pub mod queries;
pub mod reader;
pub mod repos;
pub mod source;
pub mod types;

pub use filter::{ReleaseFilter, ReleaseFilterType};
pub use listing::{RepoListing, SummaryEntry, VersionDetail, VersionSummary};
pub use mapping::{AssetNameMapper, MappingError, ReleaseMapper};
pub use reader::{EXCLUDED_EARLY_ACCESS, GraphQlReleaseSource, RepositoryTable};
pub use repos::{UpstreamRepo, repositories_for, vendor_for_repository};
pub use source::{ReleaseSource, SourceError};
