//! [`ReleaseSource`] backed by the upstream GraphQL API.
//!
//! Each call fans out one task per tracked repository. Sibling tasks never
//! cancel each other; once all of them have finished, the first failure (if
//! any) fails the whole version so callers never act on a partial listing.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::task::JoinSet;

use crate::graphql::{GraphQlClient, GraphQlError, QueryOutcome};
use crate::model::{Release, ReleaseId};
use crate::short_error_message;

use super::filter::ReleaseFilter;
use super::listing::{RepoListing, SummaryEntry, VersionDetail, VersionSummary};
use super::mapping::{AssetNameMapper, ReleaseMapper};
use super::queries::{RELEASE_ASSETS, RELEASE_BY_ID, REPOSITORY_RELEASES, REPOSITORY_SUMMARY};
use super::repos::{UpstreamRepo, repositories_for};
use super::source::{ReleaseSource, Result, SourceError};
use super::types::{AssetPageNode, GhRelease, GhReleaseSummary, NodeData, RepositoryData};

/// Early-access releases that are broken upstream and never imported.
pub const EXCLUDED_EARLY_ACCESS: [&str; 2] = ["jdk17u-2022-05-27-19-32-beta", "jdk-11.0.13'+8"];

/// Maps a major version to the repositories to read.
pub type RepositoryTable = fn(u32) -> Vec<UpstreamRepo>;

#[derive(Clone)]
pub struct GraphQlReleaseSource {
    client: GraphQlClient,
    mapper: Arc<dyn ReleaseMapper>,
    repositories: RepositoryTable,
}

impl GraphQlReleaseSource {
    pub fn new(client: GraphQlClient) -> Self {
        Self {
            client,
            mapper: Arc::new(AssetNameMapper),
            repositories: repositories_for,
        }
    }

    #[must_use]
    pub fn with_mapper(mut self, mapper: Arc<dyn ReleaseMapper>) -> Self {
        self.mapper = mapper;
        self
    }

    #[must_use]
    pub fn with_repositories(mut self, repositories: RepositoryTable) -> Self {
        self.repositories = repositories;
        self
    }

    #[must_use]
    pub fn client(&self) -> &GraphQlClient {
        &self.client
    }

    /// Run `fetch` for every repository concurrently, preserving table order.
    async fn fan_out<T, F, Fut>(
        &self,
        version: u32,
        repos: Vec<UpstreamRepo>,
        fetch: F,
    ) -> Result<Vec<(UpstreamRepo, T)>>
    where
        T: Send + 'static,
        F: Fn(Self, UpstreamRepo) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let mut tasks = JoinSet::new();
        for (index, repo) in repos.into_iter().enumerate() {
            let task = fetch(self.clone(), repo.clone());
            tasks.spawn(async move { (index, repo, task.await) });
        }

        let mut done = Vec::new();
        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, repo, Ok(value))) => done.push((index, repo, value)),
                Ok((_, repo, Err(e))) => {
                    tracing::warn!(
                        version,
                        repo = %repo,
                        error = %short_error_message(&e),
                        "Failed to read repository"
                    );
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    tracing::error!(version, error = %e, "Repository fetch task failed");
                    first_error.get_or_insert(SourceError::TaskPanicked(e.to_string()));
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }
        done.sort_by_key(|(index, _, _)| *index);
        Ok(done.into_iter().map(|(_, repo, value)| (repo, value)).collect())
    }

    async fn repo_summary(&self, repo: &UpstreamRepo) -> Result<RepoListing<SummaryEntry>> {
        let variables = json!({ "owner": repo.owner, "name": repo.name });
        let outcome = self
            .client
            .query_all(
                REPOSITORY_SUMMARY,
                variables,
                |page: RepositoryData<GhReleaseSummary>| {
                    page.repository
                        .map(|r| (r.releases.nodes, r.releases.page_info))
                },
            )
            .await
            .map_err(|e| SourceError::upstream(repo.full_name(), e))?;

        Ok(match outcome {
            QueryOutcome::NotResolvable => RepoListing::NotFound,
            QueryOutcome::Data(items) => {
                RepoListing::from_items(items.into_iter().map(SummaryEntry::from).collect())
            }
        })
    }

    async fn repo_detail(
        &self,
        repo: &UpstreamRepo,
        filter: &ReleaseFilter,
    ) -> Result<(RepoListing<Release>, Vec<ReleaseId>)> {
        let variables = json!({ "owner": repo.owner, "name": repo.name });
        let outcome = self
            .client
            .query_all(
                REPOSITORY_RELEASES,
                variables,
                |page: RepositoryData<GhRelease>| {
                    page.repository
                        .map(|r| (r.releases.nodes, r.releases.page_info))
                },
            )
            .await
            .map_err(|e| SourceError::upstream(repo.full_name(), e))?;

        let raw = match outcome {
            QueryOutcome::NotResolvable => return Ok((RepoListing::NotFound, Vec::new())),
            QueryOutcome::Data(raw) => raw,
        };

        let mut releases = Vec::new();
        let mut unmapped = Vec::new();
        for mut release in raw {
            if !filter.includes(repo.vendor, release.updated_at, release.is_prerelease) {
                continue;
            }
            if EXCLUDED_EARLY_ACCESS.contains(&release.name.as_str()) {
                tracing::debug!(release = %release.name, "Skipping excluded early-access release");
                continue;
            }
            self.complete_assets(&mut release).await?;
            match self.mapper.map_release(&release, repo) {
                Ok(mapped) => releases.push(mapped),
                Err(e) => {
                    tracing::warn!(
                        repo = %repo,
                        release_id = %release.id,
                        error = %e,
                        "Failed to map release"
                    );
                    unmapped.push(release.id);
                }
            }
        }

        Ok((RepoListing::from_items(releases), unmapped))
    }

    /// Fetch the remaining asset pages of a release, if any.
    async fn complete_assets(&self, release: &mut GhRelease) -> Result<()> {
        let page_info = &release.release_assets.page_info;
        if !page_info.has_next_page {
            return Ok(());
        }
        let variables = json!({ "id": release.id });
        let mut cursor = page_info.end_cursor.clone();
        let mut more = Vec::new();

        while let Some(current) = cursor.take() {
            let outcome = self
                .client
                .query_page::<NodeData<AssetPageNode>>(RELEASE_ASSETS, &variables, Some(&current))
                .await
                .map_err(|e| SourceError::upstream(release.id.to_string(), e))?;
            let Some(node) = outcome.into_data().and_then(|page| page.data.node) else {
                break;
            };
            let assets = node.release_assets;
            more.extend(assets.nodes);
            if assets.page_info.has_next_page
                && let Some(next) = assets.page_info.end_cursor
                && next != current
            {
                cursor = Some(next);
            }
        }

        tracing::debug!(release_id = %release.id, extra_assets = more.len(), "Fetched remaining assets");
        release.merge_assets(more);
        Ok(())
    }
}

#[async_trait]
impl ReleaseSource for GraphQlReleaseSource {
    #[tracing::instrument(skip(self))]
    async fn summary(&self, version: u32) -> Result<VersionSummary> {
        let repos = (self.repositories)(version);
        let listings = self
            .fan_out(version, repos, |source, repo| async move {
                source.repo_summary(&repo).await
            })
            .await?;
        Ok(VersionSummary::new(version, listings))
    }

    #[tracing::instrument(skip(self, filter))]
    async fn detail(&self, version: u32, filter: &ReleaseFilter) -> Result<VersionDetail> {
        let repos: Vec<UpstreamRepo> = (self.repositories)(version)
            .into_iter()
            .filter(|repo| filter.includes_vendor(repo.vendor))
            .collect();

        let results = self
            .fan_out(version, repos, |source, repo| {
                let filter = filter.clone();
                async move { source.repo_detail(&repo, &filter).await }
            })
            .await?;

        let mut detail = VersionDetail {
            version,
            ..VersionDetail::default()
        };
        for (repo, (listing, mut unmapped)) in results {
            detail.unmapped.append(&mut unmapped);
            detail.repos.push((repo, listing));
        }
        Ok(detail)
    }

    async fn release_by_id(&self, id: &ReleaseId) -> Result<Release> {
        let outcome = match self
            .client
            .query::<NodeData<GhRelease>>(RELEASE_BY_ID, json!({ "id": id }))
            .await
        {
            Ok(outcome) => outcome,
            Err(GraphQlError::Decode(reason)) => {
                return Err(SourceError::Mapping {
                    release_id: id.clone(),
                    reason,
                });
            }
            Err(e) => return Err(SourceError::upstream(id.to_string(), e)),
        };

        let mut release = outcome
            .into_data()
            .and_then(|page| page.data.node)
            .ok_or_else(|| SourceError::Missing(id.clone()))?;

        let repo = UpstreamRepo::from_release_url(&release.url)
            .or_else(|| UpstreamRepo::from_release_url(&release.resource_path))
            .ok_or_else(|| SourceError::Mapping {
                release_id: id.clone(),
                reason: format!("unknown repository for {}", release.url),
            })?;

        self.complete_assets(&mut release).await?;
        self.mapper
            .map_release(&release, &repo)
            .map_err(|e| SourceError::Mapping {
                release_id: id.clone(),
                reason: e.to_string(),
            })
    }
}
