//! GraphQL documents for the upstream release API.
//!
//! Every paginated query declares a `$cursor` variable and asks for the
//! `rateLimit` block so the client can self-throttle.

/// Releases and assets per page.
pub const PAGE_SIZE: u32 = 50;

pub const REPOSITORY_SUMMARY: &str = r#"
query($owner: String!, $name: String!, $cursor: String) {
  repository(owner: $owner, name: $name) {
    releases(first: 50, after: $cursor, orderBy: {field: CREATED_AT, direction: DESC}) {
      nodes {
        id
        name
        publishedAt
        updatedAt
        isPrerelease
        releaseAssets { totalCount }
      }
      pageInfo { hasNextPage endCursor }
    }
  }
  rateLimit { cost remaining }
}
"#;

pub const REPOSITORY_RELEASES: &str = r#"
query($owner: String!, $name: String!, $cursor: String) {
  repository(owner: $owner, name: $name) {
    releases(first: 50, after: $cursor, orderBy: {field: CREATED_AT, direction: DESC}) {
      nodes {
        id
        url
        name
        publishedAt
        updatedAt
        isPrerelease
        resourcePath
        releaseAssets(first: 50) {
          totalCount
          nodes { name downloadUrl downloadCount size updatedAt }
          pageInfo { hasNextPage endCursor }
        }
      }
      pageInfo { hasNextPage endCursor }
    }
  }
  rateLimit { cost remaining }
}
"#;

pub const RELEASE_BY_ID: &str = r#"
query($id: ID!) {
  node(id: $id) {
    ... on Release {
      id
      url
      name
      publishedAt
      updatedAt
      isPrerelease
      resourcePath
      releaseAssets(first: 50) {
        totalCount
        nodes { name downloadUrl downloadCount size updatedAt }
        pageInfo { hasNextPage endCursor }
      }
    }
  }
  rateLimit { cost remaining }
}
"#;

pub const RELEASE_ASSETS: &str = r#"
query($id: ID!, $cursor: String) {
  node(id: $id) {
    ... on Release {
      releaseAssets(first: 50, after: $cursor) {
        totalCount
        nodes { name downloadUrl downloadCount size updatedAt }
        pageInfo { hasNextPage endCursor }
      }
    }
  }
  rateLimit { cost remaining }
}
"#;
