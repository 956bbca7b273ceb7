//! The upstream repositories tracked for each major version.

use std::fmt;

use crate::model::Vendor;

pub const ADOPT_ORG: &str = "AdoptOpenJDK";
pub const ADOPTIUM_ORG: &str = "adoptium";

/// One upstream repository and the vendor whose releases it holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UpstreamRepo {
    pub owner: String,
    pub name: String,
    pub vendor: Vendor,
}

impl UpstreamRepo {
    pub fn new(owner: impl Into<String>, name: impl Into<String>, vendor: Vendor) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            vendor,
        }
    }

    /// `owner/name`.
    #[inline]
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Identify the repository a release URL or resource path belongs to.
    ///
    /// Accepts `https://github.com/<owner>/<name>/releases/tag/<tag>` and
    /// `/<owner>/<name>/releases/tag/<tag>`.
    #[must_use]
    pub fn from_release_url(url: &str) -> Option<Self> {
        let path = url
            .strip_prefix("https://github.com")
            .or_else(|| url.strip_prefix("http://github.com"))
            .unwrap_or(url);
        let mut segments = path.trim_start_matches('/').split('/');
        let owner = segments.next().filter(|s| !s.is_empty())?;
        let name = segments.next().filter(|s| !s.is_empty())?;
        let vendor = vendor_for_repository(name)?;
        Some(Self::new(owner, name, vendor))
    }
}

impl fmt::Display for UpstreamRepo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Every repository that may hold releases of `version`.
///
/// Not every combination exists upstream; absent ones resolve to nothing.
#[must_use]
pub fn repositories_for(version: u32) -> Vec<UpstreamRepo> {
    vec![
        UpstreamRepo::new(
            ADOPT_ORG,
            format!("openjdk{version}-openj9-releases"),
            Vendor::Adoptopenjdk,
        ),
        UpstreamRepo::new(
            ADOPT_ORG,
            format!("openjdk{version}-openj9-nightly"),
            Vendor::Adoptopenjdk,
        ),
        UpstreamRepo::new(
            ADOPT_ORG,
            format!("openjdk{version}-nightly"),
            Vendor::Adoptopenjdk,
        ),
        UpstreamRepo::new(
            ADOPT_ORG,
            format!("openjdk{version}-binaries"),
            Vendor::Adoptopenjdk,
        ),
        UpstreamRepo::new(
            ADOPT_ORG,
            format!("openjdk{version}-upstream-binaries"),
            Vendor::Openjdk,
        ),
        UpstreamRepo::new(
            ADOPT_ORG,
            format!("openjdk{version}-dragonwell-binaries"),
            Vendor::Alibaba,
        ),
        UpstreamRepo::new(
            ADOPTIUM_ORG,
            format!("temurin{version}-binaries"),
            Vendor::Eclipse,
        ),
        UpstreamRepo::new(ADOPT_ORG, format!("semeru{version}-binaries"), Vendor::Ibm),
    ]
}

/// Vendor owning a repository, judged by its name pattern.
#[must_use]
pub fn vendor_for_repository(name: &str) -> Option<Vendor> {
    let versioned = |prefix: &str, suffix: &str| {
        name.strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(suffix))
            .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
    };

    if versioned("openjdk", "-upstream-binaries") {
        Some(Vendor::Openjdk)
    } else if versioned("openjdk", "-dragonwell-binaries") {
        Some(Vendor::Alibaba)
    } else if versioned("openjdk", "-openj9-releases")
        || versioned("openjdk", "-openj9-nightly")
        || versioned("openjdk", "-nightly")
        || versioned("openjdk", "-binaries")
    {
        Some(Vendor::Adoptopenjdk)
    } else if versioned("temurin", "-binaries") {
        Some(Vendor::Eclipse)
    } else if versioned("semeru", "-binaries") {
        Some(Vendor::Ibm)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repositories_cover_every_vendor() {
        let repos = repositories_for(17);
        assert_eq!(repos.len(), 8);
        for vendor in Vendor::ALL {
            assert!(repos.iter().any(|r| r.vendor == vendor), "{vendor} missing");
        }
        assert!(repos.contains(&UpstreamRepo::new(
            "adoptium",
            "temurin17-binaries",
            Vendor::Eclipse
        )));
    }

    #[test]
    fn every_generated_repository_maps_back_to_its_vendor() {
        for repo in repositories_for(21) {
            assert_eq!(vendor_for_repository(&repo.name), Some(repo.vendor), "{repo}");
        }
    }

    #[test]
    fn vendor_for_repository_rejects_unknown_names() {
        assert_eq!(vendor_for_repository("temurin-binaries"), None);
        assert_eq!(vendor_for_repository("openjdkX-binaries"), None);
        assert_eq!(vendor_for_repository("api.adoptium.net"), None);
    }

    #[test]
    fn from_release_url_parses_url_and_resource_path() {
        let repo = UpstreamRepo::from_release_url(
            "https://github.com/adoptium/temurin17-binaries/releases/tag/jdk-17.0.2%2B8",
        )
        .unwrap();
        assert_eq!(repo.full_name(), "adoptium/temurin17-binaries");
        assert_eq!(repo.vendor, Vendor::Eclipse);

        let repo =
            UpstreamRepo::from_release_url("/AdoptOpenJDK/semeru11-binaries/releases/tag/x").unwrap();
        assert_eq!(repo.vendor, Vendor::Ibm);

        assert!(UpstreamRepo::from_release_url("https://github.com/").is_none());
    }
}
