use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Structured JDK version of a release.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionData {
    pub major: u32,
    pub minor: u32,
    pub security: u32,
    #[serde(default)]
    pub patch: Option<u32>,
    #[serde(default)]
    pub pre: Option<String>,
    #[serde(default)]
    pub adopt_build_number: Option<u32>,
    pub build: u32,
    #[serde(default)]
    pub optional: Option<String>,
    pub openjdk_version: String,
    pub semver: String,
}

impl VersionData {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        major: u32,
        minor: u32,
        security: u32,
        patch: Option<u32>,
        pre: Option<String>,
        build: u32,
        adopt_build_number: Option<u32>,
        optional: Option<String>,
        openjdk_version: impl Into<String>,
    ) -> Self {
        let mut version = Self {
            major,
            minor,
            security,
            patch,
            pre,
            adopt_build_number,
            build,
            optional,
            openjdk_version: openjdk_version.into(),
            semver: String::new(),
        };
        version.semver = version.format_semver();
        version
    }

    fn format_semver(&self) -> String {
        let mut out = format!("{}.{}.{}", self.major, self.minor, self.security);
        if let Some(pre) = &self.pre {
            out.push('-');
            out.push_str(pre);
        }
        out.push('+');
        out.push_str(&self.build.to_string());
        if let Some(patch) = self.patch {
            out.push_str(&format!(".{patch}"));
        }
        if let Some(adopt) = self.adopt_build_number {
            out.push_str(&format!(".{adopt}"));
        }
        if let Some(optional) = &self.optional {
            out.push('.');
            out.push_str(optional);
        }
        out
    }

    /// Parse a release name into a version.
    ///
    /// Accepts `jdk-17.0.2+8`, `jdk-11.0.13+8.1`, `jdk-17.0.2.1+1`,
    /// `jdk-21+35-ea-beta`, `jdk8u322-b06` and nightly tags like
    /// `jdk17u-2022-05-27-19-32-beta`.
    #[must_use]
    pub fn parse_release_name(name: &str) -> Option<Self> {
        let name = name.trim();
        if let Some(rest) = name.strip_prefix("jdk-") {
            return parse_modern(rest, name);
        }
        if let Some(rest) = name.strip_prefix("jdk8u") {
            return parse_jdk8(rest, name);
        }
        parse_nightly(name)
    }
}

fn parse_number(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

// 17.0.2+8, 17.0.2.1+1, 11.0.13+8.1, 21+35-ea-beta
fn parse_modern(rest: &str, name: &str) -> Option<VersionData> {
    let (numbers, build_part) = rest.split_once('+')?;
    let mut parts = numbers.split('.');
    let major = parse_number(parts.next()?)?;
    let minor = parts.next().map(parse_number).unwrap_or(Some(0))?;
    let security = parts.next().map(parse_number).unwrap_or(Some(0))?;
    let patch = match parts.next() {
        Some(p) => Some(parse_number(p)?),
        None => None,
    };
    if parts.next().is_some() {
        return None;
    }

    let mut segments = build_part.split('-');
    let build_segment = segments.next()?;
    let (build, adopt_build_number) = match build_segment.split_once('.') {
        Some((b, a)) => (parse_number(b)?, Some(parse_number(a)?)),
        None => (parse_number(build_segment)?, None),
    };
    let pre = match segments.next() {
        Some("ea") | Some("beta") => Some("ea".to_string()),
        Some(_) => return None,
        None => None,
    };

    Some(VersionData::new(
        major,
        minor,
        security,
        patch,
        pre,
        build,
        adopt_build_number,
        None,
        name.trim_start_matches("jdk-"),
    ))
}

// 322-b06, 322-b06.1, 322-b06-ea
fn parse_jdk8(rest: &str, name: &str) -> Option<VersionData> {
    let (update, build_part) = rest.split_once("-b")?;
    let security = parse_number(update)?;
    let mut segments = build_part.split('-');
    let build_segment = segments.next()?;
    let (build, adopt_build_number) = match build_segment.split_once('.') {
        Some((b, a)) => (parse_number(b)?, Some(parse_number(a)?)),
        None => (parse_number(build_segment)?, None),
    };
    let pre = match segments.next() {
        Some("ea") | Some("beta") => Some("ea".to_string()),
        Some(_) => return None,
        None => None,
    };

    Some(VersionData::new(
        8,
        0,
        security,
        None,
        pre,
        build,
        adopt_build_number,
        None,
        format!("1.8.0_{}", name.trim_start_matches("jdk8u")),
    ))
}

// jdk17u-2022-05-27-19-32-beta
fn parse_nightly(name: &str) -> Option<VersionData> {
    let rest = name.strip_prefix("jdk")?;
    let (major, timestamp) = rest.split_once("u-")?;
    let major = parse_number(major)?;
    let timestamp = timestamp.strip_suffix("-beta")?;
    let stamp_parts: Vec<&str> = timestamp.split('-').collect();
    if stamp_parts.len() != 5 || stamp_parts.iter().any(|p| parse_number(p).is_none()) {
        return None;
    }

    Some(VersionData::new(
        major,
        0,
        0,
        None,
        Some("beta".to_string()),
        0,
        None,
        Some(stamp_parts.concat()),
        name,
    ))
}

impl Ord for VersionData {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.security.cmp(&other.security))
            .then(self.patch.unwrap_or(0).cmp(&other.patch.unwrap_or(0)))
            // A pre-release sorts before the release it precedes.
            .then(match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
            .then(self.build.cmp(&other.build))
            .then(
                self.adopt_build_number
                    .unwrap_or(0)
                    .cmp(&other.adopt_build_number.unwrap_or(0)),
            )
            .then(self.optional.cmp(&other.optional))
            .then(self.openjdk_version.cmp(&other.openjdk_version))
    }
}

impl PartialOrd for VersionData {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VersionData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.semver)
    }
}
