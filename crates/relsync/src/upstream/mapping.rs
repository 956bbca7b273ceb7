//! Mapping raw upstream releases into the domain model.
//!
//! The default [`AssetNameMapper`] classifies assets purely by file name,
//! e.g. `OpenJDK17U-jdk_x64_linux_hotspot_17.0.2_8.tar.gz`. Sidecar files
//! (`.sha256.txt`, `.sig`, `.json`) are paired with the package they
//! describe and installers (`.msi`, `.pkg`) with the archive of the same
//! platform.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::model::{
    Architecture, Binary, BinaryKey, CLib, HeapSize, ImageType, JvmImpl, OperatingSystem, Package,
    Project, Release, ReleaseType, SourcePackage, VersionData,
};

use super::repos::UpstreamRepo;
use super::types::{GhAsset, GhRelease};

const ARCHIVE_EXTENSIONS: [&str; 3] = [".tar.gz", ".zip", ".json"];
const INSTALLER_EXTENSIONS: [&str; 2] = [".msi", ".pkg"];
const CHECKSUM_SUFFIX: &str = ".sha256.txt";
const SIGNATURE_SUFFIX: &str = ".sig";
const METADATA_SUFFIX: &str = ".json";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("release name {0:?} is not a recognised version")]
    UnparseableName(String),

    #[error("release {0:?} has no recognisable binaries")]
    NoBinaries(String),
}

/// Turns one upstream release into a [`Release`].
pub trait ReleaseMapper: Send + Sync {
    fn map_release(&self, release: &GhRelease, repo: &UpstreamRepo) -> Result<Release, MappingError>;
}

/// File-name based classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssetNameMapper;

impl ReleaseMapper for AssetNameMapper {
    fn map_release(&self, release: &GhRelease, repo: &UpstreamRepo) -> Result<Release, MappingError> {
        let version = VersionData::parse_release_name(&release.name)
            .ok_or_else(|| MappingError::UnparseableName(release.name.clone()))?;

        let assets = &release.release_assets.nodes;
        let sidecars = Sidecars::collect(assets);

        let mut archives: BTreeMap<BinaryKey, Binary> = BTreeMap::new();
        let mut installers: Vec<(BinaryKey, Package)> = Vec::new();
        let mut source = None;

        for asset in assets {
            if sidecars.is_sidecar(&asset.name) {
                continue;
            }
            let Some(kind) = package_kind(&asset.name) else {
                continue;
            };
            let Some(platform) = Platform::classify(&asset.name) else {
                if kind == PackageKind::Archive && is_source_archive(&asset.name) {
                    source = Some(SourcePackage {
                        name: asset.name.clone(),
                        link: asset.download_url.clone(),
                        size: asset.size,
                    });
                }
                continue;
            };
            let package = sidecars.package_for(asset);
            match kind {
                PackageKind::Archive => {
                    let binary = platform.into_binary(package, asset);
                    archives.insert(binary.key(), binary);
                }
                PackageKind::Installer => installers.push((platform.key(), package)),
            }
        }

        for (key, installer) in installers {
            match archives.get_mut(&key) {
                Some(binary) => {
                    binary.download_count += installer.download_count;
                    binary.installer = Some(installer);
                }
                None => tracing::debug!(
                    release = %release.name,
                    installer = %installer.name,
                    "Installer without matching archive, skipping"
                ),
            }
        }

        if archives.is_empty() {
            return Err(MappingError::NoBinaries(release.name.clone()));
        }

        let release_type = if release.is_prerelease || version.pre.is_some() {
            ReleaseType::Ea
        } else {
            ReleaseType::Ga
        };

        Ok(Release::new(
            release.id.clone(),
            release_type,
            release.url.clone(),
            release.name.clone(),
            release.published_at,
            release.updated_at,
            archives.into_values().collect(),
            repo.vendor,
            version,
        )
        .with_source(source)
        .with_upstream(repo.full_name(), release.release_assets.total_count))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PackageKind {
    Archive,
    Installer,
}

fn package_kind(name: &str) -> Option<PackageKind> {
    if INSTALLER_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
        Some(PackageKind::Installer)
    } else if ARCHIVE_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
        Some(PackageKind::Archive)
    } else {
        None
    }
}

fn strip_extension(name: &str) -> &str {
    ARCHIVE_EXTENSIONS
        .iter()
        .chain(INSTALLER_EXTENSIONS.iter())
        .find_map(|ext| name.strip_suffix(ext))
        .unwrap_or(name)
}

/// Lowercased `_`-separated tokens of the file stem.
fn name_tokens(name: &str) -> impl Iterator<Item = String> + '_ {
    strip_extension(name).split('_').map(str::to_ascii_lowercase)
}

fn is_source_archive(name: &str) -> bool {
    name_tokens(name).any(|token| token.split('-').any(|part| part == "sources"))
}

/// Checksum, signature and metadata links keyed by the package they describe.
#[derive(Default)]
struct Sidecars<'a> {
    checksums: BTreeMap<&'a str, &'a str>,
    signatures: BTreeMap<&'a str, &'a str>,
    metadata: BTreeMap<&'a str, &'a str>,
}

impl<'a> Sidecars<'a> {
    fn collect(assets: &'a [GhAsset]) -> Self {
        let mut sidecars = Self::default();
        for asset in assets {
            let name = asset.name.as_str();
            let link = asset.download_url.as_str();
            if let Some(base) = name.strip_suffix(CHECKSUM_SUFFIX) {
                sidecars.checksums.insert(base, link);
            } else if let Some(base) = name.strip_suffix(SIGNATURE_SUFFIX) {
                sidecars.signatures.insert(base, link);
            } else if let Some(base) = name.strip_suffix(METADATA_SUFFIX)
                && package_kind(base).is_some()
            {
                sidecars.metadata.insert(base, link);
            }
        }
        sidecars
    }

    fn is_sidecar(&self, name: &str) -> bool {
        name.ends_with(CHECKSUM_SUFFIX)
            || name.ends_with(SIGNATURE_SUFFIX)
            || name
                .strip_suffix(METADATA_SUFFIX)
                .is_some_and(|base| package_kind(base).is_some())
    }

    fn package_for(&self, asset: &GhAsset) -> Package {
        let name = asset.name.as_str();
        Package {
            name: asset.name.clone(),
            link: asset.download_url.clone(),
            size: asset.size,
            checksum: None,
            checksum_link: self.checksums.get(name).map(|s| (*s).to_string()),
            signature_link: self.signatures.get(name).map(|s| (*s).to_string()),
            metadata_link: self.metadata.get(name).map(|s| (*s).to_string()),
            download_count: asset.download_count,
        }
    }
}

/// Platform attributes read from an asset name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Platform {
    os: OperatingSystem,
    architecture: Architecture,
    image_type: ImageType,
    jvm_impl: JvmImpl,
    heap_size: HeapSize,
    c_lib: Option<CLib>,
    project: Project,
}

impl Platform {
    fn classify(name: &str) -> Option<Self> {
        let mut os = None;
        let mut architecture = None;
        let mut image_type = None;
        let mut jvm_impl = None;
        let mut heap_size = HeapSize::Normal;
        let mut c_lib = None;
        let mut project = Project::Jdk;

        for token in name_tokens(name) {
            if token == "x86-32" {
                architecture.get_or_insert(Architecture::X32);
                continue;
            }
            if token.ends_with("xl") || token == "largeheap" {
                heap_size = HeapSize::Large;
                continue;
            }
            if let Some(found) = OperatingSystem::from_token(&token) {
                os.get_or_insert(found);
                continue;
            }
            for part in token.split('-') {
                if let Some(found) = Architecture::from_token(part) {
                    architecture.get_or_insert(found);
                } else if let Some(found) = OperatingSystem::from_token(part) {
                    os.get_or_insert(found);
                } else if let Some(found) = ImageType::from_token(part) {
                    image_type.get_or_insert(found);
                } else if let Some(found) = JvmImpl::from_token(part) {
                    jvm_impl.get_or_insert(found);
                } else if let Some(found) = CLib::from_token(part) {
                    c_lib.get_or_insert(found);
                } else if let Some(found) = Project::from_token(part)
                    && found != Project::Jdk
                {
                    project = found;
                }
            }
        }

        let os = os?;
        if os == OperatingSystem::AlpineLinux {
            c_lib.get_or_insert(CLib::Musl);
        }
        Some(Self {
            os,
            architecture: architecture?,
            image_type: image_type?,
            jvm_impl: jvm_impl.unwrap_or(JvmImpl::Hotspot),
            heap_size,
            c_lib,
            project,
        })
    }

    fn key(&self) -> BinaryKey {
        BinaryKey {
            architecture: self.architecture,
            heap_size: self.heap_size,
            image_type: self.image_type,
            jvm_impl: self.jvm_impl,
            os: self.os,
            project: self.project,
            c_lib: self.c_lib,
        }
    }

    fn into_binary(self, package: Package, asset: &GhAsset) -> Binary {
        Binary {
            os: self.os,
            architecture: self.architecture,
            image_type: self.image_type,
            c_lib: self.c_lib,
            jvm_impl: self.jvm_impl,
            download_count: package.download_count,
            package,
            installer: None,
            heap_size: self.heap_size,
            updated_at: asset.updated_at,
            scm_ref: None,
            project: self.project,
        }
    }
}
