use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! token_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => $token:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $token)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $token,)+
                }
            }

            /// Parse an asset-name token, case-insensitively.
            #[must_use]
            pub fn from_token(token: &str) -> Option<Self> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(token))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

token_enum! {
    pub enum Architecture {
        X64 => "x64",
        X86 => "x86",
        X32 => "x32",
        Ppc64 => "ppc64",
        Ppc64le => "ppc64le",
        S390x => "s390x",
        Aarch64 => "aarch64",
        Arm => "arm",
        Sparcv9 => "sparcv9",
        Riscv64 => "riscv64",
    }
}

token_enum! {
    pub enum OperatingSystem {
        Linux => "linux",
        Windows => "windows",
        Mac => "mac",
        Solaris => "solaris",
        Aix => "aix",
        AlpineLinux => "alpine-linux",
    }
}

token_enum! {
    pub enum ImageType {
        Jdk => "jdk",
        Jre => "jre",
        TestImage => "testimage",
        DebugImage => "debugimage",
        StaticLibs => "staticlibs",
        Sources => "sources",
        Sbom => "sbom",
        Jmods => "jmods",
    }
}

token_enum! {
    pub enum JvmImpl {
        Hotspot => "hotspot",
        Openj9 => "openj9",
    }
}

token_enum! {
    pub enum HeapSize {
        Normal => "normal",
        Large => "large",
    }
}

token_enum! {
    pub enum CLib {
        Musl => "musl",
        Glibc => "glibc",
    }
}

token_enum! {
    pub enum Project {
        Jdk => "jdk",
        Valhalla => "valhalla",
        Metropolis => "metropolis",
        Jfr => "jfr",
        Shenandoah => "shenandoah",
    }
}

/// A downloadable file: the archive itself or an installer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub link: String,
    pub size: u64,
    #[serde(default)]
    pub checksum: Option<String>,
    #[serde(default)]
    pub checksum_link: Option<String>,
    #[serde(default)]
    pub signature_link: Option<String>,
    #[serde(default)]
    pub metadata_link: Option<String>,
    pub download_count: u64,
}

/// One build artifact of a release.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Binary {
    pub os: OperatingSystem,
    pub architecture: Architecture,
    pub image_type: ImageType,
    #[serde(default)]
    pub c_lib: Option<CLib>,
    pub jvm_impl: JvmImpl,
    pub package: Package,
    #[serde(default)]
    pub installer: Option<Package>,
    pub heap_size: HeapSize,
    pub download_count: u64,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub scm_ref: Option<String>,
    pub project: Project,
}

/// Identity of a binary within a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BinaryKey {
    pub architecture: Architecture,
    pub heap_size: HeapSize,
    pub image_type: ImageType,
    pub jvm_impl: JvmImpl,
    pub os: OperatingSystem,
    pub project: Project,
    pub c_lib: Option<CLib>,
}

impl Binary {
    #[must_use]
    pub fn key(&self) -> BinaryKey {
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
}
