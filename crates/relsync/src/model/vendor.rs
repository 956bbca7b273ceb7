use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Organisation that publishes a build of the JDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    Adoptopenjdk,
    Openjdk,
    Alibaba,
    Eclipse,
    Ibm,
}

impl Vendor {
    pub const ALL: [Vendor; 5] = [
        Vendor::Adoptopenjdk,
        Vendor::Openjdk,
        Vendor::Alibaba,
        Vendor::Eclipse,
        Vendor::Ibm,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Vendor::Adoptopenjdk => "adoptopenjdk",
            Vendor::Openjdk => "openjdk",
            Vendor::Alibaba => "alibaba",
            Vendor::Eclipse => "eclipse",
            Vendor::Ibm => "ibm",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Vendor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Vendor::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown vendor: {s}"))
    }
}
