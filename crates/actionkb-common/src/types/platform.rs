//! Platform and brand classification of automation code
//!
//! Page objects live in per-platform and per-brand directories; these enums are
//! the normalized form of those directory fragments.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Device platform a page object drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ctv,
    Mobile,
    Web,
    Html5,
    Hdmi,
    #[default]
    None,
}

impl Platform {
    /// All concrete platforms, in table order
    pub const ALL: [Platform; 5] = [
        Platform::Ctv,
        Platform::Mobile,
        Platform::Web,
        Platform::Html5,
        Platform::Hdmi,
    ];

    /// Wire name of the platform
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ctv => "ctv",
            Platform::Mobile => "mobile",
            Platform::Web => "web",
            Platform::Html5 => "html5",
            Platform::Hdmi => "hdmi",
            Platform::None => "none",
        }
    }

    /// Whether this is a concrete platform
    pub fn is_known(&self) -> bool {
        !matches!(self, Platform::None)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ctv" => Ok(Platform::Ctv),
            "mobile" => Ok(Platform::Mobile),
            "web" => Ok(Platform::Web),
            "html5" => Ok(Platform::Html5),
            "hdmi" => Ok(Platform::Hdmi),
            "none" | "" => Ok(Platform::None),
            other => Err(format!("unknown platform: {}", other)),
        }
    }
}

/// Product brand a page object belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Brand {
    Pplus,
    PplusIntl,
    #[default]
    None,
}

impl Brand {
    /// Wire name of the brand
    pub fn as_str(&self) -> &'static str {
        match self {
            Brand::Pplus => "pplus",
            Brand::PplusIntl => "pplus_intl",
            Brand::None => "none",
        }
    }

    /// Whether this is a concrete brand
    pub fn is_known(&self) -> bool {
        !matches!(self, Brand::None)
    }
}

impl fmt::Display for Brand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Brand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pplus" => Ok(Brand::Pplus),
            "pplus_intl" | "pplusintl" => Ok(Brand::PplusIntl),
            "none" | "" => Ok(Brand::None),
            other => Err(format!("unknown brand: {}", other)),
        }
    }
}
