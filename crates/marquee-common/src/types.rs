//! Core type definitions shared by the scanner and the catalog.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Resolution class of a movie, as shown in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quality {
    /// Below 720 lines.
    #[serde(rename = "SD")]
    Sd,
    /// 720 to 1080 lines.
    #[serde(rename = "HD")]
    Hd,
    /// Above 1080, up to 1440 lines.
    #[serde(rename = "2K")]
    TwoK,
    /// Above 1440, up to 2160 lines.
    #[serde(rename = "4K")]
    FourK,
    /// Above 2160 lines.
    #[serde(rename = "4K+")]
    FourKPlus,
    /// The file could not be probed.
    Unknown,
}

impl Quality {
    /// Classify a video by its frame height.
    #[must_use]
    pub fn from_height(height: u32) -> Self {
        if height > 2160 {
            Self::FourKPlus
        } else if height > 1440 {
            Self::FourK
        } else if height > 1080 {
            Self::TwoK
        } else if height >= 720 {
            Self::Hd
        } else {
            Self::Sd
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sd => write!(f, "SD"),
            Self::Hd => write!(f, "HD"),
            Self::TwoK => write!(f, "2K"),
            Self::FourK => write!(f, "4K"),
            Self::FourKPlus => write!(f, "4K+"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}
