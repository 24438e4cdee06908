//! Severity labels to display tiers.
//!
//! The service emits free-form severity strings. Anything outside the
//! known set falls through to the info tier instead of failing, so new
//! labels still render.

use serde::{Deserialize, Serialize};

/// Display tier for a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    High,
    Medium,
    Low,
    Info,
}

impl Tier {
    /// All tiers, most severe first.
    pub const ALL: [Tier; 4] = [Tier::High, Tier::Medium, Tier::Low, Tier::Info];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::High => "high",
            Tier::Medium => "medium",
            Tier::Low => "low",
            Tier::Info => "info",
        }
    }

    /// Sort rank, 0 is most severe.
    pub fn rank(&self) -> usize {
        match self {
            Tier::High => 0,
            Tier::Medium => 1,
            Tier::Low => 2,
            Tier::Info => 3,
        }
    }

    /// Style class name used by web front ends.
    pub fn css_class(&self) -> &'static str {
        match self {
            Tier::High => "severity-high",
            Tier::Medium => "severity-medium",
            Tier::Low => "severity-low",
            Tier::Info => "severity-info",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Icon shown next to a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Icon {
    Red,
    Yellow,
    Blue,
    CheckMark,
}

impl Icon {
    pub fn as_str(&self) -> &'static str {
        match self {
            Icon::Red => "red",
            Icon::Yellow => "yellow",
            Icon::Blue => "blue",
            Icon::CheckMark => "check-mark",
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            Icon::Red => "🔴",
            Icon::Yellow => "🟡",
            Icon::Blue => "🔵",
            Icon::CheckMark => "✅",
        }
    }
}

/// Tier and icon for one severity label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub tier: Tier,
    pub icon: Icon,
}

/// Classify a severity label. Total: unknown or missing labels map to info.
///
/// Matching is exact; `"HIGH"` is not `"high"`.
pub fn classify(label: Option<&str>) -> Classification {
    match label {
        Some("high") => Classification {
            tier: Tier::High,
            icon: Icon::Red,
        },
        Some("medium") => Classification {
            tier: Tier::Medium,
            icon: Icon::Yellow,
        },
        Some("low") => Classification {
            tier: Tier::Low,
            icon: Icon::Blue,
        },
        _ => Classification {
            tier: Tier::Info,
            icon: Icon::CheckMark,
        },
    }
}
