//! Business-criticality tiers.
//!
//! Tiers parameterize health reduction: the same production outage is
//! `critical` for a TIER-1 service but only `degraded` for TIER-3.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Business-criticality label attached to every catalog service.
///
/// Ordering is by criticality (TIER-1 is the most critical). The ordering is
/// used only for reduction policy, never for sorting API output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Tier {
    /// Critical: customer-facing, revenue-impacting.
    #[serde(rename = "TIER-1")]
    Tier1,
    /// Important: degradation is visible but survivable.
    #[serde(rename = "TIER-2")]
    Tier2,
    /// Standard: internal tooling and batch workloads.
    #[default]
    #[serde(rename = "TIER-3")]
    Tier3,
}

impl Tier {
    /// Returns the wire representation (`TIER-1` ... `TIER-3`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Tier1 => "TIER-1",
            Self::Tier2 => "TIER-2",
            Self::Tier3 => "TIER-3",
        }
    }

    /// Returns true for the most critical tier.
    #[must_use]
    pub const fn is_critical(&self) -> bool {
        matches!(self, Self::Tier1)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TIER-1" => Ok(Self::Tier1),
            "TIER-2" => Ok(Self::Tier2),
            "TIER-3" => Ok(Self::Tier3),
            other => Err(Error::validation(
                "tier",
                format!("unknown tier '{other}' (expected TIER-1, TIER-2, or TIER-3)"),
            )),
        }
    }
}
