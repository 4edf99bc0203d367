//! Gap severity and the ladder helpers detectors build their policies on.

use crate::rules::RiskLevel;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Severity of a coverage gap.
///
/// Ordered `Low < Medium < High < Critical`, so `>=` reads as "at least".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum GapSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl GapSeverity {
    /// Report order: most severe first.
    pub const DESCENDING: [Self; 4] = [Self::Critical, Self::High, Self::Medium, Self::Low];

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Sort key: critical = 0 ... low = 3.
    #[must_use]
    pub const fn rank(&self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }

    /// The severity tier a rule's own risk level implies.
    #[must_use]
    pub const fn tier(risk: RiskLevel) -> Self {
        match risk {
            RiskLevel::Critical => Self::Critical,
            RiskLevel::High => Self::High,
            RiskLevel::Medium => Self::Medium,
        }
    }

    /// One notch below the rule's tier. The default for ordinary variants.
    #[must_use]
    pub const fn one_below(risk: RiskLevel) -> Self {
        match risk {
            RiskLevel::Critical => Self::High,
            RiskLevel::High => Self::Medium,
            RiskLevel::Medium => Self::Low,
        }
    }

    /// Clamp to the rule's tier. Escalated shapes may reach it, never pass it.
    #[must_use]
    pub fn capped_at(self, risk: RiskLevel) -> Self {
        self.min(Self::tier(risk))
    }
}
