//! Closed categorical domains shared by every report section.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Spend-based player segmentation, in canonical display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VipTier {
    /// Whale.
    Whale,
    /// Super R.
    SuperR,
    /// Big R.
    BigR,
    /// Medium R.
    MediumR,
    /// Small R.
    SmallR,
    /// Non-spender or cross-server new role.
    NonR,
}

impl VipTier {
    /// Every tier in canonical order.
    pub const ALL: [Self; 6] = [
        Self::Whale,
        Self::SuperR,
        Self::BigR,
        Self::MediumR,
        Self::SmallR,
        Self::NonR,
    ];

    /// Zero-based position in the canonical order.
    pub const fn ordinal(self) -> usize {
        match self {
            Self::Whale => 0,
            Self::SuperR => 1,
            Self::BigR => 2,
            Self::MediumR => 3,
            Self::SmallR => 4,
            Self::NonR => 5,
        }
    }

    /// Tier at the given ordinal, if any.
    pub const fn from_ordinal(ordinal: usize) -> Option<Self> {
        match ordinal {
            0 => Some(Self::Whale),
            1 => Some(Self::SuperR),
            2 => Some(Self::BigR),
            3 => Some(Self::MediumR),
            4 => Some(Self::SmallR),
            5 => Some(Self::NonR),
            _ => None,
        }
    }

    /// Label as it appears in the workbook export.
    pub const fn default_sheet_label(self) -> &'static str {
        match self {
            Self::Whale => "Whale",
            Self::SuperR => "Super R",
            Self::BigR => "Big R",
            Self::MediumR => "Medium R",
            Self::SmallR => "Small R",
            Self::NonR => "Non-R or Cross-server New Role",
        }
    }

    /// Abbreviated label used on chart axes.
    pub const fn default_display_label(self) -> &'static str {
        match self {
            Self::NonR => "Non-R",
            other => other.default_sheet_label(),
        }
    }

    /// Whether the tier contains paying players.
    pub const fn is_spender(self) -> bool {
        !matches!(self, Self::NonR)
    }
}

impl fmt::Display for VipTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_display_label())
    }
}

/// Server cohort bucketed by time since the server opened, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneAge {
    /// Open for 24 months or more.
    Months24Plus,
    /// Open for 12 months or more.
    Months12Plus,
    /// Open for 6 months or more.
    Months6Plus,
    /// Open for 3 months or more.
    Months3Plus,
    /// Open for less than 3 months.
    Under3Months,
}

impl ZoneAge {
    /// Every zone age in canonical order.
    pub const ALL: [Self; 5] = [
        Self::Months24Plus,
        Self::Months12Plus,
        Self::Months6Plus,
        Self::Months3Plus,
        Self::Under3Months,
    ];

    /// Zero-based position in the canonical order.
    pub const fn ordinal(self) -> usize {
        match self {
            Self::Months24Plus => 0,
            Self::Months12Plus => 1,
            Self::Months6Plus => 2,
            Self::Months3Plus => 3,
            Self::Under3Months => 4,
        }
    }

    /// Zone age at the given ordinal, if any.
    pub const fn from_ordinal(ordinal: usize) -> Option<Self> {
        match ordinal {
            0 => Some(Self::Months24Plus),
            1 => Some(Self::Months12Plus),
            2 => Some(Self::Months6Plus),
            3 => Some(Self::Months3Plus),
            4 => Some(Self::Under3Months),
            _ => None,
        }
    }

    /// Label as it appears in the workbook export.
    pub const fn default_sheet_label(self) -> &'static str {
        match self {
            Self::Months24Plus => "Server Open 24Months+",
            Self::Months12Plus => "Server Open 12Months+",
            Self::Months6Plus => "Server Open 6Months+",
            Self::Months3Plus => "Server Open 3Months+",
            Self::Under3Months => "Server Open 3Months-",
        }
    }

    /// Abbreviated label used on panel titles.
    pub const fn default_display_label(self) -> &'static str {
        match self {
            Self::Months24Plus => "24M+",
            Self::Months12Plus => "12M+",
            Self::Months6Plus => "6M+",
            Self::Months3Plus => "3M+",
            Self::Under3Months => "3M-",
        }
    }
}

impl fmt::Display for ZoneAge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_display_label())
    }
}

/// The five independent sections of the weekly report, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionId {
    /// Weekly/daily KPIs, channels and registration cohorts.
    Kpi,
    /// Diamond spend and holdings.
    Currency,
    /// Server zones and payment tiers.
    UserBase,
    /// Core hero holdings.
    Hero,
    /// Time-limited activities.
    Activities,
}

impl SectionId {
    /// Every section in run order.
    pub const ALL: [Self; 5] = [
        Self::Kpi,
        Self::Currency,
        Self::UserBase,
        Self::Hero,
        Self::Activities,
    ];

    /// Output subdirectory for the section's charts.
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Kpi => "kpi",
            Self::Currency => "currency",
            Self::UserBase => "user_base",
            Self::Hero => "hero",
            Self::Activities => "activities",
        }
    }

    /// Human readable title used in progress logs.
    pub const fn title(self) -> &'static str {
        match self {
            Self::Kpi => "KPI",
            Self::Currency => "Currency",
            Self::UserBase => "User Base",
            Self::Hero => "Hero",
            Self::Activities => "Activity",
        }
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}
