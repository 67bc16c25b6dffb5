//! Tests for the closed categorical domains in opsgraph-common.
//!
//! This test suite covers:
//! - Canonical ordering being total and consistent with ordinals
//! - Display and sheet labels
//! - Serialization of the enums used in configuration files

use std::collections::HashSet;
use opsgraph_common::types::*;

#[cfg(test)]
mod vip_tier_tests {
    use super::*;

    #[test]
    fn test_ordinals_follow_canonical_order() {
        for (i, tier) in VipTier::ALL.iter().enumerate() {
            assert_eq!(tier.ordinal(), i);
            assert_eq!(VipTier::from_ordinal(i), Some(*tier));
        }
        assert_eq!(VipTier::from_ordinal(VipTier::ALL.len()), None);
    }

    #[test]
    fn test_sort_matches_canonical_order() {
        let mut shuffled = vec![
            VipTier::NonR,
            VipTier::BigR,
            VipTier::Whale,
            VipTier::SmallR,
            VipTier::MediumR,
            VipTier::SuperR,
        ];
        shuffled.sort();
        assert_eq!(shuffled, VipTier::ALL.to_vec());
    }

    #[test]
    fn test_labels() {
        assert_eq!(VipTier::NonR.default_sheet_label(), "Non-R or Cross-server New Role");
        assert_eq!(VipTier::NonR.default_display_label(), "Non-R");
        assert_eq!(format!("{}", VipTier::SuperR), "Super R");

        let labels: HashSet<_> = VipTier::ALL.iter().map(|t| t.default_sheet_label()).collect();
        assert_eq!(labels.len(), VipTier::ALL.len());
    }

    #[test]
    fn test_spenders_exclude_non_r() {
        let spenders: Vec<_> = VipTier::ALL.into_iter().filter(|t| t.is_spender()).collect();
        assert_eq!(spenders.len(), 5);
        assert!(!spenders.contains(&VipTier::NonR));
    }

    #[test]
    fn test_serialization() {
        let yaml = serde_yaml::to_string(&VipTier::MediumR).unwrap();
        assert_eq!(yaml.trim(), "medium_r");
        let parsed: VipTier = serde_yaml::from_str("super_r").unwrap();
        assert_eq!(parsed, VipTier::SuperR);
    }
}

#[cfg(test)]
mod zone_age_tests {
    use super::*;

    #[test]
    fn test_ordinals_follow_canonical_order() {
        for (i, zone) in ZoneAge::ALL.iter().enumerate() {
            assert_eq!(zone.ordinal(), i);
            assert_eq!(ZoneAge::from_ordinal(i), Some(*zone));
        }
        assert!(ZoneAge::Months24Plus < ZoneAge::Under3Months);
    }

    #[test]
    fn test_labels() {
        assert_eq!(ZoneAge::Months3Plus.default_sheet_label(), "Server Open 3Months+");
        assert_eq!(ZoneAge::Under3Months.default_display_label(), "3M-");
        assert_eq!(format!("{}", ZoneAge::Months12Plus), "12M+");
    }
}

#[cfg(test)]
mod section_tests {
    use super::*;

    #[test]
    fn test_run_order_and_directories() {
        let dirs: Vec<_> = SectionId::ALL.iter().map(|s| s.dir_name()).collect();
        assert_eq!(dirs, vec!["kpi", "currency", "user_base", "hero", "activities"]);
        assert_eq!(SectionId::UserBase.to_string(), "user_base");
        assert_eq!(SectionId::Hero.title(), "Hero");
    }
}
