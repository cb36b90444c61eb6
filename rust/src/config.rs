//! Configuration types for the scheduling pipeline and payload mapping.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::blockers::ResourceOverlap;
use crate::calendar::DurationRounding;
use crate::derive::DependencyRule;

/// Configuration for one scheduling run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Verbosity level: 0=silent, 1=changes, 2=checks, 3=debug.
    pub verbosity: u8,
    /// Fractional duration policy for working-day arithmetic.
    pub rounding: DurationRounding,
    /// Derivation rules, applied in this order.
    pub rules: Vec<DependencyRule>,
    /// Anchor for the backward pass instead of the computed project end.
    pub project_deadline: Option<NaiveDate>,
    /// Window comparison used when reporting resource conflicts.
    pub resource_overlap: ResourceOverlap,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            rounding: DurationRounding::Up,
            rules: DependencyRule::ALL.to_vec(),
            project_deadline: None,
            resource_overlap: ResourceOverlap::Inclusive,
        }
    }
}

/// What to do when an employee code has no external identity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedIdentityPolicy {
    /// Abort the whole mapping.
    #[default]
    Fail,
    /// Use this identity instead and record the substitution.
    Fallback(String),
}

/// Configuration for payload mapping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    pub unresolved_identity: UnresolvedIdentityPolicy,
    /// Prefix for the reference each payload is given (`{prefix}{wbs_code}`).
    pub reference_prefix: String,
    /// Emit owning-task summary records ahead of their phases.
    pub include_parents: bool,
    pub verbosity: u8,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            unresolved_identity: UnresolvedIdentityPolicy::Fail,
            reference_prefix: "WBS-".to_string(),
            include_parents: true,
            verbosity: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.verbosity, 0);
        assert_eq!(config.rounding, DurationRounding::Up);
        assert_eq!(
            config.rules,
            vec![
                DependencyRule::PhaseSequence,
                DependencyRule::SectionSequence,
                DependencyRule::ResourceConflict
            ]
        );
        assert!(config.project_deadline.is_none());
        assert_eq!(config.resource_overlap, ResourceOverlap::Inclusive);
    }

    #[test]
    fn test_engine_config_partial_json() {
        let config: EngineConfig =
            serde_json::from_str(
                r#"{"rounding": "down", "project_deadline": "2025-03-31", "resource_overlap": "hand_off"}"#,
            )
            .unwrap();
        assert_eq!(config.rounding, DurationRounding::Down);
        assert_eq!(
            config.project_deadline,
            NaiveDate::from_ymd_opt(2025, 3, 31)
        );
        assert_eq!(config.rules.len(), 3);
        assert_eq!(config.resource_overlap, ResourceOverlap::HandOff);
    }

    #[test]
    fn test_mapping_config_fallback_json() {
        let config: MappingConfig =
            serde_json::from_str(r#"{"unresolved_identity": {"fallback": "admin@example.com"}}"#)
                .unwrap();
        assert_eq!(
            config.unresolved_identity,
            UnresolvedIdentityPolicy::Fallback("admin@example.com".to_string())
        );
        assert_eq!(config.reference_prefix, "WBS-");
    }
}
