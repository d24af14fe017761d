//! Bucket lifecycle rule sets.
//!
//! The remote returns lifecycle rules in its own order, so two rule sets are
//! compared after sorting by rule id (rules without an id sort first). Every
//! optional sub-block is compared nil-safely: present on one side and absent
//! on the other is a difference. Zero is a real value for every numeric field
//! (an object-size threshold of `Some(0)` is not the same as no threshold).

use serde::{Deserialize, Serialize};

use super::Equivalent;

/// Whether a rule is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleStatus {
    /// The rule is applied.
    #[default]
    Enabled,
    /// The rule is kept but not applied.
    Disabled,
}

/// An object tag used in filters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag {
    /// Tag key.
    pub key: String,
    /// Tag value.
    pub value: String,
}

impl Tag {
    /// Create a tag.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// All conditions of an `and` filter must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleAndOperator {
    /// Key prefix.
    pub prefix: Option<String>,
    /// Tags; order is not significant.
    pub tags: Vec<Tag>,
    /// Minimum object size in bytes, exclusive.
    pub object_size_greater_than: Option<i64>,
    /// Maximum object size in bytes, exclusive.
    pub object_size_less_than: Option<i64>,
}

/// Which objects a rule applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleFilter {
    /// Key prefix.
    pub prefix: Option<String>,
    /// A single tag.
    pub tag: Option<Tag>,
    /// Minimum object size in bytes, exclusive.
    pub object_size_greater_than: Option<i64>,
    /// Maximum object size in bytes, exclusive.
    pub object_size_less_than: Option<i64>,
    /// Conjunction of several conditions.
    pub and: Option<LifecycleAndOperator>,
}

/// When current object versions expire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Expiration {
    /// ISO 8601 date.
    pub date: Option<String>,
    /// Days after creation.
    pub days: Option<i32>,
    /// Remove delete markers with no noncurrent versions behind them.
    pub expired_object_delete_marker: Option<bool>,
}

/// When current object versions move to another storage class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transition {
    /// ISO 8601 date.
    pub date: Option<String>,
    /// Days after creation.
    pub days: Option<i32>,
    /// Destination storage class.
    pub storage_class: String,
}

/// When noncurrent object versions expire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoncurrentVersionExpiration {
    /// Days after becoming noncurrent.
    pub noncurrent_days: Option<i32>,
    /// Number of newer noncurrent versions to keep.
    pub newer_noncurrent_versions: Option<i32>,
}

/// When noncurrent object versions move to another storage class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoncurrentVersionTransition {
    /// Days after becoming noncurrent.
    pub noncurrent_days: Option<i32>,
    /// Number of newer noncurrent versions to keep.
    pub newer_noncurrent_versions: Option<i32>,
    /// Destination storage class.
    pub storage_class: String,
}

/// Cleanup of multipart uploads that never completed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbortIncompleteMultipartUpload {
    /// Days after the upload was initiated.
    pub days_after_initiation: i32,
}

/// A single lifecycle rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleRule {
    /// Rule id, used to pair rules across round-trips.
    pub id: Option<String>,
    /// Whether the rule is applied.
    pub status: RuleStatus,
    /// Objects the rule applies to; `None` means the whole bucket.
    pub filter: Option<LifecycleFilter>,
    /// Current-version expiration.
    pub expiration: Option<Expiration>,
    /// Current-version transitions; order is not significant.
    pub transitions: Vec<Transition>,
    /// Noncurrent-version expiration.
    pub noncurrent_version_expiration: Option<NoncurrentVersionExpiration>,
    /// Noncurrent-version transitions; order is not significant.
    pub noncurrent_version_transitions: Vec<NoncurrentVersionTransition>,
    /// Incomplete multipart upload cleanup.
    pub abort_incomplete_multipart_upload: Option<AbortIncompleteMultipartUpload>,
}

impl LifecycleRule {
    /// A rule with the given id and nothing else set.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    fn normalized(&self) -> LifecycleRule {
        let mut rule = self.clone();
        rule.transitions.sort_by(|a, b| {
            (a.days, &a.date, &a.storage_class).cmp(&(b.days, &b.date, &b.storage_class))
        });
        rule.noncurrent_version_transitions.sort_by(|a, b| {
            (a.noncurrent_days, a.newer_noncurrent_versions, &a.storage_class).cmp(&(
                b.noncurrent_days,
                b.newer_noncurrent_versions,
                &b.storage_class,
            ))
        });
        if let Some(and) = rule.filter.as_mut().and_then(|filter| filter.and.as_mut()) {
            and.tags.sort();
        }
        rule
    }
}

/// The full lifecycle configuration of a bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleConfiguration {
    /// Rules; order is not significant.
    pub rules: Vec<LifecycleRule>,
}

impl LifecycleConfiguration {
    /// Wrap a rule list.
    pub fn new(rules: Vec<LifecycleRule>) -> Self {
        Self { rules }
    }

    /// Rules normalized and sorted by id, absent ids first.
    fn canonical_rules(&self) -> Vec<LifecycleRule> {
        let mut rules: Vec<LifecycleRule> =
            self.rules.iter().map(LifecycleRule::normalized).collect();
        rules.sort_by(|a, b| a.id.cmp(&b.id));
        rules
    }
}

impl Equivalent for LifecycleConfiguration {
    fn equivalent(&self, other: &Self) -> bool {
        self.rules.len() == other.rules.len() && self.canonical_rules() == other.canonical_rules()
    }
}

/// Compare two rule lists irrespective of order.
pub fn rules_equivalent(desired: &[LifecycleRule], observed: &[LifecycleRule]) -> bool {
    LifecycleConfiguration::new(desired.to_vec())
        .equivalent(&LifecycleConfiguration::new(observed.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expire_after(id: &str, days: i32) -> LifecycleRule {
        LifecycleRule {
            expiration: Some(Expiration {
                days: Some(days),
                ..Default::default()
            }),
            filter: Some(LifecycleFilter {
                prefix: Some(format!("{}/", id)),
                ..Default::default()
            }),
            ..LifecycleRule::with_id(id)
        }
    }

    fn archive(id: &str) -> LifecycleRule {
        LifecycleRule {
            transitions: vec![
                Transition {
                    days: Some(30),
                    storage_class: "COLD".to_string(),
                    ..Default::default()
                },
                Transition {
                    days: Some(90),
                    storage_class: "ICE".to_string(),
                    ..Default::default()
                },
            ],
            abort_incomplete_multipart_upload: Some(AbortIncompleteMultipartUpload {
                days_after_initiation: 7,
            }),
            ..LifecycleRule::with_id(id)
        }
    }

    #[test]
    fn test_rule_order_is_ignored() {
        let desired = vec![expire_after("a", 30), archive("b")];
        let observed = vec![archive("b"), expire_after("a", 30)];

        assert!(rules_equivalent(&desired, &observed));
    }

    #[test]
    fn test_scalar_change_is_detected() {
        let desired = vec![expire_after("a", 30), archive("b")];
        let observed = vec![archive("b"), expire_after("a", 31)];

        assert!(!rules_equivalent(&desired, &observed));
        assert!(!rules_equivalent(&observed, &desired));
    }

    #[test]
    fn test_length_mismatch() {
        let desired = vec![expire_after("a", 30)];
        let observed = vec![expire_after("a", 30), expire_after("a", 30)];

        assert!(!rules_equivalent(&desired, &observed));
        assert!(rules_equivalent(&[], &[]));
    }

    #[test]
    fn test_rules_without_id_sort_first() {
        let anonymous = LifecycleRule {
            id: None,
            ..expire_after("x", 5)
        };
        let desired = vec![expire_after("a", 30), anonymous.clone()];
        let observed = vec![anonymous, expire_after("a", 30)];

        assert!(rules_equivalent(&desired, &observed));

        let canonical = LifecycleConfiguration::new(desired).canonical_rules();
        assert_eq!(canonical[0].id, None);
    }

    #[test]
    fn test_sub_block_presence_is_significant() {
        let with_abort = archive("b");
        let without_abort = LifecycleRule {
            abort_incomplete_multipart_upload: None,
            ..archive("b")
        };

        assert!(!rules_equivalent(&[with_abort], &[without_abort]));
    }

    #[test]
    fn test_zero_size_threshold_differs_from_unset() {
        let unset = LifecycleRule {
            filter: Some(LifecycleFilter {
                and: Some(LifecycleAndOperator {
                    prefix: Some("logs/".to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..LifecycleRule::with_id("a")
        };
        let mut zero = unset.clone();
        if let Some(and) = zero.filter.as_mut().and_then(|f| f.and.as_mut()) {
            and.object_size_greater_than = Some(0);
        }

        assert!(!rules_equivalent(&[unset], &[zero]));
    }

    #[test]
    fn test_and_tags_and_transitions_are_unordered() {
        let tagged = |tags: Vec<Tag>, rule: LifecycleRule| LifecycleRule {
            filter: Some(LifecycleFilter {
                and: Some(LifecycleAndOperator {
                    tags,
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..rule
        };
        let mut reversed = archive("b");
        reversed.transitions.reverse();

        let desired = tagged(vec![Tag::new("env", "test"), Tag::new("team", "infra")], archive("b"));
        let observed = tagged(vec![Tag::new("team", "infra"), Tag::new("env", "test")], reversed);
        assert!(rules_equivalent(&[desired.clone()], &[observed]));

        let retagged = tagged(vec![Tag::new("team", "infra"), Tag::new("env", "prod")], archive("b"));
        assert!(!rules_equivalent(&[desired], &[retagged]));
    }

    #[test]
    fn test_deserializes_from_state_json() {
        let rule: LifecycleRule = serde_json::from_value(serde_json::json!({
            "id": "a",
            "status": "disabled",
            "expiration": {"days": 30}
        }))
        .unwrap();

        assert_eq!(rule.status, RuleStatus::Disabled);
        assert_eq!(rule.expiration.unwrap().days, Some(30));
        assert!(rule.filter.is_none());
    }
}
