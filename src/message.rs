//! Conversion of configuration values into wire messages.
//!
//! Every value that is submitted to the remote implements [`ToMessage`].
//! Conversions that cannot fail simply return `Ok`; conversions that
//! validate (a lifecycle rule with neither days nor date, say) report
//! [`ProviderError::InvalidRequest`] before anything is sent.

use prost::Message;

use crate::compare::lifecycle::{
    AbortIncompleteMultipartUpload, Expiration, LifecycleAndOperator, LifecycleConfiguration,
    LifecycleFilter, LifecycleRule, NoncurrentVersionExpiration, NoncurrentVersionTransition,
    RuleStatus, Tag, Transition,
};
use crate::compare::policy::PolicyDocument;
use crate::compare::VersioningStatus;
use crate::error::ProviderError;
use crate::proto;

/// A value with a wire representation.
pub trait ToMessage {
    /// The wire message.
    type Message: Message + Default;

    /// Build the wire message, validating as needed.
    fn to_message(&self) -> Result<Self::Message, ProviderError>;
}

/// Encode a value to protobuf bytes.
pub fn encode<T>(value: &T) -> Result<Vec<u8>, ProviderError>
where
    T: ToMessage + ?Sized,
{
    Ok(value.to_message()?.encode_to_vec())
}

fn invalid(rule: &LifecycleRule, problem: &str) -> ProviderError {
    ProviderError::InvalidRequest(format!(
        "lifecycle rule {}: {}",
        rule.id.as_deref().unwrap_or("<unnamed>"),
        problem
    ))
}

impl ToMessage for Tag {
    type Message = proto::Tag;

    fn to_message(&self) -> Result<proto::Tag, ProviderError> {
        Ok(proto::Tag {
            key: self.key.clone(),
            value: self.value.clone(),
        })
    }
}

fn tags_to_message(tags: &[Tag]) -> Result<Vec<proto::Tag>, ProviderError> {
    tags.iter().map(ToMessage::to_message).collect()
}

impl ToMessage for LifecycleAndOperator {
    type Message = proto::LifecycleAndOperator;

    fn to_message(&self) -> Result<proto::LifecycleAndOperator, ProviderError> {
        Ok(proto::LifecycleAndOperator {
            prefix: self.prefix.clone(),
            tags: tags_to_message(&self.tags)?,
            object_size_greater_than: self.object_size_greater_than,
            object_size_less_than: self.object_size_less_than,
        })
    }
}

impl ToMessage for LifecycleFilter {
    type Message = proto::LifecycleFilter;

    fn to_message(&self) -> Result<proto::LifecycleFilter, ProviderError> {
        Ok(proto::LifecycleFilter {
            prefix: self.prefix.clone(),
            tag: self.tag.as_ref().map(ToMessage::to_message).transpose()?,
            object_size_greater_than: self.object_size_greater_than,
            object_size_less_than: self.object_size_less_than,
            and: self.and.as_ref().map(ToMessage::to_message).transpose()?,
        })
    }
}

fn expiration_to_message(expiration: &Expiration) -> proto::Expiration {
    proto::Expiration {
        date: expiration.date.clone(),
        days: expiration.days,
        expired_object_delete_marker: expiration.expired_object_delete_marker,
    }
}

fn transition_to_message(transition: &Transition) -> proto::Transition {
    proto::Transition {
        date: transition.date.clone(),
        days: transition.days,
        storage_class: transition.storage_class.clone(),
    }
}

fn noncurrent_expiration_to_message(
    expiration: &NoncurrentVersionExpiration,
) -> proto::NoncurrentVersionExpiration {
    proto::NoncurrentVersionExpiration {
        noncurrent_days: expiration.noncurrent_days,
        newer_noncurrent_versions: expiration.newer_noncurrent_versions,
    }
}

fn noncurrent_transition_to_message(
    transition: &NoncurrentVersionTransition,
) -> proto::NoncurrentVersionTransition {
    proto::NoncurrentVersionTransition {
        noncurrent_days: transition.noncurrent_days,
        newer_noncurrent_versions: transition.newer_noncurrent_versions,
        storage_class: transition.storage_class.clone(),
    }
}

fn abort_to_message(abort: &AbortIncompleteMultipartUpload) -> proto::AbortIncompleteMultipartUpload {
    proto::AbortIncompleteMultipartUpload {
        days_after_initiation: abort.days_after_initiation,
    }
}

impl ToMessage for LifecycleRule {
    type Message = proto::LifecycleRule;

    fn to_message(&self) -> Result<proto::LifecycleRule, ProviderError> {
        if let Some(expiration) = &self.expiration {
            let set = [
                expiration.date.is_some(),
                expiration.days.is_some(),
                expiration.expired_object_delete_marker.is_some(),
            ]
            .iter()
            .filter(|set| **set)
            .count();
            if set != 1 {
                return Err(invalid(
                    self,
                    "expiration needs exactly one of date, days or expired_object_delete_marker",
                ));
            }
        }
        if self
            .transitions
            .iter()
            .any(|t| t.date.is_none() && t.days.is_none())
        {
            return Err(invalid(self, "transition needs a date or days"));
        }
        if self
            .abort_incomplete_multipart_upload
            .as_ref()
            .is_some_and(|abort| abort.days_after_initiation <= 0)
        {
            return Err(invalid(self, "days_after_initiation must be positive"));
        }

        Ok(proto::LifecycleRule {
            id: self.id.clone(),
            enabled: self.status == RuleStatus::Enabled,
            filter: self.filter.as_ref().map(ToMessage::to_message).transpose()?,
            expiration: self.expiration.as_ref().map(expiration_to_message),
            transitions: self.transitions.iter().map(transition_to_message).collect(),
            noncurrent_version_expiration: self
                .noncurrent_version_expiration
                .as_ref()
                .map(noncurrent_expiration_to_message),
            noncurrent_version_transitions: self
                .noncurrent_version_transitions
                .iter()
                .map(noncurrent_transition_to_message)
                .collect(),
            abort_incomplete_multipart_upload: self
                .abort_incomplete_multipart_upload
                .as_ref()
                .map(abort_to_message),
        })
    }
}

impl ToMessage for LifecycleConfiguration {
    type Message = proto::LifecycleConfiguration;

    fn to_message(&self) -> Result<proto::LifecycleConfiguration, ProviderError> {
        Ok(proto::LifecycleConfiguration {
            rules: self
                .rules
                .iter()
                .map(ToMessage::to_message)
                .collect::<Result<_, _>>()?,
        })
    }
}

impl ToMessage for PolicyDocument {
    type Message = proto::BucketPolicy;

    fn to_message(&self) -> Result<proto::BucketPolicy, ProviderError> {
        Ok(proto::BucketPolicy {
            document: self.to_json()?,
        })
    }
}

impl ToMessage for VersioningStatus {
    type Message = proto::PutBucketVersioningRequest;

    fn to_message(&self) -> Result<proto::PutBucketVersioningRequest, ProviderError> {
        let status = match self {
            VersioningStatus::Enabled => proto::VersioningStatus::Enabled,
            VersioningStatus::Suspended => proto::VersioningStatus::Suspended,
            VersioningStatus::Unversioned => {
                return Err(ProviderError::InvalidRequest(
                    "versioning cannot be returned to Unversioned; suspend it instead".to_string(),
                ))
            },
        };
        Ok(proto::PutBucketVersioningRequest {
            bucket: String::new(),
            status: status as i32,
        })
    }
}
