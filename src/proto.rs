//! Wire messages for bucket configuration calls.
//!
//! These mirror the storage service's `v1` bucket configuration protocol.
//! Optional scalars use proto3 `optional` so that an explicit zero survives
//! the round-trip.

/// Lifecycle configuration of a bucket.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LifecycleConfiguration {
    /// Rules.
    #[prost(message, repeated, tag = "1")]
    pub rules: ::prost::alloc::vec::Vec<LifecycleRule>,
}

/// A single lifecycle rule.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LifecycleRule {
    /// Rule id.
    #[prost(string, optional, tag = "1")]
    pub id: ::core::option::Option<::prost::alloc::string::String>,
    /// Whether the rule is applied.
    #[prost(bool, tag = "2")]
    pub enabled: bool,
    /// Object filter.
    #[prost(message, optional, tag = "3")]
    pub filter: ::core::option::Option<LifecycleFilter>,
    /// Current-version expiration.
    #[prost(message, optional, tag = "4")]
    pub expiration: ::core::option::Option<Expiration>,
    /// Current-version transitions.
    #[prost(message, repeated, tag = "5")]
    pub transitions: ::prost::alloc::vec::Vec<Transition>,
    /// Noncurrent-version expiration.
    #[prost(message, optional, tag = "6")]
    pub noncurrent_version_expiration: ::core::option::Option<NoncurrentVersionExpiration>,
    /// Noncurrent-version transitions.
    #[prost(message, repeated, tag = "7")]
    pub noncurrent_version_transitions: ::prost::alloc::vec::Vec<NoncurrentVersionTransition>,
    /// Incomplete multipart upload cleanup.
    #[prost(message, optional, tag = "8")]
    pub abort_incomplete_multipart_upload:
        ::core::option::Option<AbortIncompleteMultipartUpload>,
}

/// Object tag.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Tag {
    /// Key.
    #[prost(string, tag = "1")]
    pub key: ::prost::alloc::string::String,
    /// Value.
    #[prost(string, tag = "2")]
    pub value: ::prost::alloc::string::String,
}

/// Lifecycle rule filter.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LifecycleFilter {
    /// Key prefix.
    #[prost(string, optional, tag = "1")]
    pub prefix: ::core::option::Option<::prost::alloc::string::String>,
    /// Single tag.
    #[prost(message, optional, tag = "2")]
    pub tag: ::core::option::Option<Tag>,
    /// Minimum object size, exclusive.
    #[prost(int64, optional, tag = "3")]
    pub object_size_greater_than: ::core::option::Option<i64>,
    /// Maximum object size, exclusive.
    #[prost(int64, optional, tag = "4")]
    pub object_size_less_than: ::core::option::Option<i64>,
    /// Conjunction of conditions.
    #[prost(message, optional, tag = "5")]
    pub and: ::core::option::Option<LifecycleAndOperator>,
}

/// Conjunction filter.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LifecycleAndOperator {
    /// Key prefix.
    #[prost(string, optional, tag = "1")]
    pub prefix: ::core::option::Option<::prost::alloc::string::String>,
    /// Tags.
    #[prost(message, repeated, tag = "2")]
    pub tags: ::prost::alloc::vec::Vec<Tag>,
    /// Minimum object size, exclusive.
    #[prost(int64, optional, tag = "3")]
    pub object_size_greater_than: ::core::option::Option<i64>,
    /// Maximum object size, exclusive.
    #[prost(int64, optional, tag = "4")]
    pub object_size_less_than: ::core::option::Option<i64>,
}

/// Current-version expiration.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Expiration {
    /// ISO 8601 date.
    #[prost(string, optional, tag = "1")]
    pub date: ::core::option::Option<::prost::alloc::string::String>,
    /// Days after creation.
    #[prost(int32, optional, tag = "2")]
    pub days: ::core::option::Option<i32>,
    /// Remove expired delete markers.
    #[prost(bool, optional, tag = "3")]
    pub expired_object_delete_marker: ::core::option::Option<bool>,
}

/// Current-version transition.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Transition {
    /// ISO 8601 date.
    #[prost(string, optional, tag = "1")]
    pub date: ::core::option::Option<::prost::alloc::string::String>,
    /// Days after creation.
    #[prost(int32, optional, tag = "2")]
    pub days: ::core::option::Option<i32>,
    /// Destination storage class.
    #[prost(string, tag = "3")]
    pub storage_class: ::prost::alloc::string::String,
}

/// Noncurrent-version expiration.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NoncurrentVersionExpiration {
    /// Days after becoming noncurrent.
    #[prost(int32, optional, tag = "1")]
    pub noncurrent_days: ::core::option::Option<i32>,
    /// Newer noncurrent versions to keep.
    #[prost(int32, optional, tag = "2")]
    pub newer_noncurrent_versions: ::core::option::Option<i32>,
}

/// Noncurrent-version transition.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NoncurrentVersionTransition {
    /// Days after becoming noncurrent.
    #[prost(int32, optional, tag = "1")]
    pub noncurrent_days: ::core::option::Option<i32>,
    /// Newer noncurrent versions to keep.
    #[prost(int32, optional, tag = "2")]
    pub newer_noncurrent_versions: ::core::option::Option<i32>,
    /// Destination storage class.
    #[prost(string, tag = "3")]
    pub storage_class: ::prost::alloc::string::String,
}

/// Incomplete multipart upload cleanup.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AbortIncompleteMultipartUpload {
    /// Days after initiation.
    #[prost(int32, tag = "1")]
    pub days_after_initiation: i32,
}

/// Bucket access policy.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BucketPolicy {
    /// Policy document as JSON.
    #[prost(string, tag = "1")]
    pub document: ::prost::alloc::string::String,
}

/// Bucket versioning state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum VersioningStatus {
    /// Never versioned.
    Unspecified = 0,
    /// Versioning enabled.
    Enabled = 1,
    /// Versioning suspended.
    Suspended = 2,
}

/// Replace a bucket's lifecycle configuration.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PutBucketLifecycleRequest {
    /// Bucket name.
    #[prost(string, tag = "1")]
    pub bucket: ::prost::alloc::string::String,
    /// New configuration.
    #[prost(message, optional, tag = "2")]
    pub configuration: ::core::option::Option<LifecycleConfiguration>,
}

/// Replace a bucket's access policy.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PutBucketPolicyRequest {
    /// Bucket name.
    #[prost(string, tag = "1")]
    pub bucket: ::prost::alloc::string::String,
    /// New policy.
    #[prost(message, optional, tag = "2")]
    pub policy: ::core::option::Option<BucketPolicy>,
}

/// Change a bucket's versioning state.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PutBucketVersioningRequest {
    /// Bucket name.
    #[prost(string, tag = "1")]
    pub bucket: ::prost::alloc::string::String,
    /// New state.
    #[prost(enumeration = "VersioningStatus", tag = "2")]
    pub status: i32,
}
