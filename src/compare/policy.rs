//! Access-policy documents.
//!
//! Policies are stored remotely as JSON text, and the text that comes back
//! rarely matches the text that went in: keys are reordered, whitespace
//! changes, and single-element lists collapse to bare strings (or the other
//! way round). [`PolicyDocument`] parses either form into one canonical
//! structure so that two documents can be compared by meaning.
//!
//! ```
//! use hemmer_provider_convergence::compare::policy::policies_equivalent;
//!
//! let submitted = r#"{"Version":"2012-10-17","Statement":[
//!     {"Effect":"Allow","Principal":"*","Action":"s3:GetObject","Resource":"arn:x/*"}]}"#;
//! let observed = r#"{"Statement":[{"Resource":["arn:x/*"],"Action":["s3:GetObject"],
//!     "Effect":"Allow","Principal":"*"}],"Version":"2012-10-17"}"#;
//!
//! assert!(policies_equivalent(submitted, observed).unwrap());
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::Equivalent;
use crate::error::ProviderError;

/// A value the remote encodes either as a bare item or as a list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(mut items: Vec<T>) -> Self {
        if items.len() == 1 {
            OneOrMany::One(items.remove(0))
        } else {
            OneOrMany::Many(items)
        }
    }
}

fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    OneOrMany::deserialize(deserializer).map(OneOrMany::into_vec)
}

#[allow(clippy::ptr_arg)]
fn collapse_one<S>(items: &Vec<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match items.as_slice() {
        [single] => serializer.serialize_str(single),
        _ => items.serialize(serializer),
    }
}

/// A parsed access-policy document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDocument {
    /// Policy language version, e.g. `2012-10-17`.
    #[serde(rename = "Version")]
    pub version: String,
    /// Optional document id.
    #[serde(rename = "Id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Statements, in document order.
    #[serde(rename = "Statement", deserialize_with = "one_or_many")]
    pub statements: Vec<Statement>,
}

/// Whether a statement grants or denies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// Grant the listed actions.
    Allow,
    /// Deny the listed actions.
    Deny,
}

/// One statement of a policy document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// Statement id.
    #[serde(rename = "Sid", default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    /// Grant or deny.
    #[serde(rename = "Effect")]
    pub effect: Effect,
    /// Who the statement applies to.
    #[serde(rename = "Principal", default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
    /// Actions, e.g. `s3:GetObject`.
    #[serde(
        rename = "Action",
        default,
        deserialize_with = "one_or_many",
        serialize_with = "collapse_one",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub actions: Vec<String>,
    /// Resource ARNs.
    #[serde(
        rename = "Resource",
        default,
        deserialize_with = "one_or_many",
        serialize_with = "collapse_one",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub resources: Vec<String>,
    /// Principals the statement excludes.
    #[serde(rename = "NotPrincipal", default, skip_serializing_if = "Option::is_none")]
    pub not_principal: Option<Principal>,
    /// Actions the statement excludes.
    #[serde(
        rename = "NotAction",
        default,
        deserialize_with = "one_or_many",
        serialize_with = "collapse_one",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub not_actions: Vec<String>,
    /// Resource ARNs the statement excludes.
    #[serde(
        rename = "NotResource",
        default,
        deserialize_with = "one_or_many",
        serialize_with = "collapse_one",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub not_resources: Vec<String>,
    /// Condition block, compared as raw JSON.
    #[serde(rename = "Condition", default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<serde_json::Value>,
}

/// The principal of a statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPrincipal", into = "RawPrincipal")]
pub enum Principal {
    /// The literal `"*"`: everyone.
    Any,
    /// Principal type (e.g. `AWS`) to ARNs.
    Mapped(BTreeMap<String, Vec<String>>),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawPrincipal {
    Wildcard(String),
    Mapped(BTreeMap<String, OneOrMany<String>>),
}

impl TryFrom<RawPrincipal> for Principal {
    type Error = String;

    fn try_from(raw: RawPrincipal) -> Result<Self, Self::Error> {
        match raw {
            RawPrincipal::Wildcard(value) if value == "*" => Ok(Principal::Any),
            RawPrincipal::Wildcard(value) => Err(format!(
                "principal must be \"*\" or a map, got {:?}",
                value
            )),
            RawPrincipal::Mapped(map) => Ok(Principal::Mapped(
                map.into_iter()
                    .map(|(kind, arns)| (kind, arns.into_vec()))
                    .collect(),
            )),
        }
    }
}

impl From<Principal> for RawPrincipal {
    fn from(principal: Principal) -> Self {
        match principal {
            Principal::Any => RawPrincipal::Wildcard("*".to_string()),
            Principal::Mapped(map) => RawPrincipal::Mapped(
                map.into_iter()
                    .map(|(kind, arns)| (kind, OneOrMany::from(arns)))
                    .collect(),
            ),
        }
    }
}

fn sorted_unique(mut items: Vec<String>) -> Vec<String> {
    items.sort();
    items.dedup();
    items
}

fn normalized_principal(principal: &Option<Principal>) -> Option<Principal> {
    principal.clone().map(|principal| match principal {
        Principal::Any => Principal::Any,
        Principal::Mapped(map) => Principal::Mapped(
            map.into_iter()
                .map(|(kind, arns)| (kind, sorted_unique(arns)))
                .collect(),
        ),
    })
}

impl Statement {
    fn normalized(&self) -> Statement {
        Statement {
            principal: normalized_principal(&self.principal),
            not_principal: normalized_principal(&self.not_principal),
            actions: sorted_unique(self.actions.clone()),
            not_actions: sorted_unique(self.not_actions.clone()),
            resources: sorted_unique(self.resources.clone()),
            not_resources: sorted_unique(self.not_resources.clone()),
            ..self.clone()
        }
    }
}

impl PolicyDocument {
    /// Parse a JSON policy document.
    pub fn from_json(json: &str) -> Result<Self, ProviderError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Render the document as compact JSON.
    pub fn to_json(&self) -> Result<String, ProviderError> {
        Ok(serde_json::to_string(self)?)
    }

    /// The canonical form: statement order is kept, while action, resource
    /// and principal lists (and their `Not*` forms) are sorted and
    /// deduplicated. Lists are compared as sets, so `["a", "a"]` is
    /// equivalent to `"a"`.
    pub fn normalized(&self) -> PolicyDocument {
        PolicyDocument {
            version: self.version.clone(),
            id: self.id.clone(),
            statements: self.statements.iter().map(Statement::normalized).collect(),
        }
    }
}

impl Equivalent for PolicyDocument {
    fn equivalent(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

/// Parse two JSON policies and compare them by meaning.
pub fn policies_equivalent(a: &str, b: &str) -> Result<bool, ProviderError> {
    Ok(PolicyDocument::from_json(a)?.equivalent(&PolicyDocument::from_json(b)?))
}
