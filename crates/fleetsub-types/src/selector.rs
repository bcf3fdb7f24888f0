//! Label selectors
//!
//! [`LabelSelector`] is the wire form carried on a package filter. It is
//! validated into a [`Selector`] before use; a selector that fails validation
//! must not be evaluated at all.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Wire form of a label selector
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub match_labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_expressions: Vec<LabelSelectorRequirement>,
}

/// One set-based requirement of a label selector
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelectorRequirement {
    pub key: String,
    pub operator: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

/// Selector validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("label selector requirement has an empty key")]
    EmptyKey,

    #[error("unknown label selector operator {operator:?} for key {key:?}")]
    UnknownOperator { key: String, operator: String },

    #[error("operator {operator} for key {key:?} requires at least one value")]
    MissingValues { key: String, operator: &'static str },

    #[error("operator {operator} for key {key:?} does not take values")]
    UnexpectedValues { key: String, operator: &'static str },
}

/// A validated requirement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Equals { key: String, value: String },
    In { key: String, values: BTreeSet<String> },
    NotIn { key: String, values: BTreeSet<String> },
    Exists { key: String },
    DoesNotExist { key: String },
}

impl Requirement {
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match self {
            Requirement::Equals { key, value } => labels.get(key) == Some(value),
            Requirement::In { key, values } => labels.get(key).is_some_and(|v| values.contains(v)),
            Requirement::NotIn { key, values } => {
                labels.get(key).map_or(true, |v| !values.contains(v))
            }
            Requirement::Exists { key } => labels.contains_key(key),
            Requirement::DoesNotExist { key } => !labels.contains_key(key),
        }
    }
}

/// A validated label selector; the empty selector matches everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    requirements: Vec<Requirement>,
}

impl Selector {
    pub fn everything() -> Self {
        Self::default()
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements.iter().all(|r| r.matches(labels))
    }
}

impl TryFrom<&LabelSelector> for Selector {
    type Error = SelectorError;

    fn try_from(wire: &LabelSelector) -> Result<Self, Self::Error> {
        let mut requirements = Vec::with_capacity(wire.match_labels.len() + wire.match_expressions.len());

        for (key, value) in &wire.match_labels {
            if key.is_empty() {
                return Err(SelectorError::EmptyKey);
            }
            requirements.push(Requirement::Equals {
                key: key.clone(),
                value: value.clone(),
            });
        }

        for expr in &wire.match_expressions {
            requirements.push(parse_requirement(expr)?);
        }

        Ok(Self { requirements })
    }
}

fn parse_requirement(expr: &LabelSelectorRequirement) -> Result<Requirement, SelectorError> {
    if expr.key.is_empty() {
        return Err(SelectorError::EmptyKey);
    }
    let key = expr.key.clone();
    let values: BTreeSet<String> = expr.values.iter().cloned().collect();

    match expr.operator.as_str() {
        "In" | "NotIn" => {
            let operator = if expr.operator == "In" { "In" } else { "NotIn" };
            if values.is_empty() {
                return Err(SelectorError::MissingValues { key, operator });
            }
            Ok(if operator == "In" {
                Requirement::In { key, values }
            } else {
                Requirement::NotIn { key, values }
            })
        }
        "Exists" | "DoesNotExist" => {
            let operator = if expr.operator == "Exists" { "Exists" } else { "DoesNotExist" };
            if !values.is_empty() {
                return Err(SelectorError::UnexpectedValues { key, operator });
            }
            Ok(if operator == "Exists" {
                Requirement::Exists { key }
            } else {
                Requirement::DoesNotExist { key }
            })
        }
        other => Err(SelectorError::UnknownOperator {
            key,
            operator: other.to_string(),
        }),
    }
}
