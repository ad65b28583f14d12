//! Variation descriptors.
//!
//! A variation is a plain value: an id into the variation catalog, a weight
//! and a table of named parameters. Evaluation and self-randomization live in
//! the catalog (`compute::VariationCatalog`).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a variation in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariationId(pub u16);

impl fmt::Display for VariationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A variation instance attached to a transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variation {
    pub id: VariationId,
    pub name: String,
    pub weight: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, f64>,
}

impl Variation {
    pub fn new(id: VariationId, name: impl Into<String>, weight: f64) -> Self {
        Self {
            id,
            name: name.into(),
            weight,
            params: BTreeMap::new(),
        }
    }

    pub fn contains_param(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    pub fn param(&self, name: &str) -> Option<f64> {
        self.params.get(name).copied()
    }

    /// Parameter value or `default` when absent.
    pub fn param_or(&self, name: &str, default: f64) -> f64 {
        self.param(name).unwrap_or(default)
    }

    /// Set an existing parameter. Returns false if the variation has no such parameter.
    pub fn set_param(&mut self, name: &str, value: f64) -> bool {
        match self.params.get_mut(name) {
            Some(v) => {
                *v = value;
                true
            }
            None => false,
        }
    }
}
