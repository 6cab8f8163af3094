//! Evaluation validity of functions and graphs.
//!
//! A function or graph whose referenced features no longer resolve stays
//! persisted and is reported as invalid; this is a value, never an error.

use super::FeatureId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Validity {
    Valid,
    Invalid(InvalidConfiguration),
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Why a function or graph cannot be evaluated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidConfiguration {
    /// Referenced feature ids with no feature row.
    pub missing_feature_ids: BTreeSet<FeatureId>,
    /// Referenced features that exist but cannot resolve themselves.
    pub unresolved_feature_ids: BTreeSet<FeatureId>,
}
