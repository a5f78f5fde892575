//! Submitted field values for adding or editing a part
//!
//! This is what the add/edit form hands to the store. Values are trimmed
//! before validation, and the same struct round-trips through JSON so a
//! front end can pass a whole form as one document.

use serde::{Deserialize, Serialize};

use super::data::Part;
use crate::error::{CatalogError, Result};

/// All user-editable fields of a part
///
/// `deleted` and `imageValid` are deliberately absent: the former is only
/// changed by delete/merge, the latter only by the image probe.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct PartFields {
    #[serde(rename = "Customer Group")]
    pub customer_group: String,
    #[serde(rename = "Customer Name")]
    pub customer_name: String,
    #[serde(rename = "Model")]
    pub model: String,
    #[serde(rename = "Part Name")]
    pub part_name: String,
    #[serde(rename = "Part No")]
    pub part_no: String,
    #[serde(rename = "Contribution")]
    pub contribution: String,
    #[serde(rename = "Classification")]
    pub classification: String,
    #[serde(rename = "Segment Wise")]
    pub segment: String,
    #[serde(rename = "Component Wt")]
    pub component_weight: String,
    #[serde(rename = "Image Name")]
    pub image_locator: String,
}

impl PartFields {
    /// Create an empty set of fields
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefill from an existing record (the edit form's starting point)
    pub fn from_part(part: &Part) -> Self {
        Self {
            customer_group: part.customer_group().to_string(),
            customer_name: part.customer_name().to_string(),
            model: part.model().to_string(),
            part_name: part.part_name().to_string(),
            part_no: part.part_no().to_string(),
            contribution: part.contribution().to_string(),
            classification: part.classification().to_string(),
            segment: part.segment().to_string(),
            component_weight: part.component_weight().to_string(),
            image_locator: part.image_locator().to_string(),
        }
    }

    /// Parse from a JSON object
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Trim surrounding whitespace from every value
    pub fn trimmed(&self) -> Self {
        Self {
            customer_group: self.customer_group.trim().to_string(),
            customer_name: self.customer_name.trim().to_string(),
            model: self.model.trim().to_string(),
            part_name: self.part_name.trim().to_string(),
            part_no: self.part_no.trim().to_string(),
            contribution: self.contribution.trim().to_string(),
            classification: self.classification.trim().to_string(),
            segment: self.segment.trim().to_string(),
            component_weight: self.component_weight.trim().to_string(),
            image_locator: self.image_locator.trim().to_string(),
        }
    }

    /// Check that customer name, part name and part number are filled in
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&'static str> = [
            ("Customer Name", &self.customer_name),
            ("Part Name", &self.part_name),
            ("Part No", &self.part_no),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CatalogError::Validation { missing })
        }
    }

    /// Write these values over a record's descriptive fields and locator
    ///
    /// Identity, unknown keys and derived flags are left for the caller.
    pub(crate) fn apply_to(self, part: &mut Part) {
        part.customer_group = Some(self.customer_group);
        part.customer_name = Some(self.customer_name);
        part.model = Some(self.model);
        part.part_name = Some(self.part_name);
        part.part_no = Some(self.part_no);
        part.contribution = Some(self.contribution);
        part.classification = Some(self.classification);
        part.segment = Some(self.segment);
        part.component_weight = Some(self.component_weight);
        part.image_locator = Some(self.image_locator);
    }
}
