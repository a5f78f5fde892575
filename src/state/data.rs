//! Shared data structures for the catalog state
//!
//! These structs represent the part records that flow between the
//! `images.json` document, the record store and the view layer.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Label used in the navigation summary for records without a customer name
pub const UNKNOWN_CUSTOMER: &str = "(Unknown)";

/// Represents a single part in the catalog
///
/// Field names on the wire follow the original `images.json` columns.
/// Descriptive fields are optional; an absent field reads as an empty
/// string through the accessor methods.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Part {
    /// Stable identity, unique within a store. Empty until the store
    /// assigns one to a record that arrived without it.
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: String,

    #[serde(rename = "Customer Group", default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub customer_group: Option<String>,

    #[serde(rename = "Customer Name", default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,

    #[serde(rename = "Model", default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(rename = "Part Name", default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub part_name: Option<String>,

    #[serde(rename = "Part No", default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub part_no: Option<String>,

    #[serde(rename = "Contribution", default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub contribution: Option<String>,

    #[serde(rename = "Classification", default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,

    #[serde(rename = "Segment Wise", default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,

    #[serde(rename = "Component Wt", default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub component_weight: Option<String>,

    /// Reference to the part's image: a path, an http(s) URL or a data: URL
    #[serde(rename = "Image Name", default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub image_locator: Option<String>,

    /// Soft-delete marker
    #[serde(default, deserialize_with = "lenient_flag")]
    pub deleted: bool,

    /// Set only by the image probe. Never read from or written to JSON.
    #[serde(skip)]
    pub image_valid: bool,

    /// Keys this crate does not model, kept so export reproduces them
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Part {
    pub fn customer_group(&self) -> &str {
        text(&self.customer_group)
    }

    pub fn customer_name(&self) -> &str {
        text(&self.customer_name)
    }

    pub fn model(&self) -> &str {
        text(&self.model)
    }

    pub fn part_name(&self) -> &str {
        text(&self.part_name)
    }

    pub fn part_no(&self) -> &str {
        text(&self.part_no)
    }

    pub fn contribution(&self) -> &str {
        text(&self.contribution)
    }

    pub fn classification(&self) -> &str {
        text(&self.classification)
    }

    pub fn segment(&self) -> &str {
        text(&self.segment)
    }

    pub fn component_weight(&self) -> &str {
        text(&self.component_weight)
    }

    pub fn image_locator(&self) -> &str {
        text(&self.image_locator)
    }

    /// Whether this record belongs in the visible set at all
    /// (before customer and query filters are applied)
    pub fn is_available(&self) -> bool {
        !self.deleted && self.image_valid
    }

    /// Every field free-text search looks at
    pub fn searchable_fields(&self) -> [&str; 10] {
        [
            self.customer_group(),
            self.customer_name(),
            self.model(),
            self.part_name(),
            self.part_no(),
            self.contribution(),
            self.classification(),
            self.segment(),
            self.component_weight(),
            self.image_locator(),
        ]
    }

    /// Key used for the customer navigation summary
    pub fn customer_label(&self) -> &str {
        match self.customer_name() {
            "" => UNKNOWN_CUSTOMER,
            name => name,
        }
    }

    /// Reset derived state on a record entering the store
    ///
    /// `imageValid` can sneak in through `extra` when a document was
    /// produced by something that did not strip it.
    pub(crate) fn normalize(&mut self) {
        self.image_valid = false;
        self.extra.remove("imageValid");
    }

    /// Overlay an incoming record onto this one, key by key
    ///
    /// Fields present on `incoming` win; absent fields keep their stored
    /// value. `deleted` always takes the incoming value. The id is kept.
    pub(crate) fn merge_from(&mut self, incoming: Part) {
        fn overlay(slot: &mut Option<String>, value: Option<String>) {
            if value.is_some() {
                *slot = value;
            }
        }

        overlay(&mut self.customer_group, incoming.customer_group);
        overlay(&mut self.customer_name, incoming.customer_name);
        overlay(&mut self.model, incoming.model);
        overlay(&mut self.part_name, incoming.part_name);
        overlay(&mut self.part_no, incoming.part_no);
        overlay(&mut self.contribution, incoming.contribution);
        overlay(&mut self.classification, incoming.classification);
        overlay(&mut self.segment, incoming.segment);
        overlay(&mut self.component_weight, incoming.component_weight);
        overlay(&mut self.image_locator, incoming.image_locator);
        self.deleted = incoming.deleted;
        self.extra.extend(incoming.extra);
        self.normalize();
    }
}

fn text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

/// Accept strings, numbers and booleans as text; `null` means absent
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected text, found {other}"
        ))),
    }
}

fn lenient_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_text(deserializer)?.unwrap_or_default())
}

/// Truthiness for the `deleted` flag: anything but false/null/0/"" counts
fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let flag = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    };
    Ok(flag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_original_column_names() {
        let part: Part = serde_json::from_str(
            r#"{
                "id": "7",
                "Customer Group": "OEM",
                "Customer Name": "Acme",
                "Model": "X1",
                "Part Name": "Bolt",
                "Part No": "B1",
                "Segment Wise": "Fasteners",
                "Component Wt": 0.25,
                "Image Name": "images/bolt.png"
            }"#,
        )
        .unwrap();

        assert_eq!(part.id, "7");
        assert_eq!(part.customer_group(), "OEM");
        assert_eq!(part.segment(), "Fasteners");
        assert_eq!(part.component_weight(), "0.25");
        assert_eq!(part.image_locator(), "images/bolt.png");
        assert_eq!(part.contribution(), "");
        assert!(!part.deleted);
        assert!(!part.image_valid);
    }

    #[test]
    fn test_numeric_id_and_truthy_deleted() {
        let part: Part =
            serde_json::from_str(r#"{"id": 42, "deleted": 1, "Part No": null}"#).unwrap();
        assert_eq!(part.id, "42");
        assert!(part.deleted);
        assert_eq!(part.part_no, None);
    }

    #[test]
    fn test_export_strips_image_valid_and_keeps_unknown_keys() {
        let mut part: Part = serde_json::from_str(
            r#"{"id": "1", "Part Name": "Nut", "Supplier": "Kay", "imageValid": true}"#,
        )
        .unwrap();
        part.normalize();
        part.image_valid = true;

        let value = serde_json::to_value(&part).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj["Supplier"], "Kay");
        assert_eq!(obj["Part Name"], "Nut");
        assert_eq!(obj["deleted"], false);
        assert!(!obj.contains_key("imageValid"));
        assert!(!obj.contains_key("Model"));
    }

    #[test]
    fn test_merge_overlays_present_fields_only() {
        let mut stored: Part = serde_json::from_str(
            r#"{"id": "1", "Customer Name": "Acme", "Model": "X1", "Part Name": "Bolt", "deleted": true}"#,
        )
        .unwrap();
        stored.image_valid = true;

        let incoming: Part =
            serde_json::from_str(r#"{"id": "1", "Part Name": "Bolt-v2"}"#).unwrap();
        stored.merge_from(incoming);

        assert_eq!(stored.part_name(), "Bolt-v2");
        assert_eq!(stored.model(), "X1");
        assert_eq!(stored.customer_name(), "Acme");
        assert!(!stored.deleted);
        assert!(!stored.image_valid);
    }

    #[test]
    fn test_customer_label_falls_back_to_unknown() {
        let part = Part::default();
        assert_eq!(part.customer_label(), UNKNOWN_CUSTOMER);
    }
}
