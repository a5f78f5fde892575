//! Visibility filter
//!
//! Pure functions from the store's snapshot plus the session's selectors to
//! what the view layer shows. Nothing here is cached; callers recompute on
//! every change.

use std::collections::BTreeMap;

use super::data::Part;

/// Records the card grid should show, in store order
///
/// Only non-deleted records with a valid image qualify. `active_customer`
/// matches the customer name exactly; `query` is a case-insensitive
/// substring match against every descriptive field and the locator.
pub fn visible(parts: &[Part], active_customer: Option<&str>, query: &str) -> Vec<Part> {
    let needle = query.trim().to_lowercase();

    parts
        .iter()
        .filter(|p| p.is_available())
        .filter(|p| active_customer.map_or(true, |c| p.customer_name() == c))
        .filter(|p| needle.is_empty() || matches_query(p, &needle))
        .cloned()
        .collect()
}

/// `needle` must already be lower-cased
fn matches_query(part: &Part, needle: &str) -> bool {
    part.searchable_fields()
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
}

/// Navigation summary: customer name -> that customer's available records
///
/// Keys are sorted; records without a customer name are grouped under
/// `(Unknown)`. Ignores the active customer and query.
pub fn group_by_customer(parts: &[Part]) -> BTreeMap<String, Vec<Part>> {
    let mut groups: BTreeMap<String, Vec<Part>> = BTreeMap::new();
    for part in parts.iter().filter(|p| p.is_available()) {
        groups
            .entry(part.customer_label().to_string())
            .or_default()
            .push(part.clone());
    }
    groups
}

/// Number of records that could be shown at all
pub fn available_count(parts: &[Part]) -> usize {
    parts.iter().filter(|p| p.is_available()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::data::UNKNOWN_CUSTOMER;

    fn part(id: &str, customer: &str, name: &str, part_no: &str) -> Part {
        Part {
            id: id.into(),
            customer_name: (!customer.is_empty()).then(|| customer.to_string()),
            part_name: Some(name.into()),
            part_no: Some(part_no.into()),
            image_locator: Some(format!("img/{id}.png")),
            image_valid: true,
            ..Part::default()
        }
    }

    fn catalog() -> Vec<Part> {
        let mut deleted = part("3", "Acme", "Washer", "W1");
        deleted.deleted = true;
        let mut broken = part("4", "Zeta", "Spring", "S1");
        broken.image_valid = false;
        let mut gear = part("5", "Beta", "Gear", "G7");
        gear.classification = Some("Drive Train".into());

        vec![
            part("1", "Acme", "Bolt", "B1"),
            part("2", "Beta", "Nut", "N1"),
            deleted,
            broken,
            gear,
            part("6", "", "Clip", "C1"),
            part("7", "Acme", "Bracket", "BR2"),
        ]
    }

    fn ids(parts: &[Part]) -> Vec<&str> {
        parts.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_no_selectors_returns_every_available_record_in_order() {
        assert_eq!(ids(&visible(&catalog(), None, "")), vec!["1", "2", "5", "6", "7"]);
    }

    #[test]
    fn test_customer_filter_is_exact() {
        let parts = catalog();
        assert_eq!(ids(&visible(&parts, Some("Acme"), "")), vec!["1", "7"]);
        assert!(visible(&parts, Some("acme"), "").is_empty());
        assert!(visible(&parts, Some("Zeta"), "").is_empty());
    }

    #[test]
    fn test_query_is_case_insensitive_over_all_fields() {
        let parts = catalog();
        assert_eq!(ids(&visible(&parts, None, "  BOLT ")), vec!["1"]);
        assert_eq!(ids(&visible(&parts, None, "drive")), vec!["5"]);
        assert_eq!(ids(&visible(&parts, None, "img/6")), vec!["6"]);
        assert_eq!(ids(&visible(&parts, None, "br")), vec!["7"]);
        assert!(visible(&parts, None, "washer").is_empty());
    }

    #[test]
    fn test_customer_and_query_combine() {
        let parts = catalog();
        assert_eq!(ids(&visible(&parts, Some("Acme"), "b")), vec!["1", "7"]);
        assert!(visible(&parts, Some("Beta"), "bolt").is_empty());
    }

    #[test]
    fn test_groups_are_sorted_and_skip_unavailable() {
        let groups = group_by_customer(&catalog());
        let keys: Vec<&str> = groups.keys().map(String::as_str).collect();
        assert_eq!(keys, vec![UNKNOWN_CUSTOMER, "Acme", "Beta"]);
        assert_eq!(ids(&groups["Acme"]), vec!["1", "7"]);
        assert_eq!(ids(&groups["Beta"]), vec!["2", "5"]);
        assert_eq!(ids(&groups[UNKNOWN_CUSTOMER]), vec!["6"]);
    }

    #[test]
    fn test_available_count() {
        assert_eq!(available_count(&catalog()), 5);
        assert_eq!(available_count(&[]), 0);
    }
}
