//! Pure search/filter pipeline.  Stateless; operates on dataset-view slices
//! and never mutates the records it is given.

use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;

use crate::data::{ContentItem, ContentType, UpdateRecord};

/// A parsed search query: free text plus `#`-prefixed tag tokens.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Query {
    /// Case-folded free text, matched as a substring of item names and
    /// identifiers.
    pub text: String,
    /// Tags matched against the item's combined tag/type set.
    pub tags: BTreeSet<String>,
}

impl Query {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.tags.is_empty()
    }
}

/// Splits on whitespace; a token starting with `#` contributes to the tag
/// set with the `#` and any non-word characters stripped, everything else is
/// rejoined into the lower-cased free-text needle.
pub fn parse_query(raw: &str) -> Query {
    let mut tags = BTreeSet::new();
    let mut words = Vec::new();
    for token in raw.split_whitespace() {
        if let Some(rest) = token.strip_prefix('#') {
            let tag: String = rest
                .chars()
                .filter(|c| c.is_alphanumeric() || *c == '_')
                .flat_map(char::to_lowercase)
                .collect();
            if !tag.is_empty() {
                tags.insert(tag);
            }
        } else {
            words.push(token);
        }
    }
    Query {
        text: words.iter().join(" ").to_lowercase(),
        tags,
    }
}

fn item_matches(item: &ContentItem, query: &Query, remove_duplicates: bool) -> bool {
    if remove_duplicates && item.is_hidden() {
        return false;
    }
    let text_ok = query.text.is_empty()
        || item.name.to_lowercase().contains(&query.text)
        || item.identifier.to_lowercase().contains(&query.text);
    text_ok && query.tags.iter().all(|tag| item.has_tag(tag))
}

pub fn filter_items(
    items: &[ContentItem],
    query: &Query,
    remove_duplicates: bool,
) -> Vec<ContentItem> {
    items
        .iter()
        .filter(|item| item_matches(item, query, remove_duplicates))
        .cloned()
        .collect()
}

/// Applies [`filter_items`] to every content-type array, returning a
/// record-shaped value with the same keys and filtered arrays.
pub fn filter_record(
    record: &UpdateRecord,
    query: &Query,
    remove_duplicates: bool,
) -> UpdateRecord {
    let added = record
        .added
        .iter()
        .map(|(ty, items)| (*ty, filter_items(items, query, remove_duplicates)))
        .collect();
    UpdateRecord {
        added,
        ..record.clone()
    }
}

/// Filters every record of the dataset view and drops the ones left with no
/// content type that is both visibility-enabled and non-empty.  Survivors
/// keep the dataset view's order.
pub fn filtered_view(
    dataset: &[UpdateRecord],
    query: &Query,
    remove_duplicates: bool,
    visible: &BTreeMap<ContentType, bool>,
) -> Vec<UpdateRecord> {
    dataset
        .iter()
        .map(|record| filter_record(record, query, remove_duplicates))
        .filter(|record| {
            record.added.iter().any(|(ty, items)| {
                !items.is_empty() && visible.get(ty).copied().unwrap_or(true)
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RawRecord;
    use serde_json::json;

    fn item(identifier: &str, name: &str, tags: &[&str]) -> ContentItem {
        serde_json::from_value(json!({
            "identifier": identifier,
            "name": name,
            "tags": tags,
        }))
        .unwrap()
    }

    fn sample_record() -> UpdateRecord {
        let raw: RawRecord = serde_json::from_value(json!({
            "name": "Wild Update",
            "date": "2022-06-07",
            "added": {
                "blocks": [
                    { "identifier": "mud", "name": "Mud", "tags": ["blocks"] },
                    { "identifier": "mud_bricks", "name": "Mud Bricks", "tags": ["blocks", "hidden"] }
                ],
                "mobs": [
                    { "identifier": "warden", "name": "Warden", "tags": ["mobs", "boss"] }
                ]
            }
        }))
        .unwrap();
        UpdateRecord::from_raw(raw)
    }

    #[test]
    fn parses_text_and_tags() {
        let query = parse_query("Ender #rare #boss");
        assert_eq!(query.text, "ender");
        assert_eq!(
            query.tags,
            ["rare", "boss"].iter().map(|s| s.to_string()).collect()
        );
    }

    #[test]
    fn strips_non_word_characters_from_tags() {
        let query = parse_query("#end-game! stray words");
        assert!(query.tags.contains("endgame"));
        assert_eq!(query.text, "stray words");
    }

    #[test]
    fn empty_and_whitespace_queries_parse_to_empty() {
        assert!(parse_query("").is_empty());
        assert!(parse_query("   \t ").is_empty());
        // A bare `#` contributes nothing.
        assert!(parse_query("#").is_empty());
    }

    #[test]
    fn text_matches_name_or_identifier_case_insensitively() {
        let items = vec![item("mud_bricks", "Mud Bricks", &[]), item("warden", "Warden", &[])];
        let query = parse_query("BRICK");
        let hits = filter_items(&items, &query, false);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].identifier, "mud_bricks");
    }

    #[test]
    fn all_query_tags_must_be_present() {
        let items = vec![
            item("warden", "Warden", &["mobs", "boss"]),
            item("allay", "Allay", &["mobs"]),
        ];
        let hits = filter_items(&items, &parse_query("#mobs #boss"), false);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].identifier, "warden");
    }

    #[test]
    fn remove_duplicates_suppresses_hidden_items_regardless_of_match() {
        let items = vec![
            item("mud", "Mud", &["blocks"]),
            item("mud_bricks", "Mud Bricks", &["blocks", "hidden"]),
        ];
        let query = parse_query("mud");
        assert_eq!(filter_items(&items, &query, false).len(), 2);
        let deduped = filter_items(&items, &query, true);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].identifier, "mud");
    }

    #[test]
    fn filter_record_shrinks_arrays_and_keeps_keys() {
        let record = sample_record();
        let filtered = filter_record(&record, &parse_query("mud"), false);
        assert_eq!(filtered.added[&ContentType::Blocks].len(), 2);
        assert_eq!(filtered.added[&ContentType::Mobs].len(), 0);
        assert_eq!(filtered.added.len(), record.added.len());
        // The original record is untouched.
        assert_eq!(record.added[&ContentType::Mobs].len(), 1);
    }

    #[test]
    fn filtering_is_idempotent() {
        let record = sample_record();
        for (raw, dedup) in [("mud", true), ("#boss", false), ("", true), ("warden", false)] {
            let query = parse_query(raw);
            let once = filter_record(&record, &query, dedup);
            let twice = filter_record(&once, &query, dedup);
            assert_eq!(once, twice, "query {raw:?} dedup {dedup}");
        }
    }

    #[test]
    fn records_with_nothing_visible_left_are_dropped() {
        let record = sample_record();
        let visible: BTreeMap<ContentType, bool> =
            ContentType::ALL.iter().map(|ty| (*ty, true)).collect();

        // "warden" only matches the mobs array; hide mobs and the record
        // disappears from the view.
        let mut mobs_hidden = visible.clone();
        mobs_hidden.insert(ContentType::Mobs, false);
        let query = parse_query("warden");
        assert_eq!(filtered_view(&[record.clone()], &query, false, &visible).len(), 1);
        assert_eq!(filtered_view(&[record], &query, false, &mobs_hidden).len(), 0);
    }

    #[test]
    fn surviving_records_keep_dataset_order() {
        let a = sample_record();
        let mut b = sample_record();
        b.derived_id = "second".into();
        b.name = "Second".into();
        let visible: BTreeMap<ContentType, bool> =
            ContentType::ALL.iter().map(|ty| (*ty, true)).collect();
        let out = filtered_view(&[a, b], &parse_query(""), false, &visible);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].name, "Wild Update");
        assert_eq!(out[1].name, "Second");
    }
}
