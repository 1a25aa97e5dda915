use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::Date;

use crate::data::id::{derived_id, Id};

/// Tag that marks an item as a hidden variant.  Items carrying it are
/// suppressed when duplicate removal is enabled.
pub const HIDDEN_TAG: &str = "hidden";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Blocks,
    Items,
    Mobs,
    Biomes,
    Structures,
    Effects,
}

impl ContentType {
    /// Canonical display order of the catalogued categories.
    pub const ALL: [ContentType; 6] = [
        Self::Blocks,
        Self::Items,
        Self::Mobs,
        Self::Biomes,
        Self::Structures,
        Self::Effects,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Blocks => "blocks",
            Self::Items => "items",
            Self::Mobs => "mobs",
            Self::Biomes => "biomes",
            Self::Structures => "structures",
            Self::Effects => "effects",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|ty| ty.key() == key)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One catalogued addition.  Immutable once loaded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub identifier: String,
    pub name: String,
    #[serde(default)]
    pub wiki: Option<String>,
    /// Combined tag/type set, used for dedup and tag search.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Opaque payload, e.g. nested related items.
    #[serde(default)]
    pub meta: serde_json::Value,
}

impl ContentItem {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    pub fn is_hidden(&self) -> bool {
        self.has_tag(HIDDEN_TAG)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Major,
    Minor,
    Drop,
    /// Synthetic kind of the per-year aggregates.
    Year,
}

impl Default for RecordKind {
    fn default() -> Self {
        Self::Minor
    }
}

/// Release date of a record, parsed from its raw string form.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReleaseDate {
    /// No date at all, the update is still upcoming.
    Upcoming,
    /// A bare four-digit year.
    Year(i32),
    /// A full calendar date.
    Full(Date),
    /// A date string we could not make sense of.
    Unparsed,
}

impl ReleaseDate {
    pub fn parse(raw: Option<&str>) -> Self {
        let format = format_description!("[year]-[month]-[day]");
        match raw {
            None => Self::Upcoming,
            Some(s) if s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit()) => {
                s.parse().map(Self::Year).unwrap_or(Self::Unparsed)
            }
            Some(s) => Date::parse(s, &format)
                .map(Self::Full)
                .unwrap_or(Self::Unparsed),
        }
    }

    pub fn year(&self) -> Option<i32> {
        match self {
            Self::Year(year) => Some(*year),
            Self::Full(date) => Some(date.year()),
            Self::Upcoming | Self::Unparsed => None,
        }
    }
}

/// Raw, wire-shaped record as it appears in the dataset files.  Normalized
/// into [`UpdateRecord`] at the ingestion boundary.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "version")]
    pub release_version_label: Option<String>,
    #[serde(default, rename = "date")]
    pub release_date: Option<String>,
    #[serde(default)]
    pub wiki: Option<String>,
    #[serde(default)]
    pub kind: RecordKind,
    #[serde(default)]
    pub added: BTreeMap<ContentType, Vec<ContentItem>>,
}

/// One version or drop.  Immutable after load; the full ordered list is the
/// single source of truth for the versions view.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UpdateRecord {
    pub derived_id: String,
    pub name: String,
    pub release_version_label: String,
    /// `None` means upcoming, a bare four-digit string is year-only,
    /// anything else is a full date string.
    pub release_date: Option<String>,
    pub wiki: Option<String>,
    pub kind: RecordKind,
    pub added: BTreeMap<ContentType, Vec<ContentItem>>,
}

impl UpdateRecord {
    pub fn from_raw(raw: RawRecord) -> Self {
        let id = derived_id(raw.name.as_deref(), raw.release_version_label.as_deref());
        let name = raw
            .name
            .or_else(|| raw.release_version_label.clone())
            .unwrap_or_else(|| id.clone());
        Self {
            derived_id: id,
            release_version_label: raw.release_version_label.unwrap_or_default(),
            name,
            release_date: raw.release_date,
            wiki: raw.wiki,
            kind: raw.kind,
            added: raw.added,
        }
    }

    pub fn release(&self) -> ReleaseDate {
        ReleaseDate::parse(self.release_date.as_deref())
    }

    pub fn count(&self, ty: ContentType) -> usize {
        self.added.get(&ty).map_or(0, Vec::len)
    }

    pub fn total_count(&self) -> usize {
        self.added.values().map(Vec::len).sum()
    }
}

impl Id for UpdateRecord {
    fn id(&self) -> &str {
        &self.derived_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn release_date_partitions() {
        assert_eq!(ReleaseDate::parse(None), ReleaseDate::Upcoming);
        assert_eq!(ReleaseDate::parse(Some("2021")), ReleaseDate::Year(2021));
        assert!(matches!(
            ReleaseDate::parse(Some("2021-06-01")),
            ReleaseDate::Full(_)
        ));
        assert_eq!(ReleaseDate::parse(Some("soon(tm)")), ReleaseDate::Unparsed);
        assert_eq!(ReleaseDate::parse(Some("21")), ReleaseDate::Unparsed);
    }

    #[test]
    fn release_date_year_extraction() {
        assert_eq!(ReleaseDate::parse(Some("2021-06-01")).year(), Some(2021));
        assert_eq!(ReleaseDate::parse(Some("2019")).year(), Some(2019));
        assert_eq!(ReleaseDate::parse(None).year(), None);
        assert_eq!(ReleaseDate::parse(Some("n/a")).year(), None);
    }

    #[test]
    fn raw_record_normalization() {
        let raw: RawRecord = serde_json::from_value(json!({
            "name": "Caves & Cliffs",
            "version": "1.17",
            "date": "2021-06-08",
            "added": {
                "blocks": [
                    { "identifier": "copper_block", "name": "Copper Block" }
                ]
            }
        }))
        .unwrap();
        let record = UpdateRecord::from_raw(raw);
        assert_eq!(record.derived_id, "Caves_Cliffs");
        assert_eq!(record.name, "Caves & Cliffs");
        assert_eq!(record.release_version_label, "1.17");
        assert_eq!(record.count(ContentType::Blocks), 1);
        assert_eq!(record.count(ContentType::Mobs), 0);
    }

    #[test]
    fn raw_record_missing_name_falls_back_to_version() {
        let raw: RawRecord = serde_json::from_value(json!({ "version": "1.2.4" })).unwrap();
        let record = UpdateRecord::from_raw(raw);
        assert_eq!(record.derived_id, "v1_2_4");
        assert_eq!(record.name, "1.2.4");
    }

    #[test]
    fn hidden_tag_detection() {
        let item: ContentItem = serde_json::from_value(json!({
            "identifier": "waxed_copper",
            "name": "Waxed Copper",
            "tags": ["blocks", "hidden"]
        }))
        .unwrap();
        assert!(item.is_hidden());
        assert!(item.has_tag("BLOCKS"));
        assert!(!item.has_tag("mobs"));
    }

    #[test]
    fn content_type_keys_round_trip() {
        for ty in ContentType::ALL {
            assert_eq!(ContentType::from_key(ty.key()), Some(ty));
        }
        assert_eq!(ContentType::from_key("paintings"), None);
    }
}
