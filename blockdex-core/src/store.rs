use std::cmp::Ordering;
use std::collections::BTreeMap;

use once_cell::sync::OnceCell;

use crate::data::{
    derived_id, ContentItem, ContentType, DatasetView, Id, RecordKind, ReleaseDate, UpdateRecord,
};

/// Canonical, immutable ordering of the loaded records, plus the memoized
/// per-year aggregation.  Loaded once per session, never mutated.
pub struct RecordStore {
    records: Vec<UpdateRecord>,
    years: OnceCell<Vec<UpdateRecord>>,
}

impl RecordStore {
    /// Sorts newest/most-relevant first: upcoming records (insertion order),
    /// then year-only records by year descending, then fully dated records
    /// by date descending.  Records with unparseable date strings sort after
    /// every parsed date, keeping their relative insertion order.
    pub fn load(mut records: Vec<UpdateRecord>) -> Self {
        records.sort_by(|a, b| Self::display_order(&a.release(), &b.release()));
        log::info!("loaded {} update records", records.len());
        Self {
            records,
            years: OnceCell::new(),
        }
    }

    fn display_order(a: &ReleaseDate, b: &ReleaseDate) -> Ordering {
        fn partition(date: &ReleaseDate) -> u8 {
            match date {
                ReleaseDate::Upcoming => 0,
                ReleaseDate::Year(_) => 1,
                ReleaseDate::Full(_) | ReleaseDate::Unparsed => 2,
            }
        }
        partition(a).cmp(&partition(b)).then_with(|| match (a, b) {
            (ReleaseDate::Year(x), ReleaseDate::Year(y)) => y.cmp(x),
            (ReleaseDate::Full(x), ReleaseDate::Full(y)) => y.cmp(x),
            (ReleaseDate::Full(_), ReleaseDate::Unparsed) => Ordering::Less,
            (ReleaseDate::Unparsed, ReleaseDate::Full(_)) => Ordering::Greater,
            _ => Ordering::Equal,
        })
    }

    pub fn records(&self) -> &[UpdateRecord] {
        &self.records
    }

    /// Synthetic per-year aggregates, newest year first.  Computed once per
    /// session; the dataset is immutable, so the grouping never goes stale.
    /// Records with no parseable year do not contribute to any group.
    pub fn year_groups(&self) -> &[UpdateRecord] {
        self.years.get_or_init(|| {
            let mut grouped: BTreeMap<i32, BTreeMap<ContentType, Vec<ContentItem>>> =
                BTreeMap::new();
            for record in &self.records {
                let Some(year) = record.release().year() else {
                    continue;
                };
                let group = grouped.entry(year).or_default();
                for (ty, items) in &record.added {
                    group.entry(*ty).or_default().extend(items.iter().cloned());
                }
            }
            grouped
                .into_iter()
                .rev()
                .map(|(year, added)| {
                    let name = year.to_string();
                    UpdateRecord {
                        derived_id: derived_id(Some(&name), None),
                        release_version_label: name.clone(),
                        release_date: Some(name.clone()),
                        name,
                        wiki: None,
                        kind: RecordKind::Year,
                        added,
                    }
                })
                .collect()
        })
    }

    pub fn dataset(&self, view: DatasetView) -> &[UpdateRecord] {
        match view {
            DatasetView::Versions => self.records(),
            DatasetView::Years => self.year_groups(),
        }
    }

    pub fn find(&self, view: DatasetView, id: &str) -> Option<&UpdateRecord> {
        self.dataset(view).iter().find(|record| record.has_id(id))
    }
}
