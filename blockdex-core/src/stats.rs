//! Growth aggregation feeding the stats mode's chart rendering.

use std::collections::BTreeMap;

use crate::data::{ContentType, UpdateRecord};

/// Per-period counts per content type, in ascending chronological order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GrowthSeries {
    pub labels: Vec<String>,
    pub series: BTreeMap<ContentType, Vec<usize>>,
}

/// Runs the running-sum scan over the dataset view in ascending chronological
/// order, i.e. the reverse of the display order.  That ordering is what gives
/// "cumulative growth" its meaning and must not change.
pub fn growth(dataset: &[UpdateRecord], cumulative: bool) -> GrowthSeries {
    let mut labels = Vec::with_capacity(dataset.len());
    let mut series: BTreeMap<ContentType, Vec<usize>> = ContentType::ALL
        .iter()
        .map(|ty| (*ty, Vec::with_capacity(dataset.len())))
        .collect();
    let mut totals: BTreeMap<ContentType, usize> =
        ContentType::ALL.iter().map(|ty| (*ty, 0)).collect();

    for record in dataset.iter().rev() {
        labels.push(record.name.clone());
        for ty in ContentType::ALL {
            let count = record.count(ty);
            let total = totals.entry(ty).or_default();
            *total += count;
            let value = if cumulative { *total } else { count };
            if let Some(points) = series.get_mut(&ty) {
                points.push(value);
            }
        }
    }
    GrowthSeries { labels, series }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RawRecord;
    use crate::store::RecordStore;
    use serde_json::json;

    fn record(name: &str, date: &str, blocks: usize, mobs: usize) -> UpdateRecord {
        let make = |prefix: &str, n: usize| {
            (0..n)
                .map(|i| json!({ "identifier": format!("{prefix}_{i}"), "name": format!("{prefix} {i}") }))
                .collect::<Vec<_>>()
        };
        let raw: RawRecord = serde_json::from_value(json!({
            "name": name,
            "date": date,
            "added": { "blocks": make("block", blocks), "mobs": make("mob", mobs) }
        }))
        .unwrap();
        UpdateRecord::from_raw(raw)
    }

    #[test]
    fn scans_in_ascending_chronological_order() {
        let store = RecordStore::load(vec![
            record("Old", "2019-01-01", 2, 0),
            record("Mid", "2020-01-01", 3, 1),
            record("New", "2021-01-01", 1, 4),
        ]);
        let growth = growth(store.records(), false);
        assert_eq!(growth.labels, ["Old", "Mid", "New"]);
        assert_eq!(growth.series[&ContentType::Blocks], [2, 3, 1]);
        assert_eq!(growth.series[&ContentType::Mobs], [0, 1, 4]);
    }

    #[test]
    fn cumulative_series_is_a_running_sum() {
        let store = RecordStore::load(vec![
            record("Old", "2019-01-01", 2, 0),
            record("Mid", "2020-01-01", 3, 1),
            record("New", "2021-01-01", 1, 4),
        ]);
        let growth = growth(store.records(), true);
        assert_eq!(growth.series[&ContentType::Blocks], [2, 5, 6]);
        assert_eq!(growth.series[&ContentType::Mobs], [0, 1, 5]);
    }

    #[test]
    fn empty_dataset_yields_empty_series() {
        let growth = growth(&[], true);
        assert!(growth.labels.is_empty());
        for ty in ContentType::ALL {
            assert!(growth.series[&ty].is_empty());
        }
    }
}
