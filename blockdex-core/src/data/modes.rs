use serde::Deserialize;
use time::{Date, OffsetDateTime};

use crate::data::record::{ContentItem, ReleaseDate};

/// Curated overlay series shown in the stats mode next to the computed
/// growth chart.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct StatsDataset {
    #[serde(default)]
    pub points: Vec<StatsPoint>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct StatsPoint {
    pub label: String,
    pub value: f64,
}

/// One tracked event of the time-since mode.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct TimeSinceEntry {
    pub name: String,
    #[serde(default)]
    pub wiki: Option<String>,
    pub date: String,
}

impl TimeSinceEntry {
    pub fn parsed_date(&self) -> Option<Date> {
        match ReleaseDate::parse(Some(&self.date)) {
            ReleaseDate::Full(date) => Some(date),
            _ => None,
        }
    }
}

/// A named family of related items, e.g. everything made of one material.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct MaterialGroup {
    pub name: String,
    #[serde(default)]
    pub items: Vec<ContentItem>,
}

/// Elapsed-time text recomputed by the time-since ticker.  Clamps to zero
/// for dates that have not happened yet.
pub fn elapsed_label(from: Date, now: OffsetDateTime) -> String {
    let from = from.midnight().assume_utc();
    let seconds = (now - from).whole_seconds().max(0);
    let days = seconds / 86_400;
    let rest = seconds % 86_400;
    let (hours, minutes, seconds) = (rest / 3_600, rest % 3_600 / 60, rest % 60);
    if days >= 365 {
        let years = days / 365;
        let year_word = if years == 1 { "year" } else { "years" };
        format!(
            "{} {}, {} days, {:02}:{:02}:{:02}",
            years,
            year_word,
            days % 365,
            hours,
            minutes,
            seconds
        )
    } else {
        format!("{} days, {:02}:{:02}:{:02}", days, hours, minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn elapsed_label_under_a_year() {
        let label = elapsed_label(date!(2021 - 06 - 08), datetime!(2021 - 06 - 10 03:15:09 UTC));
        assert_eq!(label, "2 days, 03:15:09");
    }

    #[test]
    fn elapsed_label_splits_years() {
        let label = elapsed_label(date!(2020 - 01 - 01), datetime!(2021 - 02 - 11 00:00:30 UTC));
        assert_eq!(label, "1 year, 42 days, 00:00:30");
    }

    #[test]
    fn elapsed_label_clamps_future_dates() {
        let label = elapsed_label(date!(2030 - 01 - 01), datetime!(2021 - 01 - 01 00:00:00 UTC));
        assert_eq!(label, "0 days, 00:00:00");
    }

    #[test]
    fn time_since_entry_parses_full_dates_only() {
        let entry = TimeSinceEntry {
            name: "Last drop".into(),
            wiki: None,
            date: "2024-12-03".into(),
        };
        assert!(entry.parsed_date().is_some());

        let vague = TimeSinceEntry {
            name: "Sometime".into(),
            wiki: None,
            date: "2024".into(),
        };
        assert!(vague.parsed_date().is_none());
    }
}
