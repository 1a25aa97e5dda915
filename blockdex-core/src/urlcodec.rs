//! Serialization of the URL-visible state subset.  Decoding ignores
//! unrecognized values so a stale or hand-mangled URL degrades to the
//! persisted-or-default state instead of failing.

use url::form_urlencoded;

use crate::data::{DatasetView, Mode, ViewState};

/// The state conveyed by URL query parameters.  `None` means "parameter
/// absent or invalid"; the reconciliation merge falls through to the
/// persisted or default value.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UrlState {
    pub view: Option<DatasetView>,
    pub mode: Option<Mode>,
    pub search: Option<String>,
    pub compare1: Option<String>,
    pub compare2: Option<String>,
    pub detail_type: Option<String>,
    pub detail_id: Option<String>,
}

pub fn decode(query: &str) -> UrlState {
    let mut state = UrlState::default();
    for (key, value) in form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
        match key.as_ref() {
            "view" => state.view = DatasetView::from_param(&value),
            "mode" => state.mode = Mode::from_param(&value),
            "search" => state.search = Some(value.into_owned()),
            "compare1" => state.compare1 = Some(value.into_owned()),
            "compare2" => state.compare2 = Some(value.into_owned()),
            "detailType" => state.detail_type = Some(value.into_owned()),
            "detailId" => state.detail_id = Some(value.into_owned()),
            other => log::debug!("ignoring unknown URL parameter {other:?}"),
        }
    }
    state
}

/// Encodes the current state as a query string.  Defaults are left out so
/// the plain list view keeps a bare URL.
pub fn encode(state: &ViewState) -> String {
    let mut ser = form_urlencoded::Serializer::new(String::new());
    if state.dataset_view != DatasetView::Versions {
        ser.append_pair("view", state.dataset_view.as_param());
    }
    if let Some(mode) = state.mode.as_param() {
        ser.append_pair("mode", mode);
    }
    if !state.search.is_empty() {
        ser.append_pair("search", &state.search);
    }
    if state.mode == Mode::Compare {
        for (key, slot) in [
            ("compare1", &state.compare_selection[0]),
            ("compare2", &state.compare_selection[1]),
        ] {
            if let Some(selected) = slot {
                ser.append_pair(key, &selected.derived_id);
            }
        }
    }
    if state.mode == Mode::Detail {
        if let Some(target) = &state.detail_target {
            ser.append_pair("detailType", target.view.as_detail_kind());
            ser.append_pair("detailId", &target.derived_id);
        }
    }
    ser.finish()
}

/// How a URL change should interact with browser history: incidental changes
/// replace the current entry, navigational actions push a new one.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HistoryMode {
    Replace,
    Push,
}

/// Receiver of encoded URL state, e.g. the browser history collaborator.
pub trait UrlSink {
    fn replace(&mut self, query: String);
    fn push(&mut self, query: String);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RecordRef;

    #[test]
    fn decodes_known_parameters() {
        let state = decode("?view=years&mode=compare&search=ender+%23boss&compare1=v1_17");
        assert_eq!(state.view, Some(DatasetView::Years));
        assert_eq!(state.mode, Some(Mode::Compare));
        assert_eq!(state.search.as_deref(), Some("ender #boss"));
        assert_eq!(state.compare1.as_deref(), Some("v1_17"));
        assert_eq!(state.compare2, None);
    }

    #[test]
    fn invalid_enum_values_decode_to_absent() {
        let state = decode("view=decades&mode=karaoke&search=x");
        assert_eq!(state.view, None);
        assert_eq!(state.mode, None);
        assert_eq!(state.search.as_deref(), Some("x"));
    }

    #[test]
    fn unknown_parameters_are_ignored() {
        let state = decode("utm_source=feed&view=years");
        assert_eq!(state.view, Some(DatasetView::Years));
    }

    #[test]
    fn default_state_encodes_to_an_empty_query() {
        assert_eq!(encode(&ViewState::default()), "");
    }

    #[test]
    fn compare_ids_are_encoded_only_in_compare_mode() {
        let mut state = ViewState::default();
        state.compare_selection[0] = Some(RecordRef::new("v1_17", DatasetView::Versions));
        assert_eq!(encode(&state), "");

        state.mode = Mode::Compare;
        assert_eq!(encode(&state), "mode=compare&compare1=v1_17");
    }

    #[test]
    fn detail_target_is_encoded_only_in_detail_mode() {
        let mut state = ViewState::default();
        state.detail_target = Some(RecordRef::new("v2021", DatasetView::Years));
        assert_eq!(encode(&state), "");

        state.mode = Mode::Detail;
        assert_eq!(encode(&state), "mode=detail&detailType=year&detailId=v2021");
    }

    #[test]
    fn encode_decode_round_trip() {
        let mut state = ViewState::default();
        state.dataset_view = DatasetView::Years;
        state.mode = Mode::Compare;
        state.search = "mud #blocks".into();
        state.compare_selection = [
            Some(RecordRef::new("v2021", DatasetView::Years)),
            Some(RecordRef::new("v2022", DatasetView::Years)),
        ];
        let decoded = decode(&encode(&state));
        assert_eq!(decoded.view, Some(DatasetView::Years));
        assert_eq!(decoded.mode, Some(Mode::Compare));
        assert_eq!(decoded.search.as_deref(), Some("mud #blocks"));
        assert_eq!(decoded.compare1.as_deref(), Some("v2021"));
        assert_eq!(decoded.compare2.as_deref(), Some("v2022"));
    }
}
