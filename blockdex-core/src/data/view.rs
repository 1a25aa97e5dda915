use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::record::ContentType;

/// One of the two alternate aggregations of the same records.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetView {
    Versions,
    Years,
}

impl DatasetView {
    pub fn as_param(&self) -> &'static str {
        match self {
            Self::Versions => "versions",
            Self::Years => "years",
        }
    }

    pub fn from_param(param: &str) -> Option<Self> {
        match param {
            "versions" => Some(Self::Versions),
            "years" => Some(Self::Years),
            _ => None,
        }
    }

    /// The `detailType` parameter value implied by this view.
    pub fn as_detail_kind(&self) -> &'static str {
        match self {
            Self::Versions => "version",
            Self::Years => "year",
        }
    }

    pub fn from_detail_kind(kind: &str) -> Self {
        if kind == "year" {
            Self::Years
        } else {
            Self::Versions
        }
    }
}

impl Default for DatasetView {
    fn default() -> Self {
        Self::Versions
    }
}

/// The mutually exclusive top-level behavior.  Exactly one is active at any
/// time; `List` is the default and has no URL parameter of its own.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Mode {
    List,
    Compare,
    Stats,
    TimeSince,
    MaterialGroups,
    Detail,
}

impl Mode {
    pub fn as_param(&self) -> Option<&'static str> {
        match self {
            Self::List => None,
            Self::Compare => Some("compare"),
            Self::Stats => Some("stats"),
            Self::TimeSince => Some("time-since"),
            Self::MaterialGroups => Some("material-groups"),
            Self::Detail => Some("detail"),
        }
    }

    pub fn from_param(param: &str) -> Option<Self> {
        match param {
            "compare" => Some(Self::Compare),
            "stats" => Some(Self::Stats),
            "time-since" => Some(Self::TimeSince),
            "material-groups" => Some(Self::MaterialGroups),
            "detail" => Some(Self::Detail),
            _ => None,
        }
    }

    /// Modes that own a lazily fetched dataset and therefore an exit hook.
    pub fn has_exit_hook(&self) -> bool {
        matches!(self, Self::Stats | Self::TimeSince | Self::MaterialGroups)
    }

    /// Modes a closed detail page may return to.
    pub fn can_return_from_detail(&self) -> bool {
        matches!(self, Self::List | Self::Stats | Self::Compare)
    }
}

impl Default for Mode {
    fn default() -> Self {
        Self::List
    }
}

/// A derived id paired with the dataset view it was selected under.  The
/// versions and years views are different object universes sharing only the
/// derived-id namespace, so selections must be re-resolved on every view
/// switch.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RecordRef {
    pub derived_id: String,
    pub view: DatasetView,
}

impl RecordRef {
    pub fn new(derived_id: impl Into<String>, view: DatasetView) -> Self {
        Self {
            derived_id: derived_id.into(),
            view,
        }
    }
}

/// The single mutable UI state value.  Owned by the controller; everything
/// else sees read-only snapshots.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewState {
    pub dataset_view: DatasetView,
    pub mode: Mode,
    pub visible: BTreeMap<ContentType, bool>,
    pub remove_duplicates: bool,
    pub search: String,
    pub compare_selection: [Option<RecordRef>; 2],
    pub detail_target: Option<RecordRef>,
    pub detail_return_mode: Mode,
    /// `"<recordId>:<sectionType>"` keys.
    pub collapsed: BTreeMap<String, bool>,
    /// Scroll offset remembered when a detail page opens, restored on close.
    pub return_scroll: f64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            dataset_view: DatasetView::default(),
            mode: Mode::default(),
            visible: ContentType::ALL.iter().map(|ty| (*ty, true)).collect(),
            remove_duplicates: true,
            search: String::new(),
            compare_selection: [None, None],
            detail_target: None,
            detail_return_mode: Mode::List,
            collapsed: BTreeMap::new(),
            return_scroll: 0.0,
        }
    }
}

impl ViewState {
    pub fn is_visible(&self, ty: ContentType) -> bool {
        self.visible.get(&ty).copied().unwrap_or(true)
    }

    pub fn section_key(record_id: &str, ty: ContentType) -> String {
        format!("{record_id}:{ty}")
    }

    pub fn is_collapsed(&self, record_id: &str, ty: ContentType) -> bool {
        self.collapsed
            .get(&Self::section_key(record_id, ty))
            .copied()
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_params_round_trip() {
        for mode in [
            Mode::Compare,
            Mode::Stats,
            Mode::TimeSince,
            Mode::MaterialGroups,
            Mode::Detail,
        ] {
            let param = mode.as_param().unwrap();
            assert_eq!(Mode::from_param(param), Some(mode));
        }
        assert_eq!(Mode::List.as_param(), None);
        assert_eq!(Mode::from_param("karaoke"), None);
    }

    #[test]
    fn view_params_round_trip() {
        assert_eq!(DatasetView::from_param("versions"), Some(DatasetView::Versions));
        assert_eq!(DatasetView::from_param("years"), Some(DatasetView::Years));
        assert_eq!(DatasetView::from_param("decades"), None);
    }

    #[test]
    fn detail_kind_mapping() {
        assert_eq!(DatasetView::from_detail_kind("year"), DatasetView::Years);
        assert_eq!(DatasetView::from_detail_kind("version"), DatasetView::Versions);
        assert_eq!(DatasetView::from_detail_kind("anything"), DatasetView::Versions);
    }

    #[test]
    fn default_state_shows_everything() {
        let state = ViewState::default();
        assert_eq!(state.mode, Mode::List);
        assert_eq!(state.dataset_view, DatasetView::Versions);
        for ty in ContentType::ALL {
            assert!(state.is_visible(ty));
        }
        assert!(!state.is_collapsed("v1_17", ContentType::Blocks));
    }
}
