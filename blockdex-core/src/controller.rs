//! Owner of the mutable view state.  All mutation funnels through the
//! controller so the mode invariant stays enforceable in one place; every
//! other component gets read-only snapshots or pure-function inputs.

use crossbeam_channel::Sender;

use crate::data::{
    ContentType, DatasetView, MaterialGroup, Mode, Promise, RecordRef, StatsDataset,
    TimeSinceEntry, UpdateRecord, ViewState,
};
use crate::error::Error;
use crate::persist::{KeyValueStore, PersistenceGateway, Snapshot};
use crate::query::{self, Query};
use crate::stats::{self, GrowthSeries};
use crate::store::RecordStore;
use crate::ticker::{TickEvent, Ticker};
use crate::urlcodec::{self, HistoryMode, UrlSink, UrlState};

/// Token for an in-flight lazy fetch.  A completion whose token no longer
/// matches the mode's deferred epoch is discarded; this is how an exit hook
/// invalidates a fetch that has not resolved yet.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FetchTicket {
    pub mode: Mode,
    epoch: u64,
}

pub struct ViewStateController<S, U> {
    store: RecordStore,
    state: ViewState,
    persistence: PersistenceGateway<S>,
    url: U,
    events: Sender<TickEvent>,
    epoch: u64,
    stats: Promise<StatsDataset, u64>,
    time_since: Promise<Vec<TimeSinceEntry>, u64>,
    material_groups: Promise<Vec<MaterialGroup>, u64>,
    ticker: Option<Ticker>,
}

impl<S: KeyValueStore, U: UrlSink> ViewStateController<S, U> {
    pub fn new(
        store: RecordStore,
        persistence: PersistenceGateway<S>,
        url: U,
        events: Sender<TickEvent>,
    ) -> Self {
        Self {
            store,
            state: ViewState::default(),
            persistence,
            url,
            events,
            epoch: 0,
            stats: Promise::Empty,
            time_since: Promise::Empty,
            material_groups: Promise::Empty,
            ticker: None,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn url_sink(&self) -> &U {
        &self.url
    }

    // ---- startup reconciliation ----------------------------------------

    /// Merges built-in defaults, the persisted snapshot, and the URL
    /// parameters (URL wins), then resolves every persisted reference
    /// against the loaded dataset.  Runs once after the dataset load.
    pub fn reconcile_startup(&mut self, url_query: &str) {
        let stored = self.persistence.load();
        let url_state = urlcodec::decode(url_query);
        self.state = reconcile(ViewState::default(), stored.as_ref(), &url_state);

        self.resolve_selections();
        if let Some(target) = &self.state.detail_target {
            if self.store.find(target.view, &target.derived_id).is_none() {
                log::info!(
                    "detail target {:?} not present in the dataset, dropping it",
                    target.derived_id
                );
                self.state.detail_target = None;
            }
        }
        if self.state.mode == Mode::Detail && self.state.detail_target.is_none() {
            self.state.mode = Mode::List;
        }

        self.enter_mode(self.state.mode);
        self.sync(HistoryMode::Replace);
    }

    // ---- mode state machine --------------------------------------------

    pub fn set_mode(&mut self, target: Mode) {
        if target == self.state.mode {
            return;
        }
        self.run_exit_hook();
        self.state.mode = target;
        if target != Mode::Detail {
            self.state.detail_target = None;
        }
        self.enter_mode(target);
        self.sync(HistoryMode::Push);
    }

    pub fn toggle_mode(&mut self, mode: Mode) {
        let target = if self.state.mode == mode {
            Mode::List
        } else {
            mode
        };
        self.set_mode(target);
    }

    fn run_exit_hook(&mut self) {
        match self.state.mode {
            Mode::Stats => self.stats.clear(),
            Mode::MaterialGroups => self.material_groups.clear(),
            Mode::TimeSince => {
                self.time_since.clear();
                if let Some(ticker) = self.ticker.take() {
                    ticker.cancel();
                }
            }
            Mode::List | Mode::Compare | Mode::Detail => {}
        }
    }

    fn enter_mode(&mut self, target: Mode) {
        match target {
            Mode::Stats => {
                self.epoch += 1;
                self.stats.defer(self.epoch);
            }
            Mode::MaterialGroups => {
                self.epoch += 1;
                self.material_groups.defer(self.epoch);
            }
            Mode::TimeSince => {
                self.epoch += 1;
                self.time_since.defer(self.epoch);
                self.ticker = Some(Ticker::start(Ticker::PERIOD, self.events.clone()));
            }
            Mode::List | Mode::Compare | Mode::Detail => {}
        }
    }

    pub fn ticker_running(&self) -> bool {
        self.ticker.is_some()
    }

    // ---- dataset view --------------------------------------------------

    pub fn set_dataset_view(&mut self, view: DatasetView) {
        if view == self.state.dataset_view {
            return;
        }
        // Detail pages and the time-since timer do not survive a change of
        // aggregation dimension.
        if matches!(self.state.mode, Mode::Detail | Mode::TimeSince) {
            self.set_mode(Mode::List);
        }
        self.state.dataset_view = view;
        self.resolve_selections();
        self.sync(HistoryMode::Push);
    }

    /// Re-resolves the compare selection.  A ref that resolves in the
    /// current view is re-tagged to it; a ref whose id is gone from both
    /// universes is dropped and the user must re-pick.  A ref that only
    /// resolves in the view it was selected under is kept so it can be
    /// resurrected when the user switches back.
    fn resolve_selections(&mut self) {
        let view = self.state.dataset_view;
        for slot in &mut self.state.compare_selection {
            let Some(selected) = slot.as_mut() else {
                continue;
            };
            if self.store.find(view, &selected.derived_id).is_some() {
                selected.view = view;
            } else if self.store.find(selected.view, &selected.derived_id).is_none() {
                log::info!(
                    "compare selection {:?} no longer resolves, clearing it",
                    selected.derived_id
                );
                *slot = None;
            }
        }
    }

    // ---- detail sub-flow -----------------------------------------------

    /// Opens the record addressed by `(kind, id)`, remembering where to
    /// return to.  Unresolvable targets make this a no-op.
    pub fn open_detail(&mut self, kind: &str, id: &str, scroll: f64) {
        let view = DatasetView::from_detail_kind(kind);
        if self.store.find(view, id).is_none() {
            log::warn!("detail target {kind}:{id} not found, ignoring");
            return;
        }
        let current = self.state.mode;
        if current != Mode::Detail {
            self.state.detail_return_mode = if current.can_return_from_detail() {
                current
            } else {
                Mode::List
            };
            self.state.return_scroll = scroll;
        }
        self.state.detail_target = Some(RecordRef::new(id, view));
        if current == Mode::Detail {
            self.sync(HistoryMode::Push);
        } else {
            self.set_mode(Mode::Detail);
        }
    }

    /// Leaves the detail page, returning the scroll offset to restore.
    pub fn close_detail(&mut self) -> f64 {
        if self.state.mode == Mode::Detail {
            let back = self.state.detail_return_mode;
            let back = if back.can_return_from_detail() {
                back
            } else {
                Mode::List
            };
            self.set_mode(back);
        }
        self.state.return_scroll
    }

    pub fn detail_record(&self) -> Option<&UpdateRecord> {
        let target = self.state.detail_target.as_ref()?;
        self.store.find(target.view, &target.derived_id)
    }

    // ---- filters, search, sections -------------------------------------

    pub fn set_search(&mut self, raw: &str) {
        if self.state.search == raw {
            return;
        }
        self.state.search = raw.to_string();
        self.sync(HistoryMode::Replace);
    }

    pub fn set_visibility(&mut self, ty: ContentType, visible: bool) {
        self.state.visible.insert(ty, visible);
        self.sync(HistoryMode::Replace);
    }

    pub fn set_remove_duplicates(&mut self, on: bool) {
        if self.state.remove_duplicates == on {
            return;
        }
        self.state.remove_duplicates = on;
        self.sync(HistoryMode::Replace);
    }

    pub fn toggle_section(&mut self, record_id: &str, ty: ContentType) {
        let key = ViewState::section_key(record_id, ty);
        let flag = self.state.collapsed.entry(key).or_insert(false);
        *flag = !*flag;
        self.sync(HistoryMode::Replace);
    }

    // ---- compare selection ---------------------------------------------

    /// Records a compare pick under the active dataset view.  `slot` is 0
    /// or 1; ids that do not resolve are ignored.
    pub fn pick_compare(&mut self, slot: usize, id: &str) {
        let Some(entry) = self.state.compare_selection.get_mut(slot) else {
            log::warn!("compare slot {slot} out of range");
            return;
        };
        let view = self.state.dataset_view;
        if self.store.find(view, id).is_none() {
            log::warn!("compare pick {id:?} not found in {view:?}, ignoring");
            return;
        }
        *entry = Some(RecordRef::new(id, view));
        self.sync(HistoryMode::Replace);
    }

    pub fn clear_compare(&mut self, slot: usize) {
        if let Some(entry) = self.state.compare_selection.get_mut(slot) {
            *entry = None;
            self.sync(HistoryMode::Replace);
        }
    }

    /// The compare selection resolved against the active dataset view.
    pub fn resolved_compare(&self) -> [Option<&UpdateRecord>; 2] {
        let view = self.state.dataset_view;
        let resolve = |slot: &Option<RecordRef>| {
            slot.as_ref()
                .and_then(|selected| self.store.find(view, &selected.derived_id))
        };
        [
            resolve(&self.state.compare_selection[0]),
            resolve(&self.state.compare_selection[1]),
        ]
    }

    // ---- derived views --------------------------------------------------

    pub fn query(&self) -> Query {
        query::parse_query(&self.state.search)
    }

    /// The filtered dataset view consumed by the rendering layer.
    pub fn visible_records(&self) -> Vec<UpdateRecord> {
        query::filtered_view(
            self.store.dataset(self.state.dataset_view),
            &self.query(),
            self.state.remove_duplicates,
            &self.state.visible,
        )
    }

    pub fn growth(&self, cumulative: bool) -> GrowthSeries {
        stats::growth(self.store.dataset(self.state.dataset_view), cumulative)
    }

    // ---- lazy mode datasets --------------------------------------------

    /// What the driver should fetch next, if anything.
    pub fn pending_fetch(&self) -> Option<FetchTicket> {
        let ticket = FetchTicket {
            mode: self.state.mode,
            epoch: self.epoch,
        };
        match self.state.mode {
            Mode::Stats if self.stats.is_deferred(&self.epoch) => Some(ticket),
            Mode::TimeSince if self.time_since.is_deferred(&self.epoch) => Some(ticket),
            Mode::MaterialGroups if self.material_groups.is_deferred(&self.epoch) => Some(ticket),
            _ => None,
        }
    }

    pub fn complete_stats(&mut self, ticket: FetchTicket, result: Result<StatsDataset, Error>) {
        if !self.stats.is_deferred(&ticket.epoch) {
            log::debug!("discarding stale stats fetch (epoch {})", ticket.epoch);
            return;
        }
        if let Err(err) = &result {
            log::warn!("stats dataset failed to load: {err}");
        }
        self.stats.resolve_or_reject(result);
    }

    pub fn complete_time_since(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<TimeSinceEntry>, Error>,
    ) {
        if !self.time_since.is_deferred(&ticket.epoch) {
            log::debug!("discarding stale time-since fetch (epoch {})", ticket.epoch);
            return;
        }
        if let Err(err) = &result {
            log::warn!("time-since dataset failed to load: {err}");
        }
        self.time_since.resolve_or_reject(result);
    }

    pub fn complete_material_groups(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<MaterialGroup>, Error>,
    ) {
        if !self.material_groups.is_deferred(&ticket.epoch) {
            log::debug!(
                "discarding stale material-groups fetch (epoch {})",
                ticket.epoch
            );
            return;
        }
        if let Err(err) = &result {
            log::warn!("material-groups dataset failed to load: {err}");
        }
        self.material_groups.resolve_or_reject(result);
    }

    pub fn stats_data(&self) -> &Promise<StatsDataset, u64> {
        &self.stats
    }

    pub fn time_since_data(&self) -> &Promise<Vec<TimeSinceEntry>, u64> {
        &self.time_since
    }

    pub fn material_groups_data(&self) -> &Promise<Vec<MaterialGroup>, u64> {
        &self.material_groups
    }

    // ---- gateways -------------------------------------------------------

    fn sync(&mut self, history: HistoryMode) {
        self.persistence.save(&Snapshot::from_state(&self.state));
        let query = urlcodec::encode(&self.state);
        match history {
            HistoryMode::Replace => self.url.replace(query),
            HistoryMode::Push => self.url.push(query),
        }
    }
}

impl<S, U> Drop for ViewStateController<S, U> {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.cancel();
        }
    }
}

/// The ordered three-source merge: built-in defaults, then the persisted
/// snapshot, then the URL parameters.  Pure so it can be tested without any
/// storage or history collaborator.
pub fn reconcile(defaults: ViewState, stored: Option<&Snapshot>, url: &UrlState) -> ViewState {
    let mut state = defaults;
    if let Some(snap) = stored {
        state.dataset_view = snap.view;
        for (ty, on) in &snap.visible {
            state.visible.insert(*ty, *on);
        }
        state.remove_duplicates = snap.remove_duplicates;
        state.collapsed = snap.collapsed.clone();
        state.mode = snap.mode();
        state.detail_return_mode = snap
            .detail_return
            .as_deref()
            .and_then(Mode::from_param)
            .filter(Mode::can_return_from_detail)
            .unwrap_or(Mode::List);
        state.detail_target = snap.detail_target.as_ref().map(|target| {
            RecordRef::new(
                target.id.clone(),
                DatasetView::from_detail_kind(&target.kind),
            )
        });
        state.compare_selection = [
            snap.compare1
                .clone()
                .map(|id| RecordRef::new(id, snap.view)),
            snap.compare2
                .clone()
                .map(|id| RecordRef::new(id, snap.view)),
        ];
    }
    if let Some(view) = url.view {
        state.dataset_view = view;
    }
    if let Some(mode) = url.mode {
        state.mode = mode;
    }
    if let Some(search) = &url.search {
        state.search = search.clone();
    }
    // Compare and detail parameters are only meaningful under their modes.
    if url.mode == Some(Mode::Compare) {
        if let Some(id) = &url.compare1 {
            state.compare_selection[0] = Some(RecordRef::new(id.clone(), state.dataset_view));
        }
        if let Some(id) = &url.compare2 {
            state.compare_selection[1] = Some(RecordRef::new(id.clone(), state.dataset_view));
        }
    }
    if url.mode == Some(Mode::Detail) {
        if let (Some(kind), Some(id)) = (&url.detail_type, &url.detail_id) {
            state.detail_target = Some(RecordRef::new(
                id.clone(),
                DatasetView::from_detail_kind(kind),
            ));
        }
    }
    state
}
