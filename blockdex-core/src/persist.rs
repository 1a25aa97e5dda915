//! Best-effort persistence of the documented ViewState subset.  Read
//! failures degrade to defaults, write failures are logged and swallowed.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use parking_lot::Mutex;
use platform_dirs::AppDirs;
use serde::{Deserialize, Serialize};

use crate::data::{ContentType, DatasetView, Mode, RecordRef, ViewState};
use crate::error::Error;

const APP_NAME: &str = "Blockdex";
const SNAPSHOT_FILENAME: &str = "snapshot.json";

/// The key under which the single snapshot entry lives.
pub const SNAPSHOT_KEY: &str = "snapshot";

fn default_true() -> bool {
    true
}

/// Persisted reference to a detail target.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct DetailTarget {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

/// JSON-serializable snapshot of the persisted ViewState subset.  The mode
/// flags are stored independently; they are mutually exclusive only by
/// convention.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub view: DatasetView,
    pub compare: bool,
    pub stats: bool,
    pub time_since: bool,
    pub material_groups: bool,
    pub detail: bool,
    pub visible: BTreeMap<ContentType, bool>,
    #[serde(default = "default_true")]
    pub remove_duplicates: bool,
    pub collapsed: BTreeMap<String, bool>,
    pub detail_target: Option<DetailTarget>,
    pub detail_return: Option<String>,
    pub compare1: Option<String>,
    pub compare2: Option<String>,
}

impl Snapshot {
    pub fn from_state(state: &ViewState) -> Self {
        let ref_id = |r: &Option<RecordRef>| r.as_ref().map(|r| r.derived_id.clone());
        Self {
            view: state.dataset_view,
            compare: state.mode == Mode::Compare,
            stats: state.mode == Mode::Stats,
            time_since: state.mode == Mode::TimeSince,
            material_groups: state.mode == Mode::MaterialGroups,
            detail: state.mode == Mode::Detail,
            visible: state.visible.clone(),
            remove_duplicates: state.remove_duplicates,
            collapsed: state.collapsed.clone(),
            detail_target: state.detail_target.as_ref().map(|target| DetailTarget {
                kind: target.view.as_detail_kind().to_string(),
                id: target.derived_id.clone(),
            }),
            detail_return: state
                .detail_return_mode
                .as_param()
                .map(|param| param.to_string()),
            compare1: ref_id(&state.compare_selection[0]),
            compare2: ref_id(&state.compare_selection[1]),
        }
    }

    /// The mode encoded by the snapshot's independent flags.  When several
    /// are set (a corrupt or hand-edited snapshot), the first in a fixed
    /// order wins.
    pub fn mode(&self) -> Mode {
        let flags = [
            (self.compare, Mode::Compare),
            (self.stats, Mode::Stats),
            (self.time_since, Mode::TimeSince),
            (self.material_groups, Mode::MaterialGroups),
            (self.detail, Mode::Detail),
        ];
        flags
            .iter()
            .find(|(on, _)| *on)
            .map(|(_, mode)| *mode)
            .unwrap_or(Mode::List)
    }
}

/// Single-entry key-value store underneath the gateway.
pub trait KeyValueStore {
    fn read(&self, key: &str) -> Option<String>;
    fn write(&self, key: &str, value: &str) -> Result<(), Error>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn read(&self, key: &str) -> Option<String> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), Error> {
        (**self).write(key, value)
    }
}

/// Filesystem-backed store under the platform config directory.
pub struct FsStore {
    base: PathBuf,
}

impl FsStore {
    pub fn new(base: PathBuf) -> Self {
        Self { base }
    }

    pub fn in_app_dirs() -> Option<Self> {
        const USE_XDG_ON_MACOS: bool = false;
        AppDirs::new(Some(APP_NAME), USE_XDG_ON_MACOS).map(|dirs| Self::new(dirs.config_dir))
    }

    fn path(&self, key: &str) -> PathBuf {
        if key == SNAPSHOT_KEY {
            self.base.join(SNAPSHOT_FILENAME)
        } else {
            self.base.join(format!("{key}.json"))
        }
    }
}

impl KeyValueStore for FsStore {
    fn read(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path(key)).ok()
    }

    fn write(&self, key: &str, value: &str) -> Result<(), Error> {
        fs::create_dir_all(&self.base)
            .map_err(|err| Error::Persistence(format!("creating {:?}: {err}", self.base)))?;
        fs::write(self.path(key), value)
            .map_err(|err| Error::Persistence(format!("writing {key}: {err}")))
    }
}

/// In-memory store for tests and restricted contexts with no usable config
/// directory.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn write(&self, key: &str, value: &str) -> Result<(), Error> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Serializes the snapshot in and out of a [`KeyValueStore`].  Never
/// surfaces failures to the caller.
pub struct PersistenceGateway<S> {
    store: S,
}

impl<S: KeyValueStore> PersistenceGateway<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Missing or corrupt entries read as "nothing saved".
    pub fn load(&self) -> Option<Snapshot> {
        let raw = self.store.read(SNAPSHOT_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                log::warn!("ignoring corrupt snapshot: {err}");
                None
            }
        }
    }

    pub fn save(&self, snapshot: &Snapshot) {
        let raw = match serde_json::to_string_pretty(snapshot) {
            Ok(raw) => raw,
            Err(err) => {
                log::warn!("failed to serialize snapshot: {err}");
                return;
            }
        };
        if let Err(err) = self.store.write(SNAPSHOT_KEY, &raw) {
            log::warn!("failed to save snapshot: {err}");
        }
    }
}
