//! Dataset loading collaborator.  The initial load is one index read
//! followed by N parallel per-record reads, joined all-or-nothing: if any
//! sub-read fails, the whole load fails and nothing partial is installed.

use std::fs::File;
use std::path::{Path, PathBuf};

use crossbeam_channel::unbounded;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use threadpool::ThreadPool;

use crate::data::{MaterialGroup, RawRecord, StatsDataset, TimeSinceEntry, UpdateRecord};
use crate::error::Error;

const INDEX_FILE: &str = "index.json";
const STATS_FILE: &str = "stats.json";
const TIME_SINCE_FILE: &str = "time_since.json";
const MATERIAL_GROUPS_FILE: &str = "material_groups.json";

const WORKERS: usize = 8;

#[derive(Debug, Deserialize)]
struct Index {
    files: Vec<String>,
}

/// Source of the record dataset and of the lazily fetched per-mode
/// documents.
pub trait RecordSource {
    fn load_records(&self) -> Result<Vec<UpdateRecord>, Error>;
    fn load_stats(&self) -> Result<StatsDataset, Error>;
    fn load_time_since(&self) -> Result<Vec<TimeSinceEntry>, Error>;
    fn load_material_groups(&self) -> Result<Vec<MaterialGroup>, Error>;
}

/// Reads the dataset from a directory: `index.json` names one JSON file per
/// update record; the mode documents sit next to it.
pub struct DirSource {
    base: PathBuf,
    pool: ThreadPool,
}

impl DirSource {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            pool: ThreadPool::new(WORKERS),
        }
    }

    fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Error> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }
}

impl RecordSource for DirSource {
    fn load_records(&self) -> Result<Vec<UpdateRecord>, Error> {
        let index: Index = Self::read_json(&self.base.join(INDEX_FILE))
            .map_err(|err| Error::Load(format!("reading {INDEX_FILE}: {err}")))?;

        let (send, recv) = unbounded();
        for (slot, file) in index.files.iter().enumerate() {
            let path = self.base.join(file);
            let send = send.clone();
            self.pool.execute(move || {
                let result = Self::read_json::<RawRecord>(&path)
                    .map_err(|err| Error::Load(format!("reading {path:?}: {err}")));
                // The join side may have bailed on an earlier failure.
                let _ = send.send((slot, result));
            });
        }
        drop(send);

        let mut slots: Vec<Option<RawRecord>> = vec![None; index.files.len()];
        for (slot, result) in recv {
            slots[slot] = Some(result?);
        }
        slots
            .into_iter()
            .enumerate()
            .map(|(slot, raw)| {
                raw.map(UpdateRecord::from_raw).ok_or_else(|| {
                    Error::Load(format!("record file {slot} produced no result"))
                })
            })
            .collect()
    }

    fn load_stats(&self) -> Result<StatsDataset, Error> {
        Self::read_json(&self.base.join(STATS_FILE))
            .map_err(|err| Error::ModeData(format!("reading {STATS_FILE}: {err}")))
    }

    fn load_time_since(&self) -> Result<Vec<TimeSinceEntry>, Error> {
        Self::read_json(&self.base.join(TIME_SINCE_FILE))
            .map_err(|err| Error::ModeData(format!("reading {TIME_SINCE_FILE}: {err}")))
    }

    fn load_material_groups(&self) -> Result<Vec<MaterialGroup>, Error> {
        Self::read_json(&self.base.join(MATERIAL_GROUPS_FILE))
            .map_err(|err| Error::ModeData(format!("reading {MATERIAL_GROUPS_FILE}: {err}")))
    }
}
