pub mod id;
mod modes;
mod promise;
mod record;
mod view;

pub use crate::data::{
    id::{derived_id, Id},
    modes::{elapsed_label, MaterialGroup, StatsDataset, StatsPoint, TimeSinceEntry},
    promise::{Promise, PromiseState},
    record::{
        ContentItem, ContentType, RawRecord, RecordKind, ReleaseDate, UpdateRecord, HIDDEN_TAG,
    },
    view::{DatasetView, Mode, RecordRef, ViewState},
};
