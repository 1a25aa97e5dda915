pub mod controller;
pub mod data;
pub mod error;
pub mod loader;
pub mod persist;
pub mod query;
pub mod stats;
pub mod store;
pub mod ticker;
pub mod urlcodec;
