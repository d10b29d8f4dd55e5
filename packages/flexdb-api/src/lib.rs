//! Asynchronous boundary API over the flexdb data layer.
//!
//! Every operation runs the underlying blocking transaction on the
//! blocking thread pool and reports plain success flags (or empty
//! collections) to the caller; diagnostic detail is logged, not
//! returned.

mod manager;

pub use flexdb_core::{FieldMap, StoreConfig, POSITION_KEY};
pub use manager::StoreManager;
