//! Dynamic collection and record engine over an embedded SQLite catalog.
//!
//! Emulates a schema-flexible document store (databases → collections →
//! fields → records) on top of a fixed-schema embedded database. Record
//! values live in one encoded JSON object per record and are validated
//! against the declared field set at write time.

pub mod catalog;
pub mod codec;
pub mod config;
pub mod error;
mod lookup;
pub mod model;
pub mod records;
pub mod schema;
pub mod session;
pub mod types;

pub use catalog::Catalog;
pub use codec::FieldMap;
pub use config::StoreConfig;
pub use error::DbError;
pub use records::{RecordAddress, RecordEngine, POSITION_KEY};
pub use schema::SchemaRegistry;
pub use session::Session;
pub use types::FieldType;
