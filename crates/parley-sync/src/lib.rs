//! Client-side synchronization for a polling chat view.
//!
//! The [`Synchronizer`] keeps a roster, a local profile learned from it, and
//! the message list of at most one active conversation in step with an
//! external collaborator service that only offers request/response polling.

pub mod collaborator;
pub mod config;
pub mod error;
pub mod http;
pub mod identity;
pub mod media;
pub mod store;
pub mod sync;

pub use collaborator::Collaborator;
pub use config::{ClientConfig, Config, SyncConfig};
pub use error::{Result, SyncError, ValidationError};
pub use http::HttpCollaborator;
pub use identity::IdentityHolder;
pub use store::{KeyValueStore, MemoryStore, SqliteStore};
pub use sync::Synchronizer;
