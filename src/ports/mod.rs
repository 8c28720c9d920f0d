//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the sync core and a remote
//! system (the directory service and the identity backend).
//! Implementations live in `src/adapters/`.

pub mod backend;
pub mod directory;

pub use backend::{BackendGroup, BackendUser, IdentityBackend};
pub use directory::{Directory, DirectoryEntry};
