//! Blob storage backends for resivault.
//!
//! The vault only ever needs four operations from its backing medium: save,
//! load, delete and list, keyed by an opaque string. Everything above this
//! crate works against [`BlobStorage`] and never assumes a particular medium.

pub mod local;
pub mod memory;
pub mod provider;

pub use local::FilesystemStorage;
pub use memory::MemoryStorage;
pub use provider::BlobStorage;
