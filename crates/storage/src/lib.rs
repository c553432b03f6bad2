#![forbid(unsafe_code)]

pub mod repository;

pub use repository::{
    EvictionPolicy, InMemorySessionStore, SessionRepository, StorageError,
};
