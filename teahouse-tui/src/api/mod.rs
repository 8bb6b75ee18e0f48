pub mod backend;
mod client;
mod error;
pub mod memory;
pub mod query;
pub mod repository;

pub use backend::{Backend, IdentityProvider, ObjectStore, RecordStore, SharedBackend};
pub use client::SupabaseClient;
pub use error::{ApiError, ApiResult, ErrorCategory};
pub use memory::MemoryBackend;
pub use query::{Query, Table};
pub use repository::Repository;
