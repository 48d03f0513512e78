// External collaborators: the CRUD backend, the event store, and caching
pub mod backend;
pub mod cache;
pub mod memory;
pub mod postgres;
pub mod store;

pub use backend::{BackendClient, BackendError};
pub use cache::{CacheError, CacheKey, CacheManager};
pub use memory::{InMemoryEventStore, InMemoryMarketplace};
pub use postgres::{PostgresError, PostgresEventStore};
pub use store::{EventStore, MarketplaceStore, StoreError};
