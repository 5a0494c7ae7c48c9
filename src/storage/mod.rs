pub mod persistence;
pub mod snapshot;

pub use persistence::{
    FileStore, FileStoreProvider, MemoryStore, MemoryStoreProvider, PersistenceStore,
    StoreProvider,
};
pub use snapshot::{LeaderboardSnapshot, PermanentSnapshot, RotatingSnapshot};
