pub mod memory_store;
pub mod mongo_store;
pub mod session_store;

pub use memory_store::MemoryStore;
pub use mongo_store::MongoStore;
pub use session_store::MokaSessionStore;
