//! SQLite-backed storage.

pub mod bot;
pub mod matches;
pub mod pool;
pub mod session;

pub use bot::SqliteBotRepository;
pub use matches::SqliteMatchRepository;
pub use pool::DatabasePool;
pub use session::SqliteSessionBackend;
