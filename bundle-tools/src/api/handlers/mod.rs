pub mod entry;
pub mod health;
pub mod list;

pub use entry::entry_handler;
pub use health::health_handler;
pub use list::list_handler;
