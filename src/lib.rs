// TaskMaster - tray-style to-do manager: task store core + shell boundary

pub mod error;
pub mod kv;
pub mod models;
pub mod shell;
pub mod store;
pub mod transfer;

// Re-export main types for convenience
pub use error::StoreError;
pub use models::{Category, Filter, Priority, SortKey, Stats, Task, TaskDraft, now_ms};
pub use shell::{Event, Reply, Shell};
pub use store::TaskStore;
