//! Table module providing multi-table support with async actor model.
//!
//! This module implements:
//! - TableActor: async actor that owns one table and its game
//! - TableManager: registry that spawns tables and routes requests to them
//! - Message-based communication with tokio channels
//!
//! ## Architecture
//!
//! Each table runs in a separate Tokio task with an mpsc message inbox and is
//! the only writer of its game. The manager keeps handles in a map behind a
//! read-write lock that is held just long enough to find a handle. Every
//! accepted move is broadcast to the table's subscribers in log order.
//!
//! ## Example
//!
//! ```ignore
//! use hanabi_live::history::MemoryRecorder;
//! use hanabi_live::table::{ManagerConfig, TableConfig, TableManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let manager = TableManager::new(ManagerConfig::default(), Arc::new(MemoryRecorder::new()));
//!     let table_id = manager.create_table(TableConfig::default(), 1).await.unwrap();
//!     manager.join_table(table_id, 1, "Alice".to_string()).await.unwrap();
//! }
//! ```

pub mod actor;
pub mod config;
pub mod errors;
pub mod manager;
pub mod messages;

pub type TableId = i64;
pub type UserId = i64;

pub use actor::{TableActor, TableHandle};
pub use config::{ManagerConfig, TableConfig};
pub use errors::TableError;
pub use manager::{ManagerStats, TableManager};
pub use messages::{
    CardView, ChatMessage, HandView, LeaveOutcome, Notification, TableMessage,
    TableStateResponse, TableStatus, TableSummary,
};
