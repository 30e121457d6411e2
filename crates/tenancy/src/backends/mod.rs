//! Storage backend implementations.
//!
//! | Backend | Feature | Notes |
//! |---------|---------|-------|
//! | SQLite | `sqlite` (default) | In-memory or file, pooled with r2d2 |

#[cfg(feature = "sqlite")]
pub mod sqlite;
