//! Database layer
//!
//! SQLite (default, single file) or MySQL, chosen by `database.driver`.
//!
//! ```ignore
//! use noteboard::config::DatabaseConfig;
//! use noteboard::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
