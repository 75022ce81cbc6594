//! Database layer
//!
//! SQLite is the default backend for single-binary deployments; MySQL is
//! available for larger installs. The driver is picked from configuration
//! and hidden behind the `DatabasePool` trait.
//!
//! ```ignore
//! use newsportal::config::DatabaseConfig;
//! use newsportal::db::{create_pool, migrations};
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
