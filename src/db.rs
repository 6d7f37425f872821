//! Global database pool.
//!
//! The pool is initialized once at startup (or once per test process) and
//! handed out as a `&'static` reference, so entity helpers can grab it
//! without threading a connection through every call.

use once_cell::sync::OnceCell;
use sea_orm::{Database, DatabaseConnection};

static DB_POOL: OnceCell<DatabaseConnection> = OnceCell::new();

/// Connect to the database and store the pool. Panics if the connection
/// fails or if called twice.
pub async fn init_db(database_url: String) {
    let pool = Database::connect(&database_url)
        .await
        .expect("Failed to connect to the database.");
    DB_POOL
        .set(pool)
        .expect("init_db() called more than once.");
}

pub fn get_db_pool() -> &'static DatabaseConnection {
    DB_POOL.get().expect("DB pool is not initialized.")
}
