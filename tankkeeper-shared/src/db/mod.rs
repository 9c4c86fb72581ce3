/// Postgres plumbing for [`crate::store::PostgresStore`]
///
/// # Modules
///
/// - `pool`: connection pool construction and health probe
/// - `migrations`: embedded schema migrations
///
/// # Example
///
/// ```no_run
/// use tankkeeper_shared::db::pool::{create_pool, DatabaseConfig};
/// use tankkeeper_shared::store::PostgresStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = create_pool(DatabaseConfig::new(std::env::var("DATABASE_URL")?)).await?;
///     let store = PostgresStore::new(pool);
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;
