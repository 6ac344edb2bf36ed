use diesel::{
    pg::PgConnection,
    r2d2::{self, ConnectionManager},
};

pub type Connection = PgConnection;
pub type Pool = r2d2::Pool<ConnectionManager<Connection>>;

/// Builds the Postgres connection pool used by the `unique` rule.
pub fn init_db_pool(url: &str) -> Result<Pool, r2d2::PoolError> {
    log::info!("Configuring database pool");
    let manager = ConnectionManager::<Connection>::new(url);
    r2d2::Pool::builder().build(manager)
}
