pub type RedisPool = r2d2::Pool<redis::Client>;

/// Builds the Redis connection pool backing the session store.
pub fn init_redis_client(redis_url: &str) -> Result<RedisPool, Box<dyn std::error::Error + Send + Sync>> {
    log::info!("Configuring redis pool");
    let client = redis::Client::open(redis_url)?;
    let pool = r2d2::Pool::builder().build(client)?;
    Ok(pool)
}
