//! Session storage for re-presenting a failed form.
//!
//! On validation failure the request layer stores the error map and the
//! original posted data so the page the user is redirected back to can show
//! both. Values are JSON so either backend can hold any posted structure.

use std::collections::HashMap;
use std::sync::RwLock;

use redis::Commands;
use serde_json::Value;

use crate::config::cache::RedisPool;
use crate::constants::SESSION_KEY_PREFIX;
use crate::error::{ServiceError, ServiceResult};

pub trait SessionStore: Send + Sync {
    fn set(&self, key: &str, value: Value) -> ServiceResult<()>;

    fn get(&self, key: &str) -> ServiceResult<Option<Value>>;

    fn remove(&self, key: &str) -> ServiceResult<()>;

    /// Reads `key` and removes it, the way flashed form state is consumed.
    fn take(&self, key: &str) -> ServiceResult<Option<Value>> {
        let value = self.get(key)?;
        if value.is_some() {
            self.remove(key)?;
        }
        Ok(value)
    }
}

/// Process-local session, one per user session.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    values: RwLock<HashMap<String, Value>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn set(&self, key: &str, value: Value) -> ServiceResult<()> {
        self.values
            .write()
            .map_err(|_| ServiceError::session("Session lock poisoned"))?
            .insert(key.to_string(), value);
        Ok(())
    }

    fn get(&self, key: &str) -> ServiceResult<Option<Value>> {
        Ok(self
            .values
            .read()
            .map_err(|_| ServiceError::session("Session lock poisoned"))?
            .get(key)
            .cloned())
    }

    fn remove(&self, key: &str) -> ServiceResult<()> {
        self.values
            .write()
            .map_err(|_| ServiceError::session("Session lock poisoned"))?
            .remove(key);
        Ok(())
    }
}

/// Redis-backed session scoped to one session id.
///
/// Keys are stored as `session:<id>:<key>` holding the JSON encoding of the value.
#[derive(Clone)]
pub struct RedisSessionStore {
    pool: RedisPool,
    session_id: String,
    ttl_secs: u64,
}

impl RedisSessionStore {
    pub fn new(pool: RedisPool, session_id: impl Into<String>, ttl_secs: u64) -> Self {
        Self {
            pool,
            session_id: session_id.into(),
            ttl_secs,
        }
    }

    pub fn storage_key(&self, key: &str) -> String {
        session_storage_key(&self.session_id, key)
    }

    fn connection(&self) -> ServiceResult<r2d2::PooledConnection<redis::Client>> {
        self.pool
            .get()
            .map_err(|e| ServiceError::session(format!("Failed to get redis connection: {}", e)))
    }
}

impl SessionStore for RedisSessionStore {
    fn set(&self, key: &str, value: Value) -> ServiceResult<()> {
        let encoded = serde_json::to_string(&value)?;
        let mut conn = self.connection()?;
        let storage_key = self.storage_key(key);

        if self.ttl_secs > 0 {
            conn.set_ex::<_, _, ()>(&storage_key, encoded, self.ttl_secs)?;
        } else {
            conn.set::<_, _, ()>(&storage_key, encoded)?;
        }
        log::debug!("Session value stored under {}", storage_key);
        Ok(())
    }

    fn get(&self, key: &str) -> ServiceResult<Option<Value>> {
        let mut conn = self.connection()?;
        let raw: Option<String> = conn.get(self.storage_key(key))?;

        raw.map(|encoded| serde_json::from_str(&encoded).map_err(ServiceError::from))
            .transpose()
    }

    fn remove(&self, key: &str) -> ServiceResult<()> {
        let mut conn = self.connection()?;
        conn.del::<_, ()>(self.storage_key(key))?;
        Ok(())
    }

    /// GET and DEL in one MULTI/EXEC so a flashed value is read at most once.
    fn take(&self, key: &str) -> ServiceResult<Option<Value>> {
        let mut conn = self.connection()?;
        let (raw, _removed): (Option<String>, i64) = redis::pipe()
            .atomic()
            .get(self.storage_key(key))
            .del(self.storage_key(key))
            .query(&mut *conn)?;

        raw.map(|encoded| serde_json::from_str(&encoded).map_err(ServiceError::from))
            .transpose()
    }
}

pub fn session_storage_key(session_id: &str, key: &str) -> String {
    format!("{}:{}:{}", SESSION_KEY_PREFIX, session_id, key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_session_set_get_remove() {
        let session = MemorySessionStore::new();
        assert_eq!(session.get("errors").unwrap(), None);

        session.set("errors", json!({"name": "Field 'name' is required"})).unwrap();
        assert_eq!(
            session.get("errors").unwrap(),
            Some(json!({"name": "Field 'name' is required"}))
        );

        session.remove("errors").unwrap();
        assert_eq!(session.get("errors").unwrap(), None);
    }

    #[test]
    fn test_memory_session_set_overwrites() {
        let session = MemorySessionStore::new();
        session.set("form_data", json!({"a": 1})).unwrap();
        session.set("form_data", json!({"a": 2})).unwrap();
        assert_eq!(session.get("form_data").unwrap(), Some(json!({"a": 2})));
    }

    #[test]
    fn test_take_consumes_value() {
        let session = MemorySessionStore::new();
        session.set("errors", json!({"x": "y"})).unwrap();

        assert_eq!(session.take("errors").unwrap(), Some(json!({"x": "y"})));
        assert_eq!(session.take("errors").unwrap(), None);
    }

    #[test]
    fn test_session_storage_key() {
        assert_eq!(session_storage_key("abc", "errors"), "session:abc:errors");
    }

    mod redis_backend {
        use std::panic::{catch_unwind, AssertUnwindSafe};

        use redis::Commands;
        use serde_json::json;
        use testcontainers::clients;
        use testcontainers::images::redis::Redis;
        use testcontainers::Container;

        use super::*;
        use crate::config::cache::{init_redis_client, RedisPool};

        fn try_run_redis<'a>(docker: &'a clients::Cli) -> Option<Container<'a, Redis>> {
            catch_unwind(AssertUnwindSafe(|| docker.run(Redis::default()))).ok()
        }

        fn redis_pool(container: &Container<'_, Redis>, test_name: &str) -> Option<RedisPool> {
            let url = format!("redis://127.0.0.1:{}", container.get_host_port_ipv4(6379));
            match init_redis_client(&url) {
                Ok(pool) => Some(pool),
                Err(e) => {
                    eprintln!("Skipping {test_name} because redis pool unavailable: {e}");
                    None
                }
            }
        }

        #[test]
        fn test_redis_session_set_get_take() {
            let docker = clients::Cli::default();
            let Some(container) = try_run_redis(&docker) else {
                eprintln!("Skipping test_redis_session_set_get_take because Docker is unavailable");
                return;
            };
            let Some(pool) = redis_pool(&container, "test_redis_session_set_get_take") else {
                return;
            };
            let session = RedisSessionStore::new(pool, "abc", 0);

            assert_eq!(session.get("errors").unwrap(), None);
            session.set("errors", json!({"name": "Field 'name' is required"})).unwrap();
            assert_eq!(
                session.get("errors").unwrap(),
                Some(json!({"name": "Field 'name' is required"}))
            );

            assert_eq!(
                session.take("errors").unwrap(),
                Some(json!({"name": "Field 'name' is required"}))
            );
            assert_eq!(session.take("errors").unwrap(), None);

            session.set("form_data", json!({"age": "30"})).unwrap();
            session.remove("form_data").unwrap();
            assert_eq!(session.get("form_data").unwrap(), None);
        }

        #[test]
        fn test_redis_sessions_are_isolated_by_id() {
            let docker = clients::Cli::default();
            let Some(container) = try_run_redis(&docker) else {
                eprintln!("Skipping test_redis_sessions_are_isolated_by_id because Docker is unavailable");
                return;
            };
            let Some(pool) = redis_pool(&container, "test_redis_sessions_are_isolated_by_id") else {
                return;
            };
            let first = RedisSessionStore::new(pool.clone(), "first", 0);
            let second = RedisSessionStore::new(pool, "second", 0);

            first.set("errors", json!({"x": "y"})).unwrap();
            assert_eq!(second.get("errors").unwrap(), None);
        }

        #[test]
        fn test_redis_session_ttl() {
            let docker = clients::Cli::default();
            let Some(container) = try_run_redis(&docker) else {
                eprintln!("Skipping test_redis_session_ttl because Docker is unavailable");
                return;
            };
            let Some(pool) = redis_pool(&container, "test_redis_session_ttl") else {
                return;
            };

            let expiring = RedisSessionStore::new(pool.clone(), "expiring", 60);
            expiring.set("errors", json!({})).unwrap();
            let persistent = RedisSessionStore::new(pool.clone(), "persistent", 0);
            persistent.set("errors", json!({})).unwrap();

            let mut conn = pool.get().unwrap();
            let ttl: i64 = conn.ttl(expiring.storage_key("errors")).unwrap();
            assert!(ttl > 0 && ttl <= 60, "unexpected ttl {}", ttl);
            let ttl: i64 = conn.ttl(persistent.storage_key("errors")).unwrap();
            assert_eq!(ttl, -1);
        }
    }
}
