use std::collections::HashMap;

use ::redis::aio::ConnectionManager;
use ::redis::AsyncCommands;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{sort_newest_first, NewUser, Result, StoreError, User, UserRepository};

// ─── Key layout ──────────────────────────────────────────────────

const NEXT_ID_KEY: &str = "users:next_id";
const IDS_KEY: &str = "users:ids";

fn user_key(id: u64) -> String {
    format!("user:{id}")
}

fn email_key(email: &str) -> String {
    format!("users:email:{email}")
}

/// Users stored as one Redis hash each, with a set of live ids and one
/// claim key per email to enforce uniqueness.
///
/// `ConnectionManager` is cheaply cloneable; every clone shares the same
/// multiplexed connection and reconnects on failure.
#[derive(Clone)]
pub struct RedisUserRepository {
    conn: ConnectionManager,
}

impl RedisUserRepository {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = ::redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    /// Claims `email` for `id`. Returns false if someone else owns it.
    async fn claim_email(&self, email: &str, id: u64) -> Result<bool> {
        let mut conn = self.conn.clone();
        let claimed: Option<String> = ::redis::cmd("SET")
            .arg(email_key(email))
            .arg(id)
            .arg("NX")
            .query_async(&mut conn)
            .await?;
        if claimed.is_some() {
            return Ok(true);
        }
        let owner: Option<u64> = conn.get(email_key(email)).await?;
        Ok(owner == Some(id))
    }

    /// Drops the claim on `email`, but only while `id` still holds it.
    async fn release_email(&self, email: &str, id: u64) -> Result<bool> {
        let mut conn = self.conn.clone();
        let script = ::redis::Script::new(
            r#"
            if redis.call('GET', KEYS[1]) == ARGV[1] then
                return redis.call('DEL', KEYS[1])
            end
            return 0
            "#,
        );
        let released: i32 = script
            .key(email_key(email))
            .arg(id.to_string())
            .invoke_async(&mut conn)
            .await?;
        Ok(released == 1)
    }

    /// Hands back `result`, undoing the email claim first if it failed.
    async fn keep_or_release<T>(&self, email: &str, id: u64, result: Result<T>) -> Result<T> {
        if result.is_err() {
            if let Err(err) = self.release_email(email, id).await {
                tracing::warn!(id, error = %err, "could not release email claim");
            }
        }
        result
    }

    async fn write_hash(&self, user: &User) -> Result<()> {
        let mut conn = self.conn.clone();
        let mut cmd = ::redis::cmd("HSET");
        cmd.arg(user_key(user.id))
            .arg("id")
            .arg(user.id)
            .arg("first_name")
            .arg(&user.first_name)
            .arg("last_name")
            .arg(&user.last_name)
            .arg("email")
            .arg(&user.email)
            .arg("created_at")
            .arg(user.created_at.to_rfc3339())
            .arg("updated_at")
            .arg(user.updated_at.to_rfc3339());
        if let Some(age) = user.age {
            cmd.arg("age").arg(age);
        }
        let _: () = cmd.query_async(&mut conn).await?;
        if user.age.is_none() {
            let _: () = conn.hdel(user_key(user.id), "age").await?;
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for RedisUserRepository {
    async fn insert(&self, user: NewUser, created_at: DateTime<Utc>) -> Result<User> {
        let mut conn = self.conn.clone();
        let id: u64 = conn.incr(NEXT_ID_KEY, 1u64).await?;

        if !self.claim_email(&user.email, id).await? {
            return Err(StoreError::DuplicateEmail(user.email));
        }

        let stored = User {
            id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            age: user.age,
            created_at,
            updated_at: created_at,
        };
        let written = async {
            self.write_hash(&stored).await?;
            let _: () = conn.sadd(IDS_KEY, id).await?;
            Ok::<_, StoreError>(())
        }
        .await;
        self.keep_or_release(&stored.email, id, written).await?;

        tracing::debug!(id, "user inserted into redis");
        Ok(stored)
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<User>> {
        let mut conn = self.conn.clone();
        let map: HashMap<String, String> = conn.hgetall(user_key(id)).await?;
        if map.is_empty() {
            return Ok(None);
        }
        user_from_map(id, &map).map(Some)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let mut conn = self.conn.clone();
        let owner: Option<u64> = conn.get(email_key(email)).await?;
        match owner {
            Some(id) => self.find_by_id(id).await,
            None => Ok(None),
        }
    }

    async fn update(&self, id: u64, user: NewUser) -> Result<User> {
        let existing = self.find_by_id(id).await?.ok_or(StoreError::NotFound(id))?;

        let email_changed = existing.email != user.email;
        if email_changed && !self.claim_email(&user.email, id).await? {
            return Err(StoreError::DuplicateEmail(user.email));
        }

        let updated = User {
            id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            age: user.age,
            created_at: existing.created_at,
            updated_at: Utc::now(),
        };
        let written = self.write_hash(&updated).await;
        if email_changed {
            self.keep_or_release(&updated.email, id, written).await?;
            let mut conn = self.conn.clone();
            let _: () = conn.del(email_key(&existing.email)).await?;
        } else {
            written?;
        }

        tracing::debug!(id, "user updated in redis");
        Ok(updated)
    }

    async fn delete(&self, id: u64) -> Result<()> {
        let existing = self.find_by_id(id).await?.ok_or(StoreError::NotFound(id))?;

        let mut conn = self.conn.clone();
        let _: () = ::redis::pipe()
            .atomic()
            .del(user_key(id))
            .ignore()
            .del(email_key(&existing.email))
            .ignore()
            .srem(IDS_KEY, id)
            .ignore()
            .query_async(&mut conn)
            .await?;

        tracing::debug!(id, "user deleted from redis");
        Ok(())
    }

    async fn find_all(&self) -> Result<Vec<User>> {
        let mut conn = self.conn.clone();
        let ids: Vec<u64> = conn.smembers(IDS_KEY).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = ::redis::pipe();
        for id in &ids {
            pipe.hgetall(user_key(*id));
        }
        let maps: Vec<HashMap<String, String>> = pipe.query_async(&mut conn).await?;

        let mut users = Vec::with_capacity(ids.len());
        for (id, map) in ids.into_iter().zip(maps) {
            // A hash can vanish between SMEMBERS and HGETALL
            if map.is_empty() {
                continue;
            }
            users.push(user_from_map(id, &map)?);
        }
        sort_newest_first(&mut users);
        Ok(users)
    }

    async fn count(&self) -> Result<u64> {
        let mut conn = self.conn.clone();
        Ok(conn.scard(IDS_KEY).await?)
    }
}

// ─── Helpers ─────────────────────────────────────────────────────

fn user_from_map(id: u64, map: &HashMap<String, String>) -> Result<User> {
    let field = |name: &str| {
        map.get(name).cloned().ok_or_else(|| StoreError::Corrupt {
            id,
            reason: format!("missing field '{name}'"),
        })
    };
    let timestamp = |name: &str| -> Result<DateTime<Utc>> {
        let raw = field(name)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| StoreError::Corrupt {
                id,
                reason: format!("bad {name}: {e}"),
            })
    };
    let age = match map.get("age") {
        Some(raw) => Some(raw.parse::<i32>().map_err(|e| StoreError::Corrupt {
            id,
            reason: format!("bad age: {e}"),
        })?),
        None => None,
    };

    Ok(User {
        id,
        first_name: field("first_name")?,
        last_name: field("last_name")?,
        email: field("email")?,
        age,
        created_at: timestamp("created_at")?,
        updated_at: timestamp("updated_at")?,
    })
}
