//! # Store
//!
//! Persistence for every resource table.
//!
//! The rest of the crate only needs five primitives: select, insert, update, delete and upsert. They
//! live behind the [`Store`] trait so the server can run against Redis in production and an
//! in-process map in development and tests.
//!
//! ## Redis Layout
//!
//! - One Redis hash per table: `tutor:<table>`
//! - Hash field is the record id, value is the JSON record
//! - Tables are small (hundreds of rows), so reads pull the whole hash and sort in process
//! - Inserts use `HSETNX` so two clients racing for the same id cannot overwrite each other
//! - Upserts are written in one `MULTI` pipeline after the batch passes the table rules
//!
//! ## Notes
//! There is no locking across operations. An update reads, merges and writes back, so two operators
//! editing the same record at the same time resolve as last write wins.
use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use redis::{
    AsyncCommands, Client,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use tracing::info;

use crate::{
    error::{AppError, StoreError},
    memory::MemoryStore,
    schema::{Fields, Record, Resource, Row},
    table::Table,
};

pub const KEY_PREFIX: &str = "tutor";

#[async_trait]
pub trait Store: Send + Sync {
    /// Every record of the table in the resource's list order.
    async fn select(&self, resource: Resource) -> Result<Vec<Record>, StoreError>;

    async fn insert(&self, resource: Resource, record: Record) -> Result<Record, StoreError>;

    /// Replaces only the supplied columns of the record with this id.
    async fn update(
        &self,
        resource: Resource,
        id: u64,
        fields: Fields,
    ) -> Result<Record, StoreError>;

    /// Deleting an id that does not exist is not an error.
    async fn delete(&self, resource: Resource, id: u64) -> Result<(), StoreError>;

    /// Insert-or-update keyed by id. Returns the number of rows written.
    async fn upsert(&self, resource: Resource, rows: Vec<Row>) -> Result<usize, StoreError>;
}

/// Picks a backend from the store URL: `memory://` or any `redis://` / `rediss://` URL.
pub async fn init_store(store_url: &str) -> Result<Arc<dyn Store>, AppError> {
    if store_url.starts_with("memory:") {
        info!("Using in-memory store, data is lost on restart");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let redis_connection = init_redis(store_url).await?;
    info!("Connected to Redis store");

    Ok(Arc::new(RedisStore::new(redis_connection)))
}

pub async fn init_redis(redis_url: &str) -> Result<ConnectionManager, AppError> {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(500));

    let client =
        Client::open(redis_url).map_err(|e| AppError::Config(format!("STORE_URL: {e}")))?;
    let connection_manager = client
        .get_connection_manager_with_config(config)
        .await
        .map_err(StoreError::from)?;

    Ok(connection_manager)
}

#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }

    fn key(resource: Resource) -> String {
        format!("{KEY_PREFIX}:{}", resource.table())
    }

    fn decode(resource: Resource, raw: &str) -> Result<Record, StoreError> {
        serde_json::from_str(raw).map_err(|source| StoreError::Corrupt {
            table: resource.table(),
            source,
        })
    }

    fn encode(resource: Resource, record: &Record) -> Result<String, StoreError> {
        serde_json::to_string(record).map_err(|source| StoreError::Corrupt {
            table: resource.table(),
            source,
        })
    }

    async fn load(&self, resource: Resource) -> Result<Table, StoreError> {
        let mut connection = self.connection.clone();
        let raw: Vec<String> = connection.hvals(Self::key(resource)).await?;

        let records = raw
            .iter()
            .map(|raw| Self::decode(resource, raw))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Table::from_records(resource, records))
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn select(&self, resource: Resource) -> Result<Vec<Record>, StoreError> {
        Ok(self.load(resource).await?.records())
    }

    async fn insert(&self, resource: Resource, record: Record) -> Result<Record, StoreError> {
        // Rules only, the hash itself guards id uniqueness below.
        let record = Table::new(resource).insert(record)?;

        let mut connection = self.connection.clone();
        let created: bool = connection
            .hset_nx(
                Self::key(resource),
                record.id,
                Self::encode(resource, &record)?,
            )
            .await?;

        if !created {
            return Err(StoreError::Rejected(format!(
                "duplicate key value violates unique constraint \"{}_pkey\"",
                resource.table()
            )));
        }

        Ok(record)
    }

    async fn update(
        &self,
        resource: Resource,
        id: u64,
        fields: Fields,
    ) -> Result<Record, StoreError> {
        let mut connection = self.connection.clone();
        let raw: Option<String> = connection.hget(Self::key(resource), id).await?;
        let current = raw.ok_or(StoreError::NotFound {
            table: resource.table(),
            id,
        })?;

        let mut table = Table::from_records(resource, [Self::decode(resource, &current)?]);
        let record = table.update(id, fields)?;

        let _: () = connection
            .hset(Self::key(resource), id, Self::encode(resource, &record)?)
            .await?;

        Ok(record)
    }

    async fn delete(&self, resource: Resource, id: u64) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();
        let _: () = connection.hdel(Self::key(resource), id).await?;

        Ok(())
    }

    async fn upsert(&self, resource: Resource, rows: Vec<Row>) -> Result<usize, StoreError> {
        let mut table = self.load(resource).await?;
        let written = table.upsert(rows)?;

        if written.is_empty() {
            return Ok(0);
        }

        let key = Self::key(resource);
        let mut pipe = redis::pipe();
        pipe.atomic();
        for record in &written {
            pipe.hset(&key, record.id, Self::encode(resource, record)?)
                .ignore();
        }

        let mut connection = self.connection.clone();
        let _: () = pipe.query_async(&mut connection).await?;

        Ok(written.len())
    }
}
