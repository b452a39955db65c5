use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;

use crate::{
    database::Store,
    error::StoreError,
    schema::{Fields, Record, Resource, Row},
    table::Table,
};

/// In-process store for development and tests.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<HashMap<Resource, Table>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, HashMap<Resource, Table>>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn with_table<T>(
        &self,
        resource: Resource,
        f: impl FnOnce(&mut Table) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut tables = self.tables()?;
        let table = tables
            .entry(resource)
            .or_insert_with(|| Table::new(resource));

        f(table)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn select(&self, resource: Resource) -> Result<Vec<Record>, StoreError> {
        self.with_table(resource, |table| Ok(table.records()))
    }

    async fn insert(&self, resource: Resource, record: Record) -> Result<Record, StoreError> {
        self.with_table(resource, |table| table.insert(record))
    }

    async fn update(
        &self,
        resource: Resource,
        id: u64,
        fields: Fields,
    ) -> Result<Record, StoreError> {
        self.with_table(resource, |table| table.update(id, fields))
    }

    async fn delete(&self, resource: Resource, id: u64) -> Result<(), StoreError> {
        self.with_table(resource, |table| {
            table.delete(id);
            Ok(())
        })
    }

    async fn upsert(&self, resource: Resource, rows: Vec<Row>) -> Result<usize, StoreError> {
        self.with_table(resource, |table| Ok(table.upsert(rows)?.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn testimonial(name: &str) -> Fields {
        [("studentName", name), ("course", "JEE"), ("feedback", "Great")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), Some(v.to_string())))
            .collect()
    }

    #[tokio::test]
    async fn test_tables_are_independent() {
        let store = MemoryStore::new();
        store
            .insert(
                Resource::Testimonial,
                Record {
                    id: 1,
                    fields: testimonial("Meera"),
                },
            )
            .await
            .unwrap();

        assert_eq!(store.select(Resource::Testimonial).await.unwrap().len(), 1);
        assert!(store.select(Resource::Course).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_id_is_ok() {
        let store = MemoryStore::new();
        assert!(store.delete(Resource::Course, 42).await.is_ok());
    }

    #[tokio::test]
    async fn test_clones_share_tables() {
        let store = MemoryStore::new();
        let other = store.clone();
        store
            .upsert(
                Resource::Testimonial,
                vec![Row {
                    id: None,
                    fields: testimonial("Kabir"),
                }],
            )
            .await
            .unwrap();

        let records = other.select(Resource::Testimonial).await.unwrap();
        assert_eq!(records[0].id, 1);
    }
}
