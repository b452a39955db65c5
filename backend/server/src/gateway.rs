//! # CRUD Gateway
//!
//! Turns a (resource, operation, payload) triple into one round trip against the store.
//!
//! ## Id Assignment
//! New records get `max(existing ids) + 1`, or 1 for an empty table. The read and the insert are
//! separate round trips, so two clients creating at the same moment can pick the same id. The store
//! rejects the second insert with a unique-key error instead of writing a duplicate, and the
//! operator sees that message.
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::{
    database::Store,
    error::{ActionError, StoreError},
    schema::{Fields, ID, Record, Resource},
    table::next_id,
};

/// The uniform list/create/update/delete contract every admin page is driven through.
#[async_trait]
pub trait ResourceApi: Send + Sync {
    async fn list(&self, resource: Resource) -> Result<Vec<Record>, ActionError>;

    async fn create(&self, resource: Resource, fields: Fields) -> Result<Record, ActionError>;

    async fn update(
        &self,
        resource: Resource,
        id: u64,
        fields: Fields,
    ) -> Result<Record, ActionError>;

    async fn delete(&self, resource: Resource, id: u64) -> Result<(), ActionError>;
}

#[derive(Clone)]
pub struct Gateway {
    store: Arc<dyn Store>,
}

impl Gateway {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> Arc<dyn Store> {
        self.store.clone()
    }

    pub async fn list(&self, resource: Resource) -> Result<Vec<Record>, StoreError> {
        self.store.select(resource).await
    }

    /// Any client-supplied id is dropped in favour of the next free one.
    pub async fn create(
        &self,
        resource: Resource,
        mut fields: Fields,
    ) -> Result<Record, StoreError> {
        fields.remove(ID);

        let existing = self.store.select(resource).await?;
        let id = next_id(existing.iter().map(|record| record.id).max())?;

        info!("Inserting into {} with id {id}", resource.table());
        let record = self.store.insert(resource, Record { id, fields }).await?;

        Ok(record)
    }

    pub async fn update(
        &self,
        resource: Resource,
        id: u64,
        mut fields: Fields,
    ) -> Result<Record, StoreError> {
        fields.remove(ID);

        let record = self.store.update(resource, id, fields).await?;
        info!("Updated {} id {id}", resource.table());

        Ok(record)
    }

    pub async fn delete(&self, resource: Resource, id: u64) -> Result<(), StoreError> {
        self.store.delete(resource, id).await?;
        info!("Deleted {} id {id}", resource.table());

        Ok(())
    }
}

#[async_trait]
impl ResourceApi for Gateway {
    async fn list(&self, resource: Resource) -> Result<Vec<Record>, ActionError> {
        Ok(Gateway::list(self, resource).await?)
    }

    async fn create(&self, resource: Resource, fields: Fields) -> Result<Record, ActionError> {
        Ok(Gateway::create(self, resource, fields).await?)
    }

    async fn update(
        &self,
        resource: Resource,
        id: u64,
        fields: Fields,
    ) -> Result<Record, ActionError> {
        Ok(Gateway::update(self, resource, id, fields).await?)
    }

    async fn delete(&self, resource: Resource, id: u64) -> Result<(), ActionError> {
        Ok(Gateway::delete(self, resource, id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{memory::MemoryStore, table::MAX_ID};

    fn gateway() -> Gateway {
        Gateway::new(Arc::new(MemoryStore::new()))
    }

    fn course(name: &str) -> Fields {
        [("name", name), ("description", "Two years"), ("category", "NEET")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), Some(v.to_string())))
            .collect()
    }

    #[tokio::test]
    async fn test_first_create_gets_id_one() {
        let record = gateway()
            .create(Resource::Course, course("Biology"))
            .await
            .unwrap();
        assert_eq!(record.id, 1);
    }

    #[tokio::test]
    async fn test_create_follows_max_id() {
        let gateway = gateway();
        gateway
            .store()
            .insert(
                Resource::Course,
                Record {
                    id: 7,
                    fields: course("Physics"),
                },
            )
            .await
            .unwrap();

        let record = gateway
            .create(Resource::Course, course("Chemistry"))
            .await
            .unwrap();
        assert_eq!(record.id, 8);
    }

    #[tokio::test]
    async fn test_create_after_last_id_is_refused() {
        let gateway = gateway();
        gateway
            .store()
            .insert(
                Resource::Course,
                Record {
                    id: MAX_ID,
                    fields: course("Physics"),
                },
            )
            .await
            .unwrap();

        let err = gateway
            .create(Resource::Course, course("Chemistry"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));

        // The store keeps answering.
        assert_eq!(gateway.list(Resource::Course).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_ignores_client_id() {
        let mut fields = course("Maths");
        fields.insert(ID.to_string(), Some("99".to_string()));

        let record = gateway().create(Resource::Course, fields).await.unwrap();
        assert_eq!(record.id, 1);
        assert!(!record.fields.contains_key(ID));
    }

    #[tokio::test]
    async fn test_created_record_is_listed() {
        let gateway = gateway();
        let created = gateway
            .create(Resource::Course, course("Botany"))
            .await
            .unwrap();

        let listed = gateway.list(Resource::Course).await.unwrap();
        assert!(listed.contains(&created));
    }

    #[tokio::test]
    async fn test_update_touches_only_supplied_field() {
        let gateway = gateway();
        let first = gateway.create(Resource::Course, course("A")).await.unwrap();
        let second = gateway.create(Resource::Course, course("B")).await.unwrap();

        let mut change = Fields::new();
        change.insert("category".into(), Some("JEE".into()));
        gateway
            .update(Resource::Course, first.id, change)
            .await
            .unwrap();

        let listed = gateway.list(Resource::Course).await.unwrap();
        assert_eq!(listed[0].get("category"), Some("JEE"));
        assert_eq!(listed[0].get("name"), Some("A"));
        assert_eq!(listed[0].get("description"), Some("Two years"));
        assert_eq!(listed[1], second);
    }

    #[tokio::test]
    async fn test_update_unknown_id_fails() {
        let err = gateway()
            .update(Resource::Course, 5, course("X"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { id: 5, .. }));
    }

    #[tokio::test]
    async fn test_deleted_record_is_not_listed() {
        let gateway = gateway();
        let record = gateway.create(Resource::Course, course("A")).await.unwrap();
        gateway.delete(Resource::Course, record.id).await.unwrap();

        let listed = gateway.list(Resource::Course).await.unwrap();
        assert!(listed.iter().all(|r| r.id != record.id));
    }

    #[tokio::test]
    async fn test_store_message_is_surfaced() {
        let mut fields = course("A");
        fields.insert("price".into(), Some("100".into()));

        let err = ResourceApi::create(&gateway(), Resource::Course, fields)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ActionError::Store("column \"price\" of relation \"courses\" does not exist".into())
        );
    }
}
