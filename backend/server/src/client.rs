//! # Admin Client
//!
//! Talks to the admin and import endpoints over HTTP the same way the admin pages do. Used by the
//! bulk import tool and anywhere a [`ResourceApi`] has to cross the network.
//!
//! ## Error Mapping
//! - Request never got an answer, or the answer was not JSON: [`ActionError::Transport`]
//! - 503, the server could not reach its store: [`ActionError::Transport`]
//! - Non-2xx with an `{error}` body: [`ActionError::Store`] carrying that message verbatim
//! - 422 with `{fields}`: [`ActionError::Validation`]
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, header::CONTENT_TYPE};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;

use crate::{
    error::ActionError,
    gateway::ResourceApi,
    schema::{Fields, ID, Record, Resource},
    session::SessionFlag,
    validation::FieldErrors,
};

pub const FALLBACK_ERROR: &str = "Unknown error";

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    fields: Option<FieldErrors>,
}

#[derive(Deserialize)]
struct ImportBody {
    inserted: usize,
}

pub struct AdminClient {
    http: Client,
    base_url: String,
    session: SessionFlag,
}

impl AdminClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ActionError> {
        let http = Client::builder().cookie_store(true).build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session: SessionFlag::new(),
        })
    }

    pub fn session(&self) -> &SessionFlag {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn admin_url(&self, resource: Resource) -> String {
        self.url(&format!("/api/admin/{}", resource.slug()))
    }

    pub async fn login(&self, password: &str) -> Result<(), ActionError> {
        let request = self
            .http
            .post(self.url("/api/admin/login"))
            .json(&json!({ "password": password }));

        let _: serde_json::Value = send(request).await?;
        self.session.sign_in();

        Ok(())
    }

    /// Returns the page to show next.
    pub async fn logout(&self) -> Result<&'static str, ActionError> {
        let request = self.http.post(self.url("/api/admin/logout"));
        let _: serde_json::Value = send(request).await?;

        Ok(self.session.sign_out())
    }

    pub async fn import(&self, resource: Resource, csv: Vec<u8>) -> Result<usize, ActionError> {
        let request = self
            .http
            .post(self.url(&format!("/api/import/{}", resource.slug())))
            .header(CONTENT_TYPE, "text/csv")
            .body(csv);

        let body: ImportBody = send(request).await?;
        Ok(body.inserted)
    }
}

async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ActionError> {
    let response = request.send().await?;
    if !response.status().is_success() {
        return Err(error_from(response).await);
    }

    response.json().await.map_err(ActionError::from)
}

async fn error_from(response: Response) -> ActionError {
    let status = response.status();

    match response.json::<ErrorBody>().await {
        Ok(ErrorBody {
            error: Some(message),
            ..
        }) if status == StatusCode::SERVICE_UNAVAILABLE => ActionError::Transport(message),
        Ok(_) if status == StatusCode::SERVICE_UNAVAILABLE => {
            ActionError::Transport(status.to_string())
        }
        Ok(ErrorBody {
            fields: Some(fields),
            ..
        }) if !fields.is_empty() => ActionError::Validation(fields),
        Ok(ErrorBody {
            error: Some(message),
            ..
        }) => ActionError::Store(message),
        Ok(_) => ActionError::Store(FALLBACK_ERROR.to_string()),
        Err(_) => ActionError::Transport(format!("unexpected {status} response")),
    }
}

#[async_trait]
impl ResourceApi for AdminClient {
    async fn list(&self, resource: Resource) -> Result<Vec<Record>, ActionError> {
        send(self.http.get(self.admin_url(resource))).await
    }

    async fn create(&self, resource: Resource, fields: Fields) -> Result<Record, ActionError> {
        send(self.http.post(self.admin_url(resource)).json(&fields)).await
    }

    async fn update(
        &self,
        resource: Resource,
        id: u64,
        fields: Fields,
    ) -> Result<Record, ActionError> {
        let body = Record { id, fields };
        send(self.http.put(self.admin_url(resource)).json(&body)).await
    }

    async fn delete(&self, resource: Resource, id: u64) -> Result<(), ActionError> {
        let request = self
            .http
            .delete(self.admin_url(resource))
            .query(&[(ID, id)]);

        let _: serde_json::Value = send(request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use tokio::net::TcpListener;

    use super::*;
    use crate::{
        build_router,
        config::Config,
        database::Store,
        error::StoreError,
        memory::MemoryStore,
        schema::Row,
        session::{LOGIN_PATH, Session},
        state::AppState,
    };

    const PASSWORD: &str = "open-sesame";

    struct DownStore;

    fn down() -> StoreError {
        StoreError::Unavailable("connection refused".into())
    }

    #[async_trait]
    impl Store for DownStore {
        async fn select(&self, _: Resource) -> Result<Vec<Record>, StoreError> {
            Err(down())
        }

        async fn insert(&self, _: Resource, _: Record) -> Result<Record, StoreError> {
            Err(down())
        }

        async fn update(&self, _: Resource, _: u64, _: Fields) -> Result<Record, StoreError> {
            Err(down())
        }

        async fn delete(&self, _: Resource, _: u64) -> Result<(), StoreError> {
            Err(down())
        }

        async fn upsert(&self, _: Resource, _: Vec<Row>) -> Result<usize, StoreError> {
            Err(down())
        }
    }

    /// Serves the router on an ephemeral port and returns its base URL.
    async fn serve(store: Arc<dyn Store>) -> String {
        let config = Config {
            port: 0,
            store_url: "memory://".into(),
            allowed_origin: "http://localhost:3000".into(),
            session_ttl: Duration::from_secs(600),
            admin_password: PASSWORD.into(),
            session_secret: "client-secret".into(),
        };
        let app = build_router(AppState::with_store(config, store)).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });

        format!("http://{address}")
    }

    async fn signed_in(store: Arc<dyn Store>) -> AdminClient {
        let client = AdminClient::new(serve(store).await).unwrap();
        client.login(PASSWORD).await.unwrap();
        client
    }

    fn course(name: &str) -> Fields {
        [("name", name), ("description", "Two years"), ("category", "NEET")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), Some(v.to_string())))
            .collect()
    }

    #[tokio::test]
    async fn test_login_and_logout_flip_session() {
        let client = AdminClient::new(serve(Arc::new(MemoryStore::new())).await).unwrap();
        assert_eq!(client.session().session(), Session::Unauthenticated);

        let err = client.login("wrong").await.unwrap_err();
        assert_eq!(err, ActionError::Store("Invalid password".into()));
        assert_eq!(client.session().session(), Session::Unauthenticated);

        client.login(PASSWORD).await.unwrap();
        assert_eq!(client.session().session(), Session::Authenticated);

        assert_eq!(client.logout().await.unwrap(), LOGIN_PATH);
        assert_eq!(client.session().session(), Session::Unauthenticated);
    }

    #[tokio::test]
    async fn test_crud_over_http() {
        let client = signed_in(Arc::new(MemoryStore::new())).await;

        let created = client.create(Resource::Course, course("Botany")).await.unwrap();
        assert_eq!(created.id, 1);

        let mut change = Fields::new();
        change.insert("category".into(), Some("JEE".into()));
        let updated = client.update(Resource::Course, 1, change).await.unwrap();
        assert_eq!(updated.get("category"), Some("JEE"));
        assert_eq!(updated.get("name"), Some("Botany"));

        client.delete(Resource::Course, 1).await.unwrap();
        assert!(client.list(Resource::Course).await.unwrap().is_empty());

        let inserted = client
            .import(Resource::Course, b"name,description,category\nA,d,NEET\n".to_vec())
            .await
            .unwrap();
        assert_eq!(inserted, 1);
    }

    #[tokio::test]
    async fn test_field_errors_become_validation() {
        let client = signed_in(Arc::new(MemoryStore::new())).await;

        let mut fields = course("Botany");
        fields.insert("category".into(), Some(" ".into()));
        let err = client.create(Resource::Course, fields).await.unwrap_err();

        let ActionError::Validation(errors) = &err else {
            panic!("expected field errors, got {err:?}");
        };
        assert_eq!(
            errors.get("category").map(String::as_str),
            Some("Category is required")
        );
    }

    #[tokio::test]
    async fn test_store_message_passes_through() {
        let client = signed_in(Arc::new(MemoryStore::new())).await;

        let mut fields = course("Botany");
        fields.insert("price".into(), Some("100".into()));
        let err = client.create(Resource::Course, fields).await.unwrap_err();

        assert_eq!(
            err,
            ActionError::Store("column \"price\" of relation \"courses\" does not exist".into())
        );
    }

    #[tokio::test]
    async fn test_unreachable_store_is_transport() {
        let client = signed_in(Arc::new(DownStore)).await;

        let err = client.list(Resource::Course).await.unwrap_err();
        assert_eq!(
            err,
            ActionError::Transport("Store unavailable: connection refused".into())
        );
        assert_eq!(
            ActionError::from(down()),
            ActionError::Transport("connection refused".into())
        );
    }

    #[tokio::test]
    async fn test_non_json_answer_is_transport() {
        let base = serve(Arc::new(MemoryStore::new())).await;
        let client = AdminClient::new(format!("{base}/elsewhere")).unwrap();

        let err = client.list(Resource::Course).await.unwrap_err();
        assert!(matches!(err, ActionError::Transport(_)));
    }

    #[tokio::test]
    async fn test_refused_connection_is_transport() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let client = AdminClient::new(format!("http://{address}")).unwrap();
        let err = client.list(Resource::Course).await.unwrap_err();
        assert!(matches!(err, ActionError::Transport(_)));
    }
}
