#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use thingaha_server::config::{
    Config, DatabaseConfig, JwtConfig, ServerConfig, StorageBackend, StorageConfig,
};
use thingaha_server::models::{
    AddressPayload, NewAddress, NewStudent, Page, PageRequest, Role, Student, User,
};
use thingaha_server::service::{AddressService, MemoryStore, StudentService};
use thingaha_server::storage::PhotoStorage;
use thingaha_server::{app, auth, AppState, Error};

pub const BOUNDARY: &str = "thingaha-test-boundary";

pub fn config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            url: None,
            max_connections: 1,
        },
        jwt: JwtConfig {
            secret: "integration-secret".to_string(),
            expiry_hours: 1,
        },
        storage: StorageConfig {
            backend: StorageBackend::Local,
            bucket: "thingaha".to_string(),
            url_template: "https://{bucket}.s3.amazonaws.com/{key}".to_string(),
            local_dir: "unused".to_string(),
        },
        default_address: AddressPayload {
            division: "yangon".to_string(),
            district: "east".to_string(),
            township: "MyaeNiGone".to_string(),
            street_address: "16 street".to_string(),
        },
        admin: None,
    }
}

/// Photo storage that remembers every call instead of storing bytes.
#[derive(Debug, Default)]
pub struct RecordingStorage {
    pub uploaded: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
    pub fail_deletes: bool,
}

impl RecordingStorage {
    pub fn uploaded(&self) -> Vec<String> {
        self.uploaded.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl PhotoStorage for RecordingStorage {
    async fn upload(&self, key: &str, _body: Vec<u8>, _content_type: &str) -> anyhow::Result<()> {
        self.uploaded.lock().unwrap().push(key.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        if self.fail_deletes {
            anyhow::bail!("bucket unavailable");
        }
        self.deleted.lock().unwrap().push(key.to_string());
        Ok(())
    }

    fn url_for(&self, key: &str) -> String {
        config().storage.url_for(key)
    }
}

/// Address service whose updates always report failure.
pub struct FailingAddressUpdates(pub Arc<MemoryStore>);

#[async_trait]
impl AddressService for FailingAddressUpdates {
    async fn create(&self, address: NewAddress) -> Result<i64, Error> {
        AddressService::create(self.0.as_ref(), address).await
    }

    async fn update(&self, _id: i64, _address: NewAddress) -> Result<bool, Error> {
        Ok(false)
    }

    async fn delete(&self, id: i64) -> Result<bool, Error> {
        AddressService::delete(self.0.as_ref(), id).await
    }
}

/// Address service that cannot insert.
pub struct FailingAddressCreates(pub Arc<MemoryStore>);

#[async_trait]
impl AddressService for FailingAddressCreates {
    async fn create(&self, _address: NewAddress) -> Result<i64, Error> {
        Err(Error::SqlError {
            message: "addresses table unavailable".to_string(),
        })
    }

    async fn update(&self, id: i64, address: NewAddress) -> Result<bool, Error> {
        AddressService::update(self.0.as_ref(), id, address).await
    }

    async fn delete(&self, id: i64) -> Result<bool, Error> {
        AddressService::delete(self.0.as_ref(), id).await
    }
}

/// Student service whose inserts fail after the address was stored.
pub struct FailingStudentCreates(pub Arc<MemoryStore>);

#[async_trait]
impl StudentService for FailingStudentCreates {
    async fn list(&self, page: PageRequest) -> Result<Page<Student>, Error> {
        self.0.list(page).await
    }

    async fn search(&self, query: &str, page: PageRequest) -> Result<Page<Student>, Error> {
        self.0.search(query, page).await
    }

    async fn get(&self, id: i64) -> Result<Option<Student>, Error> {
        self.0.get(id).await
    }

    async fn exists(&self, id: i64) -> Result<bool, Error> {
        self.0.exists(id).await
    }

    async fn create(&self, _student: NewStudent) -> Result<i64, Error> {
        Err(Error::SqlError {
            message: "students table unavailable".to_string(),
        })
    }

    async fn update(&self, id: i64, student: NewStudent) -> Result<bool, Error> {
        StudentService::update(self.0.as_ref(), id, student).await
    }

    async fn delete(&self, id: i64) -> Result<bool, Error> {
        StudentService::delete(self.0.as_ref(), id).await
    }

    async fn update_photo(&self, id: i64, url: &str) -> Result<bool, Error> {
        self.0.update_photo(id, url).await
    }
}

type WrapStudents = Box<dyn FnOnce(Arc<MemoryStore>) -> Arc<dyn StudentService>>;
type WrapAddresses = Box<dyn FnOnce(Arc<MemoryStore>) -> Arc<dyn AddressService>>;

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub photos: Arc<RecordingStorage>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(RecordingStorage::default(), None, None)
    }

    pub fn with_photos(photos: RecordingStorage) -> Self {
        Self::build(photos, None, None)
    }

    pub fn with_addresses<F>(addresses: F) -> Self
    where
        F: FnOnce(Arc<MemoryStore>) -> Arc<dyn AddressService> + 'static,
    {
        Self::build(RecordingStorage::default(), None, Some(Box::new(addresses)))
    }

    pub fn with_students<F>(students: F) -> Self
    where
        F: FnOnce(Arc<MemoryStore>) -> Arc<dyn StudentService> + 'static,
    {
        Self::build(RecordingStorage::default(), Some(Box::new(students)), None)
    }

    fn build(
        photos: RecordingStorage,
        students: Option<WrapStudents>,
        addresses: Option<WrapAddresses>,
    ) -> Self {
        let store = Arc::new(MemoryStore::new());
        let photos = Arc::new(photos);
        let students: Arc<dyn StudentService> = match students {
            Some(build) => build(store.clone()),
            None => store.clone(),
        };
        let addresses: Arc<dyn AddressService> = match addresses {
            Some(build) => build(store.clone()),
            None => store.clone(),
        };
        let state = AppState {
            students,
            addresses,
            users: store.clone(),
            photos: photos.clone(),
            config: Arc::new(config()),
        };
        TestApp {
            state,
            store,
            photos,
        }
    }

    pub fn token(&self, role: Role) -> String {
        let user = User {
            id: 1,
            username: "tester".to_string(),
            email: "tester@example.com".to_string(),
            password: String::new(),
            role,
            created_at: None,
            updated_at: None,
        };
        auth::issue_token(&user, &self.state.config.jwt).unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = app(self.state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    /// Creates a student as an admin and returns its JSON.
    pub async fn create_student(&self, body: Value) -> Value {
        let token = self.token(Role::Admin);
        let (status, json) = self
            .send(json_request(Method::POST, "/students", Some(&token), body))
            .await;
        assert_eq!(status, StatusCode::OK, "{}", json);
        json["data"]["student"].clone()
    }
}

pub fn student_body(name: &str) -> Value {
    serde_json::json!({
        "name": name,
        "active": true,
        "birth_date": "2010-06-15",
        "father_name": "U Ba",
        "mother_name": "Daw Hla",
        "parents_occupation": "farmer"
    })
}

pub fn request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    raw_request(method, uri, token, body.to_string())
}

pub fn raw_request(method: Method, uri: &str, token: Option<&str>, body: String) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body)).unwrap()
}

pub fn multipart_request(
    method: Method,
    uri: &str,
    token: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &[u8])>,
) -> Request<Body> {
    let mut body: Vec<u8> = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"img\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(body))
        .unwrap()
}

pub fn error_kind(body: &Value) -> &str {
    body["errors"][0]["error"].as_str().unwrap_or_default()
}
