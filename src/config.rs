use serde::Deserialize;

use crate::models::AddressPayload;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub default_address: AddressPayload,
    #[serde(default)]
    pub admin: Option<AdminConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expiry_hours: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Local,
    S3,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub bucket: String,
    /// Public URL of a stored object; `{bucket}` and `{key}` are substituted.
    pub url_template: String,
    pub local_dir: String,
}

impl StorageConfig {
    pub fn url_for(&self, key: &str) -> String {
        self.url_template
            .replace("{bucket}", &self.bucket)
            .replace("{key}", key)
    }
}

/// Administrator created on startup when no user with this email exists.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    pub email: String,
    pub username: String,
    pub password: String,
}

impl Config {
    /// Reads `.env` when present, then the process environment.
    pub fn load() -> anyhow::Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            log::info!("Loaded environment from {}", path.display());
        }
        Self::from_env(config::Environment::default())
    }

    /// Builds the config from `SECTION__KEY` variables. `JWT__SECRET` has no
    /// default and must not be blank.
    pub fn from_env(env: config::Environment) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(env.separator("__"))
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.max_connections", 10)?
            .set_default("jwt.expiry_hours", 24)?
            .set_default("storage.backend", "local")?
            .set_default("storage.bucket", "thingaha")?
            .set_default("storage.url_template", "https://{bucket}.s3.amazonaws.com/{key}")?
            .set_default("storage.local_dir", "photos")?
            .set_default("default_address.division", "yangon")?
            .set_default("default_address.district", "east")?
            .set_default("default_address.township", "MyaeNiGone")?
            .set_default("default_address.street_address", "16 street")?
            .build()?;

        let config: Config = config.try_deserialize()?;
        if config.jwt.secret.trim().is_empty() {
            anyhow::bail!("JWT__SECRET must not be empty");
        }
        Ok(config)
    }
}
