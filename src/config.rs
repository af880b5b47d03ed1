use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::StudentsError;

pub const DEFAULT_ALLOWED_ORIGIN: &str =
    "https://student-frontend-l0iv3tst8-seththemountains-projects.vercel.app";

/// Environment keys read by [`Config::figment`], lowercased the way
/// `Env::raw()` reports them.
const ENV_KEYS: &[&str] = &[
    "port",
    "database_url",
    "db_host",
    "db_port",
    "db_user",
    "db_pass",
    "db_name",
    "db_pool_size",
    "db_queue_limit",
    "db_acquire_timeout_secs",
    "db_init_schema",
    "cors_allowed_origins",
    "loglevel",
];

/// Settings whose environment text is taken verbatim. `Env` parses values as
/// primitives, which would turn `DB_PASS=007` into the number 7.
const STRING_KEYS: &[&str] = &[
    "database_url",
    "db_host",
    "db_user",
    "db_pass",
    "db_name",
    "cors_allowed_origins",
    "loglevel",
];

/// Without a configured timeout a caller waits this long for a free connection.
const UNBOUNDED_ACQUIRE_WAIT: Duration = Duration::from_secs(60 * 60 * 24 * 365);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub port: u16,
    /// Full connection URL; takes precedence over the `db_*` parts.
    #[serde(default)]
    pub database_url: Option<String>,
    pub db_host: String,
    pub db_port: u16,
    pub db_user: String,
    pub db_pass: String,
    pub db_name: String,
    pub db_pool_size: u32,
    /// Callers allowed to wait for a connection once all are checked out; 0 = unbounded.
    pub db_queue_limit: usize,
    /// 0 = wait for a connection without a practical bound.
    pub db_acquire_timeout_secs: u64,
    pub db_init_schema: bool,
    pub cors_allowed_origins: String,
    pub loglevel: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5010,
            database_url: None,
            db_host: "localhost".to_string(),
            db_port: 3306,
            db_user: "root".to_string(),
            db_pass: String::new(),
            db_name: "students".to_string(),
            db_pool_size: 10,
            db_queue_limit: 0,
            db_acquire_timeout_secs: 0,
            db_init_schema: false,
            cors_allowed_origins: DEFAULT_ALLOWED_ORIGIN.to_string(),
            loglevel: "info".to_string(),
        }
    }
}

impl Config {
    pub fn figment() -> Figment {
        let mut figment =
            Figment::from(Serialized::defaults(Config::default())).merge(Env::raw().only(ENV_KEYS));
        for (key, value) in Env::raw().only(STRING_KEYS).iter() {
            let key = key.as_str().to_ascii_lowercase();
            figment = figment.merge(Serialized::default(&key, value));
        }
        figment
    }

    /// Defaults overlaid with whatever the process environment sets.
    pub fn load() -> Result<Self, StudentsError> {
        Self::figment()
            .extract()
            .map_err(|e| StudentsError::Config(e.to_string()))
    }

    /// Connection URL for the store. `DATABASE_URL` wins; otherwise a MySQL
    /// URL is assembled from the `DB_*` parts with credentials percent-encoded.
    pub fn database_url(&self) -> Result<String, StudentsError> {
        if let Some(url) = self.database_url.as_deref().filter(|u| !u.trim().is_empty()) {
            return Ok(url.trim().to_string());
        }

        let mut url = Url::parse("mysql://localhost")?;
        url.set_host(Some(&self.db_host))?;
        url.set_port(Some(self.db_port))
            .map_err(|_| StudentsError::Config("DB_PORT cannot be applied".to_string()))?;
        url.set_username(&self.db_user)
            .map_err(|_| StudentsError::Config("DB_USER cannot be applied".to_string()))?;
        if !self.db_pass.is_empty() {
            url.set_password(Some(&self.db_pass))
                .map_err(|_| StudentsError::Config("DB_PASS cannot be applied".to_string()))?;
        }
        url.set_path(&self.db_name);
        Ok(url.to_string())
    }

    pub fn acquire_timeout(&self) -> Duration {
        match self.db_acquire_timeout_secs {
            0 => UNBOUNDED_ACQUIRE_WAIT,
            secs => Duration::from_secs(secs),
        }
    }

    /// Allow-list entries, trimmed, empties dropped.
    pub fn allowed_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}
