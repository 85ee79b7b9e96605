//! Configuration management

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Prefix of configuration environment variables, e.g.
/// `SECRETSHARE_STORE__TABLE_NAME`
pub const ENV_PREFIX: &str = "SECRETSHARE";

/// Main configuration structure
#[derive(Debug, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Answer CORS preflights from any origin
    #[serde(default = "default_true")]
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            cors: true,
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Process-local store; contents are lost on restart
    Memory,

    DynamoDb {
        #[serde(default = "default_table_name")]
        table_name: String,

        /// Falls back to the AWS default region chain
        #[serde(default)]
        region: Option<String>,

        /// e.g. DynamoDB Local
        #[serde(default)]
        endpoint_url: Option<String>,

        /// Create the table and enable TTL at start-up
        #[serde(default)]
        create_table: bool,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::DynamoDb {
            table_name: default_table_name(),
            region: None,
            endpoint_url: None,
            create_table: false,
        }
    }
}

fn default_port() -> u16 {
    8080
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_table_name() -> String {
    "secrets-share".to_string()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file and the environment. Without an explicit
    /// path, `secretshare.{toml,yaml,json}` in the working directory is used
    /// if present.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name("secretshare").required(false),
        };

        Self::build(config::Config::builder().add_source(file), environment())
    }

    fn build(
        builder: ConfigBuilder<DefaultState>,
        environment: Environment,
    ) -> anyhow::Result<Self> {
        // The tag must be present for `store` settings given without a backend
        let config = builder
            .set_default("store.backend", "dynamodb")?
            .add_source(environment)
            .build()?;
        Ok(config.try_deserialize::<Config>()?)
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
