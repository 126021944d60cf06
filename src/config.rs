//! Layered application configuration.
//!
//! Settings merge `gitfreelas.toml` with `GITFREELAS_`-prefixed
//! environment variables (double underscore separating sections, e.g.
//! `GITFREELAS_GITHUB__TOKEN`).

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;

/// Default configuration file name.
const CONFIG_FILE: &str = "gitfreelas.toml";

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the server binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_owned()
}

/// Database settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
}

/// Webhook settings.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Shared secret GitHub signs deliveries with.
    pub secret: String,
}

/// GitHub settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubConfig {
    /// REST API base URL.
    #[serde(default = "default_github_api")]
    pub api_url: String,
    /// Token with repository administration scope.
    pub token: String,
    /// Organisation or user owning task repositories.
    pub owner: String,
    /// Client account that receives repository access on completion.
    pub client_login: String,
}

fn default_github_api() -> String {
    "https://api.github.com".to_owned()
}

/// Escrow contract settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EthereumConfig {
    /// JSON-RPC endpoint of the node.
    pub rpc_url: String,
    /// Deployed escrow contract address.
    pub contract_address: String,
    /// Sender account managed by the node or relayer.
    pub sender_address: String,
    /// Chain the contract is deployed on.
    pub chain_id: u64,
}

/// Complete application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default = "default_server")]
    pub server: ServerConfig,
    /// Database settings.
    pub database: DatabaseConfig,
    /// Webhook settings.
    pub webhook: WebhookConfig,
    /// GitHub settings.
    pub github: GithubConfig,
    /// Escrow contract settings.
    pub ethereum: EthereumConfig,
}

fn default_server() -> ServerConfig {
    ServerConfig {
        bind_addr: default_bind_addr(),
    }
}

impl AppConfig {
    /// Loads configuration from the TOML file and the environment.
    ///
    /// # Errors
    ///
    /// Returns a [`figment::Error`] when required settings are missing or
    /// malformed.
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed("GITFREELAS_").split("__"))
            .extract()
    }
}
