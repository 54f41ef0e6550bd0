//! Server configuration.
//!
//! Configuration loads from a YAML file (`DASHOPS_CONFIG`, default
//! `dash-ops.yaml` when present) with `DASHOPS_*` environment overrides on
//! top. The `service_catalog` block is handed to the catalog constructor
//! explicitly; nothing here leaks into module-global state.

use serde::{Deserialize, Serialize};

use dashops_catalog::VersioningProviderKind;
use dashops_core::{Error, Result};

/// Default HTTP port.
pub const DEFAULT_HTTP_PORT: u16 = 8058;

/// Default catalog storage directory when the config leaves it empty.
pub const DEFAULT_CATALOG_DIRECTORY: &str = "../services";

/// Default config file probed when `DASHOPS_CONFIG` is unset.
pub const DEFAULT_CONFIG_FILE: &str = "dash-ops.yaml";

/// Configuration for the Dash-Ops API server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server port.
    pub http_port: u16,

    /// Enable debug mode.
    ///
    /// When enabled, `UserContext` is extracted from `X-User` / `X-Email` /
    /// `X-Teams` headers (dev/tests). When disabled, a verified JWT from the
    /// upstream OAuth2 layer is required for authenticated requests.
    pub debug: bool,

    /// CORS configuration.
    pub cors: CorsConfig,

    /// JWT verification configuration (used when `debug` is false).
    pub jwt: JwtConfig,

    /// Service catalog module configuration.
    pub service_catalog: ServiceCatalogConfig,

    /// GitHub team-directory configuration. Absent disables enrichment.
    pub github: Option<GithubConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            debug: false,
            cors: CorsConfig::default(),
            jwt: JwtConfig::default(),
            service_catalog: ServiceCatalogConfig::default(),
            github: None,
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins. `["*"]` allows any origin; empty disables CORS.
    pub allowed_origins: Vec<String>,
    /// Preflight cache duration in seconds.
    pub max_age_seconds: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            max_age_seconds: 3600,
        }
    }
}

/// JWT verification configuration.
///
/// Token issuance and session persistence belong to the upstream OAuth2
/// layer; this only verifies what that layer minted.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    /// HS256 shared secret. Mutually exclusive with `rs256_public_key_pem`.
    pub hs256_secret: Option<String>,
    /// RS256 public key in PEM format.
    pub rs256_public_key_pem: Option<String>,
    /// Expected issuer, when set.
    pub issuer: Option<String>,
    /// Expected audience, when set.
    pub audience: Option<String>,
    /// Claim carrying the username.
    pub username_claim: String,
    /// Claim carrying the email address.
    pub email_claim: String,
    /// Claim carrying the team slugs (JSON array of strings).
    pub teams_claim: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            hs256_secret: None,
            rs256_public_key_pem: None,
            issuer: None,
            audience: None,
            username_claim: "username".to_string(),
            email_claim: "email".to_string(),
            teams_claim: "teams".to_string(),
        }
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("hs256_secret", &self.hs256_secret.as_ref().map(|_| "[REDACTED]"))
            .field(
                "rs256_public_key_pem",
                &self.rs256_public_key_pem.as_ref().map(|_| "[REDACTED]"),
            )
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("username_claim", &self.username_claim)
            .field("email_claim", &self.email_claim)
            .field("teams_claim", &self.teams_claim)
            .finish()
    }
}

/// The `service_catalog` configuration block.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceCatalogConfig {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Versioning configuration.
    pub versioning: VersioningConfig,
}

/// Storage provider selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Active provider. Only `filesystem` is supported.
    pub provider: StorageProviderKind,
    /// Filesystem provider options.
    pub filesystem: FilesystemStorageConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: StorageProviderKind::Filesystem,
            filesystem: FilesystemStorageConfig::default(),
        }
    }
}

/// Known storage providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageProviderKind {
    /// Directory of YAML files.
    #[default]
    Filesystem,
}

/// Filesystem storage options.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FilesystemStorageConfig {
    /// Storage directory. Empty falls back to
    /// [`DEFAULT_CATALOG_DIRECTORY`].
    pub directory: String,
}

impl FilesystemStorageConfig {
    /// Returns the configured directory, applying the default.
    #[must_use]
    pub fn directory_or_default(&self) -> &str {
        if self.directory.trim().is_empty() {
            DEFAULT_CATALOG_DIRECTORY
        } else {
            &self.directory
        }
    }
}

/// Versioning configuration block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VersioningConfig {
    /// Master switch; `false` forces the `none` provider.
    pub enabled: bool,
    /// Provider selection when enabled.
    pub provider: VersioningProviderKind,
}

impl Default for VersioningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: VersioningProviderKind::Simple,
        }
    }
}

impl VersioningConfig {
    /// Returns the provider after applying the `enabled` switch.
    #[must_use]
    pub fn effective_provider(&self) -> VersioningProviderKind {
        if self.enabled {
            self.provider
        } else {
            VersioningProviderKind::None
        }
    }
}

/// GitHub team-directory configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    /// API base URL.
    pub api_url: String,
    /// Organization owning the teams.
    pub org: String,
    /// API token. Usually injected via `DASHOPS_GITHUB_TOKEN`.
    pub token: Option<String>,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            org: String::new(),
            token: None,
        }
    }
}

impl std::fmt::Debug for GithubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubConfig")
            .field("api_url", &self.api_url)
            .field("org", &self.org)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Config {
    /// Parses configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Returns a serialization error on malformed YAML.
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| Error::Serialization {
            message: format!("invalid configuration: {e}"),
        })
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or parsed.
    pub fn from_file(path: &str) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::backend("config", "read", format!("{path}: {e}"))
        })?;
        Self::from_yaml(&text)
    }

    /// Loads configuration from `DASHOPS_CONFIG` (or the default file when
    /// present) and applies `DASHOPS_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error on unreadable files, malformed YAML, or malformed
    /// override values.
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var("DASHOPS_CONFIG") {
            Ok(path) => Self::from_file(&path)?,
            Err(_) if std::path::Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(DEFAULT_CONFIG_FILE)?
            }
            Err(_) => Self::default(),
        };

        if let Ok(port) = std::env::var("DASHOPS_HTTP_PORT") {
            config.http_port = port.parse().map_err(|_| {
                Error::validation("http_port", format!("invalid port '{port}'"))
            })?;
        }
        if let Ok(debug) = std::env::var("DASHOPS_DEBUG") {
            config.debug = matches!(debug.as_str(), "1" | "true" | "yes");
        }
        if let Ok(dir) = std::env::var("DASHOPS_CATALOG_DIR") {
            config.service_catalog.storage.filesystem.directory = dir;
        }
        if let Ok(provider) = std::env::var("DASHOPS_VERSIONING_PROVIDER") {
            config.service_catalog.versioning.provider =
                provider.parse().map_err(|e: dashops_catalog::CatalogError| {
                    Error::validation("versioning.provider", e.to_string())
                })?;
        }
        if let Ok(secret) = std::env::var("DASHOPS_JWT_HS256_SECRET") {
            config.jwt.hs256_secret = Some(secret);
        }
        if let Ok(token) = std::env::var("DASHOPS_GITHUB_TOKEN") {
            config.github.get_or_insert_with(GithubConfig::default).token = Some(token);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns a validation error when production mode lacks a JWT key, or
    /// when both JWT key kinds are configured at once.
    pub fn validate(&self) -> Result<()> {
        match (
            self.jwt.hs256_secret.as_deref(),
            self.jwt.rs256_public_key_pem.as_deref(),
        ) {
            (Some(_), Some(_)) => Err(Error::validation(
                "jwt",
                "hs256_secret and rs256_public_key_pem are mutually exclusive",
            )),
            (None, None) if !self.debug => Err(Error::validation(
                "jwt",
                "hs256_secret or rs256_public_key_pem is required when debug=false",
            )),
            _ => Ok(()),
        }
    }
}
