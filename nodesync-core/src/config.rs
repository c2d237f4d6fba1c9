use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Schedule expression: `@every 30s`, a bare duration, or a cron expression
    pub schedule: String,
    /// Fire the first tick immediately instead of waiting for the schedule
    pub run_on_start: bool,
    /// Enabled helpers, applied in this order
    pub helpers: Vec<String>,
    pub kubernetes: KubernetesConfig,
    pub haproxy: HaproxyHelperConfig,
    pub s3: S3PolicyHelperConfig,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schedule: "@every 1m".to_string(),
            run_on_start: true,
            helpers: Vec::new(),
            kubernetes: KubernetesConfig::default(),
            haproxy: HaproxyHelperConfig::default(),
            s3: S3PolicyHelperConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Cluster connection overrides.
///
/// With every field unset the client configuration is inferred from the
/// environment (in-cluster service account, then `KUBECONFIG`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KubernetesConfig {
    pub kubeconfig: Option<String>,
    pub context: Option<String>,
    pub cluster: Option<String>,
    pub user: Option<String>,
}

impl KubernetesConfig {
    #[must_use]
    pub const fn has_overrides(&self) -> bool {
        self.kubeconfig.is_some()
            || self.context.is_some()
            || self.cluster.is_some()
            || self.user.is_some()
    }
}

pub const DEFAULT_HAPROXY_CONFIG_PATH: &str = "/etc/haproxy/haproxy.cfg";
pub const DEFAULT_HAPROXY_RELOAD_COMMAND: &str = "systemctl reload haproxy";
pub const DEFAULT_HTTP_BACKEND_PORT: u16 = 80;
pub const DEFAULT_HTTPS_BACKEND_PORT: u16 = 443;

/// HAProxy helper configuration
///
/// Every field falls back to its default independently when it is missing,
/// empty or zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HaproxyHelperConfig {
    /// Inline Handlebars template; the built-in template is used when empty
    pub template: String,
    /// File to read the template from when `template` is empty
    pub template_path: Option<String>,
    pub config_path: String,
    pub reload_command: String,
    pub http_port: u16,
    pub https_port: u16,
}

impl HaproxyHelperConfig {
    #[must_use]
    pub fn config_path(&self) -> &str {
        non_empty_or(&self.config_path, DEFAULT_HAPROXY_CONFIG_PATH)
    }

    #[must_use]
    pub fn reload_command(&self) -> &str {
        non_empty_or(&self.reload_command, DEFAULT_HAPROXY_RELOAD_COMMAND)
    }

    #[must_use]
    pub const fn http_port(&self) -> u16 {
        if self.http_port == 0 {
            DEFAULT_HTTP_BACKEND_PORT
        } else {
            self.http_port
        }
    }

    #[must_use]
    pub const fn https_port(&self) -> u16 {
        if self.https_port == 0 {
            DEFAULT_HTTPS_BACKEND_PORT
        } else {
            self.https_port
        }
    }
}

/// S3 bucket policy helper configuration
///
/// Credentials and region left empty come from the AWS default chain
/// (environment, shared profile files, web identity, instance metadata).
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct S3PolicyHelperConfig {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub region: String,
    /// Service endpoint, e.g. `https://minio.internal:9000`
    pub endpoint: String,
    pub bucket_name: String,
    /// Address the bucket as `<endpoint>/<bucket>` instead of `<bucket>.<endpoint>`
    pub force_path_style: bool,
    pub request_timeout_secs: u64,
}

impl Default for S3PolicyHelperConfig {
    fn default() -> Self {
        Self {
            access_key_id: String::new(),
            secret_access_key: String::new(),
            session_token: String::new(),
            region: String::new(),
            endpoint: String::new(),
            bucket_name: String::new(),
            force_path_style: false,
            request_timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for S3PolicyHelperConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3PolicyHelperConfig")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("bucket_name", &self.bucket_name)
            .field("force_path_style", &self.force_path_style)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

fn non_empty_or<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.trim().is_empty() {
        default
    } else {
        value
    }
}

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided)
    /// 3. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        // NODESYNC__HAPROXY__CONFIG_PATH, NODESYNC__HELPERS=haproxy,s3, ...
        builder = builder.add_source(
            Environment::with_prefix("NODESYNC")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("helpers")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load from file path
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    /// Check the settings that do not need a live collaborator.
    ///
    /// Returns every problem found rather than stopping at the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.schedule.trim().is_empty() {
            errors.push("schedule must not be empty".to_string());
        }

        let mut seen = std::collections::HashSet::new();
        for helper in &self.helpers {
            if helper.trim().is_empty() {
                errors.push("helpers must not contain empty names".to_string());
            } else if !seen.insert(helper.as_str()) {
                errors.push(format!("helper '{helper}' is listed more than once"));
            }
        }

        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            errors.push(format!(
                "logging.format must be 'json' or 'pretty', got '{}'",
                self.logging.format
            ));
        }

        if self.helpers.iter().any(|h| h == "s3") && self.s3.bucket_name.trim().is_empty() {
            errors.push("s3.bucket_name is required when the s3 helper is enabled".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
