//! HAProxy configuration helper
//!
//! Renders one backend server line per node for the plain and TLS services,
//! writes the result over the HAProxy config file and runs the reload
//! command.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use handlebars::Handlebars;
use serde::Serialize;
use tokio::process::Command;

use nodesync_core::config::HaproxyHelperConfig;
use nodesync_core::{Error, NodeHelper, NodeInfo, Result, Snapshot};

pub const HELPER_NAME: &str = "haproxy";

const TEMPLATE_NAME: &str = "haproxy";

/// rw-rw-r--
#[cfg(unix)]
const CONFIG_FILE_MODE: u32 = 0o664;

/// Two TCP frontends on :80 and :443, round-robin over every node
pub const DEFAULT_TEMPLATE: &str = r"
global
    maxconn     50000
    log         127.0.0.1 local0
    user        haproxy
    daemon

frontend http
    bind :80
    bind :::80
    mode tcp
    default_backend     http
    timeout connect 5000ms
    timeout client 50000ms
    timeout server 50000ms

frontend https
    bind :443
    bind :::443
    mode tcp
    default_backend     https
    timeout connect 5000ms
    timeout client 50000ms
    timeout server 50000ms

backend http
    mode        tcp
    balance     roundrobin
{{#each nodes}}
    server {{name}} {{internal_ip}}:{{../http_port}} check
{{/each}}

backend https
    mode        tcp
    balance     roundrobin
{{#each nodes}}
    server {{name}} {{internal_ip}}:{{../https_port}} check
{{/each}}
";

#[derive(Serialize)]
struct TemplateData<'a> {
    nodes: &'a [NodeInfo],
    http_port: u16,
    https_port: u16,
}

pub struct HaproxyHelper {
    handlebars: Handlebars<'static>,
    config_path: PathBuf,
    reload_program: String,
    reload_args: Vec<String>,
    http_port: u16,
    https_port: u16,
}

impl HaproxyHelper {
    /// Build the helper, compiling the template up front so a broken
    /// template fails startup instead of every tick.
    pub fn new(config: &HaproxyHelperConfig) -> Result<Self> {
        let template = if !config.template.trim().is_empty() {
            config.template.clone()
        } else if let Some(path) = &config.template_path {
            std::fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("failed to read HAProxy template '{path}': {e}"))
            })?
        } else {
            DEFAULT_TEMPLATE.to_string()
        };

        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.set_strict_mode(true);
        handlebars
            .register_template_string(TEMPLATE_NAME, template)
            .map_err(|e| Error::Config(format!("invalid HAProxy template: {e}")))?;

        let mut command = config.reload_command().split_whitespace().map(str::to_string);
        let reload_program = command
            .next()
            .ok_or_else(|| Error::Config("HAProxy reload command is empty".to_string()))?;

        Ok(Self {
            handlebars,
            config_path: PathBuf::from(config.config_path()),
            reload_program,
            reload_args: command.collect(),
            http_port: config.http_port(),
            https_port: config.https_port(),
        })
    }

    /// Render the HAProxy configuration for a snapshot
    pub fn render(&self, snapshot: &Snapshot) -> Result<String> {
        let data = TemplateData {
            nodes: snapshot.nodes(),
            http_port: self.http_port,
            https_port: self.https_port,
        };

        self.handlebars
            .render(TEMPLATE_NAME, &data)
            .map_err(|e| Error::Render(format!("failed to render HAProxy configuration: {e}")))
    }

    /// Replace the config file atomically: write a sibling temp file, then
    /// rename it over the target so HAProxy never reads a partial file.
    async fn write_config(&self, rendered: &str) -> Result<()> {
        let staging = staging_path(&self.config_path);
        let write_error = |source: std::io::Error| Error::Write {
            path: self.config_path.clone(),
            source,
        };

        let staged = async {
            tokio::fs::write(&staging, rendered).await?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                tokio::fs::set_permissions(
                    &staging,
                    std::fs::Permissions::from_mode(CONFIG_FILE_MODE),
                )
                .await?;
            }

            tokio::fs::rename(&staging, &self.config_path).await
        }
        .await;

        if let Err(e) = staged {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(write_error(e));
        }

        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        let output = Command::new(&self.reload_program)
            .args(&self.reload_args)
            .output()
            .await
            .map_err(|e| {
                Error::Reload(format!("failed to run '{}': {e}", self.reload_command()))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Reload(format!(
                "'{}' exited with {}: {}",
                self.reload_command(),
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }

    fn reload_command(&self) -> String {
        std::iter::once(self.reload_program.as_str())
            .chain(self.reload_args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// `haproxy.cfg` -> `.haproxy.cfg.nodesync-tmp` in the same directory
fn staging_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map_or_else(|| "haproxy.cfg".into(), |name| name.to_string_lossy());
    path.with_file_name(format!(".{file_name}.nodesync-tmp"))
}

#[async_trait]
impl NodeHelper for HaproxyHelper {
    fn name(&self) -> &str {
        HELPER_NAME
    }

    async fn apply(&self, snapshot: &Snapshot) -> Result<()> {
        let rendered = self.render(snapshot)?;
        self.write_config(&rendered).await?;
        self.reload().await?;

        tracing::info!(
            path = %self.config_path.display(),
            backends = snapshot.len(),
            "HAProxy configuration updated"
        );
        Ok(())
    }
}
