//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.mail2git/config.json`) and environment.
//! Environment variables use the names the Apps Script deployment already sets
//! (`GITHUB_TOKEN`, `GITHUB_OWNER`, ...) and override the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application config (as read from disk).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Gateway server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Target repository and credentials.
    #[serde(default)]
    pub github: GitHubConfig,

    /// Sender allow-list.
    #[serde(default)]
    pub senders: SendersConfig,

    /// Body rendering options.
    #[serde(default)]
    pub render: RenderConfig,
}

/// Gateway bind, port, and webhook secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for HTTP (default 8080).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,

    /// Shared secret expected in the `X-Webhook-Token` header. Overridden by GMAIL_WEBHOOK_TOKEN env.
    #[serde(default)]
    pub webhook_token: Option<String>,
}

fn default_gateway_port() -> u16 {
    8080
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
            webhook_token: None,
        }
    }
}

/// Repository coordinates and API endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubConfig {
    /// Repository owner (user or org). Overridden by GITHUB_OWNER env.
    #[serde(default)]
    pub owner: Option<String>,

    /// Repository name. Overridden by GITHUB_REPO env.
    #[serde(default)]
    pub repo: Option<String>,

    /// Fine-grained PAT with Contents read/write. Overridden by GITHUB_TOKEN env.
    #[serde(default)]
    pub token: Option<String>,

    /// Branch used when the payload does not name one. Overridden by DEFAULT_BRANCH env.
    #[serde(default = "default_branch")]
    pub default_branch: String,

    /// REST API base (default https://api.github.com).
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Raw content base (default https://raw.githubusercontent.com).
    #[serde(default = "default_raw_base")]
    pub raw_base: String,
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_raw_base() -> String {
    "https://raw.githubusercontent.com".to_string()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            owner: None,
            repo: None,
            token: None,
            default_branch: default_branch(),
            api_base: default_api_base(),
            raw_base: default_raw_base(),
        }
    }
}

/// Allowed senders: full addresses (`you@example.com`) or bare domains (`example.org`).
/// Empty means everyone is allowed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendersConfig {
    #[serde(default)]
    pub allowed: Vec<String>,
}

/// Which HTML converter renders `body_html` when there is no plain body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HtmlConverterKind {
    /// HTML to markdown via htmd (links kept, images dropped).
    #[default]
    Markdown,
    /// Minimal tag stripper: line breaks kept, tags removed, entities unescaped.
    Strip,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderConfig {
    #[serde(default)]
    pub html_converter: HtmlConverterKind,
}

/// Immutable runtime settings, resolved once at startup (file + env) and shared by the gateway,
/// sender check and store client.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind: String,
    pub port: u16,
    pub webhook_token: String,
    pub github: GitHubSettings,
    pub allowed_senders: Vec<String>,
    pub html_converter: HtmlConverterKind,
}

/// Resolved repository coordinates and credentials for the store client.
#[derive(Debug, Clone)]
pub struct GitHubSettings {
    pub owner: String,
    pub repo: String,
    pub token: String,
    pub default_branch: String,
    pub api_base: String,
    pub raw_base: String,
}

/// Non-empty trimmed value of an env var.
fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

fn nonempty(value: Option<&String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Split a comma-separated allow-list, lower-casing and dropping blanks.
pub fn parse_allowed_senders(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    /// Apply env overrides and check required fields, producing the runtime settings.
    pub fn resolve(&self) -> Result<Settings> {
        let github = self.resolve_github()?;
        let webhook_token = env_nonempty("GMAIL_WEBHOOK_TOKEN")
            .or_else(|| nonempty(self.gateway.webhook_token.as_ref()))
            .context(
                "webhook token not configured (set GMAIL_WEBHOOK_TOKEN or gateway.webhookToken)",
            )?;
        let allowed_senders = env_nonempty("ALLOWED_SENDERS")
            .map(|raw| parse_allowed_senders(&raw))
            .unwrap_or_else(|| parse_allowed_senders(&self.senders.allowed.join(",")));

        Ok(Settings {
            bind: self.gateway.bind.trim().to_string(),
            port: self.gateway.port,
            webhook_token,
            github,
            allowed_senders,
            html_converter: self.render.html_converter,
        })
    }

    /// Repository settings only (enough for read-only commands that never serve the webhook).
    pub fn resolve_github(&self) -> Result<GitHubSettings> {
        let token = env_nonempty("GITHUB_TOKEN")
            .or_else(|| nonempty(self.github.token.as_ref()))
            .context("GitHub token not configured (set GITHUB_TOKEN or github.token)")?;
        let owner = env_nonempty("GITHUB_OWNER")
            .or_else(|| nonempty(self.github.owner.as_ref()))
            .context("GitHub owner not configured (set GITHUB_OWNER or github.owner)")?;
        let repo = env_nonempty("GITHUB_REPO")
            .or_else(|| nonempty(self.github.repo.as_ref()))
            .context("GitHub repo not configured (set GITHUB_REPO or github.repo)")?;
        let default_branch = env_nonempty("DEFAULT_BRANCH")
            .or_else(|| nonempty(Some(&self.github.default_branch)))
            .unwrap_or_else(default_branch);
        Ok(GitHubSettings {
            owner,
            repo,
            token,
            default_branch,
            api_base: self.github.api_base.trim().trim_end_matches('/').to_string(),
            raw_base: self.github.raw_base.trim().trim_end_matches('/').to_string(),
        })
    }
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("MAIL2GIT_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".mail2git").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path (or the default). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
