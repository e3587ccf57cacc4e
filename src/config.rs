//! Runtime configuration
//!
//! API endpoint, paging and credential settings. Every flag has an
//! environment fallback so the binary runs unchanged under CI or K8s.

use anyhow::{bail, Context, Result};
use clap::Args;
use std::time::Duration;
use tracing::info;

use crate::secrets::SecretManager;

pub const DEFAULT_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// HTTP and pagination settings for the Cloudflare client
#[derive(Debug, Clone, Args)]
pub struct ApiSettings {
    /// Cloudflare v4 API base URL
    #[arg(long, env = "CLOUDFLARE_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Rules requested per listing page
    #[arg(long, env = "CLOUDFLARE_PER_PAGE", default_value_t = 100)]
    pub per_page: u32,

    /// Give up on a listing that has not ended after this many pages
    #[arg(long, env = "CLOUDFLARE_MAX_PAGES", default_value_t = 1000)]
    pub max_pages: u32,

    /// Per-request timeout in seconds
    #[arg(long, env = "CLOUDFLARE_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            per_page: 100,
            max_pages: 1000,
            timeout_secs: 30,
        }
    }
}

/// Where the Cloudflare API token comes from
#[derive(Debug, Clone, Args)]
pub struct CredentialSettings {
    /// Cloudflare API token (takes precedence over Secret Manager)
    #[arg(long, env = "CLOUDFLARE_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// GCP Project ID for Secret Manager
    #[arg(long, env = "GCP_PROJECT_ID")]
    pub gcp_project: Option<String>,

    /// Secret name for Cloudflare API token
    #[arg(long, default_value = "cloudflare-api-token")]
    pub secret_name: String,
}

impl CredentialSettings {
    /// Resolve the API token: explicit value first, then Google Secret Manager
    pub async fn resolve_token(&self) -> Result<String> {
        if let Some(token) = self.api_token.as_deref().filter(|t| !t.is_empty()) {
            info!("🔐 Using Cloudflare API token from environment");
            return Ok(token.to_string());
        }

        let Some(project) = self.gcp_project.as_deref() else {
            bail!("no Cloudflare API token: set CLOUDFLARE_API_TOKEN or GCP_PROJECT_ID");
        };

        info!("🔐 Fetching credentials from GSM (project: {})", project);
        let secret_manager = SecretManager::new(project).await?;
        secret_manager
            .get_secret(&self.secret_name)
            .await
            .context("Failed to fetch Cloudflare API token from GSM")
    }
}
