//! Cloudflare token loading from Google Secret Manager
//!
//! Authenticates with Application Default Credentials, so the same binary
//! works with `gcloud auth application-default login` locally and with
//! Workload Identity in a cluster.

use anyhow::{ensure, Context, Result};
use gcloud_sdk::google::cloud::secretmanager::v1::secret_manager_service_client::SecretManagerServiceClient;
use gcloud_sdk::google::cloud::secretmanager::v1::AccessSecretVersionRequest;
use gcloud_sdk::{GoogleApi, GoogleAuthMiddleware};
use tracing::{debug, info};

const SECRET_MANAGER_ENDPOINT: &str = "https://secretmanager.googleapis.com";

/// Read-only Secret Manager handle bound to one GCP project
pub struct SecretManager {
    client: GoogleApi<SecretManagerServiceClient<GoogleAuthMiddleware>>,
    project_id: String,
}

/// Full resource name of a secret version
fn secret_version_name(project_id: &str, secret_name: &str, version: &str) -> String {
    format!(
        "projects/{}/secrets/{}/versions/{}",
        project_id, secret_name, version
    )
}

impl SecretManager {
    pub async fn new(project_id: &str) -> Result<Self> {
        debug!(project = %project_id, "Connecting to Secret Manager");

        let client = GoogleApi::from_function(
            SecretManagerServiceClient::new,
            SECRET_MANAGER_ENDPOINT,
            None,
        )
        .await
        .context("Failed to initialize GSM client")?;

        Ok(Self {
            client,
            project_id: project_id.to_string(),
        })
    }

    /// Latest version of `secret_name`, with surrounding whitespace removed
    pub async fn get_secret(&self, secret_name: &str) -> Result<String> {
        let name = secret_version_name(&self.project_id, secret_name, "latest");
        debug!(secret = %name, "Accessing secret version");

        let response = self
            .client
            .get()
            .access_secret_version(AccessSecretVersionRequest { name })
            .await
            .with_context(|| format!("Failed to access secret {}", secret_name))?;

        let payload = response
            .into_inner()
            .payload
            .with_context(|| format!("Secret {} has no payload", secret_name))?;

        // Tokens pasted through the console often carry a trailing newline.
        let token = payload.data.as_sensitive_str().trim().to_string();
        ensure!(!token.is_empty(), "Secret {} is empty", secret_name);

        info!("✅ Credentials loaded (length: {} bytes)", token.len());
        Ok(token)
    }
}
