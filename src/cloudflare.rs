//! Cloudflare API Client
//!
//! reqwest-backed implementation of the zone, firewall access rule and
//! virtual DNS endpoints of the v4 REST API.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::api::{AccessRuleApi, VirtualDnsApi};
use crate::config::ApiSettings;
use crate::error::UpstreamError;
use crate::types::{AccessRule, Page, Scope, VirtualDns, ZoneDetails};

// ============================================================
// API Response Types
// ============================================================

#[derive(Debug, Deserialize)]
struct CloudflareResponse<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<CloudflareError>,
    result: Option<T>,
    #[serde(default)]
    result_info: Option<ResultInfo>,
}

impl<T> CloudflareResponse<T> {
    fn error_message(&self) -> String {
        if self.errors.is_empty() {
            return "request was not successful".to_string();
        }
        self.errors
            .iter()
            .map(|e| format!("{} ({})", e.message, e.code))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Deserialize)]
struct CloudflareError {
    #[serde(default)]
    code: i32,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    #[serde(default)]
    page: u32,
    #[serde(default)]
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct ZoneSummary {
    id: String,
}

// ============================================================
// Client Implementation
// ============================================================

/// Cloudflare v4 API client
pub struct CloudflareClient {
    http_client: Client,
    api_token: String,
    api_base: String,
    per_page: u32,
}

impl CloudflareClient {
    /// Create a client for the API at `settings.api_base`
    pub fn new(api_token: String, settings: &ApiSettings) -> Result<Self, UpstreamError> {
        let http_client = Client::builder()
            .user_agent(concat!("cloudflare-access-rules/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.timeout())
            .build()?;

        Ok(Self {
            http_client,
            api_token,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            per_page: settings.per_page,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// Send a request and unwrap the response envelope.
    ///
    /// A non-2xx status or `success: false` becomes [`UpstreamError::Api`],
    /// carrying the API's own error messages when the body has any.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<CloudflareResponse<T>, UpstreamError> {
        let response = request.bearer_auth(&self.api_token).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        match serde_json::from_slice::<CloudflareResponse<T>>(&body) {
            Ok(envelope) if status.is_success() && envelope.success => Ok(envelope),
            Ok(envelope) => Err(UpstreamError::Api {
                status: status.as_u16(),
                message: envelope.error_message(),
            }),
            Err(source) if status.is_success() => Err(UpstreamError::Decode {
                what: what.to_string(),
                source,
            }),
            Err(_) => Err(UpstreamError::Api {
                status: status.as_u16(),
                message: String::from_utf8_lossy(&body).into_owned(),
            }),
        }
    }

    async fn execute_result<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T, UpstreamError> {
        self.execute(request, what)
            .await?
            .result
            .ok_or_else(|| UpstreamError::EmptyResult(what.to_string()))
    }

    fn rule_path(scope: &Scope, rule_id: &str) -> String {
        format!("{}/{}", scope.rules_path(), urlencoding::encode(rule_id))
    }

    fn virtual_dns_path(org_id: &str, cluster_id: Option<&str>) -> String {
        let base = format!("/accounts/{}/virtual_dns", urlencoding::encode(org_id));
        match cluster_id {
            Some(id) => format!("{}/{}", base, urlencoding::encode(id)),
            None => base,
        }
    }
}

#[async_trait]
impl AccessRuleApi for CloudflareClient {
    async fn zone_id_by_name(&self, zone_name: &str) -> Result<Option<String>, UpstreamError> {
        debug!("Looking up zone ID for: {}", zone_name);

        let request = self
            .http_client
            .get(self.url("/zones"))
            .query(&[("name", zone_name)]);
        let zones: Vec<ZoneSummary> = self
            .execute(request, "zone lookup")
            .await?
            .result
            .unwrap_or_default();

        Ok(zones.into_iter().next().map(|zone| zone.id))
    }

    async fn zone_details(&self, zone_id: &str) -> Result<ZoneDetails, UpstreamError> {
        let path = format!("/zones/{}", urlencoding::encode(zone_id));
        let request = self.http_client.get(self.url(&path));
        self.execute_result(request, "zone details").await
    }

    async fn list_access_rules(
        &self,
        scope: &Scope,
        page: u32,
    ) -> Result<Page<AccessRule>, UpstreamError> {
        let scope_type = scope.kind().to_string();
        let request = self
            .http_client
            .get(self.url(&scope.rules_path()))
            .query(&[
                ("page", page.to_string()),
                ("per_page", self.per_page.to_string()),
                ("scope_type", scope_type),
            ]);

        let envelope: CloudflareResponse<Vec<AccessRule>> =
            self.execute(request, "access rule listing").await?;
        let items = envelope.result.unwrap_or_default();

        // Without result_info the response is the whole collection.
        let (page, total_pages) = match envelope.result_info {
            Some(info) if info.page > 0 => (info.page, info.total_pages),
            Some(info) => (page, info.total_pages),
            None => (page, page),
        };

        debug!(
            %scope,
            page,
            total_pages,
            count = items.len(),
            "Fetched access rule page"
        );

        Ok(Page {
            items,
            page,
            total_pages,
        })
    }

    async fn create_access_rule(
        &self,
        scope: &Scope,
        rule: &AccessRule,
    ) -> Result<AccessRule, UpstreamError> {
        let request = self
            .http_client
            .post(self.url(&scope.rules_path()))
            .json(rule);
        self.execute_result(request, "access rule create").await
    }

    async fn update_access_rule(
        &self,
        scope: &Scope,
        rule_id: &str,
        rule: &AccessRule,
    ) -> Result<AccessRule, UpstreamError> {
        let request = self
            .http_client
            .patch(self.url(&Self::rule_path(scope, rule_id)))
            .json(rule);
        self.execute_result(request, "access rule update").await
    }

    async fn delete_access_rule(&self, scope: &Scope, rule_id: &str) -> Result<(), UpstreamError> {
        let request = self
            .http_client
            .delete(self.url(&Self::rule_path(scope, rule_id)));
        self.execute::<serde_json::Value>(request, "access rule delete")
            .await?;
        Ok(())
    }
}

#[async_trait]
impl VirtualDnsApi for CloudflareClient {
    async fn virtual_dns(&self, org_id: &str, cluster_id: &str) -> Result<VirtualDns, UpstreamError> {
        let request = self
            .http_client
            .get(self.url(&Self::virtual_dns_path(org_id, Some(cluster_id))));
        self.execute_result(request, "virtual DNS details").await
    }

    async fn create_virtual_dns(
        &self,
        org_id: &str,
        cluster: &VirtualDns,
    ) -> Result<VirtualDns, UpstreamError> {
        let request = self
            .http_client
            .post(self.url(&Self::virtual_dns_path(org_id, None)))
            .json(cluster);
        self.execute_result(request, "virtual DNS create").await
    }

    async fn update_virtual_dns(
        &self,
        org_id: &str,
        cluster_id: &str,
        cluster: &VirtualDns,
    ) -> Result<(), UpstreamError> {
        let request = self
            .http_client
            .put(self.url(&Self::virtual_dns_path(org_id, Some(cluster_id))))
            .json(cluster);
        self.execute::<serde_json::Value>(request, "virtual DNS update")
            .await?;
        Ok(())
    }

    async fn delete_virtual_dns(&self, org_id: &str, cluster_id: &str) -> Result<(), UpstreamError> {
        let request = self
            .http_client
            .delete(self.url(&Self::virtual_dns_path(org_id, Some(cluster_id))));
        self.execute::<serde_json::Value>(request, "virtual DNS delete")
            .await?;
        Ok(())
    }
}
