//! Remote API seams
//!
//! Everything the resolver, locator and resource handlers need from
//! Cloudflare. [`crate::cloudflare::CloudflareClient`] is the HTTP
//! implementation; tests plug in scripted fakes.

use async_trait::async_trait;

use crate::error::UpstreamError;
use crate::types::{AccessRule, Page, Scope, VirtualDns, ZoneDetails};

/// Zone and firewall access rule endpoints
#[async_trait]
pub trait AccessRuleApi: Send + Sync {
    /// Look up a zone ID by zone name. `None` if no zone matches.
    async fn zone_id_by_name(&self, zone_name: &str) -> Result<Option<String>, UpstreamError>;

    /// Fetch zone details, including the owning organization
    async fn zone_details(&self, zone_id: &str) -> Result<ZoneDetails, UpstreamError>;

    /// Fetch one 1-indexed page of the rules in `scope`, filtered by scope type
    async fn list_access_rules(
        &self,
        scope: &Scope,
        page: u32,
    ) -> Result<Page<AccessRule>, UpstreamError>;

    async fn create_access_rule(
        &self,
        scope: &Scope,
        rule: &AccessRule,
    ) -> Result<AccessRule, UpstreamError>;

    async fn update_access_rule(
        &self,
        scope: &Scope,
        rule_id: &str,
        rule: &AccessRule,
    ) -> Result<AccessRule, UpstreamError>;

    async fn delete_access_rule(&self, scope: &Scope, rule_id: &str) -> Result<(), UpstreamError>;
}

/// Organization-owned virtual DNS cluster endpoints
#[async_trait]
pub trait VirtualDnsApi: Send + Sync {
    async fn virtual_dns(&self, org_id: &str, cluster_id: &str) -> Result<VirtualDns, UpstreamError>;

    async fn create_virtual_dns(
        &self,
        org_id: &str,
        cluster: &VirtualDns,
    ) -> Result<VirtualDns, UpstreamError>;

    async fn update_virtual_dns(
        &self,
        org_id: &str,
        cluster_id: &str,
        cluster: &VirtualDns,
    ) -> Result<(), UpstreamError>;

    async fn delete_virtual_dns(&self, org_id: &str, cluster_id: &str) -> Result<(), UpstreamError>;
}
