//! Virtual DNS cluster lifecycle
//!
//! Clusters belong to an organization (account); every call is made
//! against the account ID the resource was built with.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::{debug, info};

use crate::api::VirtualDnsApi;
use crate::error::{Error, Result};
use crate::types::VirtualDns;

const NAME_LEN: RangeInclusive<usize> = 1..=160;
const CACHE_TTL: RangeInclusive<u32> = 30..=36000;
const RATELIMIT: RangeInclusive<u32> = 0..=100_000_000;

fn default_minimum_cache_ttl() -> u32 {
    60
}

fn default_maximum_cache_ttl() -> u32 {
    900
}

fn default_ratelimit() -> u32 {
    5000
}

/// Desired state of a virtual DNS cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualDnsSpec {
    pub name: String,
    pub origin_ips: Vec<String>,
    /// Pin the cluster's resolver addresses; left empty they are assigned
    #[serde(default)]
    pub virtual_dns_ips: Vec<String>,
    #[serde(default = "default_minimum_cache_ttl")]
    pub minimum_cache_ttl: u32,
    #[serde(default = "default_maximum_cache_ttl")]
    pub maximum_cache_ttl: u32,
    #[serde(default)]
    pub deprecate_any_requests: bool,
    #[serde(default)]
    pub ecs_fallback: bool,
    #[serde(default = "default_ratelimit")]
    pub ratelimit: u32,
}

impl VirtualDnsSpec {
    pub fn new(name: impl Into<String>, origin_ips: Vec<String>) -> Self {
        Self {
            name: name.into(),
            origin_ips,
            virtual_dns_ips: Vec::new(),
            minimum_cache_ttl: default_minimum_cache_ttl(),
            maximum_cache_ttl: default_maximum_cache_ttl(),
            deprecate_any_requests: false,
            ecs_fallback: false,
            ratelimit: default_ratelimit(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !NAME_LEN.contains(&self.name.chars().count()) {
            return Err(Error::validation("name", "must be 1 to 160 characters"));
        }
        if self.origin_ips.is_empty() {
            return Err(Error::validation("origin_ips", "at least one origin IP is required"));
        }
        check_ips("origin_ips", &self.origin_ips)?;
        check_ips("virtual_dns_ips", &self.virtual_dns_ips)?;

        for (field, ttl) in [
            ("minimum_cache_ttl", self.minimum_cache_ttl),
            ("maximum_cache_ttl", self.maximum_cache_ttl),
        ] {
            if !CACHE_TTL.contains(&ttl) {
                return Err(Error::validation(
                    field,
                    format!("{} is outside 30..=36000", ttl),
                ));
            }
        }
        if !RATELIMIT.contains(&self.ratelimit) {
            return Err(Error::validation(
                "ratelimit",
                format!("{} is outside 0..=100000000", self.ratelimit),
            ));
        }
        Ok(())
    }

    fn to_cluster(&self, id: &str, include_virtual_ips: bool) -> VirtualDns {
        VirtualDns {
            id: id.to_string(),
            name: self.name.clone(),
            origin_ips: dedup(&self.origin_ips),
            virtual_dns_ips: if include_virtual_ips {
                dedup(&self.virtual_dns_ips)
            } else {
                Vec::new()
            },
            minimum_cache_ttl: self.minimum_cache_ttl,
            maximum_cache_ttl: self.maximum_cache_ttl,
            deprecate_any_requests: self.deprecate_any_requests,
            ecs_fallback: self.ecs_fallback,
            ratelimit: self.ratelimit,
            modified_on: None,
        }
    }
}

fn check_ips(field: &'static str, ips: &[String]) -> Result<()> {
    match ips.iter().find(|ip| ip.parse::<IpAddr>().is_err()) {
        Some(bad) => Err(Error::validation(field, format!("{:?} is not an IP address", bad))),
        None => Ok(()),
    }
}

/// IP lists are sets; keep first occurrence order
fn dedup(ips: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(ips.len());
    for ip in ips {
        if !out.contains(ip) {
            out.push(ip.clone());
        }
    }
    out
}

pub struct VirtualDnsResource<A: ?Sized> {
    api: Arc<A>,
    org_id: String,
}

impl<A: VirtualDnsApi + ?Sized> VirtualDnsResource<A> {
    pub fn new(api: Arc<A>, org_id: impl Into<String>) -> Self {
        Self {
            api,
            org_id: org_id.into(),
        }
    }

    pub async fn create(&self, spec: &VirtualDnsSpec) -> Result<VirtualDns> {
        spec.validate()?;
        debug!(?spec, "Creating virtual DNS cluster");

        let created = self
            .api
            .create_virtual_dns(&self.org_id, &spec.to_cluster("", false))
            .await?;
        if created.id.is_empty() {
            return Err(Error::MissingId("virtual DNS cluster"));
        }
        info!(cluster_id = %created.id, name = %spec.name, "Created virtual DNS cluster");

        self.read_existing(&created.id).await
    }

    /// `None` when Cloudflare answers 404, i.e. the cluster is gone
    pub async fn read(&self, cluster_id: &str) -> Result<Option<VirtualDns>> {
        match self.api.virtual_dns(&self.org_id, cluster_id).await {
            Ok(cluster) => Ok(Some(cluster)),
            Err(e) if e.is_not_found() => {
                info!(cluster_id, "Virtual DNS cluster no longer exists");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn read_existing(&self, cluster_id: &str) -> Result<VirtualDns> {
        Ok(self.api.virtual_dns(&self.org_id, cluster_id).await?)
    }

    pub async fn update(&self, cluster_id: &str, spec: &VirtualDnsSpec) -> Result<VirtualDns> {
        spec.validate()?;
        let cluster = spec.to_cluster(cluster_id, !spec.virtual_dns_ips.is_empty());
        debug!(?cluster, "Updating virtual DNS cluster");

        self.api
            .update_virtual_dns(&self.org_id, cluster_id, &cluster)
            .await?;
        info!(cluster_id, "Updated virtual DNS cluster");

        self.read_existing(cluster_id).await
    }

    pub async fn delete(&self, cluster_id: &str) -> Result<()> {
        info!(cluster_id, "Deleting virtual DNS cluster");
        self.api
            .delete_virtual_dns(&self.org_id, cluster_id)
            .await?;
        Ok(())
    }

    /// Adopt an existing cluster by ID
    pub async fn import(&self, cluster_id: &str) -> Result<VirtualDns> {
        self.read_existing(cluster_id).await
    }
}
