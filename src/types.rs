//! Cloudflare Firewall Types
//!
//! Access rules, scopes, zones and virtual DNS clusters as they travel
//! over the v4 REST API.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Read an absent or `null` field as the type's zero value
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================
// Access Rules
// ============================================================

/// Action taken when an access rule matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessRuleMode {
    Block,
    Challenge,
    Whitelist,
    JsChallenge,
}

impl fmt::Display for AccessRuleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessRuleMode::Block => write!(f, "block"),
            AccessRuleMode::Challenge => write!(f, "challenge"),
            AccessRuleMode::Whitelist => write!(f, "whitelist"),
            AccessRuleMode::JsChallenge => write!(f, "js_challenge"),
        }
    }
}

impl FromStr for AccessRuleMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "block" => Ok(AccessRuleMode::Block),
            "challenge" => Ok(AccessRuleMode::Challenge),
            "whitelist" => Ok(AccessRuleMode::Whitelist),
            "js_challenge" => Ok(AccessRuleMode::JsChallenge),
            other => Err(Error::validation(
                "mode",
                format!("expected one of block, challenge, whitelist, js_challenge; got {other:?}"),
            )),
        }
    }
}

/// What an access rule matches on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessRuleTarget {
    Ip,
    IpRange,
    Asn,
    Country,
}

impl fmt::Display for AccessRuleTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessRuleTarget::Ip => write!(f, "ip"),
            AccessRuleTarget::IpRange => write!(f, "ip_range"),
            AccessRuleTarget::Asn => write!(f, "asn"),
            AccessRuleTarget::Country => write!(f, "country"),
        }
    }
}

impl FromStr for AccessRuleTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ip" => Ok(AccessRuleTarget::Ip),
            "ip_range" => Ok(AccessRuleTarget::IpRange),
            "asn" => Ok(AccessRuleTarget::Asn),
            "country" => Ok(AccessRuleTarget::Country),
            other => Err(Error::validation(
                "target",
                format!("expected one of ip, ip_range, asn, country; got {other:?}"),
            )),
        }
    }
}

/// Target kind plus the value it is matched against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRuleConfiguration {
    pub target: AccessRuleTarget,
    pub value: String,
}

/// A firewall access rule
///
/// `id` is empty until Cloudflare assigns one. Which collection the rule
/// lives in is carried by [`Scope`], not by the rule itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRule {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub mode: AccessRuleMode,
    pub configuration: AccessRuleConfiguration,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notes: String,
}

// ============================================================
// Scopes
// ============================================================

/// Unresolved scope choice, as written by the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    Zone,
    Organization,
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeKind::Zone => write!(f, "zone"),
            ScopeKind::Organization => write!(f, "organization"),
        }
    }
}

impl FromStr for ScopeKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zone" => Ok(ScopeKind::Zone),
            "organization" => Ok(ScopeKind::Organization),
            other => Err(Error::validation(
                "scope",
                format!("expected zone or organization; got {other:?}"),
            )),
        }
    }
}

/// A resolved rule collection: the zone ID or the owning organization ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum Scope {
    Zone(String),
    Organization(String),
}

impl Scope {
    pub fn kind(&self) -> ScopeKind {
        match self {
            Scope::Zone(_) => ScopeKind::Zone,
            Scope::Organization(_) => ScopeKind::Organization,
        }
    }

    /// Remote identifier rules are listed under
    pub fn collection_id(&self) -> &str {
        match self {
            Scope::Zone(id) | Scope::Organization(id) => id,
        }
    }

    /// REST path of the rule collection, relative to the API base
    pub fn rules_path(&self) -> String {
        match self {
            Scope::Zone(id) => format!(
                "/zones/{}/firewall/access_rules/rules",
                urlencoding::encode(id)
            ),
            Scope::Organization(id) => format!(
                "/accounts/{}/firewall/access_rules/rules",
                urlencoding::encode(id)
            ),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.collection_id())
    }
}

// ============================================================
// Listing and Zones
// ============================================================

/// One page of a paginated listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-indexed page number reported by the API
    pub page: u32,
    /// Zero for an empty collection
    pub total_pages: u32,
}

/// Zone details as far as scope resolution needs them
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ZoneDetails {
    pub id: String,
    pub name: String,
    pub owner: ZoneOwner,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ZoneOwner {
    pub id: String,
    #[serde(default, rename = "type")]
    pub owner_type: Option<String>,
}

// ============================================================
// Virtual DNS
// ============================================================

/// A virtual DNS (DNS firewall) cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualDns {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub origin_ips: Vec<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub virtual_dns_ips: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub minimum_cache_ttl: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub maximum_cache_ttl: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub deprecate_any_requests: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ecs_fallback: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ratelimit: u32,
    #[serde(default, skip_serializing)]
    pub modified_on: Option<String>,
}
