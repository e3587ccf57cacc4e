//! Cloudflare Access Rules Library
//!
//! Manages firewall access rules and virtual DNS clusters through the
//! Cloudflare v4 API. Rule reads go through a cached, paginated lookup so
//! many rules in one zone cost a single collection scan.

pub mod access_rule;
pub mod api;
pub mod cloudflare;
pub mod config;
pub mod error;
pub mod locator;
pub mod scope;
pub mod secrets;
pub mod types;
pub mod virtual_dns;

#[cfg(test)]
mod testing;

pub use access_rule::{AccessRuleResource, AccessRuleSpec, AccessRuleState, ImportId};
pub use api::{AccessRuleApi, VirtualDnsApi};
pub use cloudflare::CloudflareClient;
pub use error::{Error, Result, UpstreamError};
pub use locator::{LookupCache, RuleLocator};
pub use scope::ScopeResolver;
pub use secrets::SecretManager;
pub use types::{
    AccessRule, AccessRuleConfiguration, AccessRuleMode, AccessRuleTarget, Scope, ScopeKind,
    VirtualDns,
};
pub use virtual_dns::{VirtualDnsResource, VirtualDnsSpec};
