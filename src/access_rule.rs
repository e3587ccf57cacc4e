//! Firewall access rule lifecycle
//!
//! Create, read, update, delete and import for access rules scoped to a
//! zone or to the organization owning it.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::AccessRuleApi;
use crate::error::{Error, Result};
use crate::locator::{LookupCache, RuleLocator};
use crate::scope::ScopeResolver;
use crate::types::{
    AccessRule, AccessRuleConfiguration, AccessRuleMode, AccessRuleTarget, Scope, ScopeKind,
};

pub const MAX_NOTES_LEN: usize = 1024;

/// Desired state of an access rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRuleSpec {
    /// Zone name, e.g. `example.com`
    pub zone: String,
    pub scope: ScopeKind,
    pub mode: AccessRuleMode,
    pub configuration: AccessRuleConfiguration,
    #[serde(default)]
    pub notes: String,
}

impl AccessRuleSpec {
    pub fn validate(&self) -> Result<()> {
        if self.zone.trim().is_empty() {
            return Err(Error::validation("zone", "must not be empty"));
        }
        let notes_len = self.notes.chars().count();
        if notes_len > MAX_NOTES_LEN {
            return Err(Error::validation(
                "notes",
                format!("{} characters exceeds the limit of {}", notes_len, MAX_NOTES_LEN),
            ));
        }
        validate_value(&self.configuration)
    }

    fn to_rule(&self) -> AccessRule {
        AccessRule {
            id: String::new(),
            mode: self.mode,
            configuration: self.configuration.clone(),
            notes: self.notes.clone(),
        }
    }
}

/// Check that `value` has the format its target kind requires
pub fn validate_value(configuration: &AccessRuleConfiguration) -> Result<()> {
    let value = configuration.value.as_str();
    let valid = match configuration.target {
        AccessRuleTarget::Ip => value.parse::<IpAddr>().is_ok(),
        AccessRuleTarget::IpRange => is_cidr(value),
        AccessRuleTarget::Asn => value
            .strip_prefix("AS")
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit())),
        AccessRuleTarget::Country => {
            value.len() == 2
                && value
                    .bytes()
                    .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        }
    };

    if valid {
        Ok(())
    } else {
        Err(Error::validation(
            "value",
            format!("{:?} is not a valid {} value", value, configuration.target),
        ))
    }
}

fn is_cidr(value: &str) -> bool {
    let Some((addr, prefix)) = value.split_once('/') else {
        return false;
    };
    let Ok(addr) = addr.parse::<IpAddr>() else {
        return false;
    };
    let Ok(prefix) = prefix.parse::<u8>() else {
        return false;
    };
    match addr {
        IpAddr::V4(_) => prefix <= 32,
        IpAddr::V6(_) => prefix <= 128,
    }
}

/// Recorded state of a managed access rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRuleState {
    pub id: String,
    pub zone: String,
    pub zone_id: String,
    pub scope: Scope,
    pub mode: AccessRuleMode,
    pub configuration: AccessRuleConfiguration,
    pub notes: String,
}

impl AccessRuleState {
    fn refreshed(&self, rule: AccessRule) -> Self {
        Self {
            id: self.id.clone(),
            zone: self.zone.clone(),
            zone_id: self.zone_id.clone(),
            scope: self.scope.clone(),
            mode: rule.mode,
            configuration: rule.configuration,
            notes: rule.notes,
        }
    }
}

/// Parsed `scope/zoneName/ruleID` import string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportId {
    pub scope: ScopeKind,
    pub zone: String,
    pub rule_id: String,
}

impl ImportId {
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = || Error::InvalidImportId(raw.to_string());

        let mut parts = raw.splitn(3, '/');
        let (Some(scope), Some(zone), Some(rule_id)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        if zone.is_empty() || rule_id.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            scope: scope.parse().map_err(|_| invalid())?,
            zone: zone.to_string(),
            rule_id: rule_id.to_string(),
        })
    }
}

/// Access rule lifecycle over a shared [`LookupCache`]
pub struct AccessRuleResource<A: ?Sized> {
    api: Arc<A>,
    resolver: ScopeResolver<A>,
    locator: RuleLocator<A>,
}

impl<A: AccessRuleApi + ?Sized> AccessRuleResource<A> {
    pub fn new(api: Arc<A>, cache: Arc<LookupCache>) -> Self {
        Self {
            resolver: ScopeResolver::new(api.clone()),
            locator: RuleLocator::new(api.clone(), cache),
            api,
        }
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.locator = self.locator.with_max_pages(max_pages);
        self
    }

    pub fn locator(&self) -> &RuleLocator<A> {
        &self.locator
    }

    pub async fn create(&self, spec: &AccessRuleSpec) -> Result<AccessRuleState> {
        spec.validate()?;

        let zone_id = self.resolver.zone_id(&spec.zone).await?;
        let scope = self.resolver.resolve(spec.scope, &zone_id).await?;

        let created = self.api.create_access_rule(&scope, &spec.to_rule()).await?;
        if created.id.is_empty() {
            return Err(Error::MissingId("access rule"));
        }
        self.locator.invalidate(&scope);
        info!(rule_id = %created.id, %scope, mode = %spec.mode, "Created access rule");

        let state = AccessRuleState {
            id: created.id,
            zone: spec.zone.clone(),
            zone_id,
            scope,
            mode: spec.mode,
            configuration: spec.configuration.clone(),
            notes: spec.notes.clone(),
        };
        self.read_existing(&state).await
    }

    /// Refresh `state` from Cloudflare. `None` means the rule was deleted
    /// out of band and the caller should drop its state.
    pub async fn read(&self, state: &AccessRuleState) -> Result<Option<AccessRuleState>> {
        match self.locator.find(&state.scope, &state.id).await {
            Ok(rule) => Ok(Some(state.refreshed(rule))),
            Err(e) if e.is_not_found() => {
                warn!(rule_id = %state.id, scope = %state.scope, "Access rule no longer exists");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Read where the rule must exist, such as right after a write
    async fn read_existing(&self, state: &AccessRuleState) -> Result<AccessRuleState> {
        let rule = self.locator.find(&state.scope, &state.id).await?;
        Ok(state.refreshed(rule))
    }

    /// Apply mode, configuration and notes. Zone and scope force replacement.
    pub async fn update(
        &self,
        state: &AccessRuleState,
        spec: &AccessRuleSpec,
    ) -> Result<AccessRuleState> {
        spec.validate()?;
        if spec.zone != state.zone {
            return Err(Error::ForceNew("zone"));
        }
        if spec.scope != state.scope.kind() {
            return Err(Error::ForceNew("scope"));
        }

        let mut rule = spec.to_rule();
        rule.id = state.id.clone();
        self.api
            .update_access_rule(&state.scope, &state.id, &rule)
            .await?;
        self.locator.invalidate(&state.scope);
        info!(rule_id = %state.id, scope = %state.scope, mode = %spec.mode, "Updated access rule");

        self.read_existing(state).await
    }

    pub async fn delete(&self, state: &AccessRuleState) -> Result<()> {
        self.api
            .delete_access_rule(&state.scope, &state.id)
            .await?;
        self.locator.invalidate(&state.scope);
        info!(rule_id = %state.id, scope = %state.scope, "Deleted access rule");
        Ok(())
    }

    /// Adopt an existing rule from a `scope/zoneName/ruleID` string
    pub async fn import(&self, raw: &str) -> Result<AccessRuleState> {
        let import = ImportId::parse(raw)?;

        let zone_id = self.resolver.zone_id(&import.zone).await?;
        let scope = self.resolver.resolve(import.scope, &zone_id).await?;
        let rule = self.locator.find(&scope, &import.rule_id).await?;

        Ok(AccessRuleState {
            id: import.rule_id,
            zone: import.zone,
            zone_id,
            scope,
            mode: rule.mode,
            configuration: rule.configuration,
            notes: rule.notes,
        })
    }

    /// Every rule visible in the given zone or its organization
    pub async fn list(&self, zone: &str, kind: ScopeKind) -> Result<(Scope, Vec<AccessRule>)> {
        let zone_id = self.resolver.zone_id(zone).await?;
        let scope = self.resolver.resolve(kind, &zone_id).await?;
        let rules = self.locator.list(&scope).await?;
        Ok((scope, rules))
    }
}
