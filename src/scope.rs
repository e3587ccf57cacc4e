//! Scope resolution
//!
//! Turns an operator's `zone` / `organization` choice into the collection
//! rules are listed under.

use std::sync::Arc;
use tracing::debug;

use crate::api::AccessRuleApi;
use crate::error::{Error, Result};
use crate::types::{Scope, ScopeKind};

pub struct ScopeResolver<A: ?Sized> {
    api: Arc<A>,
}

impl<A: AccessRuleApi + ?Sized> ScopeResolver<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    /// Resolve `kind` for the zone `zone_id`.
    ///
    /// Zone scope needs no remote call. Organization scope costs exactly one
    /// zone-details fetch per call; nothing is cached here.
    pub async fn resolve(&self, kind: ScopeKind, zone_id: &str) -> Result<Scope> {
        match kind {
            ScopeKind::Zone => Ok(Scope::Zone(zone_id.to_string())),
            ScopeKind::Organization => {
                let zone = self.api.zone_details(zone_id).await?;
                debug!(zone_id, org_id = %zone.owner.id, "Resolved owning organization");
                Ok(Scope::Organization(zone.owner.id))
            }
        }
    }

    /// Zone ID for a zone name
    pub async fn zone_id(&self, zone_name: &str) -> Result<String> {
        self.api
            .zone_id_by_name(zone_name)
            .await?
            .ok_or_else(|| Error::ZoneNotFound(zone_name.to_string()))
    }
}
