//! In-memory Cloudflare fake for unit tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::api::{AccessRuleApi, VirtualDnsApi};
use crate::error::UpstreamError;
use crate::types::{
    AccessRule, AccessRuleConfiguration, AccessRuleMode, AccessRuleTarget, Page, Scope,
    VirtualDns, ZoneDetails, ZoneOwner,
};

pub fn rule(id: &str, mode: AccessRuleMode) -> AccessRule {
    AccessRule {
        id: id.to_string(),
        mode,
        configuration: AccessRuleConfiguration {
            target: AccessRuleTarget::Ip,
            value: "192.0.2.10".to_string(),
        },
        notes: String::new(),
    }
}

/// A listing page as the fake will report it
struct ScriptedPage {
    items: Vec<AccessRule>,
    total_pages: u32,
}

#[derive(Default)]
struct State {
    zones: HashMap<String, (String, String)>,
    collections: HashMap<Scope, Vec<ScriptedPage>>,
    failing_pages: Vec<(Scope, u32)>,
    list_calls: Vec<(Scope, u32)>,
    zone_details_calls: usize,
    mutations: Vec<String>,
    next_id: u32,
    blank_create_ids: bool,
    unlisted_writes: bool,
    stale_page_numbers: bool,
    clusters: HashMap<String, VirtualDns>,
}

/// Scripted stand-in for both API traits, recording every call
#[derive(Default)]
pub struct FakeApi {
    state: Mutex<State>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_zone(self, name: &str, zone_id: &str, org_id: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .zones
            .insert(name.to_string(), (zone_id.to_string(), org_id.to_string()));
        self
    }

    /// Rules split into pages; every page reports `pages.len()` as the total
    pub fn with_pages(self, scope: Scope, pages: Vec<Vec<AccessRule>>) -> Self {
        let total = pages.len() as u32;
        let scripted = pages
            .into_iter()
            .map(|items| ScriptedPage {
                items,
                total_pages: total,
            })
            .collect();
        self.state.lock().unwrap().collections.insert(scope, scripted);
        self
    }

    /// Pages with explicit reported totals
    pub fn with_script(self, scope: Scope, pages: Vec<(Vec<AccessRule>, u32)>) -> Self {
        let scripted = pages
            .into_iter()
            .map(|(items, total_pages)| ScriptedPage { items, total_pages })
            .collect();
        self.state.lock().unwrap().collections.insert(scope, scripted);
        self
    }

    pub fn failing_on(self, scope: Scope, page: u32) -> Self {
        self.state.lock().unwrap().failing_pages.push((scope, page));
        self
    }

    pub fn with_blank_create_ids(self) -> Self {
        self.state.lock().unwrap().blank_create_ids = true;
        self
    }

    /// Accepted writes never show up in later listings
    pub fn with_unlisted_writes(self) -> Self {
        self.drop_later_writes();
        self
    }

    pub fn drop_later_writes(&self) {
        self.state.lock().unwrap().unlisted_writes = true;
    }

    /// Every listing page reports itself as page 1
    pub fn with_stale_page_numbers(self) -> Self {
        self.state.lock().unwrap().stale_page_numbers = true;
        self
    }

    pub fn clear_failures(&self) {
        self.state.lock().unwrap().failing_pages.clear();
    }

    /// Add a rule behind the client's back, as another actor would
    pub fn insert_remote(&self, scope: &Scope, rule: AccessRule) {
        let mut state = self.state.lock().unwrap();
        push_rule(&mut state, scope, rule);
    }

    pub fn list_calls(&self) -> Vec<(Scope, u32)> {
        self.state.lock().unwrap().list_calls.clone()
    }

    pub fn list_call_count(&self) -> usize {
        self.state.lock().unwrap().list_calls.len()
    }

    pub fn zone_details_calls(&self) -> usize {
        self.state.lock().unwrap().zone_details_calls
    }

    pub fn mutations(&self) -> Vec<String> {
        self.state.lock().unwrap().mutations.clone()
    }

    pub fn cluster(&self, id: &str) -> Option<VirtualDns> {
        self.state.lock().unwrap().clusters.get(id).cloned()
    }
}

fn push_rule(state: &mut State, scope: &Scope, rule: AccessRule) {
    let pages = state.collections.entry(scope.clone()).or_default();
    match pages.last_mut() {
        Some(last) => last.items.push(rule),
        None => pages.push(ScriptedPage {
            items: vec![rule],
            total_pages: 1,
        }),
    }
}

fn not_found(what: &str) -> UpstreamError {
    UpstreamError::Api {
        status: 404,
        message: format!("{} not found", what),
    }
}

#[async_trait]
impl AccessRuleApi for FakeApi {
    async fn zone_id_by_name(&self, zone_name: &str) -> Result<Option<String>, UpstreamError> {
        let state = self.state.lock().unwrap();
        Ok(state.zones.get(zone_name).map(|(id, _)| id.clone()))
    }

    async fn zone_details(&self, zone_id: &str) -> Result<ZoneDetails, UpstreamError> {
        let mut state = self.state.lock().unwrap();
        state.zone_details_calls += 1;
        state
            .zones
            .iter()
            .find(|(_, (id, _))| id == zone_id)
            .map(|(name, (id, org))| ZoneDetails {
                id: id.clone(),
                name: name.clone(),
                owner: ZoneOwner {
                    id: org.clone(),
                    owner_type: Some("organization".to_string()),
                },
            })
            .ok_or_else(|| not_found("zone"))
    }

    async fn list_access_rules(
        &self,
        scope: &Scope,
        page: u32,
    ) -> Result<Page<AccessRule>, UpstreamError> {
        {
            let mut state = self.state.lock().unwrap();
            state.list_calls.push((scope.clone(), page));
            if state.failing_pages.contains(&(scope.clone(), page)) {
                return Err(UpstreamError::Api {
                    status: 502,
                    message: "bad gateway".to_string(),
                });
            }
        }

        // Give concurrent callers a chance to interleave.
        tokio::task::yield_now().await;

        let state = self.state.lock().unwrap();
        let reported = if state.stale_page_numbers { 1 } else { page };
        let scripted = state.collections.get(scope).and_then(|pages| {
            pages.get(page as usize - 1).map(|p| Page {
                items: p.items.clone(),
                page: reported,
                total_pages: p.total_pages,
            })
        });
        Ok(scripted.unwrap_or(Page {
            items: Vec::new(),
            page: reported,
            total_pages: 0,
        }))
    }

    async fn create_access_rule(
        &self,
        scope: &Scope,
        rule: &AccessRule,
    ) -> Result<AccessRule, UpstreamError> {
        let mut state = self.state.lock().unwrap();
        state.mutations.push(format!("create {}", scope));
        if state.blank_create_ids {
            return Ok(rule.clone());
        }
        state.next_id += 1;
        let mut created = rule.clone();
        created.id = format!("rule-{}", state.next_id);
        if !state.unlisted_writes {
            push_rule(&mut state, scope, created.clone());
        }
        Ok(created)
    }

    async fn update_access_rule(
        &self,
        scope: &Scope,
        rule_id: &str,
        rule: &AccessRule,
    ) -> Result<AccessRule, UpstreamError> {
        let mut state = self.state.lock().unwrap();
        state.mutations.push(format!("update {} {}", scope, rule_id));
        let existing = state
            .collections
            .get_mut(scope)
            .into_iter()
            .flatten()
            .flat_map(|page| page.items.iter_mut())
            .find(|r| r.id == rule_id)
            .ok_or_else(|| not_found("rule"))?;
        *existing = AccessRule {
            id: rule_id.to_string(),
            ..rule.clone()
        };
        let updated = existing.clone();
        if state.unlisted_writes {
            for page in state.collections.get_mut(scope).into_iter().flatten() {
                page.items.retain(|r| r.id != rule_id);
            }
        }
        Ok(updated)
    }

    async fn delete_access_rule(&self, scope: &Scope, rule_id: &str) -> Result<(), UpstreamError> {
        let mut state = self.state.lock().unwrap();
        state.mutations.push(format!("delete {} {}", scope, rule_id));
        let pages = state
            .collections
            .get_mut(scope)
            .ok_or_else(|| not_found("rule"))?;
        for page in pages.iter_mut() {
            page.items.retain(|r| r.id != rule_id);
        }
        Ok(())
    }
}

#[async_trait]
impl VirtualDnsApi for FakeApi {
    async fn virtual_dns(&self, _org_id: &str, cluster_id: &str) -> Result<VirtualDns, UpstreamError> {
        let state = self.state.lock().unwrap();
        state
            .clusters
            .get(cluster_id)
            .cloned()
            .ok_or_else(|| not_found("virtual DNS cluster"))
    }

    async fn create_virtual_dns(
        &self,
        org_id: &str,
        cluster: &VirtualDns,
    ) -> Result<VirtualDns, UpstreamError> {
        let mut state = self.state.lock().unwrap();
        state.mutations.push(format!("create virtual_dns {}", org_id));
        if state.blank_create_ids {
            return Ok(cluster.clone());
        }
        state.next_id += 1;
        let mut created = cluster.clone();
        created.id = format!("cluster-{}", state.next_id);
        if created.virtual_dns_ips.is_empty() {
            created.virtual_dns_ips = vec!["203.0.113.53".to_string()];
        }
        state.clusters.insert(created.id.clone(), created.clone());
        Ok(created)
    }

    async fn update_virtual_dns(
        &self,
        org_id: &str,
        cluster_id: &str,
        cluster: &VirtualDns,
    ) -> Result<(), UpstreamError> {
        let mut state = self.state.lock().unwrap();
        state
            .mutations
            .push(format!("update virtual_dns {} {}", org_id, cluster_id));
        let existing = state
            .clusters
            .get_mut(cluster_id)
            .ok_or_else(|| not_found("virtual DNS cluster"))?;
        let assigned = std::mem::take(&mut existing.virtual_dns_ips);
        *existing = VirtualDns {
            id: cluster_id.to_string(),
            ..cluster.clone()
        };
        if existing.virtual_dns_ips.is_empty() {
            existing.virtual_dns_ips = assigned;
        }
        Ok(())
    }

    async fn delete_virtual_dns(&self, org_id: &str, cluster_id: &str) -> Result<(), UpstreamError> {
        let mut state = self.state.lock().unwrap();
        state
            .mutations
            .push(format!("delete virtual_dns {} {}", org_id, cluster_id));
        state
            .clusters
            .remove(cluster_id)
            .map(|_| ())
            .ok_or_else(|| not_found("virtual DNS cluster"))
    }
}
