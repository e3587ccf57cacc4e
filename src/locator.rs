//! Access rule lookup by ID
//!
//! The listing endpoint cannot filter by rule ID, so finding one rule means
//! walking the whole collection. [`LookupCache`] keeps the result of each
//! walk so later lookups against the same collection cost nothing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::api::AccessRuleApi;
use crate::error::{Error, Result};
use crate::types::{AccessRule, Scope};

pub const DEFAULT_MAX_PAGES: u32 = 1000;

/// Every rule of one collection, in listing order
#[derive(Debug, Default, Clone)]
pub struct RuleIndex {
    rules: HashMap<String, AccessRule>,
    order: Vec<String>,
}

impl RuleIndex {
    /// Merge one page; a repeated ID replaces the earlier record
    fn extend(&mut self, rules: Vec<AccessRule>) {
        for rule in rules {
            let id = rule.id.clone();
            if self.rules.insert(id.clone(), rule).is_none() {
                self.order.push(id);
            }
        }
    }

    pub fn get(&self, rule_id: &str) -> Option<&AccessRule> {
        self.rules.get(rule_id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AccessRule> {
        self.order.iter().filter_map(|id| self.rules.get(id))
    }
}

type Slot = Arc<OnceCell<RuleIndex>>;

/// Complete scan results per collection.
///
/// A populated entry is authoritative until [`LookupCache::invalidate`]
/// drops it. Each collection has its own slot: concurrent cold lookups of
/// one collection share a single scan, other collections are not blocked.
#[derive(Debug, Default)]
pub struct LookupCache {
    slots: Mutex<HashMap<Scope, Slot>>,
}

impl LookupCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, scope: &Scope) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(scope.clone()).or_default().clone()
    }

    /// Whether a completed scan is held for `scope`
    pub fn is_populated(&self, scope: &Scope) -> bool {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(scope).is_some_and(|slot| slot.initialized())
    }

    /// Forget the scan for `scope`. Returns whether anything was held.
    pub fn invalidate(&self, scope: &Scope) -> bool {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .remove(scope)
            .is_some_and(|slot| slot.initialized())
    }

    pub fn clear(&self) {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Finds access rules by ID through a [`LookupCache`]
pub struct RuleLocator<A: ?Sized> {
    api: Arc<A>,
    cache: Arc<LookupCache>,
    max_pages: u32,
}

impl<A: AccessRuleApi + ?Sized> RuleLocator<A> {
    pub fn new(api: Arc<A>, cache: Arc<LookupCache>) -> Self {
        Self {
            api,
            cache,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn cache(&self) -> &LookupCache {
        &self.cache
    }

    /// Find `rule_id` in `scope`, scanning the collection on a cache miss
    pub async fn find(&self, scope: &Scope, rule_id: &str) -> Result<AccessRule> {
        let slot = self.cache.slot(scope);
        let index = self.populate(&slot, scope).await?;

        index
            .get(rule_id)
            .cloned()
            .ok_or_else(|| Error::RuleNotFound {
                scope: scope.kind(),
                rule_id: rule_id.to_string(),
            })
    }

    /// All rules of `scope`, in listing order
    pub async fn list(&self, scope: &Scope) -> Result<Vec<AccessRule>> {
        let slot = self.cache.slot(scope);
        let index = self.populate(&slot, scope).await?;
        Ok(index.iter().cloned().collect())
    }

    /// Drop the cached scan of `scope` after a mutation
    pub fn invalidate(&self, scope: &Scope) {
        if self.cache.invalidate(scope) {
            debug!(%scope, "Invalidated cached access rules");
        }
    }

    async fn populate<'a>(&self, slot: &'a Slot, scope: &Scope) -> Result<&'a RuleIndex> {
        if let Some(index) = slot.get() {
            debug!(%scope, rules = index.len(), "Access rule cache hit");
            return Ok(index);
        }
        slot.get_or_try_init(|| self.scan(scope)).await
    }

    /// Walk every page of `scope`. Nothing is kept if any page fails.
    async fn scan(&self, scope: &Scope) -> Result<RuleIndex> {
        debug!(%scope, "Scanning access rules");

        let mut index = RuleIndex::default();
        let mut page = 1;
        loop {
            if page > self.max_pages {
                return Err(Error::Pagination {
                    scope: scope.kind(),
                    collection_id: scope.collection_id().to_string(),
                    max_pages: self.max_pages,
                });
            }

            let listing = self.api.list_access_rules(scope, page).await?;
            if listing.page != page {
                return Err(Error::PageMismatch {
                    scope: scope.kind(),
                    collection_id: scope.collection_id().to_string(),
                    requested: page,
                    reported: listing.page,
                });
            }
            index.extend(listing.items);

            // Zero means an empty collection; a total below the current page
            // means the collection shrank mid-scan.
            if listing.total_pages <= page {
                break;
            }
            page += 1;
        }

        debug!(%scope, pages = page, rules = index.len(), "Scanned access rules");
        Ok(index)
    }
}
