use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use super::pattern::UrlFilter;
use super::{HeaderMutation, HeaderOperation, InjectionRule, ResourceType, RuleEngine, RuleUpdate};
use crate::error::RuleError;

#[derive(Debug, Clone)]
struct CompiledRule {
    rule: InjectionRule,
    filter: UrlFilter,
}

/// In-process rule backend that rewrites request headers itself.
///
/// Plays the role of the browser's request-interception facility for
/// standalone hosts: anything about to send a request asks
/// [`headers_for`](Self::headers_for) or [`inject`](Self::inject) what the
/// active rules would add.
#[derive(Debug)]
pub struct HeaderInjectionEngine {
    ceiling: usize,
    rules: RwLock<BTreeMap<u32, CompiledRule>>,
}

impl HeaderInjectionEngine {
    pub fn new(ceiling: usize) -> Self {
        Self {
            ceiling,
            rules: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }

    /// Header mutations a request to `url` of `resource_type` would receive.
    ///
    /// Matching rules are taken by descending priority, then ascending id; the
    /// first rule to touch a header decides it.
    pub fn headers_for(&self, url: &str, resource_type: ResourceType) -> Vec<HeaderMutation> {
        let rules = self.rules.read();
        let mut matching: Vec<&CompiledRule> = rules
            .values()
            .filter(|c| c.rule.resource_types.contains(&resource_type) && c.filter.matches(url))
            .collect();
        matching.sort_by(|a, b| {
            b.rule
                .priority
                .cmp(&a.rule.priority)
                .then(a.rule.id.cmp(&b.rule.id))
        });

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for compiled in matching {
            for mutation in &compiled.rule.request_headers {
                if seen.insert(mutation.header.to_ascii_lowercase()) {
                    out.push(mutation.clone());
                }
            }
        }
        out
    }

    /// Applies the matching mutations to `headers` in place.
    pub fn inject(&self, url: &str, resource_type: ResourceType, headers: &mut HeaderMap) {
        for mutation in self.headers_for(url, resource_type) {
            let Ok(name) = HeaderName::from_bytes(mutation.header.as_bytes()) else {
                continue;
            };
            match (mutation.operation, mutation.value.as_deref()) {
                (HeaderOperation::Set, Some(value)) => {
                    if let Ok(value) = HeaderValue::from_str(value) {
                        headers.insert(name, value);
                    }
                }
                (HeaderOperation::Set, None) => {}
                (HeaderOperation::Remove, _) => {
                    headers.remove(name);
                }
            }
        }
    }

    fn compile(rule: InjectionRule) -> Result<CompiledRule, RuleError> {
        for mutation in &rule.request_headers {
            HeaderName::from_bytes(mutation.header.as_bytes()).map_err(|e| {
                RuleError::InvalidHeader {
                    header: mutation.header.clone(),
                    reason: e.to_string(),
                }
            })?;
            match (mutation.operation, &mutation.value) {
                (HeaderOperation::Set, Some(value)) => {
                    HeaderValue::from_str(value).map_err(|e| RuleError::InvalidHeader {
                        header: mutation.header.clone(),
                        reason: e.to_string(),
                    })?;
                }
                (HeaderOperation::Set, None) => {
                    return Err(RuleError::InvalidHeader {
                        header: mutation.header.clone(),
                        reason: "set operation without a value".to_string(),
                    });
                }
                (HeaderOperation::Remove, _) => {}
            }
        }
        let filter = UrlFilter::compile(&rule.url_filter)?;
        Ok(CompiledRule { rule, filter })
    }
}

#[async_trait]
impl RuleEngine for HeaderInjectionEngine {
    async fn apply(&self, update: RuleUpdate) -> Result<(), RuleError> {
        // Validate and compile outside the lock.
        let compiled = update
            .add_rules
            .into_iter()
            .map(Self::compile)
            .collect::<Result<Vec<_>, _>>()?;

        let mut rules = self.rules.write();
        let mut next = rules.clone();
        for id in &update.remove_rule_ids {
            next.remove(id);
        }
        for rule in compiled {
            let id = rule.rule.id;
            if next.insert(id, rule).is_some() {
                return Err(RuleError::DuplicateId(id));
            }
        }
        if next.len() > self.ceiling {
            return Err(RuleError::CeilingExceeded {
                requested: next.len(),
                ceiling: self.ceiling,
            });
        }

        debug!(
            removed = update.remove_rule_ids.len(),
            active = next.len(),
            "Applied rule update"
        );
        *rules = next;
        Ok(())
    }

    async fn rules(&self) -> Result<Vec<InjectionRule>, RuleError> {
        Ok(self.rules.read().values().map(|c| c.rule.clone()).collect())
    }

    async fn clear(&self) -> Result<(), RuleError> {
        self.rules.write().clear();
        Ok(())
    }
}
