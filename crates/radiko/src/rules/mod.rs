//! Declarative header-injection rules.
//!
//! The credential has to reach requests the engine does not issue itself,
//! such as those of an embedded player. Rules describe which headers to set on
//! which URLs; a [`RuleEngine`] backend makes them effective.

pub mod engine;
pub mod pattern;
pub mod publisher;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RuleError;

pub use engine::HeaderInjectionEngine;
pub use pattern::UrlFilter;
pub use publisher::RulePublisher;

/// Rule id of the auth1 device-header rule.
pub const AUTH1_RULE_ID: u32 = 1;
/// Rule id of the auth2 device-header rule.
pub const AUTH2_RULE_ID: u32 = 2;
/// First id of the player rule namespace. Every id at or above it belongs to it.
pub const PLAYER_RULE_BASE: u32 = 100;

pub const PLAYER_RULE_PRIORITY: u32 = 1;
pub const AUTH_RULE_PRIORITY: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    /// API calls issued by script
    XmlHttpRequest,
    Media,
    Other,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::XmlHttpRequest => "xmlhttprequest",
            ResourceType::Media => "media",
            ResourceType::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderOperation {
    Set,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderMutation {
    pub header: String,
    pub operation: HeaderOperation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl HeaderMutation {
    pub fn set(header: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            operation: HeaderOperation::Set,
            value: Some(value.into()),
        }
    }

    pub fn remove(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            operation: HeaderOperation::Remove,
            value: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectionRule {
    pub id: u32,
    pub priority: u32,
    pub url_filter: String,
    pub request_headers: Vec<HeaderMutation>,
    pub resource_types: Vec<ResourceType>,
}

impl InjectionRule {
    pub fn is_player_rule(&self) -> bool {
        self.id >= PLAYER_RULE_BASE
    }
}

/// Removals are applied before additions, in one step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleUpdate {
    pub remove_rule_ids: Vec<u32>,
    pub add_rules: Vec<InjectionRule>,
}

/// Host facility that owns the active rule set.
#[async_trait]
pub trait RuleEngine: Send + Sync {
    /// Applies the whole update or, on error, nothing.
    async fn apply(&self, update: RuleUpdate) -> Result<(), RuleError>;

    /// Active rules ordered by id.
    async fn rules(&self) -> Result<Vec<InjectionRule>, RuleError>;

    async fn clear(&self) -> Result<(), RuleError>;
}
