use std::sync::Arc;
use tracing::info;

use super::{
    AUTH_RULE_PRIORITY, AUTH1_RULE_ID, AUTH2_RULE_ID, HeaderMutation, InjectionRule,
    PLAYER_RULE_BASE, PLAYER_RULE_PRIORITY, ResourceType, RuleEngine, RuleUpdate,
};
use crate::auth::device::DeviceIdentity;
use crate::auth::handshake::{HEADER_AREA_ID, HEADER_AUTH_TOKEN, HEADER_DEVICE, HEADER_USER};
use crate::auth::manager::Credential;
use crate::config::{EndpointConfig, RuleConfig};
use crate::error::RuleError;

/// Translates credentials and device identity into rule updates.
pub struct RulePublisher {
    engine: Arc<dyn RuleEngine>,
    config: RuleConfig,
    endpoints: EndpointConfig,
}

impl RulePublisher {
    pub fn new(engine: Arc<dyn RuleEngine>, config: RuleConfig, endpoints: EndpointConfig) -> Self {
        Self {
            engine,
            config,
            endpoints,
        }
    }

    pub fn engine(&self) -> &Arc<dyn RuleEngine> {
        &self.engine
    }

    /// The rules `publish_player_rules` would install for `credential`.
    pub fn player_rules(&self, credential: &Credential) -> Vec<InjectionRule> {
        self.config
            .player_url_filters
            .iter()
            .zip(PLAYER_RULE_BASE..)
            .map(|(filter, id)| InjectionRule {
                id,
                priority: PLAYER_RULE_PRIORITY,
                url_filter: filter.clone(),
                request_headers: vec![
                    HeaderMutation::set(HEADER_AUTH_TOKEN, &credential.token),
                    HeaderMutation::set(HEADER_AREA_ID, &credential.area_id),
                ],
                resource_types: vec![
                    ResourceType::XmlHttpRequest,
                    ResourceType::Media,
                    ResourceType::Other,
                ],
            })
            .collect()
    }

    /// Replaces the whole player namespace with rules for `credential`.
    pub async fn publish_player_rules(&self, credential: &Credential) -> Result<usize, RuleError> {
        let remove_rule_ids = self
            .engine
            .rules()
            .await?
            .into_iter()
            .filter(InjectionRule::is_player_rule)
            .map(|r| r.id)
            .collect();
        let add_rules = self.player_rules(credential);
        let count = add_rules.len();

        self.engine
            .apply(RuleUpdate {
                remove_rule_ids,
                add_rules,
            })
            .await?;

        info!(count, area = %credential.area_id, "Published player rules");
        Ok(count)
    }

    /// Installs the two device-header rules on the auth endpoints.
    pub async fn publish_auth_rules(&self, device: &DeviceIdentity) -> Result<(), RuleError> {
        let headers = vec![
            HeaderMutation::set(HEADER_USER, &device.user_id),
            HeaderMutation::set(HEADER_DEVICE, &device.device),
        ];
        let auth_rule = |id: u32, url: &str| InjectionRule {
            id,
            priority: AUTH_RULE_PRIORITY,
            url_filter: url.to_string(),
            request_headers: headers.clone(),
            resource_types: vec![ResourceType::XmlHttpRequest],
        };

        self.engine
            .apply(RuleUpdate {
                remove_rule_ids: vec![AUTH1_RULE_ID, AUTH2_RULE_ID],
                add_rules: vec![
                    auth_rule(AUTH1_RULE_ID, &self.endpoints.auth1_url),
                    auth_rule(AUTH2_RULE_ID, &self.endpoints.auth2_url),
                ],
            })
            .await?;

        info!("Published auth rules");
        Ok(())
    }

    pub async fn clear_all_rules(&self) -> Result<(), RuleError> {
        self.engine.clear().await?;
        info!("Cleared all rules");
        Ok(())
    }

    pub async fn list_rules(&self) -> Result<Vec<InjectionRule>, RuleError> {
        self.engine.rules().await
    }
}
