//! The auth1/auth2 exchange.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, info};

use super::area::area_or_fallback;
use super::device::DeviceIdentity;
use super::partial_key::{DEFAULT_KEY_LENGTH, DEFAULT_KEY_OFFSET, derive_partial_key};
use crate::config::{AuthConfig, EndpointConfig};
use crate::error::{AuthError, AuthPhase};

pub const HEADER_APP: &str = "X-Radiko-App";
pub const HEADER_APP_VERSION: &str = "X-Radiko-App-Version";
pub const HEADER_USER: &str = "X-Radiko-User";
pub const HEADER_DEVICE: &str = "X-Radiko-Device";
pub const HEADER_AUTH_TOKEN: &str = "X-Radiko-AuthToken";
pub const HEADER_AREA_ID: &str = "X-Radiko-AreaId";
pub const HEADER_KEY_OFFSET: &str = "X-Radiko-KeyOffset";
pub const HEADER_KEY_LENGTH: &str = "X-Radiko-KeyLength";
pub const HEADER_PARTIAL_KEY: &str = "X-Radiko-PartialKey";
pub const HEADER_CONNECTION: &str = "X-Radiko-Connection";
pub const HEADER_LOCATION: &str = "X-Radiko-Location";

/// Result of a completed handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issued {
    pub token: String,
    /// Area confirmed by auth2, which may differ from the one requested
    pub area_id: String,
    /// Full auth2 line, e.g. `JP13,東京都,tokyo Japan`
    pub area_info: String,
}

/// Exchanges a device identity for a token bound to an area.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(
        &self,
        device: &DeviceIdentity,
        requested_area: &str,
    ) -> Result<Issued, AuthError>;
}

/// Performs both phases over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAuthenticator {
    client: Client,
    endpoints: EndpointConfig,
    config: AuthConfig,
}

impl HttpAuthenticator {
    pub fn new(client: Client, endpoints: EndpointConfig, config: AuthConfig) -> Self {
        Self {
            client,
            endpoints,
            config,
        }
    }

    fn device_headers(&self, request: RequestBuilder, device: &DeviceIdentity) -> RequestBuilder {
        request
            .header(HEADER_APP, &self.config.app_id)
            .header(HEADER_APP_VERSION, &device.app_version)
            .header(HEADER_USER, &device.user_id)
            .header(HEADER_DEVICE, &device.device)
            .header(reqwest::header::USER_AGENT, &device.user_agent)
    }

    async fn send(phase: AuthPhase, request: RequestBuilder) -> Result<Response, AuthError> {
        let response = request
            .send()
            .await
            .map_err(|source| AuthError::Network { phase, source })?;
        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Status { phase, status });
        }
        Ok(response)
    }

    async fn auth1(&self, device: &DeviceIdentity) -> Result<(String, usize, usize), AuthError> {
        let phase = AuthPhase::Auth1;
        let request = self.device_headers(self.client.get(&self.endpoints.auth1_url), device);
        let response = Self::send(phase, request).await?;

        let headers = response.headers();
        let token = header_str(headers, phase, HEADER_AUTH_TOKEN)?
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingHeader {
                phase,
                header: HEADER_AUTH_TOKEN,
            })?
            .to_string();
        let offset = header_usize(headers, HEADER_KEY_OFFSET)?.unwrap_or(DEFAULT_KEY_OFFSET);
        let length = header_usize(headers, HEADER_KEY_LENGTH)?.unwrap_or(DEFAULT_KEY_LENGTH);

        debug!(offset, length, "auth1 OK");
        Ok((token, offset, length))
    }
}

#[async_trait]
impl Authenticator for HttpAuthenticator {
    async fn authenticate(
        &self,
        device: &DeviceIdentity,
        requested_area: &str,
    ) -> Result<Issued, AuthError> {
        let (token, offset, length) = self.auth1(device).await?;

        let (offset, length) = self.config.partial_key_override.unwrap_or((offset, length));
        let partial_key = derive_partial_key(&self.config.app_key, offset, length)?;

        let area = area_or_fallback(requested_area);
        let phase = AuthPhase::Auth2;
        let request = self
            .device_headers(self.client.get(&self.endpoints.auth2_url), device)
            .header(HEADER_AUTH_TOKEN, &token)
            .header(HEADER_PARTIAL_KEY, partial_key)
            .header(HEADER_CONNECTION, &self.config.connection)
            .header(HEADER_LOCATION, area.location_header());
        let body = Self::send(phase, request)
            .await?
            .text()
            .await
            .map_err(|source| AuthError::Network { phase, source })?;

        let (area_id, area_info) = parse_area_line(&body)?;
        info!(requested = %area.id, confirmed = %area_id, "auth2 OK");

        Ok(Issued {
            token,
            area_id,
            area_info,
        })
    }
}

/// Splits an auth2 body into the confirmed area code and the trimmed line.
pub fn parse_area_line(body: &str) -> Result<(String, String), AuthError> {
    let info = body.trim();
    let area_id = info.split(',').next().unwrap_or_default().trim();
    if area_id.is_empty() {
        return Err(AuthError::EmptyArea);
    }
    Ok((area_id.to_string(), info.to_string()))
}

fn header_str<'a>(
    headers: &'a reqwest::header::HeaderMap,
    phase: AuthPhase,
    name: &'static str,
) -> Result<Option<&'a str>, AuthError> {
    headers
        .get(name)
        .map(|value| {
            value.to_str().map_err(|_| AuthError::MalformedHeader {
                phase,
                header: name,
                value: String::from_utf8_lossy(value.as_bytes()).into_owned(),
            })
        })
        .transpose()
}

fn header_usize(
    headers: &reqwest::header::HeaderMap,
    name: &'static str,
) -> Result<Option<usize>, AuthError> {
    let phase = AuthPhase::Auth1;
    match header_str(headers, phase, name)? {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| AuthError::MalformedHeader {
                phase,
                header: name,
                value: raw.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    #[test]
    fn test_parse_area_line() {
        let (id, info) = parse_area_line("JP13,東京都,tokyo Japan\r\n").unwrap();
        assert_eq!(id, "JP13");
        assert_eq!(info, "JP13,東京都,tokyo Japan");

        let (id, _) = parse_area_line("JP27").unwrap();
        assert_eq!(id, "JP27");
    }

    #[test]
    fn test_parse_area_line_empty() {
        assert!(matches!(parse_area_line("  \r\n"), Err(AuthError::EmptyArea)));
        assert!(matches!(parse_area_line(",東京都"), Err(AuthError::EmptyArea)));
    }

    #[test]
    fn test_header_usize() {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_KEY_OFFSET, HeaderValue::from_static(" 12 "));
        headers.insert(HEADER_KEY_LENGTH, HeaderValue::from_static("sixteen"));

        assert_eq!(header_usize(&headers, HEADER_KEY_OFFSET).unwrap(), Some(12));
        assert!(matches!(
            header_usize(&headers, HEADER_KEY_LENGTH),
            Err(AuthError::MalformedHeader { header: HEADER_KEY_LENGTH, .. })
        ));
        assert_eq!(header_usize(&HeaderMap::new(), HEADER_KEY_OFFSET).unwrap(), None);
    }
}
