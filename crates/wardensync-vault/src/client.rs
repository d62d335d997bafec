//! Vault REST client
//!
//! Handles the client-credentials token exchange and the organization
//! membership endpoints. No retries happen here; a failed call surfaces
//! immediately and the run loop decides what to do.

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;
use wardensync_core::{
    ManagedOrganization, MemberId, OrgMember, VaultConnector, VaultCredentials, VaultProvider,
};

use crate::error::{VaultError, VaultResult};
use crate::models::{InviteRequest, ListResponse, MemberDto, ProfileDto, TokenResponse};
use crate::{DEVICE_NAME, DEVICE_TYPE, TOKEN_REFRESH_MARGIN_SECS};

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Session against one vault server with one personal API key
pub struct VaultClient {
    http: Client,
    base: Url,
    credentials: VaultCredentials,
    device_id: Uuid,
    token: RwLock<Option<CachedToken>>,
}

impl VaultClient {
    pub fn new(credentials: VaultCredentials) -> VaultResult<Self> {
        let base = base_url(&credentials.url)?;

        let mut builder = ClientBuilder::new()
            .timeout(credentials.timeout)
            .connect_timeout(credentials.timeout)
            .user_agent(concat!("wardensync/", env!("CARGO_PKG_VERSION")));

        if !credentials.tls_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder
            .build()
            .map_err(|e| VaultError::Client(e.to_string()))?;

        // Stable per API key so the server sees one device, not one per cycle
        let device_id = Uuid::new_v5(&Uuid::NAMESPACE_OID, credentials.client_id.as_bytes());

        Ok(Self {
            http,
            base,
            credentials,
            device_id,
            token: RwLock::new(None),
        })
    }

    pub fn credentials(&self) -> &VaultCredentials {
        &self.credentials
    }

    fn endpoint(&self, path: &str) -> VaultResult<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| VaultError::InvalidUrl(format!("{}: {}", path, e)))
    }

    /// Bearer token, fetched or refreshed as needed
    pub async fn token(&self) -> VaultResult<String> {
        if let Some(cached) = self.token.read().await.as_ref() {
            if Instant::now() < cached.refresh_at {
                return Ok(cached.value.clone());
            }
        }

        let mut slot = self.token.write().await;
        if let Some(cached) = slot.as_ref() {
            if Instant::now() < cached.refresh_at {
                return Ok(cached.value.clone());
            }
        }

        let fresh = self.request_token().await?;
        let lifetime = fresh.expires_in.saturating_sub(TOKEN_REFRESH_MARGIN_SECS);
        let value = fresh.access_token;
        *slot = Some(CachedToken {
            value: value.clone(),
            refresh_at: Instant::now() + Duration::from_secs(lifetime),
        });
        Ok(value)
    }

    async fn request_token(&self) -> VaultResult<TokenResponse> {
        let url = self.endpoint("identity/connect/token")?;
        let device_id = self.device_id.to_string();
        let form = [
            ("grant_type", "client_credentials"),
            ("scope", "api"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("device_identifier", device_id.as_str()),
            ("device_name", DEVICE_NAME),
            ("device_type", DEVICE_TYPE),
        ];

        debug!(url = %url, "Requesting access token");

        let response = self.http.post(url).form(&form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VaultError::Auth {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<TokenResponse>().await?)
    }

    async fn authorized(&self, method: Method, path: &str) -> VaultResult<RequestBuilder> {
        let url = self.endpoint(path)?;
        let token = self.token().await?;
        Ok(self.http.request(method, url).bearer_auth(token))
    }

    async fn execute(&self, request: RequestBuilder) -> VaultResult<reqwest::Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            // Force a fresh token on the next call
            self.token.write().await.take();
        }
        let body = response.text().await.unwrap_or_default();
        Err(VaultError::Api {
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> VaultResult<T> {
        let request = self.authorized(Method::GET, path).await?;
        Ok(self.execute(request).await?.json::<T>().await?)
    }

    pub async fn fetch_members(&self, org_id: &str) -> VaultResult<Vec<OrgMember>> {
        let list: ListResponse<MemberDto> = self
            .get_json(&format!("api/organizations/{}/users", org_id))
            .await?;
        let members: Vec<OrgMember> = list
            .data
            .into_iter()
            .filter_map(MemberDto::into_member)
            .collect();
        debug!(org_id = %org_id, members = members.len(), "Fetched organization members");
        Ok(members)
    }

    pub async fn invite_member(&self, org_id: &str, email: &str) -> VaultResult<()> {
        let request = self
            .authorized(Method::POST, &format!("api/organizations/{}/users/invite", org_id))
            .await?
            .json(&InviteRequest::user(email));
        self.execute(request).await?;
        info!(org_id = %org_id, email = %email, "Invited member");
        Ok(())
    }

    async fn put_member(&self, org_id: &str, member_id: &MemberId, verb: &str) -> VaultResult<()> {
        let path = format!("api/organizations/{}/users/{}/{}", org_id, member_id, verb);
        let request = self.authorized(Method::PUT, &path).await?;
        self.execute(request).await?;
        Ok(())
    }

    pub async fn revoke_member(&self, org_id: &str, member_id: &MemberId) -> VaultResult<()> {
        self.put_member(org_id, member_id, "revoke").await?;
        info!(org_id = %org_id, member_id = %member_id, "Revoked member");
        Ok(())
    }

    pub async fn restore_member(&self, org_id: &str, member_id: &MemberId) -> VaultResult<()> {
        self.put_member(org_id, member_id, "restore").await?;
        info!(org_id = %org_id, member_id = %member_id, "Restored member");
        Ok(())
    }

    pub async fn fetch_organizations(&self) -> VaultResult<Vec<ManagedOrganization>> {
        let profile: ProfileDto = self.get_json("api/accounts/profile").await?;
        Ok(profile.organizations.into_iter().map(Into::into).collect())
    }
}

impl fmt::Debug for VaultClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultClient")
            .field("base", &self.base.as_str())
            .field("credentials", &self.credentials)
            .finish()
    }
}

/// Base URL with a trailing slash so relative joins keep any path prefix
fn base_url(raw: &str) -> VaultResult<Url> {
    let raw = raw.trim();
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    let url = Url::parse(&with_slash).map_err(|e| VaultError::InvalidUrl(format!("{}: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(VaultError::InvalidUrl(format!(
            "unsupported scheme '{}' in {}",
            other, raw
        ))),
    }
}

#[async_trait]
impl VaultProvider for VaultClient {
    async fn list_members(&self, org_id: &str) -> wardensync_core::Result<Vec<OrgMember>> {
        Ok(self.fetch_members(org_id).await?)
    }

    async fn invite(&self, org_id: &str, email: &str) -> wardensync_core::Result<()> {
        Ok(self.invite_member(org_id, email).await?)
    }

    async fn revoke(&self, org_id: &str, member_id: &MemberId) -> wardensync_core::Result<()> {
        Ok(self.revoke_member(org_id, member_id).await?)
    }

    async fn restore(&self, org_id: &str, member_id: &MemberId) -> wardensync_core::Result<()> {
        Ok(self.restore_member(org_id, member_id).await?)
    }

    async fn list_organizations(&self) -> wardensync_core::Result<Vec<ManagedOrganization>> {
        Ok(self.fetch_organizations().await?)
    }
}

/// Opens authenticated [`VaultClient`] sessions
#[derive(Debug, Clone, Default)]
pub struct HttpVaultConnector;

impl HttpVaultConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl VaultConnector for HttpVaultConnector {
    async fn connect(
        &self,
        credentials: &VaultCredentials,
    ) -> wardensync_core::Result<Arc<dyn VaultProvider>> {
        let client = VaultClient::new(credentials.clone())?;
        // Authenticate up front so bad credentials fail before any work starts
        client.token().await?;
        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wardensync_core::MemberStatus;
    use wiremock::matchers::{body_json, body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ACCOUNT: &str = "8b0d6a1e-3c2f-4f7a-9d55-0e4b7c1a2f90";

    fn credentials(url: &str) -> VaultCredentials {
        VaultCredentials {
            url: url.to_string(),
            client_id: format!("user.{}", ACCOUNT),
            client_secret: "s3cr3t-value".to_string(),
            tls_verify: true,
            timeout: Duration::from_secs(5),
        }
    }

    async fn mount_token(server: &MockServer, expires_in: u64, times: u64) {
        Mock::given(method("POST"))
            .and(path("/identity/connect/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("scope=api"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "tok",
                "expires_in": expires_in,
                "token_type": "Bearer"
            })))
            .expect(times)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_token_is_cached() {
        let server = MockServer::start().await;
        mount_token(&server, 3600, 1).await;

        let client = VaultClient::new(credentials(&server.uri())).unwrap();
        assert_eq!(client.token().await.unwrap(), "tok");
        assert_eq!(client.token().await.unwrap(), "tok");
    }

    #[tokio::test]
    async fn test_short_lived_token_is_refreshed() {
        let server = MockServer::start().await;
        // Lifetime below the refresh margin: every call needs a new token
        mount_token(&server, 10, 2).await;

        let client = VaultClient::new(credentials(&server.uri())).unwrap();
        client.token().await.unwrap();
        client.token().await.unwrap();
    }

    #[tokio::test]
    async fn test_list_members() {
        let server = MockServer::start().await;
        mount_token(&server, 3600, 1).await;
        Mock::given(method("GET"))
            .and(path("/api/organizations/org-1/users"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    { "id": "m1", "userId": ACCOUNT, "email": "Sync@Example.com", "status": 2 },
                    { "id": "m2", "userId": null, "email": "new@example.com", "status": 0 },
                    { "id": "m3", "email": "gone@example.com", "status": -1 }
                ],
                "object": "list"
            })))
            .mount(&server)
            .await;

        let client = VaultClient::new(credentials(&server.uri())).unwrap();
        let members = client.list_members("org-1").await.unwrap();

        assert_eq!(members.len(), 3);
        assert_eq!(members[0].account_id, Some(Uuid::parse_str(ACCOUNT).unwrap()));
        assert_eq!(members[1].status, MemberStatus::Invited);
        assert!(members[2].is_revoked());

        let own = client
            .resolve_own_email("org-1", Uuid::parse_str(ACCOUNT).unwrap())
            .await
            .unwrap();
        assert_eq!(own.as_deref(), Some("Sync@Example.com"));
    }

    #[tokio::test]
    async fn test_invite_sends_user_role() {
        let server = MockServer::start().await;
        mount_token(&server, 3600, 1).await;
        Mock::given(method("POST"))
            .and(path("/api/organizations/org-1/users/invite"))
            .and(body_json(json!({
                "emails": ["new@example.com"],
                "type": 2,
                "accessAll": false,
                "collections": [],
                "groups": [],
                "permissions": {}
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = VaultClient::new(credentials(&server.uri())).unwrap();
        client.invite("org-1", "new@example.com").await.unwrap();
    }

    #[tokio::test]
    async fn test_revoke_and_restore_paths() {
        let server = MockServer::start().await;
        mount_token(&server, 3600, 1).await;
        Mock::given(method("PUT"))
            .and(path("/api/organizations/org-1/users/m1/revoke"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/organizations/org-1/users/m2/restore"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = VaultClient::new(credentials(&server.uri())).unwrap();
        client.revoke("org-1", &MemberId::new("m1")).await.unwrap();
        client.restore("org-1", &MemberId::new("m2")).await.unwrap();
    }

    #[tokio::test]
    async fn test_api_error_carries_status_and_body() {
        let server = MockServer::start().await;
        mount_token(&server, 3600, 1).await;
        Mock::given(method("PUT"))
            .and(path("/api/organizations/org-1/users/m1/revoke"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Cannot revoke owner"))
            .mount(&server)
            .await;

        let client = VaultClient::new(credentials(&server.uri())).unwrap();
        let err = client.revoke("org-1", &MemberId::new("m1")).await.unwrap_err();
        assert_eq!(err.kind(), "api");
        assert_eq!(err.to_string(), "API error [HTTP 400]: Cannot revoke owner");
    }

    #[tokio::test]
    async fn test_rejected_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/identity/connect/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_client"))
            .mount(&server)
            .await;

        let err = HttpVaultConnector::new()
            .connect(&credentials(&server.uri()))
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), "api");
        assert!(err.to_string().contains("invalid_client"));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_connectivity_error() {
        let err = HttpVaultConnector::new()
            .connect(&credentials("http://127.0.0.1:1"))
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), "connectivity");
    }

    #[tokio::test]
    async fn test_manageable_organizations_from_profile() {
        let server = MockServer::start().await;
        mount_token(&server, 3600, 1).await;
        Mock::given(method("GET"))
            .and(path("/api/accounts/profile"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "email": "sync@example.com",
                "organizations": [
                    { "id": "o1", "name": "Ops", "status": 2, "type": 0, "enabled": true },
                    { "id": "o2", "name": "Invited", "status": 0, "type": 2, "enabled": true },
                    { "id": "o3", "name": "Disabled", "status": 2, "type": 1, "enabled": false }
                ]
            })))
            .mount(&server)
            .await;

        let client = VaultClient::new(credentials(&server.uri())).unwrap();
        let orgs = client.list_manageable_organizations().await.unwrap();
        assert_eq!(orgs.len(), 1);
        assert_eq!(orgs[0].id, "o1");
        assert_eq!(client.list_organizations().await.unwrap().len(), 3);
    }

    #[test]
    fn test_base_url_keeps_path_prefix() {
        let base = base_url("https://example.com/vault").unwrap();
        assert_eq!(
            base.join("api/accounts/profile").unwrap().as_str(),
            "https://example.com/vault/api/accounts/profile"
        );
        assert!(base_url("ftp://example.com").is_err());
        assert!(base_url("not a url").is_err());
    }

    #[test]
    fn test_device_id_is_stable() {
        let a = VaultClient::new(credentials("http://localhost:8080")).unwrap();
        let b = VaultClient::new(credentials("http://localhost:8080")).unwrap();
        assert_eq!(a.device_id, b.device_id);
        assert!(!format!("{:?}", a).contains("s3cr3t-value"));
    }
}
