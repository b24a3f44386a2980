/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

//! Azure Communication Services Identity REST client.
//!
//! Requests are authenticated with the resource access key using the
//! service's HMAC-SHA256 scheme: the client hashes the body, signs
//! `METHOD\npath?query\ndate;host;content-hash` and sends the result in the
//! `Authorization` header alongside `x-ms-date` and `x-ms-content-sha256`.

use std::str::FromStr;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use kitchen_sink_types::{AccessToken, CommunicationUser, Identity, TokenScope};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

use super::{IdentityIssuer, IssuerError};

type HmacSha256 = Hmac<Sha256>;

const DATE_HEADER: &str = "x-ms-date";
const CONTENT_HASH_HEADER: &str = "x-ms-content-sha256";

/// Parsed `endpoint=...;accesskey=...` connection string.
#[derive(Clone)]
pub struct ConnectionString {
    pub endpoint: Url,
    pub access_key: Vec<u8>,
}

impl std::fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionString")
            .field("endpoint", &self.endpoint.as_str())
            .field("access_key", &"<redacted>")
            .finish()
    }
}

impl FromStr for ConnectionString {
    type Err = IssuerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut endpoint = None;
        let mut access_key = None;

        for segment in s.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = segment.split_once('=').ok_or_else(|| {
                IssuerError::Config(format!("malformed connection string segment '{segment}'"))
            })?;
            match key.trim().to_ascii_lowercase().as_str() {
                "endpoint" => endpoint = Some(value.trim().to_string()),
                "accesskey" => access_key = Some(value.trim().to_string()),
                _ => {}
            }
        }

        let endpoint = endpoint
            .ok_or_else(|| IssuerError::Config("connection string has no endpoint".to_string()))?;
        let access_key = access_key
            .ok_or_else(|| IssuerError::Config("connection string has no accesskey".to_string()))?;

        let mut endpoint = Url::parse(&endpoint)
            .map_err(|e| IssuerError::Config(format!("invalid endpoint '{endpoint}': {e}")))?;
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }
        let access_key = STANDARD
            .decode(access_key)
            .map_err(|e| IssuerError::Config(format!("accesskey is not base64: {e}")))?;

        Ok(Self {
            endpoint,
            access_key,
        })
    }
}

/// Headers produced by [`sign_request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub date: String,
    pub content_hash: String,
    pub authorization: String,
}

/// Sign a request the way the identity service expects.
///
/// `date` must be the RFC 1123 value that is also sent as `x-ms-date`.
pub fn sign_request(
    access_key: &[u8],
    method: &str,
    url: &Url,
    body: &[u8],
    date: &str,
) -> Result<SignedRequest, IssuerError> {
    let content_hash = STANDARD.encode(Sha256::digest(body));

    let mut path_and_query = url.path().to_string();
    if let Some(query) = url.query() {
        path_and_query.push('?');
        path_and_query.push_str(query);
    }

    let string_to_sign = format!(
        "{method}\n{path_and_query}\n{date};{host};{content_hash}",
        host = host_header(url)
    );

    let mut mac = HmacSha256::new_from_slice(access_key)
        .map_err(|e| IssuerError::Config(format!("unusable access key: {e}")))?;
    mac.update(string_to_sign.as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());

    Ok(SignedRequest {
        date: date.to_string(),
        content_hash,
        authorization: format!(
            "HMAC-SHA256 SignedHeaders={DATE_HEADER};host;{CONTENT_HASH_HEADER}&Signature={signature}"
        ),
    })
}

fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateIdentityRequest<'a> {
    create_token_with_scopes: &'a [TokenScope],
}

#[derive(Serialize)]
struct IssueTokenRequest<'a> {
    scopes: &'a [TokenScope],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateIdentityResponse {
    identity: CommunicationUser,
    #[serde(default)]
    access_token: Option<AccessToken>,
}

/// Client for the ACS Identity REST API.
#[derive(Debug, Clone)]
pub struct AcsIdentityClient {
    http: reqwest::Client,
    connection: ConnectionString,
    api_version: String,
}

impl AcsIdentityClient {
    pub fn new(connection: ConnectionString, api_version: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            connection,
            api_version: api_version.to_string(),
        }
    }

    fn url(&self, path: &str) -> Result<Url, IssuerError> {
        let mut url = self
            .connection
            .endpoint
            .join(path)
            .map_err(|e| IssuerError::Config(format!("cannot build request url: {e}")))?;
        url.query_pairs_mut()
            .append_pair("api-version", &self.api_version);
        Ok(url)
    }

    async fn post_signed<B, R>(&self, url: Url, body: &B) -> Result<R, IssuerError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let body = serde_json::to_vec(body)
            .map_err(|e| IssuerError::InvalidResponse(format!("cannot encode request: {e}")))?;
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let signed = sign_request(&self.connection.access_key, "POST", &url, &body, &date)?;

        let response = self
            .http
            .post(url)
            .header(DATE_HEADER, signed.date)
            .header(CONTENT_HASH_HEADER, signed.content_hash)
            .header(AUTHORIZATION, signed.authorization)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IssuerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| IssuerError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl IdentityIssuer for AcsIdentityClient {
    async fn create_user_and_token(&self, scopes: &[TokenScope]) -> Result<Identity, IssuerError> {
        let url = self.url("identities")?;
        let response: CreateIdentityResponse = self
            .post_signed(
                url,
                &CreateIdentityRequest {
                    create_token_with_scopes: scopes,
                },
            )
            .await?;

        let access_token = response.access_token.ok_or_else(|| {
            IssuerError::InvalidResponse("identity created without an access token".to_string())
        })?;

        Ok(Identity {
            access_token,
            user: response.identity,
        })
    }

    async fn issue_token(
        &self,
        user_id: &str,
        scopes: &[TokenScope],
    ) -> Result<AccessToken, IssuerError> {
        let encoded: String = url::form_urlencoded::byte_serialize(user_id.as_bytes()).collect();
        let url = self.url(&format!("identities/{encoded}/:issueAccessToken"))?;
        self.post_signed(url, &IssueTokenRequest { scopes }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_B64: &str = "c2VjcmV0LWFjY2Vzcy1rZXk=";

    #[test]
    fn parses_connection_string() {
        let cs: ConnectionString =
            format!("endpoint=https://kitchen.communication.azure.com;accesskey={KEY_B64}")
                .parse()
                .unwrap();
        assert_eq!(cs.endpoint.as_str(), "https://kitchen.communication.azure.com/");
        assert_eq!(cs.access_key, b"secret-access-key");
    }

    #[test]
    fn connection_string_keys_are_case_insensitive() {
        let cs: ConnectionString =
            format!("Endpoint=https://x.example/;AccessKey={KEY_B64};")
                .parse()
                .unwrap();
        assert_eq!(cs.endpoint.host_str(), Some("x.example"));
    }

    #[test]
    fn connection_string_requires_both_fields() {
        assert!(matches!(
            "endpoint=https://x.example/".parse::<ConnectionString>(),
            Err(IssuerError::Config(_))
        ));
        assert!(matches!(
            format!("accesskey={KEY_B64}").parse::<ConnectionString>(),
            Err(IssuerError::Config(_))
        ));
        assert!(matches!(
            "endpoint=https://x.example/;accesskey=%%%".parse::<ConnectionString>(),
            Err(IssuerError::Config(_))
        ));
    }

    #[test]
    fn debug_output_redacts_key() {
        let cs: ConnectionString = format!("endpoint=https://x.example/;accesskey={KEY_B64}")
            .parse()
            .unwrap();
        let printed = format!("{cs:?}");
        assert!(!printed.contains(KEY_B64));
        assert!(printed.contains("redacted"));
    }

    #[test]
    fn signature_is_deterministic() {
        let url = Url::parse(
            "https://kitchen.communication.azure.com/identities?api-version=2023-10-01",
        )
        .unwrap();
        let body = br#"{"createTokenWithScopes":["voip","chat"]}"#;
        let date = "Tue, 04 Mar 2025 10:00:00 GMT";

        let signed = sign_request(b"secret-access-key", "POST", &url, body, date).unwrap();

        assert_eq!(signed.date, date);
        assert_eq!(signed.content_hash, "2U5sTlHbaW0i0LgOaHm0EOaC2eI1VDCi+oiSfjwLRIs=");
        assert_eq!(
            signed.authorization,
            "HMAC-SHA256 SignedHeaders=x-ms-date;host;x-ms-content-sha256&Signature=KQBhhb6B2TfyuwQUg1G0DpdosUugSbrrNGJf4UrAouc="
        );
    }

    #[test]
    fn host_header_keeps_explicit_port() {
        let url = Url::parse("http://127.0.0.1:9911/identities").unwrap();
        assert_eq!(host_header(&url), "127.0.0.1:9911");
        let url = Url::parse("https://x.example/identities").unwrap();
        assert_eq!(host_header(&url), "x.example");
    }
}
