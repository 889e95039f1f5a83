//! Helm charts stored in OCI registries.
//!
//! [`RegistryClient`] implements the two registry operations the explorer
//! needs: listing the tags (chart versions) of a repository and pulling the
//! packaged chart layer of one tag. Registries that answer `401` with a
//! `Bearer` challenge are handled through the token flow, anonymously or
//! with the configured credentials.

use crate::auth::{AuthChallenge, Credentials, DockerCredentials, TokenResponse};
use crate::client::Client;
use crate::digest::Digest;
use crate::error::{ChartexError, Result};
use crate::index::{compare_versions_desc, parse_version};
use crate::reference::Reference;
use async_trait::async_trait;
use oci_spec::image::ImageManifest;
use reqwest::header::{ACCEPT, WWW_AUTHENTICATE};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use tokio::sync::Mutex;
use tracing::{debug, info};


/// Media type of the packaged chart layer.
pub const HELM_LAYER_MEDIA_TYPE: &str = "application/vnd.cncf.helm.chart.content.v1.tar+gzip";

/// Layer media type used by charts pushed with early Helm 3 releases.
const LEGACY_LAYER_MEDIA_TYPE: &str = "application/tar+gzip";

const MANIFEST_ACCEPT: &str = concat!(
    "application/vnd.oci.image.manifest.v1+json, ",
    "application/vnd.oci.image.index.v1+json, ",
    "application/vnd.docker.distribution.manifest.v2+json"
);

/// Lists the versions published under an OCI chart reference.
#[async_trait]
pub trait TagLister: Send + Sync {
    /// Returns the tags of `reference` (`registry/path/chart`, no scheme),
    /// newest version first.
    async fn list_tags(&self, reference: &str) -> Result<Vec<String>>;
}

/// Downloads packaged charts from an OCI registry.
#[async_trait]
pub trait ChartPuller: Send + Sync {
    /// Returns the `.tgz` bytes of `reference` (`registry/path/chart:version`).
    async fn pull_chart(&self, reference: &str) -> Result<Vec<u8>>;
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// OCI distribution client for Helm charts.
#[derive(Debug)]
pub struct RegistryClient {
    client: Client,
    plain_http: bool,
    credentials: Option<Credentials>,
    docker_credentials: DockerCredentials,
    /// Bearer tokens keyed by `host/repository`.
    tokens: Mutex<HashMap<String, String>>,
}

impl RegistryClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            plain_http: false,
            credentials: None,
            docker_credentials: DockerCredentials::default(),
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Talks to registries over plain HTTP instead of HTTPS.
    pub fn with_plain_http(mut self, plain_http: bool) -> Self {
        self.plain_http = plain_http;
        self
    }

    /// Uses `credentials` for every registry.
    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Uses per-registry credentials from a Docker `config.json`.
    pub fn with_docker_credentials(mut self, docker_credentials: DockerCredentials) -> Self {
        self.docker_credentials = docker_credentials;
        self
    }

    fn base_url(&self, reference: &Reference) -> String {
        let scheme = if self.plain_http { "http" } else { "https" };
        format!("{}://{}", scheme, reference.api_host())
    }

    fn credentials_for(&self, registry: &str) -> Option<Credentials> {
        self.credentials
            .clone()
            .or_else(|| self.docker_credentials.get(registry).cloned())
    }

    /// Performs a GET against the registry, answering an auth challenge once.
    async fn get(&self, reference: &Reference, url: &str, accept: Option<&str>) -> Result<Response> {
        let token_key = format!("{}/{}", reference.api_host(), reference.repository());
        let cached = self.tokens.lock().await.get(&token_key).cloned();
        let credentials = match cached {
            Some(token) => Some(Credentials::bearer(token)),
            None => self.credentials_for(reference.registry()),
        };

        let response = self.send(url, credentials.as_ref(), accept).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Client::check_response_status(response).await;
        }

        let Some(challenge) = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .and_then(|header| AuthChallenge::parse(header).ok())
        else {
            return Client::check_response_status(response).await;
        };

        let retry_credentials = if challenge.scheme.eq_ignore_ascii_case("bearer") {
            let token = self.fetch_token(reference, &challenge).await?;
            self.tokens.lock().await.insert(token_key, token.clone());
            Credentials::bearer(token)
        } else {
            match self.credentials_for(reference.registry()) {
                Some(basic) => basic,
                None => return Client::check_response_status(response).await,
            }
        };

        let response = self.send(url, Some(&retry_credentials), accept).await?;
        Client::check_response_status(response).await
    }

    async fn send(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
        accept: Option<&str>,
    ) -> Result<Response> {
        let mut request = self.client.get(url, credentials);
        if let Some(accept) = accept {
            request = request.header(ACCEPT, accept);
        }
        self.client.send(request, url).await
    }

    async fn fetch_token(&self, reference: &Reference, challenge: &AuthChallenge) -> Result<String> {
        let token_url = challenge.token_url(reference.repository());
        debug!(url = %token_url, "Requesting registry token");

        let credentials = self.credentials_for(reference.registry());
        let response = self.send(&token_url, credentials.as_ref(), None).await?;
        let response = Client::check_response_status(response).await?;

        let token: TokenResponse = response.json().await.map_err(|e| {
            ChartexError::authentication(
                format!("Failed to parse token response from {}: {}", token_url, e),
                None,
            )
        })?;

        token.into_token().ok_or_else(|| {
            ChartexError::authentication(
                format!("Token response from {} contained no token", token_url),
                None,
            )
        })
    }

    /// Fetches the chart manifest, following an image index to its first entry.
    async fn fetch_manifest(&self, reference: &Reference, target: &str) -> Result<ImageManifest> {
        let mut target = target.to_string();
        for _ in 0..2 {
            let url = format!(
                "{}/v2/{}/manifests/{}",
                self.base_url(reference),
                reference.repository(),
                target
            );
            let body = self
                .get(reference, &url, Some(MANIFEST_ACCEPT))
                .await?
                .bytes()
                .await
                .map_err(|e| {
                    ChartexError::network_with_source("Failed to read manifest response", e)
                })?;

            let value: serde_json::Value = serde_json::from_slice(&body).map_err(|e| {
                ChartexError::validation_with_source("Failed to parse OCI manifest", e)
            })?;

            if let Some(manifests) = value.get("manifests") {
                target = manifests
                    .get(0)
                    .and_then(|m| m.get("digest"))
                    .and_then(|d| d.as_str())
                    .ok_or_else(|| ChartexError::not_found("manifest", reference.to_string()))?
                    .to_string();
                continue;
            }

            return serde_json::from_value(value).map_err(|e| {
                ChartexError::validation_with_source("Failed to parse OCI image manifest", e)
            });
        }

        Err(ChartexError::validation(format!(
            "Nested image index for {}",
            reference
        )))
    }
}

#[async_trait]
impl TagLister for RegistryClient {
    async fn list_tags(&self, reference: &str) -> Result<Vec<String>> {
        let reference = Reference::from_str(reference)?;
        let base = self.base_url(&reference);
        let mut url = format!("{}/v2/{}/tags/list", base, reference.repository());
        let mut tags = Vec::new();

        loop {
            let response = self.get(&reference, &url, None).await?;
            let next_path = Client::extract_next_link(response.headers());

            let page: TagsResponse = response.json().await.map_err(|e| {
                ChartexError::validation_with_source("Failed to parse tags response", e)
            })?;
            tags.extend(page.tags.unwrap_or_default());

            match next_path {
                Some(path) if path.starts_with("http") => url = path,
                Some(path) => url = format!("{}{}", base, path),
                None => break,
            }
        }

        Ok(chart_versions(tags))
    }
}

#[async_trait]
impl ChartPuller for RegistryClient {
    async fn pull_chart(&self, reference: &str) -> Result<Vec<u8>> {
        // Registries cannot store '+' in tags, Helm pushes it as '_'
        let reference = Reference::from_str(&reference.replace('+', "_"))?;
        let target = reference
            .digest()
            .or(reference.tag())
            .unwrap_or("latest")
            .to_string();

        info!(reference = %reference, "Pulling chart from OCI registry");
        let manifest = self.fetch_manifest(&reference, &target).await?;

        let layer = manifest
            .layers()
            .iter()
            .find(|layer| {
                let media_type = layer.media_type().to_string();
                media_type == HELM_LAYER_MEDIA_TYPE || media_type == LEGACY_LAYER_MEDIA_TYPE
            })
            .ok_or_else(|| ChartexError::not_found("chart layer", reference.to_string()))?;

        let digest = Digest::from_str(&layer.digest().to_string())?;
        let url = format!(
            "{}/v2/{}/blobs/{}",
            self.base_url(&reference),
            reference.repository(),
            digest
        );

        let blob = self
            .get(&reference, &url, None)
            .await?
            .bytes()
            .await
            .map_err(|e| ChartexError::network_with_source("Failed to read chart layer", e))?;

        digest.verify(&blob)?;
        Ok(blob.to_vec())
    }
}

/// Keeps tags that are chart versions and orders them newest first.
///
/// Tags are translated back from the registry form (`1.0.0_build`) to the
/// chart version form (`1.0.0+build`).
pub fn chart_versions(tags: Vec<String>) -> Vec<String> {
    let mut versions: Vec<String> = tags
        .into_iter()
        .map(|tag| tag.replace('_', "+"))
        .filter(|tag| parse_version(tag).is_some())
        .collect();
    versions.sort_by(|a, b| compare_versions_desc(a, b));
    versions.dedup();
    versions
}
