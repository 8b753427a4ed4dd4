use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, LINK};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::debug;

use crate::config::{Credentials, RegistryConfig};
use crate::error::{PruneError, RegistryError};
use crate::models::{Catalog, Digest, Image, TagList};

const MANIFEST_MEDIA_TYPES: &str = "application/vnd.docker.distribution.manifest.v2+json, \
     application/vnd.docker.distribution.manifest.list.v2+json, \
     application/vnd.oci.image.manifest.v1+json, \
     application/vnd.oci.image.index.v1+json";

const DIGEST_HEADER: &str = "Docker-Content-Digest";

/// The registry operations the pruner relies on.
#[async_trait]
pub trait Registry: Send + Sync {
    async fn list_repositories(&self) -> Result<Vec<String>, RegistryError>;

    async fn list_tags(&self, repo: &str) -> Result<Vec<String>, RegistryError>;

    /// Raw digest string of the manifest `tag` points at.
    async fn resolve_digest(&self, repo: &str, tag: &str) -> Result<String, RegistryError>;

    /// Every manifest in `repo`, tagged or not.
    async fn list_images(&self, repo: &str) -> Result<Vec<Image>, RegistryError>;

    async fn delete_tag_reference(&self, repo: &str, tag: &str) -> Result<(), RegistryError>;

    async fn delete_manifest(&self, repo: &str, digest: &Digest) -> Result<(), RegistryError>;
}

#[derive(Debug)]
pub struct RegistryClient {
    client: Client,
    base_url: String,
    credentials: Option<Credentials>,
}

impl RegistryClient {
    pub fn new(config: &RegistryConfig) -> Self {
        let base_url = config.url.trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
            credentials: config.credentials.clone(),
        }
    }

    /// Create a client and make sure the registry answers on GET /v2/
    ///
    /// Anonymous clients may get a 401 here; that is left for the first real
    /// request to report. With credentials the probe must succeed.
    pub async fn connect(config: &RegistryConfig) -> Result<Self, PruneError> {
        let client = Self::new(config);
        let url = format!("{}/v2/", client.base_url);
        let connection_error = |source| PruneError::Connection {
            url: client.base_url.clone(),
            source,
        };

        debug!(%url, project = %config.project, "connecting to registry");
        let resp = client
            .request(client.client.get(&url))
            .send()
            .await
            .map_err(|e| connection_error(RegistryError::Http(e)))?;

        let status = resp.status();
        let anonymous_challenge = status == StatusCode::UNAUTHORIZED && client.credentials.is_none();
        if !status.is_success() && !anonymous_challenge {
            return Err(connection_error(RegistryError::Status {
                method: "GET",
                url,
                status,
            }));
        }

        Ok(client)
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(c) => builder.basic_auth(&c.username, Some(&c.password)),
            None => builder,
        }
    }

    async fn send(
        &self,
        builder: RequestBuilder,
        method: &'static str,
        url: &str,
    ) -> Result<Response, RegistryError> {
        debug!("{} {}", method, url);
        let resp = self.request(builder).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RegistryError::Status {
                method,
                url: url.to_string(),
                status,
            });
        }

        Ok(resp)
    }

    /// GET /v2/<repo>/tags/list, following pagination
    async fn fetch_tag_lists(&self, repo: &str) -> Result<Vec<TagList>, RegistryError> {
        let mut pages = Vec::new();
        let mut url = format!("{}/v2/{}/tags/list", self.base_url, repo);

        loop {
            let resp = self.send(self.client.get(&url), "GET", &url).await?;
            let next_link = Self::parse_next_link(resp.headers());

            pages.push(resp.json::<TagList>().await?);

            match next_link {
                Some(next) => url = self.resolve_url(&next),
                None => break,
            }
        }

        Ok(pages)
    }

    /// Parse the Link header for pagination (next URL)
    fn parse_next_link(headers: &HeaderMap) -> Option<String> {
        let link = headers.get(LINK)?.to_str().ok()?;
        // Link: </v2/_catalog?n=100&last=xxx>; rel="next"
        let next = link.split(',').find(|part| part.contains("rel=\"next\""))?;
        let (_, target) = next.split_once('<')?;
        let (target, _) = target.split_once('>')?;
        Some(target.to_string())
    }

    /// Resolve a relative URL path against the base URL
    fn resolve_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }
}

#[async_trait]
impl Registry for RegistryClient {
    /// GET /v2/_catalog with pagination
    async fn list_repositories(&self) -> Result<Vec<String>, RegistryError> {
        let mut repos = Vec::new();
        let mut url = format!("{}/v2/_catalog", self.base_url);

        loop {
            let resp = self.send(self.client.get(&url), "GET", &url).await?;
            let next_link = Self::parse_next_link(resp.headers());

            let catalog: Catalog = resp.json().await?;
            repos.extend(catalog.repositories);

            match next_link {
                Some(next) => url = self.resolve_url(&next),
                None => break,
            }
        }

        Ok(repos)
    }

    async fn list_tags(&self, repo: &str) -> Result<Vec<String>, RegistryError> {
        let pages = self.fetch_tag_lists(repo).await?;
        Ok(pages.into_iter().flat_map(|p| p.tags.unwrap_or_default()).collect())
    }

    /// HEAD /v2/<repo>/manifests/<tag> — extract Docker-Content-Digest header
    async fn resolve_digest(&self, repo: &str, tag: &str) -> Result<String, RegistryError> {
        let url = format!("{}/v2/{}/manifests/{}", self.base_url, repo, tag);
        let resp = self
            .send(
                self.client.head(&url).header(ACCEPT, MANIFEST_MEDIA_TYPES),
                "HEAD",
                &url,
            )
            .await?;

        resp.headers()
            .get(DIGEST_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .ok_or_else(|| RegistryError::MissingDigest(format!("{}:{}", repo, tag)))
    }

    async fn list_images(&self, repo: &str) -> Result<Vec<Image>, RegistryError> {
        let pages = self.fetch_tag_lists(repo).await?;
        Ok(pages
            .into_iter()
            .flat_map(|p| p.manifest)
            .map(|(digest, entry)| Image {
                digest,
                tags: entry.tag,
            })
            .collect())
    }

    /// DELETE /v2/<repo>/manifests/<tag>
    async fn delete_tag_reference(&self, repo: &str, tag: &str) -> Result<(), RegistryError> {
        let url = format!("{}/v2/{}/manifests/{}", self.base_url, repo, tag);
        self.send(self.client.delete(&url), "DELETE", &url).await?;
        Ok(())
    }

    /// DELETE /v2/<repo>/manifests/<digest>
    async fn delete_manifest(&self, repo: &str, digest: &Digest) -> Result<(), RegistryError> {
        let url = format!("{}/v2/{}/manifests/{}", self.base_url, repo, digest);
        self.send(
            self.client.delete(&url).header(ACCEPT, MANIFEST_MEDIA_TYPES),
            "DELETE",
            &url,
        )
        .await?;
        Ok(())
    }
}
