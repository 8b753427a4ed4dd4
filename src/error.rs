use reqwest::StatusCode;
use thiserror::Error;

/// Failures reported by the registry client.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{method} {url} returned status {status}")]
    Status {
        method: &'static str,
        url: String,
        status: StatusCode,
    },

    #[error("Missing Docker-Content-Digest header for {0}")]
    MissingDigest(String),
}

/// A digest string that is not of the form `<algorithm>:<hex>`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed digest {0:?}: expected <algorithm>:<hex>")]
pub struct DigestError(pub String);

#[derive(Error, Debug)]
pub enum PruneError {
    #[error("A --filter is required when using --check or --delete")]
    MissingFilter,

    #[error("Filter {0:?} must be formed with <repository>:<tag>")]
    InvalidFilter(String),

    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Error connecting to registry {url}: {source}")]
    Connection {
        url: String,
        #[source]
        source: RegistryError,
    },

    #[error("Listing repositories failed: {0}")]
    ListRepositories(#[source] RegistryError),

    #[error("Listing tags of {repository} failed: {source}")]
    ListTags {
        repository: String,
        #[source]
        source: RegistryError,
    },

    #[error("Deleting tag {repository}:{tag} failed: {source}")]
    DeleteTag {
        repository: String,
        tag: String,
        #[source]
        source: RegistryError,
    },
}
