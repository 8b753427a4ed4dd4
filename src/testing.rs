//! In-memory registry used by the selector and executor tests.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;

use crate::error::RegistryError;
use crate::models::{Digest, Image};
use crate::registry::Registry;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Call {
    ListRepositories,
    ListTags(String),
    ResolveDigest(String, String),
    ListImages(String),
    DeleteTag(String, String),
    DeleteManifest(String, String),
}

impl Call {
    pub fn list_tags(repo: &str) -> Self {
        Call::ListTags(repo.to_string())
    }

    pub fn resolve(repo: &str, tag: &str) -> Self {
        Call::ResolveDigest(repo.to_string(), tag.to_string())
    }

    pub fn list_images(repo: &str) -> Self {
        Call::ListImages(repo.to_string())
    }

    pub fn delete_tag(repo: &str, tag: &str) -> Self {
        Call::DeleteTag(repo.to_string(), tag.to_string())
    }

    pub fn delete_manifest(repo: &str, digest: &str) -> Self {
        Call::DeleteManifest(repo.to_string(), digest.to_string())
    }
}

#[derive(Debug, Default)]
struct Repository {
    /// tag -> digest
    tags: BTreeMap<String, String>,
    manifests: BTreeSet<String>,
}

#[derive(Debug, Default)]
pub struct FakeRegistry {
    repositories: Mutex<BTreeMap<String, Repository>>,
    failures: HashSet<Call>,
    calls: Mutex<Vec<Call>>,
}

fn status(method: &'static str, status: StatusCode) -> RegistryError {
    RegistryError::Status {
        method,
        url: "fake://registry".to_string(),
        status,
    }
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repository(self, repo: &str) -> Self {
        self.repositories
            .lock()
            .unwrap()
            .entry(repo.to_string())
            .or_default();
        self
    }

    pub fn with_image(self, repo: &str, tag: &str, digest: &str) -> Self {
        {
            let mut repos = self.repositories.lock().unwrap();
            let entry = repos.entry(repo.to_string()).or_default();
            entry.tags.insert(tag.to_string(), digest.to_string());
            entry.manifests.insert(digest.to_string());
        }
        self
    }

    pub fn with_untagged(self, repo: &str, digest: &str) -> Self {
        self.repositories
            .lock()
            .unwrap()
            .entry(repo.to_string())
            .or_default()
            .manifests
            .insert(digest.to_string());
        self
    }

    pub fn failing_on(mut self, call: Call) -> Self {
        self.failures.insert(call);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn tags(&self, repo: &str) -> Vec<String> {
        self.repositories.lock().unwrap()[repo]
            .tags
            .keys()
            .cloned()
            .collect()
    }

    pub fn manifests(&self, repo: &str) -> Vec<String> {
        self.repositories.lock().unwrap()[repo]
            .manifests
            .iter()
            .cloned()
            .collect()
    }

    fn record(&self, call: Call, method: &'static str) -> Result<(), RegistryError> {
        let fail = self.failures.contains(&call);
        self.calls.lock().unwrap().push(call);
        if fail {
            Err(status(method, StatusCode::INTERNAL_SERVER_ERROR))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Registry for FakeRegistry {
    async fn list_repositories(&self) -> Result<Vec<String>, RegistryError> {
        self.record(Call::ListRepositories, "GET")?;
        Ok(self.repositories.lock().unwrap().keys().cloned().collect())
    }

    async fn list_tags(&self, repo: &str) -> Result<Vec<String>, RegistryError> {
        self.record(Call::list_tags(repo), "GET")?;
        let repos = self.repositories.lock().unwrap();
        let entry = repos
            .get(repo)
            .ok_or_else(|| status("GET", StatusCode::NOT_FOUND))?;
        Ok(entry.tags.keys().cloned().collect())
    }

    async fn resolve_digest(&self, repo: &str, tag: &str) -> Result<String, RegistryError> {
        self.record(Call::resolve(repo, tag), "HEAD")?;
        let repos = self.repositories.lock().unwrap();
        repos
            .get(repo)
            .and_then(|r| r.tags.get(tag))
            .cloned()
            .ok_or_else(|| status("HEAD", StatusCode::NOT_FOUND))
    }

    async fn list_images(&self, repo: &str) -> Result<Vec<Image>, RegistryError> {
        self.record(Call::list_images(repo), "GET")?;
        let repos = self.repositories.lock().unwrap();
        let entry = repos
            .get(repo)
            .ok_or_else(|| status("GET", StatusCode::NOT_FOUND))?;
        Ok(entry
            .manifests
            .iter()
            .map(|digest| Image {
                digest: digest.clone(),
                tags: entry
                    .tags
                    .iter()
                    .filter(|(_, d)| *d == digest)
                    .map(|(tag, _)| tag.clone())
                    .collect(),
            })
            .collect())
    }

    async fn delete_tag_reference(&self, repo: &str, tag: &str) -> Result<(), RegistryError> {
        self.record(Call::delete_tag(repo, tag), "DELETE")?;
        let mut repos = self.repositories.lock().unwrap();
        repos
            .get_mut(repo)
            .and_then(|r| r.tags.remove(tag))
            .map(|_| ())
            .ok_or_else(|| status("DELETE", StatusCode::NOT_FOUND))
    }

    /// Refuses to delete a manifest that a tag still points at, like GCR.
    async fn delete_manifest(&self, repo: &str, digest: &Digest) -> Result<(), RegistryError> {
        let digest = digest.to_string();
        self.record(Call::delete_manifest(repo, &digest), "DELETE")?;
        let mut repos = self.repositories.lock().unwrap();
        let entry = repos
            .get_mut(repo)
            .ok_or_else(|| status("DELETE", StatusCode::NOT_FOUND))?;
        if entry.tags.values().any(|d| *d == digest) {
            return Err(status("DELETE", StatusCode::CONFLICT));
        }
        if entry.manifests.remove(&digest) {
            Ok(())
        } else {
            Err(status("DELETE", StatusCode::NOT_FOUND))
        }
    }
}

/// Log sink for asserting on what a run prints at a given level.
#[derive(Debug, Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Route this thread's events into the buffer until the guard drops.
    pub fn install(&self, level: LevelFilter) -> DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_ansi(false)
            .with_writer(self.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
