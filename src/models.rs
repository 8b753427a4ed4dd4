use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::DigestError;

/// GET /v2/_catalog response
#[derive(Debug, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub repositories: Vec<String>,
}

/// GET /v2/<repo>/tags/list response
///
/// GCR extends the standard payload with a `manifest` map keyed by digest,
/// which also lists manifests no tag points at.
#[derive(Debug, Deserialize)]
pub struct TagList {
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub manifest: BTreeMap<String, ManifestEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ManifestEntry {
    #[serde(default)]
    pub tag: Vec<String>,
}

/// A manifest stored in a repository and the tags currently pointing at it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub digest: String,
    pub tags: Vec<String>,
}

impl Image {
    pub fn is_untagged(&self) -> bool {
        self.tags.is_empty()
    }
}

/// A content digest such as `sha256:b618c166f0b066dd9bba7...`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest {
    pub algorithm: String,
    pub hash: String,
}

impl FromStr for Digest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((algorithm, hash))
                if !algorithm.is_empty() && !hash.is_empty() && !hash.contains(':') =>
            {
                Ok(Digest {
                    algorithm: algorithm.to_string(),
                    hash: hash.to_string(),
                })
            }
            _ => Err(DigestError(s.to_string())),
        }
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hash)
    }
}

/// What the selector learned about a candidate's manifest digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateDigest {
    Resolved(Digest),
    /// The registry answered with something that is not `<algorithm>:<hex>`.
    Malformed(String),
    /// The digest lookup itself failed.
    Unresolved,
}

impl CandidateDigest {
    pub fn from_raw(raw: &str) -> Self {
        match raw.parse() {
            Ok(digest) => CandidateDigest::Resolved(digest),
            Err(_) => CandidateDigest::Malformed(raw.to_string()),
        }
    }
}

impl fmt::Display for CandidateDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateDigest::Resolved(digest) => write!(f, "{}", digest),
            CandidateDigest::Malformed(raw) => f.write_str(raw),
            CandidateDigest::Unresolved => Ok(()),
        }
    }
}

/// A tag selected by the filter, together with its manifest digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub repository: String,
    pub tag: String,
    pub digest: CandidateDigest,
}

impl Candidate {
    pub fn fullname(&self) -> String {
        format!("{}:{}", self.repository, self.tag)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Found,
    Deleted,
    DeleteFailed(String),
    DigestMalformed,
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionOutcome::Found => f.write_str("found"),
            ActionOutcome::Deleted => f.write_str("deleted"),
            ActionOutcome::DeleteFailed(reason) => write!(f, "delete failed: {}", reason),
            ActionOutcome::DigestMalformed => f.write_str("digest malformed"),
        }
    }
}

/// Counters for a whole scan, logged once the run completes
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub repositories: usize,
    pub candidates: usize,
    pub deleted: usize,
    pub failed: usize,
    pub malformed: usize,
    pub untagged_found: usize,
    pub untagged_deleted: usize,
    pub untagged_failed: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &ActionOutcome) {
        self.candidates += 1;
        match outcome {
            ActionOutcome::Found => {}
            ActionOutcome::Deleted => self.deleted += 1,
            ActionOutcome::DeleteFailed(_) => self.failed += 1,
            ActionOutcome::DigestMalformed => self.malformed += 1,
        }
    }
}
