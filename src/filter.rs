use std::fmt;
use std::str::FromStr;

use regex::Regex;

use crate::config::Mode;
use crate::error::PruneError;

/// Tag pattern that, on its own, authorizes the untagged sweep.
pub const UNTAGGED_SENTINEL: &str = ".*";

/// A `repository:tag` filter as given on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSpec {
    repository: String,
    tag: String,
}

impl FilterSpec {
    /// The filter used for a scan without `--filter`.
    pub fn match_all() -> Self {
        FilterSpec {
            repository: ".*".to_string(),
            tag: UNTAGGED_SENTINEL.to_string(),
        }
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn sweeps_untagged(&self) -> bool {
        self.tag == UNTAGGED_SENTINEL
    }

    /// Build the repository and tag matchers for a run.
    ///
    /// Check mode compares both components literally; scan and delete
    /// compile them as unanchored regular expressions.
    pub fn matchers(&self, mode: Mode) -> Result<Matchers, PruneError> {
        let matchers = match mode {
            Mode::Check => Matchers {
                repository: Matcher::Exact(self.repository.clone()),
                tag: Matcher::Exact(self.tag.clone()),
            },
            Mode::Scan | Mode::Delete => Matchers {
                repository: Matcher::Pattern(Regex::new(&self.repository)?),
                tag: Matcher::Pattern(Regex::new(&self.tag)?),
            },
        };
        Ok(matchers)
    }
}

impl FromStr for FilterSpec {
    type Err = PruneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((repository, tag))
                if !repository.is_empty() && !tag.is_empty() && !tag.contains(':') =>
            {
                Ok(FilterSpec {
                    repository: repository.to_string(),
                    tag: tag.to_string(),
                })
            }
            _ => Err(PruneError::InvalidFilter(s.to_string())),
        }
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

#[derive(Debug)]
pub enum Matcher {
    Exact(String),
    Pattern(Regex),
}

impl Matcher {
    pub fn is_match(&self, candidate: &str) -> bool {
        match self {
            Matcher::Exact(expected) => expected == candidate,
            Matcher::Pattern(re) => re.is_match(candidate),
        }
    }
}

#[derive(Debug)]
pub struct Matchers {
    pub repository: Matcher,
    /// Tested against the bare tag, never `repository:tag`.
    pub tag: Matcher,
}
