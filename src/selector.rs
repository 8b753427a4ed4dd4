use async_stream::try_stream;
use futures::Stream;
use tracing::{debug, info, trace};

use crate::error::PruneError;
use crate::filter::Matchers;
use crate::models::{Candidate, CandidateDigest};
use crate::registry::Registry;

/// One step of a registry walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Candidate(Candidate),
    /// Every tag of this repository has been yielded.
    RepositoryDone(String),
}

/// Walk the registry and lazily yield every tag both matchers accept.
///
/// Nothing is fetched ahead of the consumer: the next tag's digest is only
/// resolved once the previous candidate has been pulled and handled.
/// Listing failures end the stream with an error; a failed digest lookup
/// still yields the candidate with [`CandidateDigest::Unresolved`].
pub fn select<'a, R: Registry>(
    registry: &'a R,
    matchers: &'a Matchers,
) -> impl Stream<Item = Result<Selection, PruneError>> + 'a {
    try_stream! {
        let repositories = registry
            .list_repositories()
            .await
            .map_err(PruneError::ListRepositories)?;
        info!("found {} repos", repositories.len());

        for repository in repositories {
            if !matchers.repository.is_match(&repository) {
                debug!(%repository, "skipping repository");
                continue;
            }

            let tags = registry
                .list_tags(&repository)
                .await
                .map_err(|source| PruneError::ListTags {
                    repository: repository.clone(),
                    source,
                })?;
            info!(%repository, "found {} tags", tags.len());

            for tag in tags {
                if !matchers.tag.is_match(&tag) {
                    trace!(%repository, %tag, "skipping tag");
                    continue;
                }

                let digest = resolve(registry, &repository, &tag).await;
                yield Selection::Candidate(Candidate {
                    repository: repository.clone(),
                    tag,
                    digest,
                });
            }

            yield Selection::RepositoryDone(repository);
        }
    }
}

async fn resolve<R: Registry>(registry: &R, repository: &str, tag: &str) -> CandidateDigest {
    match registry.resolve_digest(repository, tag).await {
        Ok(raw) => {
            info!(%repository, %tag, digest = %raw, "resolved digest");
            CandidateDigest::from_raw(&raw)
        }
        Err(e) => {
            info!(%repository, %tag, error = %e, "digest resolution failed");
            CandidateDigest::Unresolved
        }
    }
}
