use futures::TryStreamExt;
use tracing::{debug, info, trace};

use crate::config::{Mode, PruneConfig};
use crate::error::PruneError;
use crate::filter::{FilterSpec, Matchers};
use crate::models::{ActionOutcome, Candidate, CandidateDigest, Digest, RunSummary};
use crate::output::{report_candidate, report_untagged};
use crate::registry::Registry;
use crate::selector::{select, Selection};

/// Scan the registry, acting on each candidate as soon as it is selected.
///
/// Returns early on listing failures and on tag-reference deletion
/// failures. Manifest deletion and untagged sweep failures are logged and
/// the run goes on.
pub async fn run<R: Registry>(
    registry: &R,
    config: &PruneConfig,
    matchers: &Matchers,
) -> Result<RunSummary, PruneError> {
    let mut summary = RunSummary::default();
    let selections = select(registry, matchers);
    futures::pin_mut!(selections);

    while let Some(selection) = selections.try_next().await? {
        match selection {
            Selection::Candidate(candidate) => {
                let outcome = act(registry, config, &candidate).await?;
                summary.record(&outcome);
            }
            Selection::RepositoryDone(repository) => {
                summary.repositories += 1;
                if config.sweeps_untagged() {
                    sweep_untagged(registry, config, &repository, &mut summary).await;
                }
            }
        }
    }

    Ok(summary)
}

/// Report or delete a single candidate.
///
/// In delete mode the tag reference goes first; if that fails the error is
/// returned and the manifest is left alone.
pub async fn act<R: Registry>(
    registry: &R,
    config: &PruneConfig,
    candidate: &Candidate,
) -> Result<ActionOutcome, PruneError> {
    let outcome = if config.deletes() {
        registry
            .delete_tag_reference(&candidate.repository, &candidate.tag)
            .await
            .map_err(|source| PruneError::DeleteTag {
                repository: candidate.repository.clone(),
                tag: candidate.tag.clone(),
                source,
            })?;

        match &candidate.digest {
            CandidateDigest::Resolved(digest) => {
                delete_manifest(registry, &candidate.repository, digest).await
            }
            CandidateDigest::Malformed(raw) => {
                info!(
                    repository = %candidate.repository,
                    tag = %candidate.tag,
                    digest = %raw,
                    "tag deleted, manifest kept: malformed digest"
                );
                ActionOutcome::DigestMalformed
            }
            CandidateDigest::Unresolved => {
                debug!(
                    repository = %candidate.repository,
                    tag = %candidate.tag,
                    "tag deleted, manifest kept: digest unresolved"
                );
                ActionOutcome::DeleteFailed("digest unresolved".to_string())
            }
        }
    } else {
        match &candidate.digest {
            CandidateDigest::Malformed(raw) => {
                info!(
                    repository = %candidate.repository,
                    tag = %candidate.tag,
                    digest = %raw,
                    "malformed digest"
                );
                ActionOutcome::DigestMalformed
            }
            _ => ActionOutcome::Found,
        }
    };

    report_candidate(candidate, config.deletes(), &outcome);
    Ok(outcome)
}

/// A manifest may still be referenced by other tags, so failures here are
/// expected and only logged.
async fn delete_manifest<R: Registry>(
    registry: &R,
    repository: &str,
    digest: &Digest,
) -> ActionOutcome {
    match registry.delete_manifest(repository, digest).await {
        Ok(()) => ActionOutcome::Deleted,
        Err(e) => {
            debug!(%repository, %digest, error = %e, "error deleting image");
            ActionOutcome::DeleteFailed(e.to_string())
        }
    }
}

/// Best-effort pass over every manifest of `repository`, including the
/// ones no tag points at. Without `--delete` only manifests with no tag are
/// reported.
pub async fn sweep_untagged<R: Registry>(
    registry: &R,
    config: &PruneConfig,
    repository: &str,
    summary: &mut RunSummary,
) {
    let images = match registry.list_images(repository).await {
        Ok(images) => images,
        Err(e) => {
            debug!(%repository, error = %e, "error getting image list");
            return;
        }
    };

    for image in images {
        if !config.deletes() && !image.is_untagged() {
            trace!(
                %repository,
                digest = %image.digest,
                tags = ?image.tags,
                "skipping tagged image"
            );
            continue;
        }

        let digest = match image.digest.parse::<Digest>() {
            Ok(digest) => digest,
            Err(e) => {
                debug!(%repository, error = %e, "skipping untagged image");
                summary.untagged_failed += 1;
                continue;
            }
        };

        let outcome = if config.deletes() {
            debug!(%repository, %digest, "deleting untagged image");
            delete_manifest(registry, repository, &digest).await
        } else {
            ActionOutcome::Found
        };

        match outcome {
            ActionOutcome::Deleted => summary.untagged_deleted += 1,
            ActionOutcome::Found => summary.untagged_found += 1,
            _ => summary.untagged_failed += 1,
        }
        report_untagged(repository, &digest, config.deletes(), &outcome);
    }
}

/// Exact existence probe for `filter`; only lists the one repository's tags.
pub async fn check_exists<R: Registry>(
    registry: &R,
    filter: &FilterSpec,
) -> Result<bool, PruneError> {
    let matchers = filter.matchers(Mode::Check)?;
    let tags = registry
        .list_tags(filter.repository())
        .await
        .map_err(|source| PruneError::ListTags {
            repository: filter.repository().to_string(),
            source,
        })?;

    Ok(tags.iter().any(|tag| matchers.tag.is_match(tag)))
}
