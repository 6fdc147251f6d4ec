//! Guard against re-publishing content that was already sent.
//!
//! Independent of the classifier and of the answer cache: two texts are the
//! same emission exactly when their normalized forms are equal.
//!
//! Callers check [`DeduplicationGuard::has_been_emitted`] before publishing
//! and call [`DeduplicationGuard::record_emission`] once the publish went
//! through. Nothing spans the publish and the record, so a crash in between
//! can let one duplicate through.

use crate::classifier::normalize;
use murmur_types::error::{MurmurError, MurmurResult};
use murmur_types::memory::{EmissionOutcome, EmittedContentStore};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct DeduplicationGuard {
    store: Arc<dyn EmittedContentStore>,
}

impl DeduplicationGuard {
    pub fn new(store: Arc<dyn EmittedContentStore>) -> Self {
        Self { store }
    }

    /// Whether this text (after normalization) was already published.
    pub async fn has_been_emitted(&self, text: &str) -> MurmurResult<bool> {
        let normalized = normalized_or_reject(text)?;
        self.store.exists(&normalized).await
    }

    /// Record a successful publish. Recording the same text twice is fine.
    pub async fn record_emission(&self, text: &str) -> MurmurResult<EmissionOutcome> {
        let normalized = normalized_or_reject(text)?;
        if self.store.insert_if_absent(&normalized).await? {
            debug!(len = normalized.len(), "Recorded emission");
            Ok(EmissionOutcome::Recorded)
        } else {
            debug!(len = normalized.len(), "Emission already on record");
            Ok(EmissionOutcome::AlreadyRecorded)
        }
    }

    /// Pick the first candidate that has not been published yet, skipping
    /// blanks and candidates that repeat an earlier one in the batch.
    ///
    /// Useful for generation loops that draft several options and need one
    /// that is safe to post.
    pub async fn first_unemitted<'a>(&self, candidates: &[&'a str]) -> MurmurResult<Option<&'a str>> {
        let mut seen = HashSet::new();
        for &candidate in candidates {
            let normalized = normalize(candidate);
            if normalized.is_empty() || !seen.insert(normalized.clone()) {
                continue;
            }
            if !self.store.exists(&normalized).await? {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }
}

fn normalized_or_reject(text: &str) -> MurmurResult<String> {
    let normalized = normalize(text);
    if normalized.is_empty() {
        return Err(MurmurError::InvalidInput(
            "content is empty after normalization".to_string(),
        ));
    }
    Ok(normalized)
}
