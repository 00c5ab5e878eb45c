//! Sequential batch orchestration
//!
//! A large unit of work is split into contiguous batches that run strictly
//! one after another. Each batch step receives the accumulator produced by
//! the previous one (for example the names already in use) and returns its
//! items together with the next accumulator. Items are merged into one map
//! keyed by their natural identity.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::future::Future;
use std::ops::Range;
use std::time::Duration;

use org_synth_sdk::{
    log_batch_complete, log_batch_event_complete, log_batch_event_failed, log_batch_event_start,
    log_batch_start, log_progress, log_warning,
};

/// Context provided to each batch step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchContext {
    /// Phase number (for logging)
    pub phase: usize,
    /// Batch number (1-indexed for display)
    pub batch_number: usize,
    pub total_batches: usize,
    /// Positions of this batch's items in the input list
    pub range: Range<usize>,
}

impl BatchContext {
    pub fn size(&self) -> usize {
        self.range.len()
    }

    pub fn is_first(&self) -> bool {
        self.batch_number == 1
    }
}

/// Split `total` items into contiguous batches of `batch_size`.
///
/// `first_batch_size` overrides the size of the first batch, e.g. when it
/// must also carry leader records. Every position appears exactly once and
/// order is preserved.
pub fn plan_batches(
    total: usize,
    batch_size: usize,
    first_batch_size: Option<usize>,
) -> Vec<Range<usize>> {
    let batch_size = batch_size.max(1);
    let mut batches = Vec::new();
    let mut start = 0;

    if let Some(first) = first_batch_size {
        let end = first.max(1).min(total);
        if end > 0 {
            batches.push(0..end);
        }
        start = end;
    }

    while start < total {
        let end = (start + batch_size).min(total);
        batches.push(start..end);
        start = end;
    }
    batches
}

/// Items merged across batches, in merge order, indexed by key
#[derive(Debug, Clone)]
pub struct MergedBatches<T> {
    items: Vec<T>,
    index: HashMap<String, usize>,
    warnings: Vec<String>,
}

impl<T> Default for MergedBatches<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
            warnings: Vec::new(),
        }
    }
}

impl<T> MergedBatches<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert under `key`; an existing key is kept and the duplicate rejected
    pub fn insert(&mut self, key: String, item: T) -> bool {
        if self.index.contains_key(&key) {
            self.warnings
                .push(format!("duplicate key '{}' excluded from merge", key));
            return false;
        }
        self.index.insert(key, self.items.len());
        self.items.push(item);
        true
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.index.get(key).map(|&i| &self.items[i])
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Warnings raised while merging (duplicates, oversized batches)
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    fn warn(&mut self, message: String) {
        log_warning!("{}", message);
        self.warnings.push(message);
    }
}

/// Drive `step` over every batch of `plan`, strictly in order.
///
/// The first failing batch aborts the whole run; nothing merged so far is
/// returned. A batch returning more items than it was given is capped at its
/// size, and an item whose key is already merged is excluded. Both cases are
/// logged and recorded in [`MergedBatches::warnings`]. Callers that need
/// completeness compare [`MergedBatches::len`] with the expected total.
pub async fn fold_batches<A, T, K, F, Fut>(
    phase: usize,
    plan: &[Range<usize>],
    pause: Duration,
    init: A,
    key_of: K,
    mut step: F,
) -> Result<(MergedBatches<T>, A)>
where
    K: Fn(&T) -> String,
    F: FnMut(BatchContext, A) -> Fut,
    Fut: Future<Output = Result<(Vec<T>, A)>>,
{
    let total_batches = plan.len();
    let expected: usize = plan.iter().map(|r| r.len()).sum();
    let mut merged = MergedBatches::new();
    let mut acc = init;

    for (idx, range) in plan.iter().enumerate() {
        let ctx = BatchContext {
            phase,
            batch_number: idx + 1,
            total_batches,
            range: range.clone(),
        };
        let batch_number = ctx.batch_number;
        let size = ctx.size();

        log_batch_event_start!(phase, batch_number, total_batches, size);
        log_batch_start!(batch_number, total_batches, size);

        let (mut items, next) = match step(ctx, acc).await {
            Ok(out) => out,
            Err(e) => {
                log_batch_event_failed!(phase, batch_number, format!("{:#}", e));
                return Err(e).with_context(|| {
                    format!("batch {}/{} failed", batch_number, total_batches)
                });
            }
        };
        acc = next;

        if items.len() > size {
            merged.warn(format!(
                "batch {} returned {} items for {} requested; extra items dropped",
                batch_number,
                items.len(),
                size
            ));
            items.truncate(size);
        }

        let before = merged.len();
        for item in items {
            let key = key_of(&item);
            if merged.contains_key(&key) {
                merged.warn(format!(
                    "batch {}: duplicate key '{}' excluded from merge",
                    batch_number, key
                ));
                continue;
            }
            merged.insert(key, item);
        }

        log_batch_event_complete!(phase, batch_number, merged.len() - before);
        log_batch_complete!(batch_number);
        log_progress!(merged.len(), expected, "merged");

        if idx + 1 < total_batches && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }

    Ok((merged, acc))
}
