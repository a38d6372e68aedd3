//! Resolving many rows concurrently while preserving input order.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt as _};
use georef_locality_models::{QdsError, ResolutionResult, ResolutionSource};
use thiserror::Error;

use crate::progress::ProgressCallback;
use crate::{InputRow, LocationResolver, malformed_result};

/// Default number of rows resolved at once.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Errors that abort a batch.
#[derive(Debug, Error)]
pub enum BatchError {
    /// A row had a malformed QDS code and the batch runs in strict mode.
    #[error("Row {row} ('{locality}') is malformed: {source}")]
    MalformedInput {
        /// 1-based data row number.
        row: usize,
        locality: String,
        #[source]
        source: QdsError,
    },
}

/// How a batch is run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Rows resolved at once.
    pub concurrency: usize,
    /// Abort on the first malformed row instead of skipping it.
    pub strict: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            strict: false,
        }
    }
}

/// Per-source tallies for a finished batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub malformed: usize,
    /// Row count per resolution source label.
    pub by_source: BTreeMap<String, usize>,
}

impl BatchSummary {
    fn record(&mut self, result: &ResolutionResult) {
        self.total += 1;
        match result.source {
            ResolutionSource::MalformedInput => self.malformed += 1,
            _ if result.is_resolved() => self.resolved += 1,
            _ => self.unresolved += 1,
        }
        *self.by_source.entry(result.source.to_string()).or_default() += 1;
    }

    /// Logs the summary at info level.
    pub fn log(&self) {
        log::info!(
            "Resolved {}/{} localities ({} unresolved, {} malformed)",
            self.resolved,
            self.total,
            self.unresolved,
            self.malformed
        );
        for (source, count) in &self.by_source {
            log::info!("  {source}: {count}");
        }
    }
}

/// Resolves `rows` with up to `options.concurrency` rows in flight.
///
/// Results come back in input order. Malformed rows become
/// [`ResolutionSource::MalformedInput`] results unless `options.strict`
/// is set.
///
/// # Errors
///
/// Returns [`BatchError::MalformedInput`] for the first malformed row in
/// strict mode. Rows still in flight are dropped.
pub async fn resolve_batch(
    resolver: &LocationResolver,
    rows: &[InputRow],
    options: BatchOptions,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<(Vec<ResolutionResult>, BatchSummary), BatchError> {
    let concurrency = options.concurrency.max(1);
    log::info!(
        "Resolving {} localities against {} datasets ({concurrency} concurrent)",
        rows.len(),
        resolver.datasets().len()
    );

    progress.set_total(rows.len() as u64);
    progress.set_message("Resolving localities".to_string());

    let mut pending = stream::iter(rows.iter().enumerate())
        .map(|(index, row)| async move { (index, row, resolver.resolve_row(row).await) })
        .buffered(concurrency);

    let mut results = Vec::with_capacity(rows.len());
    let mut summary = BatchSummary::default();

    while let Some((index, row, outcome)) = pending.next().await {
        let result = match outcome {
            Ok(result) => result,
            Err(source) if options.strict => {
                progress.finish(format!("Aborted at row {}", index + 1));
                return Err(BatchError::MalformedInput {
                    row: index + 1,
                    locality: row.locality.clone(),
                    source,
                });
            }
            Err(e) => {
                log::warn!("Skipping row {} ('{}'): {e}", index + 1, row.locality);
                malformed_result(row, &e)
            }
        };

        summary.record(&result);
        results.push(result);
        progress.inc(1);
    }

    progress.finish(format!(
        "Resolved {}/{} localities",
        summary.resolved, summary.total
    ));
    summary.log();

    Ok((results, summary))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use georef_matcher::ReferenceMatcher;

    use super::*;
    use crate::ResolverConfig;
    use crate::progress::null_progress;
    use crate::test_support::{farms, gazetteer};

    fn resolver() -> LocationResolver {
        LocationResolver::new(
            ResolverConfig::default(),
            vec![farms(), gazetteer()],
            ReferenceMatcher::default(),
        )
    }

    fn rows() -> Vec<InputRow> {
        vec![
            InputRow::new("Springbok", "2917BB"),
            InputRow::new("Kamieskroon", "3017BB"),
            InputRow::new("Muizenberg", "bad"),
            InputRow::new("Farm Rietfontein", "2917BB"),
        ]
    }

    #[derive(Default)]
    struct RecordingProgress {
        total: Mutex<u64>,
        position: Mutex<u64>,
        finished: Mutex<Option<String>>,
    }

    impl ProgressCallback for RecordingProgress {
        fn set_total(&self, total: u64) {
            *self.total.lock().unwrap() = total;
        }
        fn inc(&self, delta: u64) {
            *self.position.lock().unwrap() += delta;
        }
        fn set_message(&self, _msg: String) {}
        fn finish(&self, msg: String) {
            *self.finished.lock().unwrap() = Some(msg);
        }
    }

    #[tokio::test]
    async fn results_keep_input_order() {
        let rows = rows();
        let options = BatchOptions {
            concurrency: 3,
            strict: false,
        };

        let (results, _) = resolve_batch(&resolver(), &rows, options, &null_progress())
            .await
            .unwrap();

        let localities: Vec<&str> = results.iter().map(|r| r.locality.as_str()).collect();
        assert_eq!(
            localities,
            ["Springbok", "Kamieskroon", "Muizenberg", "Farm Rietfontein"]
        );
        assert_eq!(results[2].source, ResolutionSource::MalformedInput);
    }

    #[tokio::test]
    async fn summary_counts_each_outcome() {
        let (_, summary) = resolve_batch(
            &resolver(),
            &rows(),
            BatchOptions::default(),
            &null_progress(),
        )
        .await
        .unwrap();

        assert_eq!(summary.total, 4);
        assert_eq!(summary.resolved, 2);
        assert_eq!(summary.unresolved, 1);
        assert_eq!(summary.malformed, 1);
        assert_eq!(summary.by_source.get("Gazetteer"), Some(&1));
        assert_eq!(summary.by_source.get("Farms"), Some(&1));
        assert_eq!(summary.by_source.get("unresolved"), Some(&1));
    }

    #[tokio::test]
    async fn strict_mode_aborts_on_malformed_row() {
        let options = BatchOptions {
            concurrency: 2,
            strict: true,
        };

        let err = resolve_batch(&resolver(), &rows(), options, &null_progress())
            .await
            .unwrap_err();

        assert!(matches!(err, BatchError::MalformedInput { row: 3, .. }));
    }

    #[tokio::test]
    async fn progress_tracks_every_row() {
        let recorder = Arc::new(RecordingProgress::default());
        let progress: Arc<dyn ProgressCallback> = recorder.clone();

        resolve_batch(&resolver(), &rows(), BatchOptions::default(), &progress)
            .await
            .unwrap();

        assert_eq!(*recorder.total.lock().unwrap(), 4);
        assert_eq!(*recorder.position.lock().unwrap(), 4);
        assert_eq!(
            recorder.finished.lock().unwrap().as_deref(),
            Some("Resolved 2/4 localities")
        );
    }

    #[tokio::test]
    async fn empty_batch_is_fine() {
        let (results, summary) = resolve_batch(
            &resolver(),
            &[],
            BatchOptions::default(),
            &null_progress(),
        )
        .await
        .unwrap();

        assert!(results.is_empty());
        assert_eq!(summary, BatchSummary::default());
    }
}
