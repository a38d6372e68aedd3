#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the `georef` binary.
//!
//! [`init_logger`] routes `log` output through `indicatif-log-bridge` so log
//! lines never tear the progress bar, and [`IndicatifProgress`] renders
//! batch progress reported through [`ProgressCallback`].

use std::sync::Arc;
use std::time::Duration;

use georef_resolver::progress::ProgressCallback;
use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

/// An `indicatif` bar driven by the batch runner.
pub struct IndicatifProgress {
    bar: ProgressBar,
    /// Applied once the row count is known.
    rows_style: ProgressStyle,
}

impl IndicatifProgress {
    /// Creates a spinner that turns into a row counter with ETA when
    /// [`ProgressCallback::set_total`] is called.
    #[must_use]
    pub fn rows_bar(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());

        let rows_style = ProgressStyle::with_template(
            "  {msg} {wide_bar:.cyan/dim} {pos}/{len} rows {percent}% [{eta}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

        Arc::new(Self { bar, rows_style })
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_style(self.rows_style.clone());
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

/// Log filter used when `RUST_LOG` is unset: the `georef` crates at
/// `info`, dependencies at `warn`.
pub const DEFAULT_LOG_FILTER: &str = "warn,georef=info";

/// Installs a timestamped `pretty_env_logger` and returns the
/// [`MultiProgress`] that every progress bar must be drawn through.
///
/// `RUST_LOG` replaces `default_filter` when set. Records go through
/// `indicatif-log-bridge` so they print above active bars.
#[must_use]
pub fn init_logger(default_filter: &str) -> MultiProgress {
    let multi = MultiProgress::new();

    let filters = log_filters(std::env::var("RUST_LOG").ok(), default_filter);
    let logger = pretty_env_logger::formatted_timed_builder()
        .parse_filters(&filters)
        .build();
    let max_level = logger.filter();

    // A second call keeps the first logger and its level.
    if indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .is_ok()
    {
        log::set_max_level(max_level);
    }

    multi
}

fn log_filters(from_env: Option<String>, default_filter: &str) -> String {
    from_env
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default_filter.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_log_replaces_default_filter() {
        assert_eq!(
            log_filters(Some("georef_matcher=trace".to_string()), DEFAULT_LOG_FILTER),
            "georef_matcher=trace"
        );
    }

    #[test]
    fn blank_rust_log_keeps_default_filter() {
        assert_eq!(log_filters(None, DEFAULT_LOG_FILTER), DEFAULT_LOG_FILTER);
        assert_eq!(
            log_filters(Some("  ".to_string()), DEFAULT_LOG_FILTER),
            DEFAULT_LOG_FILTER
        );
    }
}
