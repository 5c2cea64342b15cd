//! Pipeline orchestrator: collect, analyze, value.
//!
//! Each stage consumes the previous stage's complete output. Analysis and
//! valuation degrade instead of failing, so the only failed run is one where
//! collection found nothing.
//!
//! # Example
//!
//! ```rust,ignore
//! use property_scout::{Pipeline, PipelineConfig, SearchQuery};
//!
//! let pipeline = Pipeline::new(firecrawl, gemini)
//!     .with_config(PipelineConfig::default().with_fetch_timeout(Duration::from_secs(90)))
//!     .with_observer(|state, progress| println!("{state} {:.0}%", progress * 100.0));
//!
//! let report = pipeline.run(&query).await?;
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::error::Result;
use crate::pipeline::analyze::analyze;
use crate::pipeline::collect::collect;
use crate::pipeline::valuation::estimate_all;
use crate::traits::inference::Inference;
use crate::traits::source::ListingSource;
use crate::types::config::PipelineConfig;
use crate::types::query::SearchQuery;
use crate::types::report::Report;

/// Where a run is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Collecting,
    Analyzing,
    Valuing,
    Complete,
    Failed,
}

impl PipelineState {
    /// Fraction of the run done on entering this state.
    pub fn progress(&self) -> f32 {
        match self {
            Self::Idle => 0.0,
            Self::Collecting => 0.2,
            Self::Analyzing => 0.5,
            Self::Valuing => 0.8,
            Self::Complete | Self::Failed => 1.0,
        }
    }

    /// Whether `next` directly follows this state.
    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Collecting)
                | (Self::Collecting, Self::Analyzing)
                | (Self::Collecting, Self::Failed)
                | (Self::Analyzing, Self::Valuing)
                | (Self::Valuing, Self::Complete)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Collecting => "collecting",
            Self::Analyzing => "analyzing",
            Self::Valuing => "valuing",
            Self::Complete => "complete",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Called on every state change with the new state and its progress.
pub type ProgressObserver = Arc<dyn Fn(PipelineState, f32) + Send + Sync>;

/// Per-run state tracker. Lives only for the duration of one `run`.
struct RunProgress<'a> {
    state: PipelineState,
    observer: Option<&'a ProgressObserver>,
}

impl<'a> RunProgress<'a> {
    fn new(observer: Option<&'a ProgressObserver>) -> Self {
        Self {
            state: PipelineState::Idle,
            observer,
        }
    }

    fn advance(&mut self, next: PipelineState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition {} -> {}",
            self.state,
            next
        );
        info!(from = %self.state, to = %next, "Pipeline state change");
        self.state = next;
        if let Some(observer) = self.observer {
            observer(next, next.progress());
        }
    }
}

/// Runs queries against a listing source and an inference provider.
///
/// Holds no per-run data, so one pipeline can serve concurrent runs.
pub struct Pipeline<S, I> {
    source: S,
    inference: I,
    config: PipelineConfig,
    observer: Option<ProgressObserver>,
}

impl<S: ListingSource, I: Inference> Pipeline<S, I> {
    /// Create a pipeline with the default configuration.
    pub fn new(source: S, inference: I) -> Self {
        Self {
            source,
            inference,
            config: PipelineConfig::default(),
            observer: None,
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a progress observer.
    pub fn with_observer(
        mut self,
        observer: impl Fn(PipelineState, f32) + Send + Sync + 'static,
    ) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn inference(&self) -> &I {
        &self.inference
    }

    /// Run one query to completion.
    ///
    /// Returns [`PipelineError::NoListingsFound`](crate::PipelineError) when
    /// no site produced a usable listing; no partial report is produced.
    pub async fn run(&self, query: &SearchQuery) -> Result<Report> {
        let run_id = Uuid::now_v7();
        let span = info_span!("pipeline_run", run_id = %run_id, query = %query.describe());
        self.run_inner(run_id, query).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid, query: &SearchQuery) -> Result<Report> {
        let mut progress = RunProgress::new(self.observer.as_ref());

        progress.advance(PipelineState::Collecting);
        let collected = match collect(
            &self.source,
            query,
            &self.config.sites,
            self.config.fetch_timeout,
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                progress.advance(PipelineState::Failed);
                return Err(e);
            }
        };

        progress.advance(PipelineState::Analyzing);
        let market = analyze(
            &self.inference,
            query,
            &collected.listings,
            collected.failures,
            self.config.inference_timeout,
        )
        .await;

        progress.advance(PipelineState::Valuing);
        let valuations = estimate_all(
            &self.inference,
            &collected.listings,
            &market,
            self.config.inference_timeout,
            self.config.valuation_concurrency,
        )
        .await;

        progress.advance(PipelineState::Complete);
        info!(
            listings = collected.listings.len(),
            failed_sources = market.failed_source_count(),
            "Pipeline run complete"
        );

        Ok(Report {
            run_id,
            generated_at: Utc::now(),
            listings: collected.listings,
            market,
            valuations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_are_sequential() {
        use PipelineState::*;
        assert!(Idle.can_transition_to(Collecting));
        assert!(Collecting.can_transition_to(Failed));
        assert!(!Analyzing.can_transition_to(Failed));
        assert!(!Valuing.can_transition_to(Failed));
        assert!(!Idle.can_transition_to(Analyzing));
        assert!(!Complete.can_transition_to(Collecting));
        assert!(Failed.is_terminal() && Complete.is_terminal());
    }

    #[test]
    fn test_progress_is_monotonic() {
        use PipelineState::*;
        let path = [Idle, Collecting, Analyzing, Valuing, Complete];
        assert!(path.windows(2).all(|w| w[0].progress() < w[1].progress()));
    }
}
