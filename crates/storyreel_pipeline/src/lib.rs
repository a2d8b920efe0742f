//! Run coordination for Storyreel.
//!
//! [`PipelineCoordinator`] owns one production run end to end: it fans scene
//! generation out through the worker pool, folds completion events into the
//! [`ProductionRun`] aggregate, enforces the skip threshold, resolves timing,
//! drives assembly, and persists a [`RunManifest`] at every phase transition.
//! Terminal outcomes are reported through a best-effort [`Notifier`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod coordinator;
mod manifest;
mod notify;
mod run;

pub use coordinator::{PipelineCoordinator, RunReport};
pub use manifest::RunManifest;
pub use notify::{NoopNotifier, Notifier, RunNotice, SlackNotifier};
pub use run::ProductionRun;
