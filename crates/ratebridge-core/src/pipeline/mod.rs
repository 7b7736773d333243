//! Step-sequenced pipelines
//!
//! A [`Pipeline`] is an ordered list of typed steps plus the routing rules,
//! mappings and business rules those steps use. The [`PipelineExecutor`]
//! runs it fail-fast over a single context and returns a per-step trace.
//!
//! # Module Organization
//!
//! - [`types`] - pipeline, step and routing records
//! - [`routing`] - scored pipeline selection
//! - [`executor`] - the step state machine
//!
//! Copyright (c) 2025 RateBridge Team
//! Licensed under the Apache-2.0 license

pub mod executor;
pub mod routing;
pub mod types;

#[cfg(test)]
mod tests;

pub use executor::{PipelineExecutor, RESPONSE_KEY};
pub use routing::RouteMatch;
pub use types::{EnrichLookup, Pipeline, PipelineStep, RouteRequest, RoutingRule, StepKind};
