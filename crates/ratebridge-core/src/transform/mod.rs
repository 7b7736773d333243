//! Field transformation system
//!
//! A [`Mapping`] is an ordered list of [`FieldMapping`] directives, each
//! reading a value from a source path, transforming it with one of the
//! [`Transformation`] kinds and writing it to a target path. The
//! [`TransformationEngine`] executes them and records a
//! [`FieldResult`](crate::types::FieldResult) per field.
//!
//! # Module Organization
//!
//! - [`types`] - Mapping records, transformation kinds and error definitions
//! - [`engine`] - Field and mapping execution
//!
//! # Examples
//!
//! ```
//! use ratebridge_core::transform::{FieldMapping, Mapping, MappingDirection, RequiredPolicy, Transformation, TransformationEngine};
//! use serde_json::json;
//!
//! # tokio_test_block(async {
//! let engine = TransformationEngine::default();
//! let mapping = Mapping::new("quote", MappingDirection::Request, vec![
//!     FieldMapping::new("quoteNumber", "policy.id", Transformation::Direct),
//!     FieldMapping::new("premium", "rating.total", Transformation::Number),
//! ]);
//!
//! let source = json!({"quoteNumber": "Q-1", "premium": "1200.50"});
//! let result = engine.execute_mapping(&mapping, &source, RequiredPolicy::Abort).await.unwrap();
//! assert_eq!(result.output, json!({"policy": {"id": "Q-1"}, "rating": {"total": 1200.5}}));
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f)
//! # }
//! ```
//!
//! Copyright (c) 2025 RateBridge Team
//! Licensed under the Apache-2.0 license

// Core types and error definitions
pub mod types;

// Field and mapping execution
pub mod engine;

#[cfg(test)]
mod tests;

pub use engine::TransformationEngine;
pub use types::{
    DataType, DateFormat, FieldMapping, Mapping, MappingDirection, MappingResult, RequiredPolicy,
    SkipBehavior, Transformation, TransformationError,
};
