//! Outbound calls to external rating and policy systems
//!
//! # Module Organization
//!
//! - [`error`] - HTTP error classification
//! - [`transport`] - the transport seam, reqwest and mock transports
//! - [`invoker`] - system registry records and the [`SystemInvoker`]
//!
//! No retries happen here; a failed call fails its pipeline step.
//!
//! Copyright (c) 2025 RateBridge Team
//! Licensed under the Apache-2.0 license

pub mod error;
pub mod invoker;
pub mod transport;

pub use error::{ErrorClassification, HttpError};
pub use invoker::{expand_env_vars, CallConfig, ExternalSystem, InvocationOutcome, InvokerConfig, SystemInvoker};
pub use transport::{InboundResponse, MockTransport, OutboundRequest, ReqwestTransport, SystemTransport};
