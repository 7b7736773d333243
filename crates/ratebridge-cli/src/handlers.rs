//! Command handlers for CLI subcommands
//!
//! Each handler loads what it needs from the bundle, drives ratebridge-core
//! and reports through the [`OutputWriter`](crate::output::OutputWriter).

mod completions;
mod route;
mod run;
mod transform;
mod utils;
mod validate;

pub use completions::handle_completions;
pub use route::handle_route;
pub use run::handle_run;
pub use transform::handle_transform;
pub use validate::handle_validate;
