// core/src/lib.rs

//! wardflow: async step pipelines for request workflows.
//!
//! A pipeline is an ordered list of named steps. Each step carries `before`,
//! `on` and `after` handlers that operate on a shared [`ContextData<T>`].
//! Any handler may stop the run early by returning [`PipelineControl::Stop`].
//! Pipelines are stored in a [`Registry`] keyed by their context type, so a
//! web handler only needs to build a context and call `registry.run(ctx)`.

pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::handler::Handler;
pub use crate::core::step::{SkipCondition, StepDef};
pub use crate::error::{FlowError, FlowResult};
pub use crate::pipeline::Pipeline;
pub use crate::registry::Registry;
