// core/src/core/handler.rs
use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use std::future::Future;
use std::pin::Pin;

/// A boxed async step handler.
///
/// Each invocation receives its own clone of the run's `ContextData<TData>`.
/// Handlers lock it to read or mutate state, and must release the guard
/// before awaiting.
pub type Handler<TData, Err> = Box<
  dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<PipelineControl, Err>> + Send>>
    + Send
    + Sync,
>;
