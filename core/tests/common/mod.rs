// core/tests/common/mod.rs
#![allow(dead_code)]

use once_cell::sync::Lazy;
use std::time::Duration;
use tracing::Level;
use wardflow::{ContextData, FlowError, Handler, PipelineControl};

/// A toy intake workflow: each step stamps its name into `trail`.
#[derive(Clone, Debug, Default)]
pub struct IntakeCtx {
  pub visits: i32,
  pub notes: String,
  pub trail: Vec<String>,
  pub halt_at: Option<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("engine: {0}")]
  Flow(String),

  #[error("handler: {0}")]
  Handler(String),
}

impl From<FlowError> for TestError {
  fn from(err: FlowError) -> Self {
    TestError::Flow(format!("{:?}", err))
  }
}

pub fn stamp(step: &'static str, note: &'static str) -> Handler<IntakeCtx, TestError> {
  Box::new(move |ctx: ContextData<IntakeCtx>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.visits += 1;
      guard.notes.push_str(note);
      guard.trail.push(step.to_string());
      tracing::debug!(target: "test_handlers", step, visits = guard.visits, "stamped");
      if guard.halt_at.as_deref() == Some(step) {
        return Ok(PipelineControl::Stop);
      }
      Ok::<_, TestError>(PipelineControl::Continue)
    })
  })
}

/// Sleeps first so the run really suspends between guard scopes.
pub fn slow_stamp(step: &'static str) -> Handler<IntakeCtx, TestError> {
  Box::new(move |ctx: ContextData<IntakeCtx>| {
    Box::pin(async move {
      tokio::time::sleep(Duration::from_millis(5)).await;
      ctx.write().trail.push(step.to_string());
      Ok::<_, TestError>(PipelineControl::Continue)
    })
  })
}

pub fn fail(step: &'static str, message: &'static str) -> Handler<IntakeCtx, TestError> {
  Box::new(move |ctx: ContextData<IntakeCtx>| {
    Box::pin(async move {
      ctx.write().trail.push(step.to_string());
      Err::<PipelineControl, _>(TestError::Handler(message.to_string()))
    })
  })
}

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
