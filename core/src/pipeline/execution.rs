// core/src/pipeline/execution.rs

//! `Pipeline::run`.

use crate::core::context_data::ContextData;
use crate::core::control::{PipelineControl, PipelineResult};
use crate::error::FlowError;
use crate::pipeline::definition::{Phase, Pipeline};
use tracing::{event, info_span, instrument, Instrument, Level};

const PHASES: [Phase; 3] = [Phase::Before, Phase::On, Phase::After];

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Runs every step in order against `ctx_data`.
  ///
  /// A step is skipped when its `skip_if` returns true, or when it is optional
  /// and has no handlers. A required step with no handlers at all fails with
  /// `FlowError::HandlerMissing`. The first handler error aborts the run.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(context_type = %std::any::type_name::<TData>(), num_steps = self.steps.len()),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    event!(Level::DEBUG, "Pipeline run starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();
      let step_span = info_span!("step", step_name, step_index = step_idx, optional = step_def.optional);

      if let Some(skip_if) = &step_def.skip_if {
        if skip_if(&ctx_data) {
          step_span.in_scope(|| event!(Level::DEBUG, "Step skipped by condition."));
          continue;
        }
      }

      let has_any = PHASES.iter().any(|phase| !self.handlers(*phase, step_name).is_empty());
      if !has_any {
        if step_def.optional {
          step_span.in_scope(|| event!(Level::DEBUG, "Optional step has no handlers, skipping."));
          continue;
        }
        step_span.in_scope(|| event!(Level::ERROR, "Required step has no handlers."));
        return Err(Err::from(FlowError::HandlerMissing {
          step_name: step_def.name.clone(),
        }));
      }

      for phase in PHASES {
        for (handler_idx, handler_fn) in self.handlers(phase, step_name).iter().enumerate() {
          let handler_span = tracing::debug_span!(
            parent: &step_span,
            "handler",
            phase = phase.label(),
            handler_index = handler_idx
          );
          let outcome = handler_fn(ctx_data.clone()).instrument(handler_span.clone()).await;
          match outcome {
            Ok(PipelineControl::Continue) => {}
            Ok(PipelineControl::Stop) => {
              handler_span.in_scope(|| event!(Level::INFO, "Pipeline stopped by handler."));
              return Ok(PipelineResult::Stopped);
            }
            Err(e) => {
              handler_span.in_scope(|| event!(Level::ERROR, error = %e, "Handler failed."));
              return Err(e);
            }
          }
        }
      }
    }

    event!(Level::DEBUG, "Pipeline run completed.");
    Ok(PipelineResult::Completed)
  }
}
