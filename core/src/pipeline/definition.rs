// core/src/pipeline/definition.rs

//! `Pipeline<TData, Err>` and its structural editing methods.

use crate::core::handler::Handler;
use crate::core::step::{SkipCondition, StepDef};
use crate::error::{FlowError, FlowResult};
use std::collections::HashMap;

/// Which handler list of a step a handler belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
  Before,
  On,
  After,
}

impl Phase {
  pub(crate) fn label(self) -> &'static str {
    match self {
      Phase::Before => "before",
      Phase::On => "on",
      Phase::After => "after",
    }
  }
}

/// An ordered set of named steps over context data `TData`.
///
/// Handlers return `Result<PipelineControl, Err>`. Engine failures such as a
/// required step with no handlers are converted into `Err` through
/// `From<FlowError>`.
pub struct Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) steps: Vec<StepDef<TData>>,
  pub(crate) before: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) on: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) after: HashMap<String, Vec<Handler<TData, Err>>>,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Builds a pipeline from `(name, optional, skip_if)` triples, in order.
  pub fn new(step_defs: &[(&str, bool, Option<SkipCondition<TData>>)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(name, optional, skip_if)| StepDef::new(*name, *optional, skip_if.clone()))
      .collect();

    Self {
      steps,
      before: HashMap::new(),
      on: HashMap::new(),
      after: HashMap::new(),
    }
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  pub(crate) fn position_of(&self, step_name: &str) -> FlowResult<usize> {
    self
      .steps
      .iter()
      .position(|s| s.name == step_name)
      .ok_or_else(|| FlowError::StepNotFound {
        step_name: step_name.to_string(),
      })
  }

  fn ensure_unique(&self, step_name: &str) -> FlowResult<()> {
    if self.steps.iter().any(|s| s.name == step_name) {
      return Err(FlowError::DuplicateStep {
        step_name: step_name.to_string(),
      });
    }
    Ok(())
  }

  pub(crate) fn handlers_mut(&mut self, phase: Phase) -> &mut HashMap<String, Vec<Handler<TData, Err>>> {
    match phase {
      Phase::Before => &mut self.before,
      Phase::On => &mut self.on,
      Phase::After => &mut self.after,
    }
  }

  pub(crate) fn handlers(&self, phase: Phase, step_name: &str) -> &[Handler<TData, Err>] {
    let table = match phase {
      Phase::Before => &self.before,
      Phase::On => &self.on,
      Phase::After => &self.after,
    };
    table.get(step_name).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn insert_before_step(
    &mut self,
    existing_step_name: &str,
    new_step_name: impl Into<String>,
    optional: bool,
    skip_if: Option<SkipCondition<TData>>,
  ) -> FlowResult<()> {
    let idx = self.position_of(existing_step_name)?;
    let name = new_step_name.into();
    self.ensure_unique(&name)?;
    self.steps.insert(idx, StepDef::new(name, optional, skip_if));
    Ok(())
  }

  pub fn insert_after_step(
    &mut self,
    existing_step_name: &str,
    new_step_name: impl Into<String>,
    optional: bool,
    skip_if: Option<SkipCondition<TData>>,
  ) -> FlowResult<()> {
    let idx = self.position_of(existing_step_name)?;
    let name = new_step_name.into();
    self.ensure_unique(&name)?;
    self.steps.insert(idx + 1, StepDef::new(name, optional, skip_if));
    Ok(())
  }

  /// Removes a step and every handler attached to it. Unknown names are a no-op.
  pub fn remove_step(&mut self, step_name: &str) {
    if let Ok(idx) = self.position_of(step_name) {
      self.steps.remove(idx);
      self.before.remove(step_name);
      self.on.remove(step_name);
      self.after.remove(step_name);
    }
  }

  pub fn set_optional(&mut self, step_name: &str, optional: bool) -> FlowResult<()> {
    let idx = self.position_of(step_name)?;
    self.steps[idx].optional = optional;
    Ok(())
  }

  pub fn set_skip_condition(&mut self, step_name: &str, skip_if: Option<SkipCondition<TData>>) -> FlowResult<()> {
    let idx = self.position_of(step_name)?;
    self.steps[idx].skip_if = skip_if;
    Ok(())
  }
}
