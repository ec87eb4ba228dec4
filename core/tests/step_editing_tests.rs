// core/tests/step_editing_tests.rs
mod common;

use common::*;
use std::sync::Arc;
use wardflow::{ContextData, FlowError, Pipeline, PipelineResult};

#[test]
fn insert_before_and_after_existing_steps() {
  let mut pipeline = Pipeline::<IntakeCtx, TestError>::new(&[("triage", false, None), ("admit", false, None)]);
  pipeline.insert_before_step("admit", "check_insurance", false, None).unwrap();
  pipeline.insert_after_step("admit", "assign_bed", true, None).unwrap();

  assert_eq!(pipeline.step_names(), vec!["triage", "check_insurance", "admit", "assign_bed"]);
}

#[test]
fn editing_unknown_step_reports_step_not_found() {
  let mut pipeline = Pipeline::<IntakeCtx, TestError>::new(&[("triage", false, None)]);

  let err = pipeline.insert_after_step("ghost", "x", false, None).unwrap_err();
  assert!(matches!(err, FlowError::StepNotFound { ref step_name } if step_name == "ghost"));

  assert!(pipeline.set_optional("ghost", true).is_err());
  assert!(pipeline.on_root("ghost", stamp("ghost", "")).is_err());
}

#[test]
fn duplicate_step_names_are_rejected() {
  let mut pipeline = Pipeline::<IntakeCtx, TestError>::new(&[("triage", false, None)]);

  let err = pipeline.insert_after_step("triage", "triage", false, None).unwrap_err();
  assert!(matches!(err, FlowError::DuplicateStep { .. }));
}

#[tokio::test]
async fn removed_step_takes_its_handlers_with_it() {
  setup_tracing();
  let mut pipeline = Pipeline::<IntakeCtx, TestError>::new(&[("triage", false, None), ("admit", false, None)]);
  pipeline.on_root("triage", stamp("triage", "T")).unwrap();
  pipeline.on_root("admit", stamp("admit", "A")).unwrap();
  pipeline.remove_step("triage");
  pipeline.remove_step("never_existed");

  let ctx = ContextData::new(IntakeCtx::default());
  pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(ctx.read().trail, vec!["admit"]);
}

#[tokio::test]
async fn set_optional_and_skip_condition_after_construction() {
  setup_tracing();
  let mut pipeline = Pipeline::<IntakeCtx, TestError>::new(&[("triage", false, None), ("admit", false, None)]);
  pipeline.on_root("admit", stamp("admit", "A")).unwrap();
  pipeline.set_optional("triage", true).unwrap();
  pipeline
    .set_skip_condition("admit", Some(Arc::new(|ctx: &ContextData<IntakeCtx>| ctx.read().halt_at.is_some())))
    .unwrap();

  let ctx = ContextData::new(IntakeCtx {
    halt_at: Some("anything".into()),
    ..Default::default()
  });
  assert_eq!(pipeline.run(ctx.clone()).await.unwrap(), PipelineResult::Completed);
  assert!(ctx.read().trail.is_empty());
}
