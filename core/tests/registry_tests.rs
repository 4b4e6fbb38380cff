// tests/registry_tests.rs
mod common;

use bazar_flow::{Control, Flow, FlowData, Outcome, Registry, StageDef};
use common::*;
use serial_test::serial;

#[derive(Debug, Default)]
struct Receipt {
  lines: Vec<String>,
}

#[tokio::test]
#[serial]
async fn dispatches_by_context_type() {
  setup_tracing();
  let registry = Registry::<TallyError>::new();

  let mut tally_flow = Flow::<Tally, TallyError>::new(vec![StageDef::required("count")]);
  tally_flow.on("count", add("count", 7));
  registry.register(tally_flow);

  let mut receipt_flow = Flow::<Receipt, TallyError>::new(vec![StageDef::required("print")]);
  receipt_flow.on("print", |r: FlowData<Receipt>| async move {
    r.write().lines.push("thank you".into());
    Ok::<_, TallyError>(Control::Continue)
  });
  registry.register(receipt_flow);

  assert!(registry.contains::<Tally>());
  assert!(registry.contains::<Receipt>());

  let tally = FlowData::new(Tally::default());
  assert_eq!(registry.run(tally.clone()).await.unwrap(), Outcome::Completed);
  assert_eq!(tally.read().total, 7);

  let receipt = FlowData::new(Receipt::default());
  registry.run(receipt.clone()).await.unwrap();
  assert_eq!(receipt.read().lines, vec!["thank you"]);
}

#[tokio::test]
#[serial]
async fn unregistered_context_type_is_a_configuration_error() {
  setup_tracing();
  let registry = Registry::<TallyError>::new();
  let err = registry.run(FlowData::new(Receipt::default())).await.unwrap_err();
  assert!(matches!(err, TallyError::Engine(ref m) if m.contains("Configuration")));
}

#[tokio::test]
#[serial]
async fn later_registration_replaces_earlier_one() {
  setup_tracing();
  let registry = Registry::<TallyError>::new();

  let mut first = Flow::<Tally, TallyError>::new(vec![StageDef::required("count")]);
  first.on("count", add("first", 1));
  registry.register(first);

  let mut second = Flow::<Tally, TallyError>::new(vec![StageDef::required("count")]);
  second.on("count", add("second", 2));
  registry.register(second);

  let data = FlowData::new(Tally::default());
  registry.run(data.clone()).await.unwrap();
  assert_eq!(data.read().visited, vec!["second"]);
}
