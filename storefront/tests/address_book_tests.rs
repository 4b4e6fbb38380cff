// tests/address_book_tests.rs
mod common;

use intellibazar::models::{AddressDraft, AddressKind};
use intellibazar::AppError;
use proptest::prelude::*;
use rstest::rstest;
use uuid::Uuid;

fn draft(label: &str, is_default: Option<bool>) -> AddressDraft {
  AddressDraft {
    label: label.to_string(),
    first_name: "Asha".to_string(),
    last_name: "Rao".to_string(),
    phone: "9876543210".to_string(),
    street_address: format!("{} Street", label),
    city: "Pune".to_string(),
    state: "MH".to_string(),
    pincode: "411001".to_string(),
    country: None,
    kind: Some(AddressKind::Home),
    is_default,
  }
}

#[tokio::test]
async fn first_address_becomes_default_and_country_defaults() {
  let app = common::app(false);
  let user = Uuid::new_v4();
  let book = app.state.addresses();

  let first = book.create(user, draft("Home", None)).await.unwrap();
  assert!(first.is_default);
  assert_eq!(first.country, "India");

  let second = book.create(user, draft("Office", None)).await.unwrap();
  assert!(!second.is_default);
  assert_eq!(book.default_address(user).await.unwrap().map(|a| a.id), Some(first.id));
}

#[tokio::test]
async fn explicit_default_takes_over() {
  let app = common::app(false);
  let user = Uuid::new_v4();
  let book = app.state.addresses();

  let first = book.create(user, draft("Home", None)).await.unwrap();
  let second = book.create(user, draft("Office", Some(true))).await.unwrap();

  let list = book.list(user).await.unwrap();
  assert_eq!(list.iter().filter(|a| a.is_default).count(), 1);
  assert_eq!(list[0].id, second.id);
  assert!(!book.get(user, first.id).await.unwrap().is_default);
}

#[tokio::test]
async fn deleting_default_promotes_a_remaining_address() {
  let app = common::app(false);
  let user = Uuid::new_v4();
  let book = app.state.addresses();

  let home = book.create(user, draft("Home", None)).await.unwrap();
  let office = book.create(user, draft("Office", None)).await.unwrap();

  let removal = book.delete(user, home.id).await.unwrap();
  assert!(removal.was_default);
  assert_eq!(removal.promoted, Some(office.id));
  assert!(book.get(user, office.id).await.unwrap().is_default);

  let last = book.delete(user, office.id).await.unwrap();
  assert_eq!(last.promoted, None);
  assert!(book.list(user).await.unwrap().is_empty());
}

#[tokio::test]
async fn addresses_are_private_to_their_owner() {
  let app = common::app(false);
  let owner = Uuid::new_v4();
  let stranger = Uuid::new_v4();
  let book = app.state.addresses();

  let home = book.create(owner, draft("Home", None)).await.unwrap();
  assert!(matches!(book.get(stranger, home.id).await, Err(AppError::NotFound(_))));
  assert!(matches!(book.delete(stranger, home.id).await, Err(AppError::NotFound(_))));
  assert!(matches!(book.set_default(stranger, home.id).await, Err(AppError::NotFound(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_addresses_agree_on_one_default() {
  let app = common::app(false);
  let user = Uuid::new_v4();

  let writes = (0..8).map(|i| {
    let book = app.state.addresses();
    tokio::spawn(async move { book.create(user, draft(&format!("Spot {i}"), None)).await })
  });
  for created in futures_util::future::join_all(writes).await {
    created.unwrap().unwrap();
  }

  let list = app.state.addresses().list(user).await.unwrap();
  assert_eq!(list.len(), 8);
  assert_eq!(list.iter().filter(|a| a.is_default).count(), 1);
}

#[rstest]
#[case("41100")]
#[case("4110011")]
#[case("41100a")]
#[case("४११००१")]
#[tokio::test]
async fn malformed_pincode_rejects_the_whole_write(#[case] pincode: &str) {
  let app = common::app(false);
  let user = Uuid::new_v4();
  let mut bad = draft("Home", None);
  bad.pincode = pincode.to_string();

  let err = app.state.addresses().create(user, bad).await.unwrap_err();
  assert!(matches!(err, AppError::Validation(_)));
  assert!(app.state.addresses().list(user).await.unwrap().is_empty());
}

#[tokio::test]
async fn blank_field_is_rejected() {
  let app = common::app(false);
  let mut bad = draft("Home", None);
  bad.city = "   ".to_string();
  let err = app.state.addresses().create(Uuid::new_v4(), bad).await.unwrap_err();
  assert_eq!(err.public_message(), "All fields are required");
}

#[derive(Debug, Clone)]
enum Op {
  Create(bool),
  SetDefault(usize),
  Update(usize, bool),
  Delete(usize),
}

fn op() -> impl Strategy<Value = Op> {
  prop_oneof![
    any::<bool>().prop_map(Op::Create),
    (0usize..8).prop_map(Op::SetDefault),
    (0usize..8, any::<bool>()).prop_map(|(i, d)| Op::Update(i, d)),
    (0usize..8).prop_map(Op::Delete),
  ]
}

proptest! {
  #![proptest_config(ProptestConfig::with_cases(48))]

  #[test]
  fn any_sequence_leaves_exactly_one_default(ops in prop::collection::vec(op(), 1..24)) {
    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
    let outcome = rt.block_on(async move {
      let app = common::app(false);
      let user = Uuid::new_v4();
      let book = app.state.addresses();

      for op in ops {
        let ids: Vec<Uuid> = book.list(user).await.unwrap().iter().map(|a| a.id).collect();
        let pick = |i: usize| ids.get(i % ids.len().max(1)).copied();
        match op {
          Op::Create(default) => {
            book.create(user, draft("Spot", Some(default))).await.unwrap();
          }
          Op::SetDefault(i) => {
            if let Some(id) = pick(i) {
              book.set_default(user, id).await.unwrap();
            }
          }
          Op::Update(i, default) => {
            if let Some(id) = pick(i) {
              book.update(user, id, draft("Moved", Some(default))).await.unwrap();
            }
          }
          Op::Delete(i) => {
            if let Some(id) = pick(i) {
              book.delete(user, id).await.unwrap();
            }
          }
        }

        let list = book.list(user).await.unwrap();
        let defaults = list.iter().filter(|a| a.is_default).count();
        prop_assert_eq!(defaults, usize::from(!list.is_empty()));
      }
      Ok::<_, TestCaseError>(())
    });
    outcome?;
  }
}
