// core/src/lib.rs

//! bazar_flow: a small asynchronous workflow engine.
//!
//! A [`Flow`] is an ordered list of named stages. Each stage can carry
//! `before`, `on` and `after` handlers that receive a shared [`FlowData`]
//! and answer with a [`Control`] signal. Stages may be optional, may be
//! skipped by a predicate, and may branch into sub-flows that operate on a
//! context extracted from the parent. A type-keyed [`Registry`] lets an
//! application run the right flow for a given context type.
//!
//! ```ignore
//! let mut flow = Flow::<Quote, MyError>::new(vec![
//!   StageDef::required("price"),
//!   StageDef::optional("announce").skip_when(|q: &Quote| q.silent),
//! ]);
//! flow.on("price", |data: FlowData<Quote>| async move {
//!   data.write().total = 42;
//!   Ok::<_, MyError>(Control::Continue)
//! });
//! let outcome = flow.run(FlowData::new(Quote::default())).await?;
//! ```

pub mod branch;
pub mod control;
pub mod data;
pub mod error;
pub mod flow;
pub mod registry;
pub mod stage;

pub use crate::branch::{BranchBuilder, FlowSource, RouteConfigurator, StaticSource};
pub use crate::control::{Control, Outcome};
pub use crate::data::FlowData;
pub use crate::error::{FlowError, FlowResult};
pub use crate::flow::{Flow, Handler};
pub use crate::registry::Registry;
pub use crate::stage::StageDef;
