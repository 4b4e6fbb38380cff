// storefront/src/checkout/mod.rs

//! Client-side checkout: the sign-in session, the three-step form, and the
//! orchestrator that places and settles the order once the form is submitted.

pub mod api;
pub mod orchestrator;
pub mod payment;
pub mod session;
pub mod wizard;

pub use api::{LocalOrderApi, OrderApi};
pub use orchestrator::{Basket, CheckoutOrchestrator, Confirmation};
pub use payment::{PaymentSession, PaymentSessionOutcome, SimulatedPaypalSession};
pub use session::{AuthSession, SessionUser};
pub use wizard::{CardDetails, CheckoutForm, CheckoutStep, CheckoutWizard};
