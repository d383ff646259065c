//! Marketplace rules that do not touch the database: bundle pricing, order
//! charges, the status transition table, revenue aggregation and review
//! eligibility. Services load rows and hand them to these functions.

pub mod pricing;
pub mod revenue;
pub mod review;
pub mod status;
pub mod types;

pub use pricing::{ChargePolicy, OrderCharges, bundle_subtotal, discounted_price};
pub use status::OrderStatus;
pub use types::{PaymentMethod, Role};
