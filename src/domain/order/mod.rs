//! Order domain - purchases of pooled addresses and their payment state.

mod aggregate;
mod errors;
mod pricing;
mod state;

pub use aggregate::{Order, OrderRequest, MAX_WEEKS};
pub use errors::OrderError;
pub use pricing::{FlatPricing, Price};
pub use state::OrderState;
