//! Unsubscribe endpoint.

mod handlers;
mod routes;

pub use routes::unsubscribe_routes;
