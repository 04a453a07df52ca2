//! HTTP surface: routes, auth middleware and error mapping

pub mod middleware;
mod routes;

pub use routes::build_router;
