//! Core types and orchestration for the Tether sync layer.
//!
//! A remote paginated feed and a local persistent cache are reconciled here
//! into a single observable source of truth. This crate is deliberately free
//! of HTTP and database dependencies; backends implement the contracts in
//! [`store`] and [`remote`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod entity;
pub mod error;
pub mod feed;
pub mod list;
pub mod memory;
pub mod page;
pub mod pagination;
pub mod remote;
pub mod result;
pub mod ssot;
pub mod store;
pub mod venue;
pub mod watchers;

pub use entity::Entity;
pub use error::{Error, ErrorKind, Failure, Result};
pub use result::ResultState;

#[cfg(test)]
mod tests;
