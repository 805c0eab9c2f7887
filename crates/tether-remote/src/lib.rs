//! HTTP remote sources for the Tether sync layer.
//!
//! Implements [`PageSource`](tether_core::remote::PageSource) for the venue
//! explore feed and [`EntitySource`](tether_core::remote::EntitySource) for
//! venue details, against a Foursquare-v2-shaped JSON API. Every transport,
//! status, and decoding fault is classified into a
//! [`Failure`](tether_core::Failure) here; nothing else leaks out.

pub mod client;
pub mod config;
pub mod detail;
pub mod explore;

mod wire;

pub use client::ApiClient;
pub use config::RemoteConfig;
pub use detail::VenueDetailSource;
pub use explore::ExploreSource;
