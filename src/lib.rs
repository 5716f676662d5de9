//! Progressive resolution of source catalog tracks into a playable queue.
//!
//! Tracks are discovered on a metadata-only source catalog and played from
//! an independent playback catalog. This crate bridges the two:
//!
//! * [`matcher`] scores playback catalog candidates against source metadata
//! * [`resolver`] searches the playback catalog, picks the best candidate and
//!   memoizes the outcome in a [`cache`]
//! * [`pager`] fetches a source listing page by page
//! * [`queue`] hands out the first playable item after a single resolution
//!   and resolves the rest in bounded batches as playback needs them
//!
//! The upstreams are reached through the [`catalog::CatalogClient`] and
//! [`gateway::SourceListingClient`] traits, authorized by a
//! [`token::AuthProvider`].
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_panics_doc)]

#[macro_use]
extern crate log;

pub mod cache;
pub mod catalog;
pub mod config;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod http;
pub mod matcher;
pub mod pager;
pub mod protocol;
pub mod queue;
pub mod resolver;
pub mod token;
pub mod track;

#[cfg(test)]
mod testing;
