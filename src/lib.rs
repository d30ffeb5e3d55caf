//! Balera: a public dance-event discovery service.
//!
//! Visitors browse cached, server-rendered event pages; administrators
//! manage records through a JSON API; and the [`revalidate`] subsystem keeps
//! the rendered-page cache consistent with record mutations — eventually,
//! with the cache's freshness window bounding worst-case staleness.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod revalidate;
pub mod util;
