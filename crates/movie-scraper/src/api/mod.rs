//! HTTP transport shared by every provider.
//!
//! This module provides the `Transport` seam and a cookie-aware `reqwest`
//! implementation that always presents a browser User-Agent.

pub mod client;

pub use client::{HttpClient, Transport, BROWSER_USER_AGENT};
