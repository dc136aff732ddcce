//! carfinder-api: wire protocol and HTTP client for the Car Finder service
//!
//! This crate frames the chat endpoint's server-sent event stream into
//! [`StreamEvent`]s and exposes typed access to the alerts feed.

pub mod client;
pub mod error;
pub mod sse;
pub mod stream;
pub mod types;

pub use client::{ChatClient, ChatResponse, DEFAULT_BASE_URL};
pub use error::{Error, Result};
pub use stream::{EventStream, StreamEvent};
pub use types::*;
