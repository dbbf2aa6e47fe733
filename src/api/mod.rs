//! Remote inventory client: request shapes, transport, and response decoding.

/// Typed fetches with retry and bounded fan-out
pub mod client;

/// Decoders for the REST documents
pub mod parse;

/// Relevance query building and tuple projection
pub mod relevance;

/// REST paths and relevance requests, including the master-site shapes
pub mod request;

/// The transport seam and its HTTPS implementation
pub mod transport;

/// Minimal XML element tree
pub mod xml;

pub use client::{BesApi, RetryPolicy};
pub use request::ApiRequest;
pub use transport::{HttpTransport, Transport};
