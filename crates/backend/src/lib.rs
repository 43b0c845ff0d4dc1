//! Async collaborators between the pricing core and the booking backend.

pub mod availability;
pub mod catalog;
pub mod client;
pub mod dependencies;
pub mod error;
pub mod http;
pub mod memory;
pub mod session;
pub mod wire;

pub use availability::{provider_availability, AvailabilityReport};
pub use catalog::{load_catalog, CatalogLoadReport, CatalogRequest};
pub use client::{BackendClient, FrequencyQuery};
pub use dependencies::fetch_dependencies;
pub use error::{BackendError, SubmissionError};
pub use http::HttpBackend;
pub use memory::{Endpoint, InMemoryBackend};
pub use session::{submit_booking, BookingConfirmation, BookingSession};
