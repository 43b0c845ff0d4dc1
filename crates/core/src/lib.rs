pub mod config;
pub mod domain;
pub mod errors;
pub mod numeric;
pub mod pricing;
pub mod submission;

pub use domain::booking::{BookingAction, BookingDraft, DurationUnit, RequestedDuration};
pub use domain::catalog::{
    CatalogSnapshot, ExcludeParameter, Extra, FrequencyDependencies, FrequencyRow, Industry,
    IndustryId, PricingParameter, Provider, ServiceCategory,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use pricing::dependencies::{resolve_dependencies, DependencyTicket, DependencyTracker};
pub use pricing::eligibility::{evaluate_eligibility, reconcile_draft, Audience, Eligibility};
pub use pricing::quote::{DeterministicQuoteEngine, QuoteBreakdown, QuoteEngine, QuoteInput};
pub use pricing::{
    BookingEvaluation, BookingEvaluationInput, BookingRuntime, DeterministicBookingRuntime,
};
pub use submission::{
    prepare_booking, BookingField, BookingPayload, BookingRouting, BookingValidation,
};
