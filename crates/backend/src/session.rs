use std::sync::Arc;

use homequote_core::domain::booking::{BookingAction, BookingDraft};
use homequote_core::domain::catalog::CatalogSnapshot;
use homequote_core::pricing::dependencies::DependencyTracker;
use homequote_core::pricing::eligibility::{reconcile_draft, Audience};
use homequote_core::pricing::quote::{DeterministicQuoteEngine, QuoteBreakdown};
use homequote_core::pricing::{
    BookingEvaluation, BookingEvaluationInput, BookingRuntime, DeterministicBookingRuntime,
};
use homequote_core::submission::{prepare_booking, BookingPayload, BookingRouting, DEFAULT_CURRENCY};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::catalog::{load_catalog, CatalogLoadReport, CatalogRequest};
use crate::client::BackendClient;
use crate::dependencies::fetch_dependencies;
use crate::error::SubmissionError;

/// What the backend accepted, alongside the exact figures that were sent.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BookingConfirmation {
    pub response: Value,
    pub quote: QuoteBreakdown,
    pub payload: BookingPayload,
}

/// Validates, prices and posts one booking.
///
/// The quote is computed here from `draft` immediately before the payload is
/// built. An incomplete draft never reaches the backend.
pub async fn submit_booking<C>(
    client: &C,
    catalog: &CatalogSnapshot,
    draft: &BookingDraft,
    routing: BookingRouting<'_>,
) -> Result<BookingConfirmation, SubmissionError>
where
    C: BackendClient + ?Sized,
{
    let prepared = match prepare_booking(&DeterministicQuoteEngine, catalog, draft, routing) {
        Ok(prepared) => prepared,
        Err(validation) => {
            let missing: Vec<&str> =
                validation.missing().into_iter().map(|field| field.as_str()).collect();
            info!(
                event_name = "booking.submit.incomplete",
                industry_id = %catalog.industry.id.0,
                missing = ?missing,
                "booking blocked by missing fields"
            );
            return Err(SubmissionError::Validation(validation));
        }
    };

    match client.create_booking(&prepared.payload).await {
        Ok(response) => {
            info!(
                event_name = "booking.submit.accepted",
                industry_id = %catalog.industry.id.0,
                amount = %prepared.quote.final_amount,
                "booking accepted by backend"
            );
            Ok(BookingConfirmation { response, quote: prepared.quote, payload: prepared.payload })
        }
        Err(error) => {
            let error = SubmissionError::from(error);
            warn!(
                event_name = "booking.submit.rejected",
                industry_id = %catalog.industry.id.0,
                error = %error,
                "booking not accepted"
            );
            Err(error)
        }
    }
}

/// One in-progress booking form bound to a catalog snapshot.
///
/// Every action goes through [`BookingDraft::apply`], refreshes frequency
/// dependencies when the frequency changed, and reconciles the draft against
/// the resulting eligibility.
pub struct BookingSession<C: ?Sized> {
    client: Arc<C>,
    catalog: CatalogSnapshot,
    draft: BookingDraft,
    tracker: DependencyTracker,
    audience: Audience,
    business_id: Option<String>,
    currency: String,
    runtime: DeterministicBookingRuntime<DeterministicQuoteEngine>,
}

impl<C> BookingSession<C>
where
    C: BackendClient + ?Sized,
{
    pub fn new(client: Arc<C>, catalog: CatalogSnapshot, audience: Audience) -> Self {
        Self {
            client,
            catalog,
            draft: BookingDraft::default(),
            tracker: DependencyTracker::default(),
            audience,
            business_id: None,
            currency: DEFAULT_CURRENCY.to_string(),
            runtime: DeterministicBookingRuntime::default(),
        }
    }

    /// Loads the catalog for `request` and opens an empty draft over it.
    pub async fn open(
        client: Arc<C>,
        request: &CatalogRequest,
        audience: Audience,
    ) -> (Self, CatalogLoadReport) {
        let (catalog, report) = load_catalog(client.as_ref(), request).await;
        let mut session = Self::new(client, catalog, audience);
        session.business_id = request.business_id.clone();
        (session, report)
    }

    /// Currency stamped on submitted bookings.
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn catalog(&self) -> &CatalogSnapshot {
        &self.catalog
    }

    pub fn draft(&self) -> &BookingDraft {
        &self.draft
    }

    /// Replaces the whole draft, as when a caller hands over a saved form.
    /// Extra quantities are clamped the same way [`BookingSession::dispatch`]
    /// clamps them one selection at a time.
    pub async fn restore(&mut self, draft: BookingDraft) -> BookingEvaluation {
        let clamped = draft.clamp_quantities(&self.catalog);
        self.transition(clamped).await
    }

    pub async fn dispatch(&mut self, action: BookingAction) -> BookingEvaluation {
        let next = self.draft.apply(&self.catalog, action);
        self.transition(next).await
    }

    async fn transition(&mut self, next: BookingDraft) -> BookingEvaluation {
        if next.frequency != self.draft.frequency || self.tracker.generation() == 0 {
            self.refresh_dependencies(next.frequency.clone()).await;
        }

        let (reconciled, _) =
            reconcile_draft(&self.catalog, &next, self.tracker.resolved(), self.audience);
        if reconciled.frequency.is_none() && next.frequency.is_some() {
            self.tracker.begin(self.catalog.industry.id.clone(), None);
        }

        self.draft = reconciled;
        self.evaluate()
    }

    async fn refresh_dependencies(&mut self, frequency: Option<String>) {
        let ticket = self.tracker.begin(self.catalog.industry.id.clone(), frequency);
        let dependencies = fetch_dependencies(self.client.as_ref(), &ticket).await;
        self.tracker.complete(&ticket, dependencies);
    }

    /// Eligibility, repaired draft and quote for the current state.
    pub fn evaluate(&self) -> BookingEvaluation {
        self.runtime.evaluate(BookingEvaluationInput {
            catalog: &self.catalog,
            draft: &self.draft,
            dependencies: self.tracker.resolved(),
            audience: self.audience,
        })
    }

    /// Submits the current draft. The draft resets only when the backend
    /// accepts the booking; on any failure it is left as it was for retry.
    pub async fn submit(&mut self) -> Result<BookingConfirmation, SubmissionError> {
        let confirmation = submit_booking(
            self.client.as_ref(),
            &self.catalog,
            &self.draft,
            BookingRouting { business_id: self.business_id.as_deref(), currency: &self.currency },
        )
        .await?;

        self.draft = self.draft.apply(&self.catalog, BookingAction::Reset);
        self.tracker.begin(self.catalog.industry.id.clone(), None);
        Ok(confirmation)
    }
}
