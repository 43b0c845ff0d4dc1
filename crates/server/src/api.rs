//! JSON API over the pricing engine and the booking backend.
//!
//! - `POST /api/v1/eligibility`: eligible options and the repaired draft
//! - `POST /api/v1/quote`: price breakdown for a draft
//! - `POST /api/v1/bookings`: validate, price and submit a booking
//! - `GET  /api/v1/availability`: merged provider slots for a date range

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{Days, NaiveDate};
use homequote_backend::{
    provider_availability, AvailabilityReport, BackendClient, BookingConfirmation, BookingSession,
    CatalogRequest, SubmissionError,
};
use homequote_core::config::AppConfig;
use homequote_core::domain::booking::BookingDraft;
use homequote_core::domain::catalog::IndustryId;
use homequote_core::pricing::eligibility::{Audience, Eligibility};
use homequote_core::pricing::quote::QuoteBreakdown;
use homequote_core::submission::BookingField;
use homequote_core::{ApplicationError, DomainError, InterfaceError};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

const MAX_AVAILABILITY_DAYS: u32 = 14;

#[derive(Clone)]
pub struct ApiState {
    backend: Arc<dyn BackendClient>,
    default_audience: Audience,
    business_id: Option<String>,
    currency: String,
}

impl ApiState {
    pub fn new(backend: Arc<dyn BackendClient>, config: &AppConfig) -> Self {
        Self {
            backend,
            default_audience: config.booking.default_audience,
            business_id: config.backend.business_id.clone(),
            currency: config.booking.currency.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BookingRequest {
    pub industry_id: String,
    #[serde(default)]
    pub business_id: Option<String>,
    #[serde(default)]
    pub zipcode: Option<String>,
    #[serde(default)]
    pub audience: Option<Audience>,
    #[serde(default)]
    pub draft: BookingDraft,
}

#[derive(Debug, Serialize)]
pub struct EligibilityResponse {
    pub eligibility: Eligibility,
    pub draft: BookingDraft,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
    #[serde(default)]
    pub days: Option<u32>,
    #[serde(default)]
    pub business_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub correlation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<BookingField, bool>>,
}

type ApiFailure = (StatusCode, Json<ApiError>);

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/eligibility", post(eligibility))
        .route("/api/v1/quote", post(quote))
        .route("/api/v1/bookings", post(create_booking))
        .route("/api/v1/availability", get(availability))
        .with_state(state)
}

fn correlation_id() -> String {
    Uuid::new_v4().to_string()
}

fn application_failure(error: ApplicationError, correlation_id: &str) -> ApiFailure {
    let fields = match &error {
        ApplicationError::Validation(validation) => Some(validation.fields.clone()),
        _ => None,
    };
    let interface = error.into_interface(correlation_id);
    warn!(
        event_name = "api.request.failed",
        correlation_id,
        error = %interface,
        "request could not be completed"
    );

    let status = match (&interface, fields.is_some()) {
        (_, true) => StatusCode::UNPROCESSABLE_ENTITY,
        (InterfaceError::BadRequest { .. }, false) => StatusCode::BAD_REQUEST,
        (InterfaceError::ServiceUnavailable { .. }, false) => StatusCode::SERVICE_UNAVAILABLE,
        (InterfaceError::Internal { .. }, false) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = ApiError {
        error: interface.user_message().to_string(),
        correlation_id: interface.correlation_id().to_string(),
        detail: None,
        hint: None,
        backend_status: None,
        fields,
    };
    (status, Json(body))
}

fn submission_failure(error: SubmissionError, correlation_id: &str) -> ApiFailure {
    match error {
        SubmissionError::Validation(validation) => {
            application_failure(ApplicationError::Validation(validation), correlation_id)
        }
        SubmissionError::Rejected { status, error, detail, hint } => (
            StatusCode::BAD_GATEWAY,
            Json(ApiError {
                error,
                correlation_id: correlation_id.to_string(),
                detail,
                hint,
                backend_status: Some(status),
                fields: None,
            }),
        ),
        SubmissionError::Transport(message) => {
            application_failure(ApplicationError::Integration(message), correlation_id)
        }
    }
}

impl ApiState {
    async fn session(
        &self,
        request: &BookingRequest,
        correlation_id: &str,
    ) -> Result<BookingSession<dyn BackendClient>, ApiFailure> {
        let industry_id = request.industry_id.trim();
        if industry_id.is_empty() {
            let error = DomainError::UnknownIndustry("industry_id must not be blank".to_string());
            return Err(application_failure(error.into(), correlation_id));
        }

        let catalog_request = CatalogRequest {
            industry_id: IndustryId(industry_id.to_string()),
            business_id: request.business_id.clone().or_else(|| self.business_id.clone()),
            zipcode: request.zipcode.clone(),
        };
        let audience = request.audience.unwrap_or(self.default_audience);
        let (session, report) =
            BookingSession::open(Arc::clone(&self.backend), &catalog_request, audience).await;
        let mut session = session.with_currency(self.currency.clone());
        if !report.is_complete() {
            info!(
                event_name = "api.catalog.partial",
                correlation_id,
                industry_id,
                degraded = ?report.degraded,
                "serving request from a partial catalog"
            );
        }

        session.restore(request.draft.clone()).await;
        Ok(session)
    }
}

async fn eligibility(
    State(state): State<ApiState>,
    Json(request): Json<BookingRequest>,
) -> Result<Json<EligibilityResponse>, ApiFailure> {
    let correlation_id = correlation_id();
    let session = state.session(&request, &correlation_id).await?;
    let evaluation = session.evaluate();

    info!(
        event_name = "api.eligibility.evaluated",
        correlation_id = %correlation_id,
        industry_id = %request.industry_id,
        extras = evaluation.eligibility.extras.len(),
        "eligibility evaluated"
    );
    Ok(Json(EligibilityResponse { eligibility: evaluation.eligibility, draft: evaluation.draft }))
}

async fn quote(
    State(state): State<ApiState>,
    Json(request): Json<BookingRequest>,
) -> Result<Json<QuoteBreakdown>, ApiFailure> {
    let correlation_id = correlation_id();
    let session = state.session(&request, &correlation_id).await?;
    let quote = session.evaluate().quote;

    info!(
        event_name = "api.quote.computed",
        correlation_id = %correlation_id,
        industry_id = %request.industry_id,
        final_amount = %quote.final_amount,
        "quote computed"
    );
    Ok(Json(quote))
}

async fn create_booking(
    State(state): State<ApiState>,
    Json(request): Json<BookingRequest>,
) -> Result<(StatusCode, Json<BookingConfirmation>), ApiFailure> {
    let correlation_id = correlation_id();
    let mut session = state.session(&request, &correlation_id).await?;

    let confirmation =
        session.submit().await.map_err(|error| submission_failure(error, &correlation_id))?;
    info!(
        event_name = "api.booking.created",
        correlation_id = %correlation_id,
        industry_id = %request.industry_id,
        "booking created"
    );
    Ok((StatusCode::CREATED, Json(confirmation)))
}

async fn availability(
    State(state): State<ApiState>,
    Query(query): Query<AvailabilityQuery>,
) -> Json<AvailabilityReport> {
    let days = query.days.unwrap_or(1).clamp(1, MAX_AVAILABILITY_DAYS);
    let dates: Vec<NaiveDate> = (0..days)
        .filter_map(|offset| query.date.checked_add_days(Days::new(u64::from(offset))))
        .collect();
    let business_id = query.business_id.or_else(|| state.business_id.clone());

    let report = provider_availability(Arc::clone(&state.backend), business_id, &dates).await;
    info!(
        event_name = "api.availability.merged",
        correlation_id = %correlation_id(),
        providers = report.providers_checked,
        failed = report.failed_providers.len(),
        "availability merged"
    );
    Json(report)
}
