use async_trait::async_trait;
use chrono::NaiveDate;
use homequote_core::domain::catalog::{
    ExcludeParameter, Extra, FrequencyRow, Industry, IndustryId, PricingParameter, Provider,
    ServiceCategory,
};
use homequote_core::submission::BookingPayload;
use serde_json::Value;

use crate::error::BackendError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrequencyQuery {
    pub industry_id: IndustryId,
    pub include_all: bool,
    pub zipcode: Option<String>,
}

impl FrequencyQuery {
    pub fn for_industry(industry_id: IndustryId) -> Self {
        Self { industry_id, include_all: true, zipcode: None }
    }
}

/// Read and write access to the booking backend.
///
/// Implementations return typed, validated catalog data. Callers on read
/// paths are expected to degrade errors to empty results.
#[async_trait]
pub trait BackendClient: Send + Sync {
    async fn industries(&self, business_id: Option<&str>) -> Result<Vec<Industry>, BackendError>;

    async fn frequencies(&self, query: &FrequencyQuery) -> Result<Vec<FrequencyRow>, BackendError>;

    async fn service_categories(
        &self,
        industry_id: &IndustryId,
    ) -> Result<Vec<ServiceCategory>, BackendError>;

    async fn extras(&self, industry_id: &IndustryId) -> Result<Vec<Extra>, BackendError>;

    async fn pricing_parameters(
        &self,
        industry_id: &IndustryId,
    ) -> Result<Vec<PricingParameter>, BackendError>;

    async fn exclude_parameters(
        &self,
        industry_id: &IndustryId,
    ) -> Result<Vec<ExcludeParameter>, BackendError>;

    async fn providers(&self, business_id: Option<&str>) -> Result<Vec<Provider>, BackendError>;

    async fn available_slots(
        &self,
        provider_id: &str,
        date: NaiveDate,
        business_id: Option<&str>,
    ) -> Result<Vec<String>, BackendError>;

    async fn create_booking(&self, payload: &BookingPayload) -> Result<Value, BackendError>;

    /// Reachability check used by `GET /health`.
    async fn ping(&self) -> Result<(), BackendError>;
}
