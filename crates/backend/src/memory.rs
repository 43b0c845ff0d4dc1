use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::NaiveDate;
use homequote_core::domain::catalog::{
    CatalogSnapshot, ExcludeParameter, Extra, FrequencyRow, Industry, IndustryId,
    PricingParameter, Provider, ServiceCategory,
};
use homequote_core::submission::BookingPayload;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::client::{BackendClient, FrequencyQuery};
use crate::error::BackendError;

/// Backend operations that can be made to fail in an [`InMemoryBackend`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Endpoint {
    Industries,
    Frequencies,
    ServiceCategories,
    Extras,
    PricingParameters,
    ExcludeParameters,
    Providers,
    AvailableSlots,
    CreateBooking,
    Ping,
}

#[derive(Default)]
struct MemoryState {
    industries: Vec<Industry>,
    catalogs: BTreeMap<IndustryId, CatalogSnapshot>,
    providers: Vec<Provider>,
    slots: BTreeMap<(String, NaiveDate), Vec<String>>,
    failing: BTreeMap<Endpoint, BackendError>,
    failing_providers: BTreeSet<String>,
    bookings: Vec<BookingPayload>,
}

/// Backend double holding catalogs in memory.
#[derive(Default)]
pub struct InMemoryBackend {
    state: RwLock<MemoryState>,
}

impl InMemoryBackend {
    pub async fn insert_catalog(&self, catalog: CatalogSnapshot) {
        let mut state = self.state.write().await;
        if !state.industries.iter().any(|industry| industry.id == catalog.industry.id) {
            state.industries.push(catalog.industry.clone());
        }
        state.catalogs.insert(catalog.industry.id.clone(), catalog);
    }

    pub async fn insert_provider(&self, provider: Provider) {
        self.state.write().await.providers.push(provider);
    }

    pub async fn set_slots(&self, provider_id: &str, date: NaiveDate, slots: &[&str]) {
        let mut state = self.state.write().await;
        state
            .slots
            .insert((provider_id.to_string(), date), slots.iter().map(|s| s.to_string()).collect());
    }

    pub async fn fail(&self, endpoint: Endpoint, error: BackendError) {
        self.state.write().await.failing.insert(endpoint, error);
    }

    pub async fn fail_provider(&self, provider_id: &str) {
        self.state.write().await.failing_providers.insert(provider_id.to_string());
    }

    pub async fn recover(&self, endpoint: Endpoint) {
        self.state.write().await.failing.remove(&endpoint);
    }

    pub async fn bookings(&self) -> Vec<BookingPayload> {
        self.state.read().await.bookings.clone()
    }

    async fn catalog_part<T, F>(
        &self,
        endpoint: Endpoint,
        industry_id: &IndustryId,
        select: F,
    ) -> Result<Vec<T>, BackendError>
    where
        F: FnOnce(&CatalogSnapshot) -> Vec<T> + Send,
    {
        let state = self.state.read().await;
        check(&state, endpoint)?;
        Ok(state.catalogs.get(industry_id).map(select).unwrap_or_default())
    }
}

fn check(state: &MemoryState, endpoint: Endpoint) -> Result<(), BackendError> {
    match state.failing.get(&endpoint) {
        Some(error) => Err(error.clone()),
        None => Ok(()),
    }
}

#[async_trait]
impl BackendClient for InMemoryBackend {
    async fn industries(&self, _business_id: Option<&str>) -> Result<Vec<Industry>, BackendError> {
        let state = self.state.read().await;
        check(&state, Endpoint::Industries)?;
        Ok(state.industries.clone())
    }

    async fn frequencies(&self, query: &FrequencyQuery) -> Result<Vec<FrequencyRow>, BackendError> {
        self.catalog_part(Endpoint::Frequencies, &query.industry_id, |catalog| {
            catalog.frequencies.clone()
        })
        .await
    }

    async fn service_categories(
        &self,
        industry_id: &IndustryId,
    ) -> Result<Vec<ServiceCategory>, BackendError> {
        self.catalog_part(Endpoint::ServiceCategories, industry_id, |catalog| {
            catalog.service_categories.clone()
        })
        .await
    }

    async fn extras(&self, industry_id: &IndustryId) -> Result<Vec<Extra>, BackendError> {
        self.catalog_part(Endpoint::Extras, industry_id, |catalog| catalog.extras.clone()).await
    }

    async fn pricing_parameters(
        &self,
        industry_id: &IndustryId,
    ) -> Result<Vec<PricingParameter>, BackendError> {
        self.catalog_part(Endpoint::PricingParameters, industry_id, |catalog| {
            catalog.pricing_parameters.clone()
        })
        .await
    }

    async fn exclude_parameters(
        &self,
        industry_id: &IndustryId,
    ) -> Result<Vec<ExcludeParameter>, BackendError> {
        self.catalog_part(Endpoint::ExcludeParameters, industry_id, |catalog| {
            catalog.exclude_parameters.clone()
        })
        .await
    }

    async fn providers(&self, _business_id: Option<&str>) -> Result<Vec<Provider>, BackendError> {
        let state = self.state.read().await;
        check(&state, Endpoint::Providers)?;
        Ok(state.providers.clone())
    }

    async fn available_slots(
        &self,
        provider_id: &str,
        date: NaiveDate,
        _business_id: Option<&str>,
    ) -> Result<Vec<String>, BackendError> {
        let state = self.state.read().await;
        check(&state, Endpoint::AvailableSlots)?;
        if state.failing_providers.contains(provider_id) {
            return Err(BackendError::Transport(format!("provider {provider_id} unreachable")));
        }
        Ok(state.slots.get(&(provider_id.to_string(), date)).cloned().unwrap_or_default())
    }

    async fn create_booking(&self, payload: &BookingPayload) -> Result<Value, BackendError> {
        let mut state = self.state.write().await;
        check(&state, Endpoint::CreateBooking)?;
        state.bookings.push(payload.clone());
        Ok(json!({ "id": format!("bk-{}", state.bookings.len()), "status": "created" }))
    }

    async fn ping(&self) -> Result<(), BackendError> {
        check(&*self.state.read().await, Endpoint::Ping)
    }
}
