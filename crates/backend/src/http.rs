use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use homequote_core::config::BackendConfig;
use homequote_core::domain::catalog::{
    ExcludeParameter, Extra, FrequencyRow, Industry, IndustryId, PricingParameter, Provider,
    ServiceCategory,
};
use homequote_core::submission::BookingPayload;
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::client::{BackendClient, FrequencyQuery};
use crate::error::BackendError;
use crate::wire::{
    accept_rows, normalize_slot, ListEnvelope, WireExcludeParameter, WireExtra, WireFrequency,
    WireIndustry, WirePricingParameter, WireProvider, WireServiceCategory, WireSlots,
};

/// `BackendClient` over the booking backend's REST API.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    api_token: Option<SecretString>,
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    async fn get_json<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
    {
        let url = self.url(path);
        debug!(event_name = "backend.http.get", url = %url, "backend request");

        let response = self.authorize(self.client.get(&url).query(query)).send().await?;
        read_json(response).await
    }

    async fn get_rows<W, T>(
        &self,
        path: &str,
        query: &[(&str, String)],
        entity: &'static str,
    ) -> Result<Vec<T>, BackendError>
    where
        W: DeserializeOwned,
        T: TryFrom<W, Error = BackendError>,
    {
        let envelope: ListEnvelope<W> = self.get_json(path, query).await?;
        Ok(accept_rows(envelope.into_rows(), entity))
    }
}

async fn read_json<T>(response: reqwest::Response) -> Result<T, BackendError>
where
    T: DeserializeOwned,
{
    let status = response.status();
    let body = response.text().await?;
    decode_body(status, body)
}

fn decode_body<T>(status: StatusCode, body: String) -> Result<T, BackendError>
where
    T: DeserializeOwned,
{
    if !status.is_success() {
        return Err(BackendError::Status { status: status.as_u16(), body });
    }
    if body.trim().is_empty() {
        return Err(BackendError::Decode("empty response body".to_string()));
    }

    serde_json::from_str(&body).map_err(|error| BackendError::Decode(error.to_string()))
}

fn industry_query(industry_id: &IndustryId) -> Vec<(&'static str, String)> {
    vec![("industryId", industry_id.0.clone())]
}

#[async_trait]
impl BackendClient for HttpBackend {
    async fn industries(&self, business_id: Option<&str>) -> Result<Vec<Industry>, BackendError> {
        let query: Vec<(&str, String)> =
            business_id.map(|id| ("business_id", id.to_string())).into_iter().collect();
        self.get_rows::<WireIndustry, _>("industries", &query, "industry").await
    }

    async fn frequencies(&self, query: &FrequencyQuery) -> Result<Vec<FrequencyRow>, BackendError> {
        let mut params = industry_query(&query.industry_id);
        params.push(("includeAll", query.include_all.to_string()));
        if let Some(zipcode) = &query.zipcode {
            params.push(("zipcode", zipcode.clone()));
        }
        self.get_rows::<WireFrequency, _>("industry-frequency", &params, "frequency").await
    }

    async fn service_categories(
        &self,
        industry_id: &IndustryId,
    ) -> Result<Vec<ServiceCategory>, BackendError> {
        self.get_rows::<WireServiceCategory, _>(
            "service-categories",
            &industry_query(industry_id),
            "service category",
        )
        .await
    }

    async fn extras(&self, industry_id: &IndustryId) -> Result<Vec<Extra>, BackendError> {
        self.get_rows::<WireExtra, _>("extras", &industry_query(industry_id), "extra").await
    }

    async fn pricing_parameters(
        &self,
        industry_id: &IndustryId,
    ) -> Result<Vec<PricingParameter>, BackendError> {
        self.get_rows::<WirePricingParameter, _>(
            "pricing-parameters",
            &industry_query(industry_id),
            "pricing parameter",
        )
        .await
    }

    async fn exclude_parameters(
        &self,
        industry_id: &IndustryId,
    ) -> Result<Vec<ExcludeParameter>, BackendError> {
        self.get_rows::<WireExcludeParameter, _>(
            "exclude-parameters",
            &industry_query(industry_id),
            "exclude parameter",
        )
        .await
    }

    async fn providers(&self, business_id: Option<&str>) -> Result<Vec<Provider>, BackendError> {
        let query: Vec<(&str, String)> =
            business_id.map(|id| ("businessId", id.to_string())).into_iter().collect();
        self.get_rows::<WireProvider, _>("admin/providers", &query, "provider").await
    }

    async fn available_slots(
        &self,
        provider_id: &str,
        date: NaiveDate,
        business_id: Option<&str>,
    ) -> Result<Vec<String>, BackendError> {
        let mut query = vec![("date", date.format("%Y-%m-%d").to_string())];
        if let Some(business_id) = business_id {
            query.push(("businessId", business_id.to_string()));
        }

        let path = format!("admin/providers/{provider_id}/available-slots");
        let slots: WireSlots = self.get_json(&path, &query).await?;
        Ok(slots.available_slots.iter().filter_map(|slot| normalize_slot(slot)).collect())
    }

    async fn create_booking(&self, payload: &BookingPayload) -> Result<Value, BackendError> {
        let url = self.url("bookings");
        debug!(event_name = "backend.http.post", url = %url, "backend booking request");

        let response = self.authorize(self.client.post(&url).json(payload)).send().await?;
        read_json(response).await
    }

    /// Any HTTP answer from the base URL counts as reachable.
    async fn ping(&self) -> Result<(), BackendError> {
        self.authorize(self.client.get(&self.base_url)).send().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use homequote_core::config::AppConfig;
    use reqwest::StatusCode;
    use serde_json::{json, Value};

    use super::{decode_body, HttpBackend};
    use crate::error::BackendError;

    #[test]
    fn url_joins_without_duplicate_slashes() {
        let mut config = AppConfig::default().backend;
        config.base_url = "https://api.example.test/v2/".to_string();
        let backend = HttpBackend::new(&config).expect("client builds");

        assert_eq!(backend.base_url(), "https://api.example.test/v2");
        assert_eq!(backend.url("/extras"), "https://api.example.test/v2/extras");
    }

    #[test]
    fn debug_output_redacts_token() {
        let mut config = AppConfig::default().backend;
        config.api_token = Some("tok-very-secret".to_string().into());
        let backend = HttpBackend::new(&config).expect("client builds");

        let debug = format!("{backend:?}");
        assert!(!debug.contains("tok-very-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn non_success_status_keeps_body_verbatim() {
        let body = r#"{"error":"slot taken"}"#.to_string();

        let error = decode_body::<Value>(StatusCode::CONFLICT, body.clone()).unwrap_err();

        assert_eq!(error, BackendError::Status { status: 409, body });
    }

    #[test]
    fn server_error_with_empty_body_is_a_status_error() {
        let error = decode_body::<Value>(StatusCode::BAD_GATEWAY, String::new()).unwrap_err();

        assert_eq!(error, BackendError::Status { status: 502, body: String::new() });
    }

    #[test]
    fn empty_success_body_is_a_decode_error() {
        let error = decode_body::<Value>(StatusCode::OK, "  \n".to_string()).unwrap_err();

        assert_eq!(error, BackendError::Decode("empty response body".to_string()));
    }

    #[test]
    fn malformed_success_body_is_a_decode_error() {
        let error = decode_body::<Value>(StatusCode::OK, "{not json".to_string()).unwrap_err();

        assert!(matches!(error, BackendError::Decode(_)));
    }

    #[test]
    fn success_body_decodes() {
        let value: Value =
            decode_body(StatusCode::CREATED, r#"{"id":"bk-1"}"#.to_string()).expect("decodes");

        assert_eq!(value, json!({ "id": "bk-1" }));
    }
}
