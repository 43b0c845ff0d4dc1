//! Raw payload shapes returned by the booking backend.
//!
//! The backend is loose about types: numbers arrive as strings, flags as
//! `"yes"`/`"no"`, allow-lists as comma separated strings. Everything is
//! normalised here and validated into catalog types before it reaches the
//! pricing core; rows that fail validation are dropped with a warning.

use std::collections::{BTreeMap, BTreeSet};

use homequote_core::domain::catalog::{
    DiscountType, DisplaySurface, ExcludeParameter, Extra, FixedPrice, FrequencyDependencies,
    FrequencyDiscountScope, FrequencyRow, HourlyService, Industry, IndustryId, OccurrenceTime,
    PricingParameter, Provider, ServiceCategory,
};
use homequote_core::numeric::parse_decimal;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

use crate::error::BackendError;

/// List endpoints answer either with a bare array or with `{ "data": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListEnvelope<T> {
    Bare(Vec<T>),
    Wrapped { data: Vec<T> },
}

impl<T> ListEnvelope<T> {
    pub fn into_rows(self) -> Vec<T> {
        match self {
            Self::Bare(rows) | Self::Wrapped { data: rows } => rows,
        }
    }
}

/// Converts raw rows, keeping the valid ones.
pub fn accept_rows<W, T>(rows: Vec<W>, entity: &'static str) -> Vec<T>
where
    T: TryFrom<W, Error = BackendError>,
{
    rows.into_iter()
        .filter_map(|row| match T::try_from(row) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(
                    event_name = "backend.contract.row_rejected",
                    entity,
                    error = %error,
                    "dropping backend row that failed validation"
                );
                None
            }
        })
        .collect()
}

fn value_to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(number) => parse_decimal(&number.to_string()),
        Value::String(raw) => parse_decimal(raw),
        _ => None,
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(raw) => Some(raw.trim().to_string()).filter(|raw| !raw.is_empty()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn value_to_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(value_to_string).collect(),
        Value::String(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect(),
        Value::Number(number) => vec![number.to_string()],
        _ => Vec::new(),
    }
}

fn lenient_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_decimal))
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(flag)) => flag,
        Some(Value::Number(number)) => number.as_i64().is_some_and(|n| n != 0),
        Some(Value::String(raw)) => {
            matches!(raw.trim().to_ascii_lowercase().as_str(), "yes" | "true" | "1" | "on")
        }
        _ => false,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_string).unwrap_or_default())
}

fn lenient_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_string))
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(value_to_list).unwrap_or_default())
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(raw)) => raw.trim().parse::<u32>().ok(),
        _ => None,
    })
}

fn lenient_variables<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?;
    Ok(value
        .unwrap_or_default()
        .into_iter()
        .map(|(label, options)| (label.trim().to_string(), value_to_list(&options)))
        .filter(|(label, _)| !label.is_empty())
        .collect())
}

fn required(field: &str, entity: &str, value: String) -> Result<String, BackendError> {
    if value.trim().is_empty() {
        return Err(BackendError::Contract(format!("{entity} is missing `{field}`")));
    }
    Ok(value)
}

#[derive(Clone, Debug, Deserialize)]
pub struct WireIndustry {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
}

impl TryFrom<WireIndustry> for Industry {
    type Error = BackendError;

    fn try_from(wire: WireIndustry) -> Result<Self, Self::Error> {
        Ok(Industry { id: IndustryId(required("id", "industry", wire.id)?), name: wire.name })
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct WireDependencies {
    #[serde(default, alias = "serviceCategories", deserialize_with = "lenient_list")]
    pub service_categories: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub extras: Vec<String>,
    #[serde(default, alias = "excludeParameters", deserialize_with = "lenient_list")]
    pub exclude_parameters: Vec<String>,
}

impl From<WireDependencies> for FrequencyDependencies {
    fn from(wire: WireDependencies) -> Self {
        FrequencyDependencies {
            service_categories: wire.service_categories,
            extras: wire.extras,
            exclude_parameters: wire.exclude_parameters,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct WireFrequency {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub occurrence_time: String,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub discount: Option<Decimal>,
    #[serde(default, alias = "discountType", deserialize_with = "lenient_string")]
    pub discount_type: String,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub shorter_job_length: bool,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub shorter_job_length_by: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub exclude_first_appointment: bool,
    #[serde(default, deserialize_with = "lenient_string")]
    pub frequency_discount: String,
    #[serde(default, alias = "frequencyDependencies")]
    pub dependencies: Option<WireDependencies>,
}

fn occurrence_time(raw: &str) -> Result<OccurrenceTime, BackendError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "recurring" => Ok(OccurrenceTime::Recurring),
        "" | "onetime" | "one-time" | "one_time" => Ok(OccurrenceTime::OneTime),
        other => Err(BackendError::Contract(format!("unknown occurrence_time `{other}`"))),
    }
}

fn discount_type(raw: &str) -> Result<DiscountType, BackendError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "%" | "percent" | "percentage" => Ok(DiscountType::Percent),
        "$" | "flat" | "fixed" | "amount" => Ok(DiscountType::Flat),
        other => Err(BackendError::Contract(format!("unknown discount type `{other}`"))),
    }
}

fn discount_scope(raw: &str) -> Result<FrequencyDiscountScope, BackendError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "all" => Ok(FrequencyDiscountScope::All),
        "exclude-first" | "exclude_first" => Ok(FrequencyDiscountScope::ExcludeFirst),
        other => Err(BackendError::Contract(format!("unknown frequency_discount `{other}`"))),
    }
}

impl TryFrom<WireFrequency> for FrequencyRow {
    type Error = BackendError;

    fn try_from(wire: WireFrequency) -> Result<Self, Self::Error> {
        Ok(FrequencyRow {
            id: required("id", "frequency", wire.id)?,
            name: required("name", "frequency", wire.name)?,
            occurrence_time: occurrence_time(&wire.occurrence_time)?,
            discount: wire.discount,
            discount_type: discount_type(&wire.discount_type)?,
            shorter_job_length: wire.shorter_job_length,
            shorter_job_length_by: wire.shorter_job_length_by,
            exclude_first_appointment: wire.exclude_first_appointment,
            frequency_discount: discount_scope(&wire.frequency_discount)?,
            dependencies: wire.dependencies.map(FrequencyDependencies::from),
        })
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct WireToggledPrice {
    #[serde(default, deserialize_with = "lenient_flag")]
    pub enabled: bool,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub price: Option<Decimal>,
    #[serde(default, alias = "priceCalculationType", deserialize_with = "lenient_optional_string")]
    pub price_calculation_type: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct WireServiceCategory {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_optional_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub service_category_frequency: bool,
    #[serde(default, deserialize_with = "lenient_list")]
    pub selected_frequencies: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub extras: Vec<String>,
    #[serde(default, deserialize_with = "lenient_variables")]
    pub variables: BTreeMap<String, Vec<String>>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub selected_exclude_parameters: Vec<String>,
    #[serde(default)]
    pub service_category_price: Option<WireToggledPrice>,
    #[serde(default)]
    pub hourly_service: Option<WireToggledPrice>,
}

impl TryFrom<WireServiceCategory> for ServiceCategory {
    type Error = BackendError;

    fn try_from(wire: WireServiceCategory) -> Result<Self, Self::Error> {
        Ok(ServiceCategory {
            id: required("id", "service category", wire.id)?,
            name: required("name", "service category", wire.name)?,
            description: wire.description,
            service_category_frequency: wire.service_category_frequency,
            selected_frequencies: wire.selected_frequencies.into_iter().collect(),
            extras: wire.extras.into_iter().collect(),
            variables: wire
                .variables
                .into_iter()
                .map(|(label, options)| (label, options.into_iter().collect::<BTreeSet<_>>()))
                .collect(),
            selected_exclude_parameters: wire.selected_exclude_parameters.into_iter().collect(),
            service_category_price: wire
                .service_category_price
                .map(|fixed| FixedPrice { enabled: fixed.enabled, price: fixed.price }),
            hourly_service: wire.hourly_service.map(|hourly| HourlyService {
                enabled: hourly.enabled,
                price: hourly.price,
                price_calculation_type: hourly.price_calculation_type,
            }),
        })
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct WirePricingParameter {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub price: Option<Decimal>,
    #[serde(default, alias = "variableCategory", deserialize_with = "lenient_optional_string")]
    pub variable_category: Option<String>,
    #[serde(default, alias = "service_categories", deserialize_with = "lenient_list")]
    pub service_category: Vec<String>,
    #[serde(default, alias = "frequencies", deserialize_with = "lenient_list")]
    pub frequency: Vec<String>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub show_based_on_frequency: bool,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub show_based_on_service_category: bool,
}

impl TryFrom<WirePricingParameter> for PricingParameter {
    type Error = BackendError;

    fn try_from(wire: WirePricingParameter) -> Result<Self, Self::Error> {
        let name = required("name", "pricing parameter", wire.name)?;
        let price = wire.price.ok_or_else(|| {
            BackendError::Contract(format!("pricing parameter `{name}` has no numeric price"))
        })?;

        Ok(PricingParameter {
            id: required("id", "pricing parameter", wire.id)?,
            name,
            price,
            variable_category: wire.variable_category,
            service_categories: wire.service_category,
            frequencies: wire.frequency,
            show_based_on_frequency: wire.show_based_on_frequency,
            show_based_on_service_category: wire.show_based_on_service_category,
        })
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct WireExtra {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub time: Option<u32>,
    #[serde(default, alias = "qtyBased", deserialize_with = "lenient_flag")]
    pub qty_based: bool,
    #[serde(default, alias = "maximumQuantity", deserialize_with = "lenient_u32")]
    pub maximum_quantity: Option<u32>,
    #[serde(default, alias = "exemptFromDiscount", deserialize_with = "lenient_flag")]
    pub exempt_from_discount: bool,
    #[serde(default, alias = "serviceCategory", deserialize_with = "lenient_optional_string")]
    pub service_category: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub display: Vec<String>,
}

fn display_surface(raw: &str) -> Option<DisplaySurface> {
    let normalized = raw.trim().to_ascii_lowercase().replace([' ', '-'], "_");
    match normalized.as_str() {
        "customer_frontend" | "frontend" | "customer" => Some(DisplaySurface::CustomerFrontend),
        "customer_backend" | "backend" => Some(DisplaySurface::CustomerBackend),
        "admin" | "admin_only" => Some(DisplaySurface::AdminOnly),
        _ => None,
    }
}

impl TryFrom<WireExtra> for Extra {
    type Error = BackendError;

    fn try_from(wire: WireExtra) -> Result<Self, Self::Error> {
        let name = required("name", "extra", wire.name)?;
        let price = wire
            .price
            .ok_or_else(|| BackendError::Contract(format!("extra `{name}` has no numeric price")))?;

        Ok(Extra {
            id: required("id", "extra", wire.id)?,
            name,
            price,
            time: wire.time.unwrap_or_default(),
            qty_based: wire.qty_based,
            maximum_quantity: wire.maximum_quantity,
            exempt_from_discount: wire.exempt_from_discount,
            service_category: wire.service_category,
            display: wire.display.iter().filter_map(|raw| display_surface(raw)).collect(),
        })
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct WireExcludeParameter {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_optional_string")]
    pub icon: Option<String>,
}

impl TryFrom<WireExcludeParameter> for ExcludeParameter {
    type Error = BackendError;

    fn try_from(wire: WireExcludeParameter) -> Result<Self, Self::Error> {
        Ok(ExcludeParameter {
            id: required("id", "exclude parameter", wire.id)?,
            name: required("name", "exclude parameter", wire.name)?,
            price: wire.price.unwrap_or(Decimal::ZERO),
            icon: wire.icon,
        })
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct WireProvider {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, alias = "firstName", deserialize_with = "lenient_string")]
    pub first_name: String,
    #[serde(default, alias = "lastName", deserialize_with = "lenient_string")]
    pub last_name: String,
}

impl TryFrom<WireProvider> for Provider {
    type Error = BackendError;

    fn try_from(wire: WireProvider) -> Result<Self, Self::Error> {
        let name = if wire.name.is_empty() {
            format!("{} {}", wire.first_name, wire.last_name).trim().to_string()
        } else {
            wire.name
        };
        Ok(Provider { id: required("id", "provider", wire.id)?, name })
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct WireSlots {
    #[serde(default, rename = "availableSlots", alias = "available_slots")]
    pub available_slots: Vec<String>,
}

/// Normalises an `HH:MM` 24-hour slot, rejecting anything else.
pub fn normalize_slot(raw: &str) -> Option<String> {
    let (hours, minutes) = raw.trim().split_once(':')?;
    let hours = hours.parse::<u8>().ok().filter(|hours| *hours < 24)?;
    let minutes = minutes.get(..2).and_then(|mm| mm.parse::<u8>().ok()).filter(|mm| *mm < 60)?;
    Some(format!("{hours:02}:{minutes:02}"))
}
