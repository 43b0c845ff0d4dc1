use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::booking::{BookingDraft, CustomerDetails, DurationUnit, ServiceAddress};
use crate::domain::catalog::CatalogSnapshot;
use crate::pricing::quote::{QuoteBreakdown, QuoteEngine, QuoteInput};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingField {
    FirstName,
    Email,
    Street,
    Zip,
    Service,
    Frequency,
    Date,
    Time,
}

impl BookingField {
    pub const ALL: [BookingField; 8] = [
        Self::FirstName,
        Self::Email,
        Self::Street,
        Self::Zip,
        Self::Service,
        Self::Frequency,
        Self::Date,
        Self::Time,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FirstName => "first_name",
            Self::Email => "email",
            Self::Street => "street",
            Self::Zip => "zip",
            Self::Service => "service",
            Self::Frequency => "frequency",
            Self::Date => "date",
            Self::Time => "time",
        }
    }

    fn is_missing(self, draft: &BookingDraft) -> bool {
        match self {
            Self::FirstName => blank(&draft.customer.first_name),
            Self::Email => blank(&draft.customer.email),
            Self::Street => blank(&draft.address.street),
            Self::Zip => blank(&draft.address.zip),
            Self::Service => draft.service.as_deref().map_or(true, blank),
            Self::Frequency => draft.frequency.as_deref().map_or(true, blank),
            Self::Date => draft.date.is_none(),
            Self::Time => draft.time.as_deref().map_or(true, blank),
        }
    }
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Per-field flags for required booking inputs. A field present in the map
/// with `true` is missing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingValidation {
    pub fields: BTreeMap<BookingField, bool>,
}

impl BookingValidation {
    pub fn check(draft: &BookingDraft) -> Self {
        Self {
            fields: BookingField::ALL
                .into_iter()
                .map(|field| (field, field.is_missing(draft)))
                .collect(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.fields.values().all(|missing| !missing)
    }

    pub fn missing(&self) -> Vec<BookingField> {
        self.fields.iter().filter(|(_, missing)| **missing).map(|(field, _)| *field).collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadExtra {
    pub id: String,
    pub name: String,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadExclusion {
    pub id: String,
    pub name: String,
    pub quantity: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadDuration {
    pub value: String,
    pub unit: DurationUnit,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadAdjustedTime {
    pub hours: String,
    pub minutes: String,
}

/// Currency used when the configuration names none.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Routing key and denomination stamped onto an outbound booking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BookingRouting<'a> {
    pub business_id: Option<&'a str>,
    pub currency: &'a str,
}

impl Default for BookingRouting<'_> {
    fn default() -> Self {
        Self { business_id: None, currency: DEFAULT_CURRENCY }
    }
}

/// Body posted to the bookings endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingPayload {
    pub business_id: Option<String>,
    pub provider_id: Option<String>,
    pub industry_id: String,
    pub customer: CustomerDetails,
    pub address: ServiceAddress,
    pub service: String,
    pub frequency: String,
    pub date: NaiveDate,
    pub time: String,
    pub duration: PayloadDuration,
    pub extras: Vec<PayloadExtra>,
    pub partial_cleaning: bool,
    pub excluded: Vec<PayloadExclusion>,
    pub category_values: BTreeMap<String, String>,
    pub notes: String,
    pub is_first_appointment: bool,
    pub adjust_service_total: bool,
    pub adjust_price: bool,
    pub adjust_time: bool,
    pub adjusted_time: Option<PayloadAdjustedTime>,
    /// ISO 4217 code the amounts below are denominated in.
    pub currency: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub service_total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub extras_total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub partial_cleaning_discount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub frequency_discount: Decimal,
}

/// A validated payload together with the quote it was priced from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedBooking {
    pub payload: BookingPayload,
    pub quote: QuoteBreakdown,
}

/// Validates the draft and prices it from the current state in one step, so
/// the amounts sent always match a quote computed from the same draft.
pub fn prepare_booking<Q>(
    engine: &Q,
    catalog: &CatalogSnapshot,
    draft: &BookingDraft,
    routing: BookingRouting<'_>,
) -> Result<PreparedBooking, BookingValidation>
where
    Q: QuoteEngine + ?Sized,
{
    let validation = BookingValidation::check(draft);
    let (Some(service), Some(frequency), Some(date), Some(time)) =
        (draft.service.clone(), draft.frequency.clone(), draft.date, draft.time.clone())
    else {
        return Err(validation);
    };
    if !validation.is_valid() {
        return Err(validation);
    }

    let quote = engine.quote(&QuoteInput { catalog, draft });

    let extras = draft
        .extras
        .iter()
        .map(|(id, quantity)| {
            let extra = catalog.extra(id);
            PayloadExtra {
                id: id.clone(),
                name: extra.map(|extra| extra.name.clone()).unwrap_or_default(),
                quantity: *quantity,
                price: extra.map(|extra| extra.price).unwrap_or_default(),
            }
        })
        .collect();
    let excluded = if draft.partial_cleaning {
        draft
            .excluded
            .iter()
            .map(|(id, quantity)| PayloadExclusion {
                id: id.clone(),
                name: catalog
                    .exclude_parameter(id)
                    .map(|parameter| parameter.name.clone())
                    .unwrap_or_default(),
                quantity: *quantity,
            })
            .collect()
    } else {
        Vec::new()
    };
    let adjustments = &draft.adjustments;
    let adjusted_time = adjustments.adjust_time.then(|| PayloadAdjustedTime {
        hours: adjustments.adjusted_hours.trim().to_string(),
        minutes: adjustments.adjusted_minutes.trim().to_string(),
    });

    let payload = BookingPayload {
        business_id: routing.business_id.map(str::to_string),
        provider_id: draft.provider_id.clone(),
        industry_id: catalog.industry.id.0.clone(),
        customer: draft.customer.clone(),
        address: draft.address.clone(),
        service,
        frequency,
        date,
        time,
        duration: PayloadDuration {
            value: draft.duration.value.clone(),
            unit: draft.duration.unit,
        },
        extras,
        partial_cleaning: draft.partial_cleaning,
        excluded,
        category_values: draft.category_values.clone(),
        notes: draft.notes.clone(),
        is_first_appointment: draft.is_first_appointment,
        adjust_service_total: adjustments.adjust_service_total,
        adjust_price: adjustments.adjust_price,
        adjust_time: adjustments.adjust_time,
        adjusted_time,
        currency: routing.currency.trim().to_ascii_uppercase(),
        amount: quote.final_amount,
        service_total: quote.service_total,
        extras_total: quote.extras_total,
        partial_cleaning_discount: quote.partial_cleaning_discount,
        frequency_discount: quote.frequency_discount,
    };

    Ok(PreparedBooking { payload, quote })
}
