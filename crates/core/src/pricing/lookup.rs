use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::catalog::{PricingParameter, ServiceCategory};

/// The pricing path that produced the base service price.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PriceSource {
    PricingParameter { id: String, name: String },
    FixedPrice,
    Hourly { rate: Decimal, hours: Decimal },
    NotFound,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLookup {
    pub price: Decimal,
    pub source: PriceSource,
}

#[derive(Clone, Debug)]
pub struct PriceLookupInput<'a> {
    pub service: Option<&'a str>,
    pub frequency: Option<&'a str>,
    pub category_values: &'a BTreeMap<String, String>,
    pub pricing_parameters: &'a [PricingParameter],
    pub service_categories: &'a [ServiceCategory],
    /// Requested duration in hours, before any recurring-visit shortening.
    pub duration_hours: Decimal,
}

/// Resolves the base service price; the first matching source wins:
/// pricing parameter, then fixed category price, then hourly rate times
/// duration. A configuration with none of these prices at zero, as does an
/// hourly product too large for a `Decimal`.
pub fn lookup_base_price(input: &PriceLookupInput<'_>) -> PriceLookup {
    let category = input
        .service
        .and_then(|key| input.service_categories.iter().find(|category| category.is_named(key)));

    if let Some(parameter) = matching_parameter(input, category) {
        return PriceLookup {
            price: parameter.price,
            source: PriceSource::PricingParameter {
                id: parameter.id.clone(),
                name: parameter.name.clone(),
            },
        };
    }

    if let Some(category) = category {
        if let Some(price) = category.fixed_price() {
            return PriceLookup { price, source: PriceSource::FixedPrice };
        }

        if let Some(rate) = category.hourly_rate() {
            let hours = input.duration_hours;
            match rate.checked_mul(hours) {
                Some(price) => {
                    return PriceLookup { price, source: PriceSource::Hourly { rate, hours } };
                }
                None => warn!(
                    event_name = "pricing.lookup.overflow",
                    service = input.service.unwrap_or("<none>"),
                    rate = %rate,
                    hours = %hours,
                    "hourly price out of range"
                ),
            }
        }
    }

    info!(
        event_name = "pricing.lookup.no_match",
        service = input.service.unwrap_or("<none>"),
        frequency = input.frequency.unwrap_or("<none>"),
        "no pricing found for selection"
    );
    PriceLookup { price: Decimal::ZERO, source: PriceSource::NotFound }
}

fn matching_parameter<'a>(
    input: &PriceLookupInput<'a>,
    category: Option<&ServiceCategory>,
) -> Option<&'a PricingParameter> {
    input.pricing_parameters.iter().find(|parameter| {
        if !parameter.passes_gates(category, input.frequency) {
            return false;
        }

        match parameter.variable_category() {
            Some(label) => input
                .category_values
                .get(label)
                .is_some_and(|chosen| chosen.trim() == parameter.name.trim()),
            None => true,
        }
    })
}
