use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndustryId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Industry {
    pub id: IndustryId,
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedPrice {
    pub enabled: bool,
    pub price: Option<Decimal>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlyService {
    pub enabled: bool,
    pub price: Option<Decimal>,
    pub price_calculation_type: Option<String>,
}

/// A bookable offering and its static sub-option configuration.
///
/// When `service_category_frequency` is set, the static `extras`,
/// `variables` and `selected_exclude_parameters` are ignored and the
/// frequency dependencies become the source of truth.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCategory {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub service_category_frequency: bool,
    #[serde(default)]
    pub selected_frequencies: BTreeSet<String>,
    #[serde(default)]
    pub extras: BTreeSet<String>,
    #[serde(default)]
    pub variables: BTreeMap<String, BTreeSet<String>>,
    #[serde(default)]
    pub selected_exclude_parameters: BTreeSet<String>,
    #[serde(default)]
    pub service_category_price: Option<FixedPrice>,
    #[serde(default)]
    pub hourly_service: Option<HourlyService>,
}

impl ServiceCategory {
    pub fn is_named(&self, key: &str) -> bool {
        let key = key.trim();
        self.name == key || self.id == key
    }

    pub fn fixed_price(&self) -> Option<Decimal> {
        self.service_category_price
            .as_ref()
            .filter(|fixed| fixed.enabled)
            .and_then(|fixed| fixed.price)
            .filter(|price| *price > Decimal::ZERO)
    }

    pub fn hourly_rate(&self) -> Option<Decimal> {
        self.hourly_service
            .as_ref()
            .filter(|hourly| hourly.enabled)
            .and_then(|hourly| hourly.price)
            .filter(|price| *price > Decimal::ZERO)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccurrenceTime {
    #[default]
    #[serde(rename = "onetime")]
    OneTime,
    Recurring,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscountType {
    #[default]
    #[serde(rename = "%")]
    Percent,
    #[serde(rename = "$")]
    Flat,
}

/// Whether the frequency discount also applies to the first visit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FrequencyDiscountScope {
    #[default]
    All,
    ExcludeFirst,
}

/// Resolved allow-lists for one (industry, frequency) pair. Entries may be
/// ids or names.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyDependencies {
    #[serde(default)]
    pub service_categories: Vec<String>,
    #[serde(default)]
    pub extras: Vec<String>,
    #[serde(default)]
    pub exclude_parameters: Vec<String>,
}

impl FrequencyDependencies {
    pub fn allows_service_category(&self, category: &ServiceCategory) -> bool {
        contains_key(&self.service_categories, &category.id, &category.name)
    }

    pub fn allows_extra(&self, extra: &Extra) -> bool {
        contains_key(&self.extras, &extra.id, &extra.name)
    }

    pub fn allows_exclude_parameter(&self, parameter: &ExcludeParameter) -> bool {
        contains_key(&self.exclude_parameters, &parameter.id, &parameter.name)
    }
}

fn contains_key(list: &[String], id: &str, name: &str) -> bool {
    list.iter().map(|entry| entry.trim()).any(|entry| entry == id || entry == name)
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyRow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub occurrence_time: OccurrenceTime,
    #[serde(default)]
    pub discount: Option<Decimal>,
    #[serde(default)]
    pub discount_type: DiscountType,
    #[serde(default)]
    pub shorter_job_length: bool,
    #[serde(default)]
    pub shorter_job_length_by: Option<Decimal>,
    #[serde(default)]
    pub exclude_first_appointment: bool,
    #[serde(default)]
    pub frequency_discount: FrequencyDiscountScope,
    /// Dependency lists the backend embeds on the row, if any.
    #[serde(default)]
    pub dependencies: Option<FrequencyDependencies>,
}

impl FrequencyRow {
    pub fn is_recurring(&self) -> bool {
        self.occurrence_time == OccurrenceTime::Recurring
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingParameter {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub variable_category: Option<String>,
    /// Allow-list of service category names or ids; empty means unrestricted.
    #[serde(default)]
    pub service_categories: Vec<String>,
    /// Allow-list of frequency names; empty means unrestricted.
    #[serde(default)]
    pub frequencies: Vec<String>,
    #[serde(default)]
    pub show_based_on_frequency: bool,
    #[serde(default)]
    pub show_based_on_service_category: bool,
}

impl PricingParameter {
    /// Applies the parameter's own frequency and service-category gates.
    ///
    /// A gate that is switched off never rejects. An enabled gate with an empty
    /// allow-list is unrestricted.
    pub fn passes_gates(&self, service: Option<&ServiceCategory>, frequency: Option<&str>) -> bool {
        let frequency_ok = !self.show_based_on_frequency
            || self.frequencies.is_empty()
            || frequency.is_some_and(|name| self.frequencies.iter().any(|f| f.trim() == name));

        let service_ok = !self.show_based_on_service_category
            || self.service_categories.is_empty()
            || service.is_some_and(|category| {
                self.service_categories.iter().any(|entry| category.is_named(entry))
            });

        frequency_ok && service_ok
    }

    pub fn variable_category(&self) -> Option<&str> {
        self.variable_category.as_deref().map(str::trim).filter(|label| !label.is_empty())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplaySurface {
    CustomerFrontend,
    CustomerBackend,
    AdminOnly,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extra {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    /// Minutes of work added per unit.
    #[serde(default)]
    pub time: u32,
    #[serde(default)]
    pub qty_based: bool,
    #[serde(default)]
    pub maximum_quantity: Option<u32>,
    #[serde(default)]
    pub exempt_from_discount: bool,
    #[serde(default)]
    pub service_category: Option<String>,
    #[serde(default)]
    pub display: BTreeSet<DisplaySurface>,
}

impl Extra {
    pub fn is_customer_facing(&self) -> bool {
        self.display.contains(&DisplaySurface::CustomerFrontend)
    }

    /// Quantity the selection UI allows for a requested amount.
    pub fn clamp_quantity(&self, requested: u32) -> u32 {
        if !self.qty_based {
            return requested.min(1);
        }
        match self.maximum_quantity {
            Some(max) if max > 0 => requested.min(max),
            _ => requested,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludeParameter {
    pub id: String,
    pub name: String,
    /// Credit granted when the customer opts out of this sub-task.
    pub price: Decimal,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,
    pub name: String,
}

/// In-memory configuration for one industry, fetched once per booking session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub industry: Industry,
    #[serde(default)]
    pub service_categories: Vec<ServiceCategory>,
    #[serde(default)]
    pub frequencies: Vec<FrequencyRow>,
    #[serde(default)]
    pub extras: Vec<Extra>,
    #[serde(default)]
    pub pricing_parameters: Vec<PricingParameter>,
    #[serde(default)]
    pub exclude_parameters: Vec<ExcludeParameter>,
}

impl CatalogSnapshot {
    pub fn empty(industry: Industry) -> Self {
        Self {
            industry,
            service_categories: Vec::new(),
            frequencies: Vec::new(),
            extras: Vec::new(),
            pricing_parameters: Vec::new(),
            exclude_parameters: Vec::new(),
        }
    }

    pub fn service_category(&self, key: &str) -> Option<&ServiceCategory> {
        self.service_categories.iter().find(|category| category.is_named(key))
    }

    pub fn frequency(&self, name: &str) -> Option<&FrequencyRow> {
        let name = name.trim();
        self.frequencies.iter().find(|row| row.name == name || row.id == name)
    }

    pub fn extra(&self, id: &str) -> Option<&Extra> {
        self.extras.iter().find(|extra| extra.id == id)
    }

    pub fn exclude_parameter(&self, id: &str) -> Option<&ExcludeParameter> {
        self.exclude_parameters.iter().find(|parameter| parameter.id == id)
    }
}
