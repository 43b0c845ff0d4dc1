use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::catalog::CatalogSnapshot;
use crate::numeric::parse_decimal;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DurationUnit {
    #[default]
    Hours,
    Minutes,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedDuration {
    /// Raw user input, e.g. `"04"`.
    pub value: String,
    pub unit: DurationUnit,
}

impl Default for RequestedDuration {
    fn default() -> Self {
        Self { value: String::new(), unit: DurationUnit::Hours }
    }
}

impl RequestedDuration {
    pub fn parsed(&self) -> Option<Decimal> {
        parse_decimal(&self.value)
    }

    /// Requested length expressed in hours; unparsable input counts as zero.
    pub fn hours(&self) -> Decimal {
        let value = self.parsed().unwrap_or(Decimal::ZERO);
        match self.unit {
            DurationUnit::Hours => value,
            DurationUnit::Minutes => value / Decimal::from(60),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAddress {
    pub street: String,
    pub apartment: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

/// Operator-entered values that replace computed numbers verbatim.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualAdjustments {
    pub adjust_service_total: bool,
    pub service_total_amount: String,
    pub adjust_price: bool,
    pub amount: String,
    pub adjust_time: bool,
    pub adjusted_hours: String,
    pub adjusted_minutes: String,
}

impl ManualAdjustments {
    pub fn service_total_override(&self) -> Option<Decimal> {
        self.adjust_service_total.then(|| parse_decimal(&self.service_total_amount)).flatten()
    }

    pub fn price_override(&self) -> Option<Decimal> {
        self.adjust_price.then(|| parse_decimal(&self.amount)).flatten()
    }
}

/// Mutable booking form state, only ever changed through [`BookingAction`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingDraft {
    pub customer: CustomerDetails,
    pub address: ServiceAddress,
    pub service: Option<String>,
    pub frequency: Option<String>,
    /// Selected extras keyed by extra id, valued by quantity.
    pub extras: BTreeMap<String, u32>,
    pub partial_cleaning: bool,
    /// Excluded sub-tasks keyed by exclude-parameter id, valued by quantity.
    pub excluded: BTreeMap<String, u32>,
    /// Variable category label to chosen pricing-parameter name.
    pub category_values: BTreeMap<String, String>,
    pub duration: RequestedDuration,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub provider_id: Option<String>,
    pub notes: String,
    pub adjustments: ManualAdjustments,
    pub is_first_appointment: bool,
}

impl Default for BookingDraft {
    fn default() -> Self {
        Self {
            customer: CustomerDetails::default(),
            address: ServiceAddress::default(),
            service: None,
            frequency: None,
            extras: BTreeMap::new(),
            partial_cleaning: false,
            excluded: BTreeMap::new(),
            category_values: BTreeMap::new(),
            duration: RequestedDuration::default(),
            date: None,
            time: None,
            provider_id: None,
            notes: String::new(),
            adjustments: ManualAdjustments::default(),
            is_first_appointment: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BookingAction {
    SetCustomer { customer: CustomerDetails },
    SetAddress { address: ServiceAddress },
    SelectService { service: Option<String> },
    SelectFrequency { frequency: Option<String> },
    SetCategoryValue { category: String, value: Option<String> },
    ToggleExtra { extra_id: String },
    SetExtraQuantity { extra_id: String, quantity: u32 },
    SetPartialCleaning { enabled: bool },
    ToggleExcludeParameter { parameter_id: String },
    SetExcludeQuantity { parameter_id: String, quantity: u32 },
    SetDuration { duration: RequestedDuration },
    SetSchedule { date: Option<NaiveDate>, time: Option<String> },
    AssignProvider { provider_id: Option<String> },
    SetNotes { notes: String },
    SetFirstAppointment { first: bool },
    OverrideServiceTotal { amount: Option<String> },
    OverridePrice { amount: Option<String> },
    OverrideTime { hours: Option<String>, minutes: Option<String> },
    Reset,
}

impl BookingDraft {
    /// Pure transition: returns the draft that results from `action`.
    ///
    /// Extra quantities are clamped here, at selection time, using the
    /// catalog's `qty_based` and `maximum_quantity` settings. Unknown extra ids
    /// are ignored.
    pub fn apply(&self, catalog: &CatalogSnapshot, action: BookingAction) -> Self {
        let mut next = self.clone();

        match action {
            BookingAction::SetCustomer { customer } => next.customer = customer,
            BookingAction::SetAddress { address } => next.address = address,
            BookingAction::SelectService { service } => {
                next.service = service.map(|value| value.trim().to_string());
            }
            BookingAction::SelectFrequency { frequency } => {
                next.frequency = frequency.map(|value| value.trim().to_string());
            }
            BookingAction::SetCategoryValue { category, value } => match value {
                Some(value) => {
                    next.category_values.insert(category, value);
                }
                None => {
                    next.category_values.remove(&category);
                }
            },
            BookingAction::ToggleExtra { extra_id } => {
                if next.extras.remove(&extra_id).is_none() && catalog.extra(&extra_id).is_some() {
                    next.extras.insert(extra_id, 1);
                }
            }
            BookingAction::SetExtraQuantity { extra_id, quantity } => {
                if let Some(extra) = catalog.extra(&extra_id) {
                    match extra.clamp_quantity(quantity) {
                        0 => {
                            next.extras.remove(&extra_id);
                        }
                        clamped => {
                            next.extras.insert(extra_id, clamped);
                        }
                    }
                }
            }
            BookingAction::SetPartialCleaning { enabled } => {
                next.partial_cleaning = enabled;
                if !enabled {
                    next.excluded.clear();
                }
            }
            BookingAction::ToggleExcludeParameter { parameter_id } => {
                if next.excluded.remove(&parameter_id).is_none()
                    && catalog.exclude_parameter(&parameter_id).is_some()
                {
                    next.excluded.insert(parameter_id, 1);
                }
            }
            BookingAction::SetExcludeQuantity { parameter_id, quantity } => {
                if catalog.exclude_parameter(&parameter_id).is_some() {
                    if quantity == 0 {
                        next.excluded.remove(&parameter_id);
                    } else {
                        next.excluded.insert(parameter_id, quantity);
                    }
                }
            }
            BookingAction::SetDuration { duration } => next.duration = duration,
            BookingAction::SetSchedule { date, time } => {
                next.date = date;
                next.time = time;
            }
            BookingAction::AssignProvider { provider_id } => next.provider_id = provider_id,
            BookingAction::SetNotes { notes } => next.notes = notes,
            BookingAction::SetFirstAppointment { first } => next.is_first_appointment = first,
            BookingAction::OverrideServiceTotal { amount } => {
                next.adjustments.adjust_service_total = amount.is_some();
                next.adjustments.service_total_amount = amount.unwrap_or_default();
            }
            BookingAction::OverridePrice { amount } => {
                next.adjustments.adjust_price = amount.is_some();
                next.adjustments.amount = amount.unwrap_or_default();
            }
            BookingAction::OverrideTime { hours, minutes } => {
                next.adjustments.adjust_time = hours.is_some() || minutes.is_some();
                next.adjustments.adjusted_hours = hours.unwrap_or_default();
                next.adjustments.adjusted_minutes = minutes.unwrap_or_default();
            }
            BookingAction::Reset => next = Self::default(),
        }

        next
    }

    /// Applies the selection-time quantity rules to a draft that arrived whole,
    /// as if every extra had been set through
    /// [`BookingAction::SetExtraQuantity`]. A zero quantity counts as one unit
    /// and unknown extra ids are dropped.
    pub fn clamp_quantities(&self, catalog: &CatalogSnapshot) -> Self {
        let mut cleared = self.clone();
        cleared.extras.clear();

        self.extras.iter().fold(cleared, |draft, (extra_id, quantity)| {
            draft.apply(
                catalog,
                BookingAction::SetExtraQuantity {
                    extra_id: extra_id.clone(),
                    quantity: (*quantity).max(1),
                },
            )
        })
    }

    /// Replays `actions` from an empty draft.
    pub fn replay<I>(catalog: &CatalogSnapshot, actions: I) -> Self
    where
        I: IntoIterator<Item = BookingAction>,
    {
        actions.into_iter().fold(Self::default(), |draft, action| draft.apply(catalog, action))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::catalog::{CatalogSnapshot, ExcludeParameter, Extra, Industry, IndustryId};

    use super::{BookingAction, BookingDraft, DurationUnit, RequestedDuration};

    fn catalog() -> CatalogSnapshot {
        let mut catalog = CatalogSnapshot::empty(Industry {
            id: IndustryId("ind-1".to_string()),
            name: "Home Cleaning".to_string(),
        });
        catalog.extras = vec![
            Extra {
                id: "ex-oven".to_string(),
                name: "Inside Oven".to_string(),
                price: Decimal::from(20),
                qty_based: true,
                maximum_quantity: Some(2),
                ..Default::default()
            },
            Extra {
                id: "ex-fridge".to_string(),
                name: "Inside Fridge".to_string(),
                price: Decimal::from(15),
                ..Default::default()
            },
        ];
        catalog.exclude_parameters = vec![ExcludeParameter {
            id: "xp-kitchen".to_string(),
            name: "Kitchen".to_string(),
            price: Decimal::from(10),
            icon: None,
        }];
        catalog
    }

    #[test]
    fn new_draft_assumes_first_appointment() {
        assert!(BookingDraft::default().is_first_appointment);
    }

    #[test]
    fn extra_quantity_is_clamped_at_selection_time() {
        let catalog = catalog();
        let draft = BookingDraft::replay(
            &catalog,
            [
                BookingAction::SetExtraQuantity { extra_id: "ex-oven".to_string(), quantity: 5 },
                BookingAction::SetExtraQuantity { extra_id: "ex-fridge".to_string(), quantity: 3 },
                BookingAction::SetExtraQuantity { extra_id: "ex-ghost".to_string(), quantity: 1 },
            ],
        );

        assert_eq!(draft.extras.get("ex-oven"), Some(&2));
        assert_eq!(draft.extras.get("ex-fridge"), Some(&1));
        assert!(!draft.extras.contains_key("ex-ghost"));
    }

    #[test]
    fn whole_draft_quantities_follow_selection_rules() {
        let catalog = catalog();
        let mut draft = BookingDraft::default();
        draft.extras.insert("ex-oven".to_string(), 9);
        draft.extras.insert("ex-fridge".to_string(), 40);
        draft.extras.insert("ex-ghost".to_string(), 3);

        let clamped = draft.clamp_quantities(&catalog);

        assert_eq!(clamped.extras.get("ex-oven"), Some(&2));
        assert_eq!(clamped.extras.get("ex-fridge"), Some(&1));
        assert!(!clamped.extras.contains_key("ex-ghost"));

        let mut unset = BookingDraft::default();
        unset.extras.insert("ex-oven".to_string(), 0);
        assert_eq!(unset.clamp_quantities(&catalog).extras.get("ex-oven"), Some(&1));
    }

    #[test]
    fn toggling_extra_twice_removes_it() {
        let catalog = catalog();
        let toggle = BookingAction::ToggleExtra { extra_id: "ex-fridge".to_string() };
        let draft = BookingDraft::replay(&catalog, [toggle.clone(), toggle]);

        assert!(draft.extras.is_empty());
    }

    #[test]
    fn disabling_partial_cleaning_clears_exclusions() {
        let catalog = catalog();
        let draft = BookingDraft::replay(
            &catalog,
            [
                BookingAction::SetPartialCleaning { enabled: true },
                BookingAction::ToggleExcludeParameter { parameter_id: "xp-kitchen".to_string() },
            ],
        );
        assert_eq!(draft.excluded.get("xp-kitchen"), Some(&1));

        let draft = draft.apply(&catalog, BookingAction::SetPartialCleaning { enabled: false });
        assert!(draft.excluded.is_empty());
    }

    #[test]
    fn overrides_round_through_actions() {
        let catalog = catalog();
        let draft = BookingDraft::replay(
            &catalog,
            [
                BookingAction::OverridePrice { amount: Some("0".to_string()) },
                BookingAction::OverrideServiceTotal { amount: Some("abc".to_string()) },
            ],
        );

        assert_eq!(draft.adjustments.price_override(), Some(Decimal::ZERO));
        assert_eq!(draft.adjustments.service_total_override(), None);

        let cleared = draft.apply(&catalog, BookingAction::OverridePrice { amount: None });
        assert_eq!(cleared.adjustments.price_override(), None);
    }

    #[test]
    fn replay_is_deterministic() {
        let catalog = catalog();
        let actions = vec![
            BookingAction::SelectService { service: Some(" Deep Cleaning ".to_string()) },
            BookingAction::SelectFrequency { frequency: Some("Weekly".to_string()) },
            BookingAction::SetFirstAppointment { first: false },
        ];

        let first = BookingDraft::replay(&catalog, actions.clone());
        let second = BookingDraft::replay(&catalog, actions);

        assert_eq!(first, second);
        assert_eq!(first.service.as_deref(), Some("Deep Cleaning"));
        assert!(!first.is_first_appointment);
    }

    #[test]
    fn reset_discards_everything() {
        let catalog = catalog();
        let draft = BookingDraft::replay(
            &catalog,
            [
                BookingAction::SetNotes { notes: "gate code 1234".to_string() },
                BookingAction::SetFirstAppointment { first: false },
                BookingAction::Reset,
            ],
        );
        assert_eq!(draft, BookingDraft::default());
    }

    #[test]
    fn minute_durations_convert_to_hours() {
        let duration = RequestedDuration { value: "90".to_string(), unit: DurationUnit::Minutes };
        assert_eq!(duration.hours(), Decimal::new(15, 1));

        let garbage = RequestedDuration { value: "soon".to_string(), unit: DurationUnit::Hours };
        assert_eq!(garbage.hours(), Decimal::ZERO);
    }
}
