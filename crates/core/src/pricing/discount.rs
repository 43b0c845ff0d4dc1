use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::warn;

use crate::domain::catalog::{
    DiscountType, ExcludeParameter, Extra, FrequencyDiscountScope, FrequencyRow,
};

/// Quantity lookups treat a missing or zero quantity as one unit.
fn effective_quantity(quantity: u32) -> Decimal {
    Decimal::from(quantity.max(1))
}

/// Sums `price × quantity` lines. A line that does not fit a `Decimal`, on
/// its own or added to the running total, is left out and logged.
fn checked_total<'a, I>(component: &str, lines: I) -> Decimal
where
    I: IntoIterator<Item = (&'a str, Decimal, u32)>,
{
    lines.into_iter().fold(Decimal::ZERO, |total, (id, price, quantity)| {
        let amount = price.checked_mul(effective_quantity(quantity));
        match amount.and_then(|amount| total.checked_add(amount)) {
            Some(next) => next,
            None => {
                warn!(
                    event_name = "pricing.amount.overflow",
                    component,
                    id,
                    quantity,
                    "line amount out of range; left out of the total"
                );
                total
            }
        }
    })
}

/// Sum of `price × quantity` over the selected extras. Unknown ids are
/// skipped; quantities are not re-clamped here.
pub fn extras_total(extras: &[Extra], selected: &BTreeMap<String, u32>) -> Decimal {
    checked_total(
        "extras",
        selected.iter().filter_map(|(id, quantity)| {
            extras
                .iter()
                .find(|extra| &extra.id == id)
                .map(|extra| (extra.id.as_str(), extra.price, *quantity))
        }),
    )
}

pub fn extras_minutes(extras: &[Extra], selected: &BTreeMap<String, u32>) -> u32 {
    selected
        .iter()
        .filter_map(|(id, quantity)| {
            extras.iter().find(|extra| &extra.id == id).map(|extra| (extra, *quantity))
        })
        .map(|(extra, quantity)| extra.time.saturating_mul(quantity.max(1)))
        .fold(0u32, u32::saturating_add)
}

/// Credit for the sub-tasks the customer opted out of. Returned as a
/// positive amount that callers subtract.
pub fn partial_cleaning_discount(
    parameters: &[ExcludeParameter],
    partial_cleaning: bool,
    excluded: &BTreeMap<String, u32>,
) -> Decimal {
    if !partial_cleaning {
        return Decimal::ZERO;
    }

    checked_total(
        "partial_cleaning",
        excluded.iter().filter_map(|(id, quantity)| {
            parameters
                .iter()
                .find(|parameter| &parameter.id == id)
                .map(|parameter| (parameter.id.as_str(), parameter.price, *quantity))
        }),
    )
}

#[derive(Clone, Debug)]
pub struct FrequencyDiscountInput<'a> {
    pub frequency: Option<&'a FrequencyRow>,
    pub service_total: Decimal,
    pub extras_total: Decimal,
    pub partial_cleaning_discount: Decimal,
    pub is_first_appointment: bool,
}

/// Recurring discount for the selected frequency.
///
/// Percent discounts scale with `service + extras - partial`, or are zero
/// when that product leaves the `Decimal` range; flat discounts are returned
/// verbatim. A recurring frequency scoped to exclude the first
/// visit yields zero for the first appointment.
pub fn frequency_discount(input: &FrequencyDiscountInput<'_>) -> Decimal {
    let Some(frequency) = input.frequency else {
        return Decimal::ZERO;
    };
    let discount = match frequency.discount {
        Some(discount) if !discount.is_zero() => discount,
        _ => return Decimal::ZERO,
    };

    if frequency.is_recurring()
        && frequency.frequency_discount == FrequencyDiscountScope::ExcludeFirst
        && input.is_first_appointment
    {
        return Decimal::ZERO;
    }

    match frequency.discount_type {
        DiscountType::Percent => {
            let scaled = input
                .service_total
                .checked_add(input.extras_total)
                .and_then(|sum| sum.checked_sub(input.partial_cleaning_discount))
                .and_then(|base| base.checked_mul(discount));
            match scaled {
                Some(scaled) => scaled / Decimal::ONE_HUNDRED,
                None => {
                    warn!(
                        event_name = "pricing.amount.overflow",
                        component = "frequency_discount",
                        frequency = %frequency.name,
                        "discount base out of range; no discount applied"
                    );
                    Decimal::ZERO
                }
            }
        }
        DiscountType::Flat => discount,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rust_decimal::Decimal;

    use crate::domain::catalog::{
        DiscountType, ExcludeParameter, Extra, FrequencyDiscountScope, FrequencyRow,
        OccurrenceTime,
    };

    use super::{
        extras_minutes, extras_total, frequency_discount, partial_cleaning_discount,
        FrequencyDiscountInput,
    };

    fn extra(id: &str, price: i64, time: u32) -> Extra {
        Extra {
            id: id.to_string(),
            name: id.to_string(),
            price: Decimal::from(price),
            time,
            qty_based: true,
            ..Default::default()
        }
    }

    fn recurring(discount: i64, kind: DiscountType, scope: FrequencyDiscountScope) -> FrequencyRow {
        FrequencyRow {
            id: "f-2".to_string(),
            name: "Weekly".to_string(),
            occurrence_time: OccurrenceTime::Recurring,
            discount: Some(Decimal::from(discount)),
            discount_type: kind,
            frequency_discount: scope,
            ..Default::default()
        }
    }

    fn input(frequency: Option<&FrequencyRow>, first: bool) -> FrequencyDiscountInput<'_> {
        FrequencyDiscountInput {
            frequency,
            service_total: Decimal::from(100),
            extras_total: Decimal::from(55),
            partial_cleaning_discount: Decimal::from(10),
            is_first_appointment: first,
        }
    }

    #[test]
    fn extras_total_sums_price_times_quantity() {
        let extras = vec![extra("ex-oven", 20, 30), extra("ex-fridge", 15, 20)];
        let selected: BTreeMap<String, u32> =
            [("ex-oven".to_string(), 2), ("ex-fridge".to_string(), 1)].into_iter().collect();

        assert_eq!(extras_total(&extras, &selected), Decimal::from(55));
        assert_eq!(extras_minutes(&extras, &selected), 80);
    }

    #[test]
    fn extras_total_is_not_clamped_to_maximum() {
        let mut oven = extra("ex-oven", 20, 30);
        oven.maximum_quantity = Some(1);
        let selected: BTreeMap<String, u32> = [("ex-oven".to_string(), 3)].into_iter().collect();

        assert_eq!(extras_total(&[oven], &selected), Decimal::from(60));
    }

    #[test]
    fn out_of_range_lines_are_left_out_of_totals() {
        let mut huge = extra("ex-huge", 0, 0);
        huge.price = Decimal::MAX;
        let extras = vec![huge, extra("ex-oven", 20, 30)];
        let selected: BTreeMap<String, u32> =
            [("ex-huge".to_string(), 2), ("ex-oven".to_string(), 1)].into_iter().collect();

        assert_eq!(extras_total(&extras, &selected), Decimal::from(20));

        let parameters = vec![
            ExcludeParameter {
                id: "xp-attic".to_string(),
                name: "Attic".to_string(),
                price: Decimal::MAX,
                icon: None,
            },
            ExcludeParameter {
                id: "xp-kitchen".to_string(),
                name: "Kitchen".to_string(),
                price: Decimal::from(5),
                icon: None,
            },
        ];
        let excluded: BTreeMap<String, u32> =
            [("xp-attic".to_string(), 3), ("xp-kitchen".to_string(), 1)].into_iter().collect();

        assert_eq!(partial_cleaning_discount(&parameters, true, &excluded), Decimal::from(5));
    }

    #[test]
    fn percent_discount_on_out_of_range_base_is_zero() {
        let weekly = recurring(10, DiscountType::Percent, FrequencyDiscountScope::All);
        let mut huge = input(Some(&weekly), false);
        huge.service_total = Decimal::MAX;

        assert_eq!(frequency_discount(&huge), Decimal::ZERO);
    }

    #[test]
    fn partial_cleaning_requires_toggle() {
        let parameters = vec![ExcludeParameter {
            id: "xp-kitchen".to_string(),
            name: "Kitchen".to_string(),
            price: Decimal::from(5),
            icon: None,
        }];
        let excluded: BTreeMap<String, u32> =
            [("xp-kitchen".to_string(), 2)].into_iter().collect();

        assert_eq!(partial_cleaning_discount(&parameters, false, &excluded), Decimal::ZERO);
        assert_eq!(partial_cleaning_discount(&parameters, true, &excluded), Decimal::from(10));
        assert_eq!(
            partial_cleaning_discount(&parameters, true, &BTreeMap::new()),
            Decimal::ZERO
        );
    }

    #[test]
    fn percent_discount_applies_to_net_subtotal() {
        let weekly = recurring(10, DiscountType::Percent, FrequencyDiscountScope::All);
        assert_eq!(frequency_discount(&input(Some(&weekly), true)), Decimal::new(145, 1));
    }

    #[test]
    fn percent_discount_scales_linearly() {
        let weekly = recurring(10, DiscountType::Percent, FrequencyDiscountScope::All);
        let mut doubled = input(Some(&weekly), false);
        doubled.service_total = Decimal::from(245);

        assert_eq!(frequency_discount(&doubled), Decimal::from(29));
    }

    #[test]
    fn flat_discount_ignores_subtotal() {
        let weekly = recurring(25, DiscountType::Flat, FrequencyDiscountScope::All);
        let mut large = input(Some(&weekly), false);
        large.service_total = Decimal::from(10_000);

        assert_eq!(frequency_discount(&input(Some(&weekly), false)), Decimal::from(25));
        assert_eq!(frequency_discount(&large), Decimal::from(25));
    }

    #[test]
    fn exclude_first_zeroes_first_visit_for_any_magnitude_or_type() {
        for kind in [DiscountType::Percent, DiscountType::Flat] {
            for magnitude in [1, 15, 90] {
                let weekly = recurring(magnitude, kind, FrequencyDiscountScope::ExcludeFirst);
                assert_eq!(frequency_discount(&input(Some(&weekly), true)), Decimal::ZERO);
                assert!(frequency_discount(&input(Some(&weekly), false)) > Decimal::ZERO);
            }
        }
    }

    #[test]
    fn exclude_first_does_not_apply_to_one_time_frequencies() {
        let mut one_time = recurring(10, DiscountType::Flat, FrequencyDiscountScope::ExcludeFirst);
        one_time.occurrence_time = OccurrenceTime::OneTime;

        assert_eq!(frequency_discount(&input(Some(&one_time), true)), Decimal::from(10));
    }

    #[test]
    fn no_frequency_or_no_discount_is_zero() {
        assert_eq!(frequency_discount(&input(None, false)), Decimal::ZERO);

        let mut plain = recurring(0, DiscountType::Percent, FrequencyDiscountScope::All);
        assert_eq!(frequency_discount(&input(Some(&plain), false)), Decimal::ZERO);
        plain.discount = None;
        assert_eq!(frequency_discount(&input(Some(&plain), false)), Decimal::ZERO);
    }
}
