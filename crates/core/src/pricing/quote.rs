use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::booking::{BookingDraft, ManualAdjustments};
use crate::domain::catalog::CatalogSnapshot;
use crate::pricing::discount::{
    extras_minutes, extras_total, frequency_discount, partial_cleaning_discount,
    FrequencyDiscountInput,
};
use crate::pricing::duration::{adjust_duration, AdjustedDuration};
use crate::pricing::lookup::{lookup_base_price, PriceLookupInput, PriceSource};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteTraceStep {
    pub stage: String,
    pub detail: String,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteBreakdown {
    pub service_total: Decimal,
    pub extras_total: Decimal,
    pub extras_minutes: u32,
    pub partial_cleaning_discount: Decimal,
    pub frequency_discount: Decimal,
    pub subtotal: Decimal,
    pub total_discount: Decimal,
    pub final_amount: Decimal,
    pub price_source: PriceSource,
    pub duration: AdjustedDuration,
    pub trace: Vec<QuoteTraceStep>,
}

/// Component amounts fed into the final total.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuoteComponents {
    pub service_total: Decimal,
    pub extras_total: Decimal,
    pub partial_cleaning_discount: Decimal,
    pub frequency_discount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuoteTotals {
    pub subtotal: Decimal,
    pub total_discount: Decimal,
    pub final_amount: Decimal,
}

/// Combines component amounts and manual overrides.
///
/// Both overrides replace the computed value outright. Only the computed
/// total is floored at zero; an override is trusted as entered. Sums
/// saturate at the `Decimal` bounds.
pub fn aggregate(components: &QuoteComponents, adjustments: &ManualAdjustments) -> QuoteTotals {
    let subtotal = adjustments
        .service_total_override()
        .unwrap_or_else(|| components.service_total.saturating_add(components.extras_total));
    let total_discount =
        components.partial_cleaning_discount.saturating_add(components.frequency_discount);
    let computed = subtotal.saturating_sub(total_discount).max(Decimal::ZERO);
    let final_amount = adjustments.price_override().unwrap_or(computed);

    QuoteTotals { subtotal, total_discount, final_amount }
}

#[derive(Clone, Debug)]
pub struct QuoteInput<'a> {
    pub catalog: &'a CatalogSnapshot,
    pub draft: &'a BookingDraft,
}

pub trait QuoteEngine: Send + Sync {
    fn quote(&self, input: &QuoteInput<'_>) -> QuoteBreakdown;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DeterministicQuoteEngine;

impl QuoteEngine for DeterministicQuoteEngine {
    fn quote(&self, input: &QuoteInput<'_>) -> QuoteBreakdown {
        price_draft(input.catalog, input.draft)
    }
}

pub fn price_draft(catalog: &CatalogSnapshot, draft: &BookingDraft) -> QuoteBreakdown {
    let frequency = draft.frequency.as_deref().and_then(|name| catalog.frequency(name));

    let base = lookup_base_price(&PriceLookupInput {
        service: draft.service.as_deref(),
        frequency: draft.frequency.as_deref(),
        category_values: &draft.category_values,
        pricing_parameters: &catalog.pricing_parameters,
        service_categories: &catalog.service_categories,
        duration_hours: draft.duration.hours(),
    });

    let extras = extras_total(&catalog.extras, &draft.extras);
    let partial = partial_cleaning_discount(
        &catalog.exclude_parameters,
        draft.partial_cleaning,
        &draft.excluded,
    );
    let recurring = frequency_discount(&FrequencyDiscountInput {
        frequency,
        service_total: base.price,
        extras_total: extras,
        partial_cleaning_discount: partial,
        is_first_appointment: draft.is_first_appointment,
    });

    let components = QuoteComponents {
        service_total: base.price,
        extras_total: extras,
        partial_cleaning_discount: partial,
        frequency_discount: recurring,
    };
    let totals = aggregate(&components, &draft.adjustments);

    let mut trace = vec![
        QuoteTraceStep {
            stage: "base_price".to_string(),
            detail: format!("{:?}", base.source),
            amount: base.price,
        },
        QuoteTraceStep {
            stage: "extras".to_string(),
            detail: "sum(extra.price * quantity)".to_string(),
            amount: extras,
        },
        QuoteTraceStep {
            stage: "partial_cleaning".to_string(),
            detail: "sum(exclude.price * quantity)".to_string(),
            amount: partial,
        },
        QuoteTraceStep {
            stage: "frequency_discount".to_string(),
            detail: draft.frequency.clone().unwrap_or_else(|| "<none>".to_string()),
            amount: recurring,
        },
    ];
    if let Some(amount) = draft.adjustments.service_total_override() {
        trace.push(QuoteTraceStep {
            stage: "service_total_override".to_string(),
            detail: "subtotal replaced by manual amount".to_string(),
            amount,
        });
    }
    if let Some(amount) = draft.adjustments.price_override() {
        trace.push(QuoteTraceStep {
            stage: "price_override".to_string(),
            detail: "final amount replaced by manual amount".to_string(),
            amount,
        });
    }
    trace.push(QuoteTraceStep {
        stage: "final".to_string(),
        detail: "max(0, subtotal - discounts) unless overridden".to_string(),
        amount: totals.final_amount,
    });

    QuoteBreakdown {
        service_total: base.price,
        extras_total: extras,
        extras_minutes: extras_minutes(&catalog.extras, &draft.extras),
        partial_cleaning_discount: partial,
        frequency_discount: recurring,
        subtotal: totals.subtotal,
        total_discount: totals.total_discount,
        final_amount: totals.final_amount,
        price_source: base.source,
        duration: adjust_duration(frequency, &draft.duration, draft.is_first_appointment),
        trace,
    }
}
