pub mod dependencies;
pub mod discount;
pub mod duration;
pub mod eligibility;
pub mod lookup;
pub mod quote;

use serde::{Deserialize, Serialize};

use crate::domain::booking::BookingDraft;
use crate::domain::catalog::{CatalogSnapshot, FrequencyDependencies};

use self::{
    eligibility::{reconcile_draft, Audience, Eligibility},
    quote::{DeterministicQuoteEngine, QuoteBreakdown, QuoteEngine, QuoteInput},
};

#[derive(Clone, Debug)]
pub struct BookingEvaluationInput<'a> {
    pub catalog: &'a CatalogSnapshot,
    pub draft: &'a BookingDraft,
    pub dependencies: Option<&'a FrequencyDependencies>,
    pub audience: Audience,
}

/// Eligibility, repaired draft and quote derived together from one input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingEvaluation {
    pub eligibility: Eligibility,
    pub draft: BookingDraft,
    pub quote: QuoteBreakdown,
}

pub trait BookingRuntime: Send + Sync {
    fn evaluate(&self, input: BookingEvaluationInput<'_>) -> BookingEvaluation;
}

pub struct DeterministicBookingRuntime<Q> {
    quote_engine: Q,
}

impl<Q> DeterministicBookingRuntime<Q> {
    pub fn new(quote_engine: Q) -> Self {
        Self { quote_engine }
    }
}

impl Default for DeterministicBookingRuntime<DeterministicQuoteEngine> {
    fn default() -> Self {
        Self::new(DeterministicQuoteEngine)
    }
}

impl<Q> BookingRuntime for DeterministicBookingRuntime<Q>
where
    Q: QuoteEngine,
{
    fn evaluate(&self, input: BookingEvaluationInput<'_>) -> BookingEvaluation {
        let (draft, eligibility) =
            reconcile_draft(input.catalog, input.draft, input.dependencies, input.audience);
        let quote = self.quote_engine.quote(&QuoteInput { catalog: input.catalog, draft: &draft });

        BookingEvaluation { eligibility, draft, quote }
    }
}
