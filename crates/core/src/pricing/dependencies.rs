use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::catalog::{CatalogSnapshot, FrequencyDependencies, IndustryId};

/// Resolves the dependency bundle embedded on the catalog's frequency rows.
///
/// Returns `None` when no frequency is selected, the frequency is unknown, or
/// the row carries no bundle. Never fails.
pub fn resolve_dependencies(
    catalog: &CatalogSnapshot,
    frequency: Option<&str>,
) -> Option<FrequencyDependencies> {
    let name = frequency.map(str::trim).filter(|name| !name.is_empty())?;
    let row = catalog.frequency(name)?;

    if row.dependencies.is_none() {
        debug!(
            event_name = "pricing.dependencies.not_embedded",
            industry_id = %catalog.industry.id.0,
            frequency = name,
            "frequency row carries no dependency bundle"
        );
    }

    row.dependencies.clone()
}

/// Identifies one outstanding dependency request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyTicket {
    pub generation: u64,
    pub industry_id: IndustryId,
    pub frequency: Option<String>,
}

/// Tracks which (industry, frequency) selection is current so that a slow
/// response for a superseded selection is discarded instead of applied.
#[derive(Clone, Debug, Default)]
pub struct DependencyTracker {
    generation: u64,
    current: Option<(IndustryId, Option<String>)>,
    resolved: Option<FrequencyDependencies>,
}

impl DependencyTracker {
    /// Records a new selection and returns the ticket its response must carry.
    ///
    /// Resolved dependencies from the previous selection are dropped right away
    /// so nothing gated reads stale lists while the request is in flight.
    pub fn begin(&mut self, industry_id: IndustryId, frequency: Option<String>) -> DependencyTicket {
        self.generation += 1;
        self.current = Some((industry_id.clone(), frequency.clone()));
        self.resolved = None;
        DependencyTicket { generation: self.generation, industry_id, frequency }
    }

    /// Applies a response. Returns `false` (and changes nothing) when the
    /// ticket no longer matches the current selection.
    pub fn complete(
        &mut self,
        ticket: &DependencyTicket,
        dependencies: Option<FrequencyDependencies>,
    ) -> bool {
        let is_current = ticket.generation == self.generation
            && self.current.as_ref().is_some_and(|(industry, frequency)| {
                industry == &ticket.industry_id && frequency == &ticket.frequency
            });

        if !is_current {
            debug!(
                event_name = "pricing.dependencies.stale_response",
                ticket_generation = ticket.generation,
                current_generation = self.generation,
                "discarding dependency response for superseded selection"
            );
            return false;
        }

        self.resolved = dependencies;
        true
    }

    pub fn resolved(&self) -> Option<&FrequencyDependencies> {
        self.resolved.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
