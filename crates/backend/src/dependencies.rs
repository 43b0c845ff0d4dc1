use homequote_core::domain::catalog::{CatalogSnapshot, FrequencyDependencies, Industry};
use homequote_core::pricing::dependencies::{resolve_dependencies, DependencyTicket};
use tracing::warn;

use crate::client::{BackendClient, FrequencyQuery};

/// Fetches the dependency bundle for the selection named by `ticket`.
///
/// Reads the industry's frequency rows fresh from the backend. Any failure,
/// or no frequency on the ticket, yields `None`, which the eligibility
/// filter treats as "nothing gated is eligible".
pub async fn fetch_dependencies<C>(
    client: &C,
    ticket: &DependencyTicket,
) -> Option<FrequencyDependencies>
where
    C: BackendClient + ?Sized,
{
    let frequency = ticket.frequency.as_deref()?;

    let query = FrequencyQuery::for_industry(ticket.industry_id.clone());
    let rows = match client.frequencies(&query).await {
        Ok(rows) => rows,
        Err(error) => {
            warn!(
                event_name = "backend.dependencies.degraded",
                industry_id = %ticket.industry_id.0,
                frequency,
                error = %error,
                "frequency dependency lookup failed"
            );
            return None;
        }
    };

    let mut catalog = CatalogSnapshot::empty(Industry {
        id: ticket.industry_id.clone(),
        name: String::new(),
    });
    catalog.frequencies = rows;
    resolve_dependencies(&catalog, Some(frequency))
}
