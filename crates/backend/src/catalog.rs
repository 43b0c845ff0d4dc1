use homequote_core::domain::catalog::{CatalogSnapshot, Industry, IndustryId};
use tracing::{info, warn};

use crate::client::{BackendClient, FrequencyQuery};
use crate::error::BackendError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogRequest {
    pub industry_id: IndustryId,
    pub business_id: Option<String>,
    pub zipcode: Option<String>,
}

impl CatalogRequest {
    pub fn new(industry_id: IndustryId) -> Self {
        Self { industry_id, business_id: None, zipcode: None }
    }
}

/// Which parts of a snapshot fell back to empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CatalogLoadReport {
    pub degraded: Vec<&'static str>,
}

impl CatalogLoadReport {
    pub fn is_complete(&self) -> bool {
        self.degraded.is_empty()
    }
}

fn degrade<T>(
    result: Result<Vec<T>, BackendError>,
    part: &'static str,
    industry_id: &IndustryId,
    report: &mut CatalogLoadReport,
) -> Vec<T> {
    match result {
        Ok(rows) => rows,
        Err(error) => {
            warn!(
                event_name = "backend.fetch.degraded",
                industry_id = %industry_id.0,
                part,
                error = %error,
                "backend read failed; continuing with an empty list"
            );
            report.degraded.push(part);
            Vec::new()
        }
    }
}

/// Fetches every catalog list for one industry concurrently.
///
/// Never fails: each list that cannot be fetched or decoded is replaced by an
/// empty one and named in the report.
pub async fn load_catalog<C>(
    client: &C,
    request: &CatalogRequest,
) -> (CatalogSnapshot, CatalogLoadReport)
where
    C: BackendClient + ?Sized,
{
    let industry_id = &request.industry_id;
    let frequency_query = FrequencyQuery {
        industry_id: industry_id.clone(),
        include_all: true,
        zipcode: request.zipcode.clone(),
    };

    let (industries, frequencies, categories, extras, parameters, excludes) = tokio::join!(
        client.industries(request.business_id.as_deref()),
        client.frequencies(&frequency_query),
        client.service_categories(industry_id),
        client.extras(industry_id),
        client.pricing_parameters(industry_id),
        client.exclude_parameters(industry_id),
    );

    let mut report = CatalogLoadReport::default();
    let industries = degrade(industries, "industries", industry_id, &mut report);
    let industry = match industries.into_iter().find(|industry| &industry.id == industry_id) {
        Some(industry) => industry,
        None => {
            info!(
                event_name = "backend.catalog.industry_missing",
                industry_id = %industry_id.0,
                "industry not listed by backend"
            );
            Industry { id: industry_id.clone(), name: String::new() }
        }
    };

    let mut catalog = CatalogSnapshot::empty(industry);
    catalog.frequencies = degrade(frequencies, "frequencies", industry_id, &mut report);
    catalog.service_categories =
        degrade(categories, "service_categories", industry_id, &mut report);
    catalog.extras = degrade(extras, "extras", industry_id, &mut report);
    catalog.pricing_parameters =
        degrade(parameters, "pricing_parameters", industry_id, &mut report);
    catalog.exclude_parameters = degrade(excludes, "exclude_parameters", industry_id, &mut report);

    info!(
        event_name = "backend.catalog.loaded",
        industry_id = %industry_id.0,
        service_categories = catalog.service_categories.len(),
        frequencies = catalog.frequencies.len(),
        extras = catalog.extras.len(),
        degraded = report.degraded.len(),
        "catalog snapshot loaded"
    );

    (catalog, report)
}
