use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::NaiveDate;
use homequote_core::domain::catalog::Provider;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::client::BackendClient;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AvailabilityReport {
    /// Merged free slots per date, across all providers.
    pub slots: BTreeMap<NaiveDate, BTreeSet<String>>,
    pub providers_checked: usize,
    /// Provider ids whose lookup failed for at least one date.
    pub failed_providers: BTreeSet<String>,
}

impl AvailabilityReport {
    pub fn slots_on(&self, date: NaiveDate) -> Vec<String> {
        self.slots.get(&date).map(|slots| slots.iter().cloned().collect()).unwrap_or_default()
    }
}

/// Looks up free slots for every provider on every requested date.
///
/// One request per (provider, date) pair runs concurrently; the call resolves
/// only after all of them finish. Failed lookups are counted and skipped.
pub async fn provider_availability<C>(
    client: Arc<C>,
    business_id: Option<String>,
    dates: &[NaiveDate],
) -> AvailabilityReport
where
    C: BackendClient + ?Sized + 'static,
{
    let providers = match client.providers(business_id.as_deref()).await {
        Ok(providers) => providers,
        Err(error) => {
            warn!(
                event_name = "backend.fetch.degraded",
                part = "providers",
                error = %error,
                "provider list unavailable; reporting no availability"
            );
            return AvailabilityReport::default();
        }
    };

    let mut report = AvailabilityReport {
        slots: dates.iter().map(|date| (*date, BTreeSet::new())).collect(),
        providers_checked: providers.len(),
        failed_providers: BTreeSet::new(),
    };
    if providers.is_empty() {
        info!(event_name = "availability.no_providers", "no providers configured");
        return report;
    }

    let mut lookups = JoinSet::new();
    for Provider { id, .. } in providers {
        for date in dates.iter().copied() {
            let client = Arc::clone(&client);
            let business_id = business_id.clone();
            let provider_id = id.clone();
            lookups.spawn(async move {
                let result =
                    client.available_slots(&provider_id, date, business_id.as_deref()).await;
                (provider_id, date, result)
            });
        }
    }

    while let Some(joined) = lookups.join_next().await {
        match joined {
            Ok((_, date, Ok(slots))) => {
                report.slots.entry(date).or_default().extend(slots);
            }
            Ok((provider_id, date, Err(error))) => {
                warn!(
                    event_name = "availability.lookup_failed",
                    provider_id = %provider_id,
                    date = %date,
                    error = %error,
                    "provider slot lookup failed"
                );
                report.failed_providers.insert(provider_id);
            }
            Err(error) => {
                warn!(
                    event_name = "availability.task_failed",
                    error = %error,
                    "slot lookup task did not complete"
                );
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use homequote_core::domain::catalog::Provider;

    use crate::error::BackendError;
    use crate::memory::{Endpoint, InMemoryBackend};

    use super::provider_availability;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 11, d).expect("valid date")
    }

    async fn backend() -> Arc<InMemoryBackend> {
        let backend = InMemoryBackend::default();
        for (id, name) in [("p-1", "Sam"), ("p-2", "Alex"), ("p-3", "Jo")] {
            backend.insert_provider(Provider { id: id.to_string(), name: name.to_string() }).await;
        }
        backend.set_slots("p-1", day(2), &["09:00", "13:00"]).await;
        backend.set_slots("p-2", day(2), &["09:00", "11:00"]).await;
        backend.set_slots("p-3", day(3), &["15:00"]).await;
        Arc::new(backend)
    }

    #[tokio::test]
    async fn merges_slots_across_providers_into_sorted_set() {
        let report = provider_availability(backend().await, None, &[day(2), day(3)]).await;

        assert_eq!(report.providers_checked, 3);
        assert_eq!(report.slots_on(day(2)), vec!["09:00", "11:00", "13:00"]);
        assert_eq!(report.slots_on(day(3)), vec!["15:00"]);
        assert!(report.failed_providers.is_empty());
    }

    #[tokio::test]
    async fn one_failing_provider_does_not_abort_merge() {
        let backend = backend().await;
        backend.fail_provider("p-2").await;

        let report = provider_availability(backend, None, &[day(2)]).await;

        assert_eq!(report.slots_on(day(2)), vec!["09:00", "13:00"]);
        assert!(report.failed_providers.contains("p-2"));
    }

    #[tokio::test]
    async fn provider_list_failure_reports_nothing() {
        let backend = backend().await;
        backend.fail(Endpoint::Providers, BackendError::Transport("refused".to_string())).await;

        let report = provider_availability(backend, None, &[day(2)]).await;

        assert_eq!(report.providers_checked, 0);
        assert!(report.slots.is_empty());
    }
}
