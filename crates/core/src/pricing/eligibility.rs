use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::booking::BookingDraft;
use crate::domain::catalog::{CatalogSnapshot, FrequencyDependencies, ServiceCategory};

/// Which booking surface is asking. Customers only see customer-facing extras.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    #[default]
    Customer,
    Admin,
}

impl std::str::FromStr for Audience {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "customer" => Ok(Self::Customer),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unsupported audience `{other}` (expected customer|admin)")),
        }
    }
}

/// Where the selected service category's sub-options come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionSource {
    NoService,
    StaticCategory,
    FrequencyDependencies,
}

#[derive(Clone, Debug)]
pub struct EligibilityInput<'a> {
    pub catalog: &'a CatalogSnapshot,
    pub service: Option<&'a str>,
    pub frequency: Option<&'a str>,
    pub dependencies: Option<&'a FrequencyDependencies>,
    pub audience: Audience,
}

/// Everything the booking form may show for the current selection.
///
/// Lists hold ids, except `frequencies`, `service_categories` and the
/// variable option values, which hold names.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    pub source: Option<OptionSource>,
    pub service_categories: Vec<String>,
    pub frequencies: Vec<String>,
    pub extras: Vec<String>,
    pub exclude_parameters: Vec<String>,
    pub variable_options: BTreeMap<String, Vec<String>>,
}

pub fn evaluate_eligibility(input: &EligibilityInput<'_>) -> Eligibility {
    let catalog = input.catalog;
    let selected = input.service.and_then(|key| catalog.service_category(key));

    let Some(category) = selected else {
        return Eligibility {
            source: Some(OptionSource::NoService),
            service_categories: catalog
                .service_categories
                .iter()
                .map(|category| category.name.clone())
                .collect(),
            ..Eligibility::default()
        };
    };

    let source = if category.service_category_frequency {
        OptionSource::FrequencyDependencies
    } else {
        OptionSource::StaticCategory
    };

    Eligibility {
        source: Some(source),
        service_categories: visible_service_categories(catalog, category, input.dependencies),
        frequencies: visible_frequencies(catalog, category),
        extras: visible_extras(catalog, category, input.dependencies, input.audience),
        exclude_parameters: visible_exclude_parameters(catalog, category, input.dependencies),
        variable_options: visible_variable_options(
            catalog,
            category,
            input.frequency,
            input.dependencies,
        ),
    }
}

fn visible_service_categories(
    catalog: &CatalogSnapshot,
    selected: &ServiceCategory,
    dependencies: Option<&FrequencyDependencies>,
) -> Vec<String> {
    if !selected.service_category_frequency {
        return catalog.service_categories.iter().map(|category| category.name.clone()).collect();
    }

    let Some(dependencies) = dependencies else {
        return Vec::new();
    };
    catalog
        .service_categories
        .iter()
        .filter(|category| dependencies.allows_service_category(category))
        .map(|category| category.name.clone())
        .collect()
}

/// Frequencies come from the category's own list in both modes, in catalog
/// order. A category with no configured frequencies offers none.
fn visible_frequencies(catalog: &CatalogSnapshot, category: &ServiceCategory) -> Vec<String> {
    catalog
        .frequencies
        .iter()
        .filter(|row| {
            category
                .selected_frequencies
                .iter()
                .map(|name| name.trim())
                .any(|name| name == row.name || name == row.id)
        })
        .map(|row| row.name.clone())
        .collect()
}

fn visible_extras(
    catalog: &CatalogSnapshot,
    category: &ServiceCategory,
    dependencies: Option<&FrequencyDependencies>,
    audience: Audience,
) -> Vec<String> {
    let shown = catalog
        .extras
        .iter()
        .filter(|extra| audience == Audience::Admin || extra.is_customer_facing());

    if category.service_category_frequency {
        let Some(dependencies) = dependencies else {
            return Vec::new();
        };
        return shown
            .filter(|extra| dependencies.allows_extra(extra))
            .map(|extra| extra.id.clone())
            .collect();
    }

    shown
        .filter(|extra| {
            category.extras.contains(&extra.id) || category.extras.contains(&extra.name)
        })
        .map(|extra| extra.id.clone())
        .collect()
}

fn visible_exclude_parameters(
    catalog: &CatalogSnapshot,
    category: &ServiceCategory,
    dependencies: Option<&FrequencyDependencies>,
) -> Vec<String> {
    if category.service_category_frequency {
        let Some(dependencies) = dependencies else {
            return Vec::new();
        };
        return catalog
            .exclude_parameters
            .iter()
            .filter(|parameter| dependencies.allows_exclude_parameter(parameter))
            .map(|parameter| parameter.id.clone())
            .collect();
    }

    catalog
        .exclude_parameters
        .iter()
        .filter(|parameter| {
            category.selected_exclude_parameters.contains(&parameter.name)
                || category.selected_exclude_parameters.contains(&parameter.id)
        })
        .map(|parameter| parameter.id.clone())
        .collect()
}

/// A pricing parameter is offered only when it passes its own gates and the
/// category-level source of truth. Frequency-driven categories carry no
/// variable lists, so there the own gates decide once dependencies resolved.
fn visible_variable_options(
    catalog: &CatalogSnapshot,
    category: &ServiceCategory,
    frequency: Option<&str>,
    dependencies: Option<&FrequencyDependencies>,
) -> BTreeMap<String, Vec<String>> {
    let mut options: BTreeMap<String, Vec<String>> = BTreeMap::new();

    if category.service_category_frequency && dependencies.is_none() {
        return options;
    }

    for parameter in &catalog.pricing_parameters {
        let Some(label) = parameter.variable_category() else {
            continue;
        };
        if !parameter.passes_gates(Some(category), frequency) {
            continue;
        }
        if !category.service_category_frequency {
            let allowed = category
                .variables
                .get(label)
                .is_some_and(|names| names.contains(&parameter.name));
            if !allowed {
                continue;
            }
        }

        let values = options.entry(label.to_string()).or_default();
        if !values.contains(&parameter.name) {
            values.push(parameter.name.clone());
        }
    }

    options
}

impl Eligibility {
    /// Clears every selection the eligible sets no longer contain.
    pub fn repair(&self, draft: &BookingDraft) -> BookingDraft {
        let mut repaired = draft.clone();

        if let Some(frequency) = &draft.frequency {
            if !self.frequencies.contains(frequency) {
                repaired.frequency = None;
            }
        }

        repaired.category_values.retain(|label, value| {
            self.variable_options.get(label).is_some_and(|values| values.contains(value))
        });
        repaired.extras.retain(|id, _| self.extras.contains(id));
        repaired.excluded.retain(|id, _| self.exclude_parameters.contains(id));

        repaired
    }
}

/// Maximum passes before reconciliation stops; each pass can only clear
/// selections, so a fixed point is reached quickly.
const MAX_RECONCILE_PASSES: usize = 4;

/// Re-derives eligibility and repairs the draft until nothing changes.
///
/// `dependencies` must belong to the draft's current frequency; once a pass
/// clears the frequency they are no longer applied.
pub fn reconcile_draft(
    catalog: &CatalogSnapshot,
    draft: &BookingDraft,
    dependencies: Option<&FrequencyDependencies>,
    audience: Audience,
) -> (BookingDraft, Eligibility) {
    let mut current = draft.clone();
    let mut eligibility = Eligibility::default();

    for _ in 0..MAX_RECONCILE_PASSES {
        let effective = if current.frequency.is_some() { dependencies } else { None };
        eligibility = evaluate_eligibility(&EligibilityInput {
            catalog,
            service: current.service.as_deref(),
            frequency: current.frequency.as_deref(),
            dependencies: effective,
            audience,
        });

        let repaired = eligibility.repair(&current);
        if repaired == current {
            break;
        }
        current = repaired;
    }

    (current, eligibility)
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use rust_decimal::Decimal;

    use crate::domain::booking::BookingDraft;
    use crate::domain::catalog::{
        CatalogSnapshot, DisplaySurface, ExcludeParameter, Extra, FrequencyDependencies,
        FrequencyRow, Industry, IndustryId, PricingParameter, ServiceCategory,
    };

    use super::{evaluate_eligibility, reconcile_draft, Audience, EligibilityInput, OptionSource};

    fn extra(id: &str, customer_facing: bool) -> Extra {
        let mut display = BTreeSet::new();
        if customer_facing {
            display.insert(DisplaySurface::CustomerFrontend);
        }
        Extra {
            id: id.to_string(),
            name: format!("{id} name"),
            price: Decimal::from(10),
            display,
            ..Default::default()
        }
    }

    fn parameter(id: &str, name: &str, label: &str) -> PricingParameter {
        PricingParameter {
            id: id.to_string(),
            name: name.to_string(),
            price: Decimal::from(50),
            variable_category: Some(label.to_string()),
            ..Default::default()
        }
    }

    fn catalog() -> CatalogSnapshot {
        let mut catalog = CatalogSnapshot::empty(Industry {
            id: IndustryId("ind-1".to_string()),
            name: "Home Cleaning".to_string(),
        });

        let mut variables = BTreeMap::new();
        variables.insert(
            "Bedrooms".to_string(),
            ["1 Bedroom".to_string(), "2 Bedrooms".to_string()].into_iter().collect(),
        );

        catalog.service_categories = vec![
            ServiceCategory {
                id: "sc-standard".to_string(),
                name: "Standard Cleaning".to_string(),
                selected_frequencies: ["One Time".to_string(), "Weekly".to_string()]
                    .into_iter()
                    .collect(),
                extras: ["ex-oven".to_string(), "ex-hidden".to_string()].into_iter().collect(),
                variables,
                selected_exclude_parameters: ["Kitchen".to_string()].into_iter().collect(),
                ..Default::default()
            },
            ServiceCategory {
                id: "sc-deep".to_string(),
                name: "Deep Cleaning".to_string(),
                service_category_frequency: true,
                selected_frequencies: ["Weekly".to_string()].into_iter().collect(),
                ..Default::default()
            },
        ];
        catalog.frequencies = vec![
            FrequencyRow { id: "f-1".to_string(), name: "One Time".to_string(), ..Default::default() },
            FrequencyRow { id: "f-2".to_string(), name: "Weekly".to_string(), ..Default::default() },
            FrequencyRow { id: "f-3".to_string(), name: "Monthly".to_string(), ..Default::default() },
        ];
        catalog.extras =
            vec![extra("ex-oven", true), extra("ex-fridge", true), extra("ex-hidden", false)];
        catalog.pricing_parameters = vec![
            parameter("pp-1", "1 Bedroom", "Bedrooms"),
            parameter("pp-2", "2 Bedrooms", "Bedrooms"),
            parameter("pp-3", "3 Bedrooms", "Bedrooms"),
            PricingParameter {
                frequencies: vec!["Monthly".to_string()],
                show_based_on_frequency: true,
                ..parameter("pp-4", "1 Bathroom", "Bathrooms")
            },
        ];
        catalog.exclude_parameters = vec![
            ExcludeParameter {
                id: "xp-kitchen".to_string(),
                name: "Kitchen".to_string(),
                price: Decimal::from(10),
                icon: None,
            },
            ExcludeParameter {
                id: "xp-bath".to_string(),
                name: "Bathroom".to_string(),
                price: Decimal::from(5),
                icon: None,
            },
        ];
        catalog
    }

    fn input<'a>(
        catalog: &'a CatalogSnapshot,
        service: Option<&'a str>,
        frequency: Option<&'a str>,
        dependencies: Option<&'a FrequencyDependencies>,
    ) -> EligibilityInput<'a> {
        EligibilityInput { catalog, service, frequency, dependencies, audience: Audience::Customer }
    }

    #[test]
    fn static_category_uses_its_own_configuration() {
        let catalog = catalog();
        let result =
            evaluate_eligibility(&input(&catalog, Some("Standard Cleaning"), Some("Weekly"), None));

        assert_eq!(result.source, Some(OptionSource::StaticCategory));
        assert_eq!(result.frequencies, vec!["One Time".to_string(), "Weekly".to_string()]);
        assert_eq!(result.extras, vec!["ex-oven".to_string()]);
        assert_eq!(result.exclude_parameters, vec!["xp-kitchen".to_string()]);
        assert_eq!(
            result.variable_options.get("Bedrooms"),
            Some(&vec!["1 Bedroom".to_string(), "2 Bedrooms".to_string()])
        );
        assert!(!result.variable_options.contains_key("Bathrooms"));
    }

    #[test]
    fn admin_audience_sees_hidden_extras() {
        let catalog = catalog();
        let mut admin = input(&catalog, Some("Standard Cleaning"), Some("Weekly"), None);
        admin.audience = Audience::Admin;

        let result = evaluate_eligibility(&admin);
        assert_eq!(result.extras, vec!["ex-oven".to_string(), "ex-hidden".to_string()]);
    }

    #[test]
    fn frequency_driven_category_fails_closed_without_dependencies() {
        let catalog = catalog();
        let result =
            evaluate_eligibility(&input(&catalog, Some("Deep Cleaning"), Some("Weekly"), None));

        assert_eq!(result.source, Some(OptionSource::FrequencyDependencies));
        assert!(result.extras.is_empty());
        assert!(result.service_categories.is_empty());
        assert!(result.exclude_parameters.is_empty());
        assert!(result.variable_options.is_empty());
        assert_eq!(result.frequencies, vec!["Weekly".to_string()]);
    }

    #[test]
    fn frequency_driven_category_uses_resolved_dependencies() {
        let catalog = catalog();
        let dependencies = FrequencyDependencies {
            service_categories: vec!["sc-deep".to_string()],
            extras: vec!["ex-fridge".to_string(), "ex-hidden".to_string()],
            exclude_parameters: vec!["Bathroom".to_string()],
        };
        let result = evaluate_eligibility(&input(
            &catalog,
            Some("Deep Cleaning"),
            Some("Weekly"),
            Some(&dependencies),
        ));

        assert_eq!(result.service_categories, vec!["Deep Cleaning".to_string()]);
        assert_eq!(result.extras, vec!["ex-fridge".to_string()]);
        assert_eq!(result.exclude_parameters, vec!["xp-bath".to_string()]);
        assert_eq!(result.variable_options.get("Bedrooms").map(Vec::len), Some(3));
        assert!(!result.variable_options.contains_key("Bathrooms"));
    }

    #[test]
    fn empty_dependency_lists_show_nothing() {
        let catalog = catalog();
        let dependencies = FrequencyDependencies::default();
        let result = evaluate_eligibility(&input(
            &catalog,
            Some("Deep Cleaning"),
            Some("Weekly"),
            Some(&dependencies),
        ));

        assert!(result.extras.is_empty());
        assert!(result.exclude_parameters.is_empty());
        assert!(result.service_categories.is_empty());
    }

    #[test]
    fn no_service_selected_offers_no_frequencies() {
        let catalog = catalog();
        let result = evaluate_eligibility(&input(&catalog, None, None, None));

        assert_eq!(result.source, Some(OptionSource::NoService));
        assert!(result.frequencies.is_empty());
        assert_eq!(result.service_categories.len(), 2);
    }

    #[test]
    fn reconcile_clears_now_invalid_selections() {
        let catalog = catalog();
        let mut draft = BookingDraft {
            service: Some("Standard Cleaning".to_string()),
            frequency: Some("Monthly".to_string()),
            ..BookingDraft::default()
        };
        draft.extras.insert("ex-oven".to_string(), 2);
        draft.extras.insert("ex-fridge".to_string(), 1);
        draft.excluded.insert("xp-bath".to_string(), 1);
        draft.category_values.insert("Bedrooms".to_string(), "3 Bedrooms".to_string());
        draft.category_values.insert("Bathrooms".to_string(), "1 Bathroom".to_string());

        let (repaired, _) = reconcile_draft(&catalog, &draft, None, Audience::Customer);

        assert_eq!(repaired.frequency, None);
        assert_eq!(repaired.extras.keys().cloned().collect::<Vec<_>>(), vec!["ex-oven"]);
        assert!(repaired.excluded.is_empty());
        assert!(repaired.category_values.is_empty());
    }

    #[test]
    fn reconcile_is_idempotent() {
        let catalog = catalog();
        let dependencies =
            FrequencyDependencies { extras: vec!["ex-fridge".to_string()], ..Default::default() };
        let mut draft = BookingDraft {
            service: Some("Deep Cleaning".to_string()),
            frequency: Some("Weekly".to_string()),
            ..BookingDraft::default()
        };
        draft.extras.insert("ex-oven".to_string(), 1);
        draft.extras.insert("ex-fridge".to_string(), 1);

        let (once, first) =
            reconcile_draft(&catalog, &draft, Some(&dependencies), Audience::Customer);
        let (twice, second) =
            reconcile_draft(&catalog, &once, Some(&dependencies), Audience::Customer);

        assert_eq!(once, twice);
        assert_eq!(first, second);
        assert_eq!(once.extras.keys().cloned().collect::<Vec<_>>(), vec!["ex-fridge"]);
    }

    #[test]
    fn clearing_frequency_drops_dependency_gated_selections() {
        let catalog = catalog();
        let dependencies =
            FrequencyDependencies { extras: vec!["ex-fridge".to_string()], ..Default::default() };
        let mut draft = BookingDraft {
            service: Some("Deep Cleaning".to_string()),
            frequency: Some("Monthly".to_string()),
            ..BookingDraft::default()
        };
        draft.extras.insert("ex-fridge".to_string(), 1);

        let (repaired, eligibility) =
            reconcile_draft(&catalog, &draft, Some(&dependencies), Audience::Customer);

        assert_eq!(repaired.frequency, None);
        assert!(repaired.extras.is_empty());
        assert!(eligibility.extras.is_empty());
    }
}
