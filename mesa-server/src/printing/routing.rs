//! Routing resolver
//!
//! Decides which printers receive which items. Kitchen routing goes through
//! stations: a printer either takes every item (no station) or only items of
//! its station's categories. A station without categories takes nothing.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use shared::models::{Printer, RoutableItem, Station};

use super::types::{DirectoryError, PrinterDirectory, ProductCatalog};

/// Category filter of one station
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationFilter {
    pub station_id: String,
    /// `None` when the station record no longer exists
    pub station_name: Option<String>,
    pub categories: HashSet<String>,
}

/// A printer's auto-print routing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoRoute {
    /// No station: the printer receives every item
    Unfiltered,
    Station(StationFilter),
}

impl AutoRoute {
    /// Build from the printer's station reference
    ///
    /// A dangling reference becomes an empty filter, so the printer receives nothing.
    pub fn for_printer(printer: &Printer, stations: &HashMap<String, Station>) -> Self {
        let Some(station_id) = &printer.station_id else {
            return Self::Unfiltered;
        };

        match stations.get(station_id) {
            Some(station) => Self::Station(StationFilter {
                station_id: station.id.clone(),
                station_name: Some(station.name.clone()),
                categories: station.category_ids.iter().cloned().collect(),
            }),
            None => Self::Station(StationFilter {
                station_id: station_id.clone(),
                station_name: None,
                categories: HashSet::new(),
            }),
        }
    }

    pub fn accepts(&self, category_id: Option<&str>) -> bool {
        match self {
            Self::Unfiltered => true,
            Self::Station(filter) => category_id.is_some_and(|c| filter.categories.contains(c)),
        }
    }

    pub fn station_name(&self) -> Option<&str> {
        match self {
            Self::Unfiltered => None,
            Self::Station(filter) => filter.station_name.as_deref(),
        }
    }
}

/// One printer and the items it should print
#[derive(Debug, Clone)]
pub struct StationTarget {
    pub printer: Printer,
    pub route: AutoRoute,
    pub items: Vec<RoutableItem>,
}

#[derive(Clone)]
pub struct RoutingResolver {
    directory: Arc<dyn PrinterDirectory>,
    catalog: Arc<dyn ProductCatalog>,
}

impl RoutingResolver {
    pub fn new(directory: Arc<dyn PrinterDirectory>, catalog: Arc<dyn ProductCatalog>) -> Self {
        Self { directory, catalog }
    }

    /// Kitchen targets for newly added items
    ///
    /// Printer order follows the branch printer list; item order follows the input.
    pub async fn resolve_station_targets(
        &self,
        branch_id: &str,
        items: &[RoutableItem],
    ) -> Result<Vec<StationTarget>, DirectoryError> {
        let printers: Vec<Printer> = self
            .directory
            .branch_printers(branch_id)
            .await?
            .into_iter()
            .filter(|p| p.is_active && p.auto_print && p.print_mode.receives_station_items())
            .collect();

        if printers.is_empty() || items.is_empty() {
            return Ok(Vec::new());
        }

        let stations: HashMap<String, Station> = if printers.iter().any(|p| p.station_id.is_some()) {
            self.directory
                .branch_stations(branch_id)
                .await?
                .into_iter()
                .map(|s| (s.id.clone(), s))
                .collect()
        } else {
            HashMap::new()
        };

        let routes: Vec<AutoRoute> = printers
            .iter()
            .map(|p| AutoRoute::for_printer(p, &stations))
            .collect();

        let needs_categories = routes.iter().any(|r| matches!(r, AutoRoute::Station(_)));
        let items = if needs_categories {
            self.backfill_categories(items).await?
        } else {
            items.to_vec()
        };

        let targets = printers
            .into_iter()
            .zip(routes)
            .filter_map(|(printer, route)| {
                let selected: Vec<RoutableItem> = items
                    .iter()
                    .filter(|item| route.accepts(item.category_id.as_deref()))
                    .cloned()
                    .collect();
                (!selected.is_empty()).then_some(StationTarget {
                    printer,
                    route,
                    items: selected,
                })
            })
            .collect();

        Ok(targets)
    }

    /// Control-ticket printers; no item filtering
    pub async fn resolve_billing_targets(
        &self,
        branch_id: &str,
    ) -> Result<Vec<Printer>, DirectoryError> {
        Ok(self
            .directory
            .branch_printers(branch_id)
            .await?
            .into_iter()
            .filter(|p| p.is_active && p.print_mode.receives_full_order())
            .collect())
    }

    /// Fill missing categories with a single catalog lookup
    async fn backfill_categories(
        &self,
        items: &[RoutableItem],
    ) -> Result<Vec<RoutableItem>, DirectoryError> {
        let mut seen = HashSet::new();
        let missing: Vec<String> = items
            .iter()
            .filter(|item| item.category_id.is_none())
            .filter(|item| seen.insert(item.product_id.as_str()))
            .map(|item| item.product_id.clone())
            .collect();

        if missing.is_empty() {
            return Ok(items.to_vec());
        }

        let categories = self.catalog.categories_for(&missing).await?;
        Ok(items
            .iter()
            .cloned()
            .map(|mut item| {
                if item.category_id.is_none() {
                    item.category_id = categories.get(&item.product_id).cloned();
                }
                item
            })
            .collect())
    }
}
