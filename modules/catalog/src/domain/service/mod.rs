//! Domain service layer.
//!
//! - `listing` - shared list query path for every entity
//! - `selections` - product attribute selections (reconcile, clear, single insert)
//! - `orders` - order creation and status workflow
//!
//! Services own a [`Db`] handle and open one transaction per mutating call.
//! Notifications go out after commit and never fail the call.

use std::sync::Arc;

use catalog_db::Db;

use crate::config::CatalogConfig;
use crate::domain::ports::Notifier;

mod listing;
mod orders;
mod selections;

pub use listing::ListingService;
pub use orders::OrderService;
pub use selections::{ReconcileReport, SelectionService};

/// DI container aggregating the domain services.
#[derive(Clone)]
pub struct AppServices {
    pub listing: ListingService,
    pub selections: SelectionService,
    pub orders: OrderService,
}

impl AppServices {
    #[must_use]
    pub fn new(db: Db, notifier: Arc<dyn Notifier>, config: CatalogConfig) -> Self {
        let config = Arc::new(config);
        Self {
            listing: ListingService::new(db.clone(), Arc::clone(&config)),
            selections: SelectionService::new(
                db.clone(),
                Arc::clone(&notifier),
                Arc::clone(&config),
            ),
            orders: OrderService::new(db, notifier, config),
        }
    }
}
