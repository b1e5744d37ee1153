#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Retail catalog core.
//!
//! Three services sit on top of the shared store:
//!
//! - [`ListingService`]: filtered, sorted, paginated listing of any entity
//! - [`SelectionService`]: per-attribute reconciliation of a product's
//!   selected options, plus the single-insert and clear paths
//! - [`OrderService`]: order admission (allow-list, weight limit, per-shop
//!   numbering) and the status workflow
//!
//! [`AppServices`] wires all three from one [`catalog_db::Db`], a
//! [`Notifier`] and a [`CatalogConfig`].

pub mod config;
pub mod domain;
pub mod infra;

pub use config::{CatalogConfig, ChannelConfig};
pub use domain::error::{DomainError, ErrorKind};
pub use domain::models::{
    Account, AccountRef, Attribute, AttributeOption, Category, NewOrder, NewProductAttributeValue,
    Order, OrderItem, OrderPatch, OrderStatus, Product, ProductAttributeValue, Shop, Tag,
};
pub use domain::ports::{Notifier, RequestContext};
pub use domain::service::{
    AppServices, ListingService, OrderService, ReconcileReport, SelectionService,
};
pub use infra::TracingNotifier;
