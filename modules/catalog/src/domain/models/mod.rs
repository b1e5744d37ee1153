//! Catalog entities.
//!
//! Each entity carries a static field table used by the list query planner
//! and declares its unique indexes for the store.

mod attributes;
mod catalog;
mod orders;

pub use attributes::{
    ATTRIBUTE_OPTION_KEY_INDEX, Attribute, AttributeOption, NewProductAttributeValue,
    PAV_SELECTION_INDEX, ProductAttributeValue,
};
pub use catalog::{Account, Category, Product, Shop, Tag};
pub use orders::{
    AccountRef, NewOrder, ORDER_SEQUENCE_INDEX, Order, OrderItem, OrderPatch, OrderStatus,
};
