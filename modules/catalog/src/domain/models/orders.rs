use std::fmt;

use catalog_db::{Entity, UniqueKey};
use catalog_query::{EntitySchema, FieldDef, FieldKind, Record, Value};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Unique index over `(shop_id, customer_order_id)`.
pub const ORDER_SEQUENCE_INDEX: &str = "order_shop_sequence";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Complete,
    Cancelled,
}

impl OrderStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Complete => "complete",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Case-insensitive parse of a status name.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(OrderStatus::Pending),
            "complete" => Some(OrderStatus::Complete),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// Lenient form used on order creation: anything unrecognised is
    /// `Pending`.
    #[must_use]
    pub fn coerce(raw: Option<&str>) -> Self {
        raw.and_then(Self::parse).unwrap_or_default()
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Free-form description; also the key into the unit-weight table.
    pub description: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub product_id: Option<Uuid>,
}

impl OrderItem {
    #[must_use]
    pub fn new(description: impl Into<String>, quantity: u32, unit_price: f64) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
            product_id: None,
        }
    }

    #[must_use]
    pub fn line_total(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }
}

const ORDER_FIELDS: &[FieldDef] = &[
    FieldDef::new("id", FieldKind::Uuid),
    FieldDef::new("shop_id", FieldKind::Uuid),
    FieldDef::new("account_id", FieldKind::Uuid),
    FieldDef::new("customer_order_id", FieldKind::I64),
    FieldDef::new("status", FieldKind::String),
    FieldDef::new("total", FieldKind::F64),
    FieldDef::new("notes", FieldKind::String),
    FieldDef::new("completed_at", FieldKind::DateTime),
    FieldDef::new("completed_by", FieldKind::Uuid),
    FieldDef::new("created_at", FieldKind::DateTime),
];
static ORDER: EntitySchema = EntitySchema::new("order", ORDER_FIELDS);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub account_id: Uuid,
    /// Customer-visible number, unique within the shop.
    pub customer_order_id: u64,
    pub items: Vec<OrderItem>,
    pub status: OrderStatus,
    pub total: f64,
    pub notes: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    pub completed_by: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Order {
    /// Record the first transition into a terminal status. Later calls keep
    /// the original timestamp and actor.
    pub fn mark_completed(&mut self, actor: Option<Uuid>, at: OffsetDateTime) {
        if self.completed_at.is_none() {
            self.completed_at = Some(at);
            self.completed_by = actor;
        }
    }
}

impl Record for Order {
    fn schema() -> &'static EntitySchema {
        &ORDER
    }

    fn value(&self, field: &str) -> Value {
        match field {
            "id" => self.id.into(),
            "shop_id" => self.shop_id.into(),
            "account_id" => self.account_id.into(),
            "customer_order_id" => self.customer_order_id.into(),
            "status" => self.status.as_str().into(),
            "total" => self.total.into(),
            "notes" => self.notes.clone().into(),
            "completed_at" => self.completed_at.into(),
            "completed_by" => self.completed_by.into(),
            "created_at" => self.created_at.into(),
            _ => Value::Null,
        }
    }
}

impl Entity for Order {
    fn id(&self) -> Uuid {
        self.id
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::new(
            ORDER_SEQUENCE_INDEX,
            format!("{}:{}", self.shop_id, self.customer_order_id),
        )]
    }
}

/// Who places an order: an existing account, or a new one created by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRef {
    Id(Uuid),
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub account: AccountRef,
    pub items: Vec<OrderItem>,
    /// Requested initial status; unrecognised values fall back to pending.
    pub status: Option<String>,
    pub notes: Option<String>,
}

impl NewOrder {
    #[must_use]
    pub fn new(account: AccountRef, items: Vec<OrderItem>) -> Self {
        Self {
            account,
            items,
            status: None,
            notes: None,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.items.iter().map(OrderItem::line_total).sum()
    }
}

/// Partial order update; `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    pub notes: Option<String>,
    pub total: Option<f64>,
    pub items: Option<Vec<OrderItem>>,
}

impl OrderPatch {
    #[must_use]
    pub fn status(status: OrderStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_status_coercion() {
        let shouted = OrderStatus::coerce(Some("COMPLETE"));
        assert_eq!(shouted, OrderStatus::Complete);
        assert_eq!(OrderStatus::coerce(Some("shipped")), OrderStatus::Pending);
        assert_eq!(OrderStatus::coerce(None), OrderStatus::Pending);
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
    }

    #[test]
    fn test_mark_completed_keeps_first_write() {
        let first = Uuid::now_v7();
        let then = OffsetDateTime::now_utc();
        let mut order = Order {
            id: Uuid::now_v7(),
            shop_id: Uuid::now_v7(),
            account_id: Uuid::now_v7(),
            customer_order_id: 1,
            items: Vec::new(),
            status: OrderStatus::Complete,
            total: 0.0,
            notes: None,
            completed_at: None,
            completed_by: None,
            created_at: then,
        };
        order.mark_completed(Some(first), then);
        order.mark_completed(Some(Uuid::now_v7()), OffsetDateTime::now_utc());
        assert_eq!(order.completed_by, Some(first));
        assert_eq!(order.completed_at, Some(then));
    }

    #[test]
    fn test_total_sums_lines() {
        let items = vec![OrderItem::new("1g", 2, 10.0), OrderItem::new("5g", 1, 4.5)];
        let order = NewOrder::new(AccountRef::Name("ann".to_owned()), items);
        assert!((order.total() - 24.5).abs() < 1e-9);
    }
}
