use catalog_db::Entity;
use catalog_query::{EntitySchema, FieldDef, FieldKind, Record, Value};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

const SHOP_FIELDS: &[FieldDef] = &[
    FieldDef::new("id", FieldKind::Uuid),
    FieldDef::new("name", FieldKind::String),
    FieldDef::new("created_at", FieldKind::DateTime),
];
static SHOP: EntitySchema = EntitySchema::new("shop", SHOP_FIELDS);

/// Tenant. Every other catalog entity hangs off a shop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shop {
    pub id: Uuid,
    pub name: String,
    /// Exact IP addresses allowed to submit orders. Empty disables the check.
    pub allowed_ips: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Shop {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            allowed_ips: Vec::new(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[must_use]
    pub fn with_allowed_ips<I, S>(mut self, ips: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_ips = ips.into_iter().map(Into::into).collect();
        self
    }
}

impl Record for Shop {
    fn schema() -> &'static EntitySchema {
        &SHOP
    }

    fn value(&self, field: &str) -> Value {
        match field {
            "id" => self.id.into(),
            "name" => self.name.as_str().into(),
            "created_at" => self.created_at.into(),
            _ => Value::Null,
        }
    }
}

impl Entity for Shop {
    fn id(&self) -> Uuid {
        self.id
    }
}

const ACCOUNT_FIELDS: &[FieldDef] = &[
    FieldDef::new("id", FieldKind::Uuid),
    FieldDef::new("shop_id", FieldKind::Uuid),
    FieldDef::new("name", FieldKind::String),
    FieldDef::new("created_at", FieldKind::DateTime),
];
static ACCOUNT: EntitySchema = EntitySchema::new("account", ACCOUNT_FIELDS);

/// Customer account within a shop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Account {
    #[must_use]
    pub fn new(shop_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            shop_id,
            name: name.into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

impl Record for Account {
    fn schema() -> &'static EntitySchema {
        &ACCOUNT
    }

    fn value(&self, field: &str) -> Value {
        match field {
            "id" => self.id.into(),
            "shop_id" => self.shop_id.into(),
            "name" => self.name.as_str().into(),
            "created_at" => self.created_at.into(),
            _ => Value::Null,
        }
    }
}

impl Entity for Account {
    fn id(&self) -> Uuid {
        self.id
    }
}

const CATEGORY_FIELDS: &[FieldDef] = &[
    FieldDef::new("id", FieldKind::Uuid),
    FieldDef::new("shop_id", FieldKind::Uuid),
    FieldDef::new("parent_id", FieldKind::Uuid),
    FieldDef::new("name", FieldKind::String),
];
static CATEGORY: EntitySchema = EntitySchema::new("category", CATEGORY_FIELDS);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
}

impl Category {
    #[must_use]
    pub fn new(shop_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            shop_id,
            parent_id: None,
            name: name.into(),
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

impl Record for Category {
    fn schema() -> &'static EntitySchema {
        &CATEGORY
    }

    fn value(&self, field: &str) -> Value {
        match field {
            "id" => self.id.into(),
            "shop_id" => self.shop_id.into(),
            "parent_id" => self.parent_id.into(),
            "name" => self.name.as_str().into(),
            _ => Value::Null,
        }
    }
}

impl Entity for Category {
    fn id(&self) -> Uuid {
        self.id
    }
}

const TAG_FIELDS: &[FieldDef] = &[
    FieldDef::new("id", FieldKind::Uuid),
    FieldDef::new("shop_id", FieldKind::Uuid),
    FieldDef::new("name", FieldKind::String),
];
static TAG: EntitySchema = EntitySchema::new("tag", TAG_FIELDS);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub name: String,
}

impl Tag {
    #[must_use]
    pub fn new(shop_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            shop_id,
            name: name.into(),
        }
    }
}

impl Record for Tag {
    fn schema() -> &'static EntitySchema {
        &TAG
    }

    fn value(&self, field: &str) -> Value {
        match field {
            "id" => self.id.into(),
            "shop_id" => self.shop_id.into(),
            "name" => self.name.as_str().into(),
            _ => Value::Null,
        }
    }
}

impl Entity for Tag {
    fn id(&self) -> Uuid {
        self.id
    }
}

const PRODUCT_FIELDS: &[FieldDef] = &[
    FieldDef::new("id", FieldKind::Uuid),
    FieldDef::new("shop_id", FieldKind::Uuid),
    FieldDef::new("category_id", FieldKind::Uuid),
    FieldDef::new("name", FieldKind::String),
    FieldDef::new("description", FieldKind::String),
    FieldDef::new("price", FieldKind::F64),
    FieldDef::new("active", FieldKind::Bool),
    FieldDef::new("created_at", FieldKind::DateTime),
];
static PRODUCT: EntitySchema = EntitySchema::new("product", PRODUCT_FIELDS);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Product {
    #[must_use]
    pub fn new(shop_id: Uuid, name: impl Into<String>, price: f64) -> Self {
        Self {
            id: Uuid::now_v7(),
            shop_id,
            category_id: None,
            name: name.into(),
            description: String::new(),
            price,
            active: true,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[must_use]
    pub fn with_category(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl Record for Product {
    fn schema() -> &'static EntitySchema {
        &PRODUCT
    }

    fn value(&self, field: &str) -> Value {
        match field {
            "id" => self.id.into(),
            "shop_id" => self.shop_id.into(),
            "category_id" => self.category_id.into(),
            "name" => self.name.as_str().into(),
            "description" => self.description.as_str().into(),
            "price" => self.price.into(),
            "active" => self.active.into(),
            "created_at" => self.created_at.into(),
            _ => Value::Null,
        }
    }
}

impl Entity for Product {
    fn id(&self) -> Uuid {
        self.id
    }
}
