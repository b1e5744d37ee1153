use catalog_db::{Entity, UniqueKey};
use catalog_query::{EntitySchema, FieldDef, FieldKind, Record, Value};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique index over `(attribute_id, value_key)`.
pub const ATTRIBUTE_OPTION_KEY_INDEX: &str = "attribute_option_key";

/// Unique index over `(product_id, attribute_id, option-or-text)`.
pub const PAV_SELECTION_INDEX: &str = "pav_selection";

const ATTRIBUTE_FIELDS: &[FieldDef] = &[
    FieldDef::new("id", FieldKind::Uuid),
    FieldDef::new("shop_id", FieldKind::Uuid),
    FieldDef::new("name", FieldKind::String),
];
static ATTRIBUTE: EntitySchema = EntitySchema::new("attribute", ATTRIBUTE_FIELDS);

/// A product dimension such as colour or size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub name: String,
}

impl Attribute {
    #[must_use]
    pub fn new(shop_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            shop_id,
            name: name.into(),
        }
    }
}

impl Record for Attribute {
    fn schema() -> &'static EntitySchema {
        &ATTRIBUTE
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

impl Entity for Attribute {
    fn id(&self) -> Uuid {
        self.id
    }
}

const ATTRIBUTE_OPTION_FIELDS: &[FieldDef] = &[
    FieldDef::new("id", FieldKind::Uuid),
    FieldDef::new("attribute_id", FieldKind::Uuid),
    FieldDef::new("value_key", FieldKind::String),
    FieldDef::new("label", FieldKind::String),
];
static ATTRIBUTE_OPTION: EntitySchema =
    EntitySchema::new("attribute_option", ATTRIBUTE_OPTION_FIELDS);

/// One selectable value of an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeOption {
    pub id: Uuid,
    pub attribute_id: Uuid,
    pub value_key: String,
    pub label: String,
}

impl AttributeOption {
    #[must_use]
    pub fn new(attribute_id: Uuid, value_key: impl Into<String>) -> Self {
        let value_key = value_key.into();
        Self {
            id: Uuid::now_v7(),
            attribute_id,
            label: value_key.clone(),
            value_key,
        }
    }
}

impl Record for AttributeOption {
    fn schema() -> &'static EntitySchema {
        &ATTRIBUTE_OPTION
    }

    fn value(&self, field: &str) -> Value {
        match field {
            "id" => self.id.into(),
            "attribute_id" => self.attribute_id.into(),
            "value_key" => self.value_key.as_str().into(),
            "label" => self.label.as_str().into(),
            _ => Value::Null,
        }
    }
}

impl Entity for AttributeOption {
    fn id(&self) -> Uuid {
        self.id
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::new(
            ATTRIBUTE_OPTION_KEY_INDEX,
            format!("{}:{}", self.attribute_id, self.value_key),
        )]
    }
}

const PAV_FIELDS: &[FieldDef] = &[
    FieldDef::new("id", FieldKind::Uuid),
    FieldDef::new("product_id", FieldKind::Uuid),
    FieldDef::new("attribute_id", FieldKind::Uuid),
    FieldDef::new("option_id", FieldKind::Uuid),
    FieldDef::new("value_text", FieldKind::String),
];
static PAV: EntitySchema = EntitySchema::new("product_attribute_value", PAV_FIELDS);

/// Selection of an option (or a free-text value) of one attribute for one
/// product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductAttributeValue {
    pub id: Uuid,
    pub product_id: Uuid,
    pub attribute_id: Uuid,
    pub option_id: Option<Uuid>,
    pub value_text: Option<String>,
}

impl ProductAttributeValue {
    #[must_use]
    pub fn with_option(product_id: Uuid, attribute_id: Uuid, option_id: Uuid) -> Self {
        Self {
            id: Uuid::now_v7(),
            product_id,
            attribute_id,
            option_id: Some(option_id),
            value_text: None,
        }
    }

    #[must_use]
    pub fn with_text(product_id: Uuid, attribute_id: Uuid, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            product_id,
            attribute_id,
            option_id: None,
            value_text: Some(text.into()),
        }
    }

    /// Composite key of the selection index.
    #[must_use]
    pub fn selection_key(&self) -> String {
        let value = match (&self.option_id, &self.value_text) {
            (Some(option), _) => format!("option:{option}"),
            (None, Some(text)) => format!("text:{text}"),
            (None, None) => "empty".to_owned(),
        };
        format!("{}:{}:{value}", self.product_id, self.attribute_id)
    }
}

impl Record for ProductAttributeValue {
    fn schema() -> &'static EntitySchema {
        &PAV
    }

    fn value(&self, field: &str) -> Value {
        match field {
            "id" => self.id.into(),
            "product_id" => self.product_id.into(),
            "attribute_id" => self.attribute_id.into(),
            "option_id" => self.option_id.into(),
            "value_text" => self.value_text.clone().into(),
            _ => Value::Null,
        }
    }
}

impl Entity for ProductAttributeValue {
    fn id(&self) -> Uuid {
        self.id
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::new(PAV_SELECTION_INDEX, self.selection_key())]
    }
}

/// Input of the single-insert selection path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProductAttributeValue {
    pub product_id: Uuid,
    /// Inferred from the option when absent.
    pub attribute_id: Option<Uuid>,
    pub option_id: Option<Uuid>,
    pub value_text: Option<String>,
}

impl NewProductAttributeValue {
    #[must_use]
    pub fn option(product_id: Uuid, option_id: Uuid) -> Self {
        Self {
            product_id,
            option_id: Some(option_id),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn text(product_id: Uuid, attribute_id: Uuid, text: impl Into<String>) -> Self {
        Self {
            product_id,
            attribute_id: Some(attribute_id),
            value_text: Some(text.into()),
            ..Self::default()
        }
    }
}
