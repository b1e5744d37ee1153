//! Entity schema tables.
//!
//! Every listable entity publishes a static [`EntitySchema`]: its resource name
//! and the fields a query may reference. The query engine never inspects
//! records reflectively; it only asks the schema whether a field exists and
//! what kind of value it holds, then reads values through [`Record::value`].
//!
//! ```rust
//! use catalog_query::{EntitySchema, FieldDef, FieldKind};
//!
//! const TAG_FIELDS: &[FieldDef] = &[
//!     FieldDef::new("id", FieldKind::Uuid),
//!     FieldDef::new("name", FieldKind::String),
//! ];
//! static TAG: EntitySchema = EntitySchema::new("tag", TAG_FIELDS);
//!
//! assert_eq!(TAG.field("NAME").map(|f| f.name), Some("name"));
//! assert!(TAG.field("colour").is_none());
//! ```

use std::fmt;

use crate::value::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    String,
    I64,
    F64,
    Bool,
    Uuid,
    DateTime,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::String => write!(f, "String"),
            FieldKind::I64 => write!(f, "I64"),
            FieldKind::F64 => write!(f, "F64"),
            FieldKind::Bool => write!(f, "Bool"),
            FieldKind::Uuid => write!(f, "Uuid"),
            FieldKind::DateTime => write!(f, "DateTime"),
        }
    }
}

/// A single named, typed field of an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldDef {
    #[must_use]
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

/// Field table of one entity type (the `FieldsOf` capability).
#[derive(Debug)]
pub struct EntitySchema {
    name: &'static str,
    fields: &'static [FieldDef],
}

impl EntitySchema {
    #[must_use]
    pub const fn new(name: &'static str, fields: &'static [FieldDef]) -> Self {
        Self { name, fields }
    }

    /// Singular entity name, e.g. `"product"`.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// All fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &'static [FieldDef] {
        self.fields
    }

    /// Look a field up by name, ignoring ASCII case.
    ///
    /// The returned definition carries the canonical spelling, which is the
    /// name records answer to in [`Record::value`].
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        let fields: &'static [FieldDef] = self.fields;
        fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Exact-name lookup. Used where a field must be *literally* present
    /// (the GET-many `id` match).
    #[must_use]
    pub fn field_exact(&self, name: &str) -> Option<&'static FieldDef> {
        let fields: &'static [FieldDef] = self.fields;
        fields.iter().find(|f| f.name == name)
    }

    /// Resource label used in content-range descriptors: `"{name}s"`.
    #[must_use]
    pub fn resource(&self) -> String {
        format!("{}s", self.name)
    }
}

/// A record the query engine can read field values from.
pub trait Record {
    /// Schema shared by every record of this type.
    fn schema() -> &'static EntitySchema;

    /// Current value of `field` (canonical name). Unknown fields read as
    /// [`Value::Null`].
    fn value(&self, field: &str) -> Value;
}
