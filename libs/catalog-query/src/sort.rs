use std::cmp::Ordering;
use std::fmt;

use tracing::warn;

use crate::limits::QueryLimits;
use crate::schema::{EntitySchema, Record};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SortDir {
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DESC")]
    Desc,
}

impl SortDir {
    /// Case-insensitive `ASC` / `DESC`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("asc") {
            Some(SortDir::Asc)
        } else if raw.eq_ignore_ascii_case("desc") {
            Some(SortDir::Desc)
        } else {
            None
        }
    }

    fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortDir::Asc => ord,
            SortDir::Desc => ord.reverse(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortClause {
    pub field: String,
    pub dir: SortDir,
}

impl SortClause {
    #[must_use]
    pub fn new(field: impl Into<String>, dir: SortDir) -> Self {
        Self {
            field: field.into(),
            dir,
        }
    }

    #[must_use]
    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDir::Asc)
    }

    #[must_use]
    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDir::Desc)
    }
}

impl fmt::Display for SortClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.dir {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        };
        write!(f, "{}:{dir}", self.field)
    }
}

/// Parse `field:ASC|DESC` tokens, keeping the valid ones in the order given.
///
/// A token without a colon sorts ascending on that field. Unknown fields,
/// unknown directions and tokens past the configured maximum are dropped.
#[must_use]
pub fn parse_sorts<S: AsRef<str>>(
    schema: &EntitySchema,
    tokens: &[S],
    limits: &QueryLimits,
) -> Vec<SortClause> {
    let mut order = Vec::new();
    for token in tokens {
        let token = token.as_ref().trim();
        if token.is_empty() {
            continue;
        }
        let (field, dir) = match token.split_once(':') {
            Some((field, raw_dir)) => {
                let Some(dir) = SortDir::parse(raw_dir) else {
                    warn!(
                        entity = schema.name(),
                        token,
                        "dropping sort with unknown direction"
                    );
                    continue;
                };
                (field.trim(), dir)
            }
            None => (token, SortDir::Asc),
        };
        let Some(def) = schema.field(field) else {
            warn!(
                entity = schema.name(),
                field,
                "dropping sort on unknown field"
            );
            continue;
        };
        if order.len() == limits.max_sort_fields {
            warn!(
                entity = schema.name(),
                field = def.name,
                max = limits.max_sort_fields,
                "dropping sort beyond the configured maximum"
            );
            continue;
        }
        order.push(SortClause::new(def.name, dir));
    }
    order
}

/// Composite comparison of two records under every sort clause at once.
#[must_use]
pub fn compare_records<R: Record>(a: &R, b: &R, order: &[SortClause]) -> Ordering {
    order
        .iter()
        .map(|clause| {
            clause
                .dir
                .apply(a.value(&clause.field).sort_cmp(&b.value(&clause.field)))
        })
        .find(|ord| *ord != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}
