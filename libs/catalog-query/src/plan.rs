//! List requests and validated query plans.
//!
//! A [`ListRequest`] is what the transport hands over: raw filter tokens, raw
//! sort tokens and pagination. [`QueryPlan::build`] turns it into a bounded,
//! validated plan against one entity schema. Stores either compile the plan
//! into their native query language or, for in-process collections, run it
//! directly with [`QueryPlan::apply`].

use tracing::debug;

use crate::error::QueryError;
use crate::filter::{FilterNode, FilterParam, parse_filters};
use crate::limits::QueryLimits;
use crate::page::Page;
use crate::pagination::Pagination;
use crate::schema::{EntitySchema, Record};
use crate::sort::{SortClause, compare_records, parse_sorts};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[must_use]
pub struct ListRequest {
    pub filters: Vec<FilterParam>,
    pub sorts: Vec<String>,
    pub pagination: Pagination,
}

impl ListRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, param: impl Into<FilterParam>) -> Self {
        self.filters.push(param.into());
        self
    }

    /// GET-many: fetch the records whose id is in `ids`.
    pub fn with_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.filters.push(FilterParam::Many(
            ids.into_iter().map(|id| id.to_string()).collect(),
        ));
        self
    }

    pub fn with_sort(mut self, token: impl Into<String>) -> Self {
        self.sorts.push(token.into());
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn paginate(self, skip: u64, limit: u64) -> Self {
        self.with_pagination(Pagination::new(skip, limit))
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
#[must_use]
pub struct QueryPlan {
    filter: Option<FilterNode>,
    order: Vec<SortClause>,
    pagination: Pagination,
}

impl QueryPlan {
    /// Build a plan for `schema` from a raw request.
    ///
    /// `base` is AND-ed with the parsed filters; callers use it for tenant
    /// scoping and other constraints the client cannot lift.
    ///
    /// # Errors
    /// Returns `QueryError::InvalidRange` if the requested limit exceeds
    /// `limits.max_limit`. Filter and sort problems never fail the build.
    pub fn build(
        schema: &EntitySchema,
        request: &ListRequest,
        base: Option<FilterNode>,
        limits: &QueryLimits,
    ) -> Result<Self, QueryError> {
        limits.validate_limit(request.pagination.limit)?;

        let parsed = parse_filters(schema, &request.filters, limits);
        let filter = match (base, parsed) {
            (Some(base), Some(parsed)) => Some(base.and_with(parsed)),
            (base, parsed) => base.or(parsed),
        };
        let order = parse_sorts(schema, &request.sorts, limits);

        debug!(
            entity = schema.name(),
            clauses = filter.as_ref().map_or(0, FilterNode::clause_count),
            sorts = order.len(),
            skip = request.pagination.skip,
            limit = request.pagination.limit,
            "built query plan"
        );

        Ok(Self {
            filter,
            order,
            pagination: request.pagination,
        })
    }

    /// Unsorted, unpaginated plan over every record.
    pub fn all() -> Self {
        Self::default()
    }

    /// Unsorted, unpaginated plan over the records matching `filter`.
    pub fn filtered(filter: FilterNode) -> Self {
        Self {
            filter: Some(filter),
            ..Self::default()
        }
    }

    pub fn with_order(mut self, order: Vec<SortClause>) -> Self {
        self.order = order;
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    #[must_use]
    pub fn filter(&self) -> Option<&FilterNode> {
        self.filter.as_ref()
    }

    #[must_use]
    pub fn order(&self) -> &[SortClause] {
        &self.order
    }

    #[must_use]
    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn matches<R: Record>(&self, row: &R) -> bool {
        self.filter.as_ref().is_none_or(|f| f.matches(row))
    }

    /// Run the plan over an in-process collection.
    ///
    /// Returns the requested slice and the size of the filtered set before
    /// pagination.
    #[must_use]
    pub fn apply<R, I>(&self, rows: I) -> (Vec<R>, u64)
    where
        R: Record,
        I: IntoIterator<Item = R>,
    {
        let mut matched: Vec<R> = rows.into_iter().filter(|r| self.matches(r)).collect();
        let total = u64::try_from(matched.len()).unwrap_or(u64::MAX);

        if !self.order.is_empty() {
            matched.sort_by(|a, b| compare_records(a, b, &self.order));
        }

        let skip = usize::try_from(self.pagination.skip).unwrap_or(usize::MAX);
        let items = if self.pagination.is_unlimited() {
            matched.into_iter().skip(skip).collect()
        } else {
            let limit = usize::try_from(self.pagination.limit).unwrap_or(usize::MAX);
            matched.into_iter().skip(skip).take(limit).collect()
        };
        (items, total)
    }

    /// Run the plan and wrap the result as a [`Page`] of `R`.
    #[must_use]
    pub fn page<R, I>(&self, rows: I) -> Page<R>
    where
        R: Record,
        I: IntoIterator<Item = R>,
    {
        let (items, total) = self.apply(rows);
        Page::new(R::schema().resource(), items, self.pagination, total)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::schema::{FieldDef, FieldKind};
    use crate::value::Value;

    const BOOK_FIELDS: &[FieldDef] = &[
        FieldDef::new("title", FieldKind::String),
        FieldDef::new("pages", FieldKind::I64),
        FieldDef::new("shelf", FieldKind::I64),
    ];
    static BOOK: EntitySchema = EntitySchema::new("book", BOOK_FIELDS);

    #[derive(Clone, Debug, PartialEq)]
    struct Book {
        title: &'static str,
        pages: i64,
        shelf: i64,
    }

    impl Record for Book {
        fn schema() -> &'static EntitySchema {
            &BOOK
        }

        fn value(&self, field: &str) -> Value {
            match field {
                "title" => self.title.into(),
                "pages" => self.pages.into(),
                "shelf" => self.shelf.into(),
                _ => Value::Null,
            }
        }
    }

    fn book(title: &'static str, pages: i64, shelf: i64) -> Book {
        Book {
            title,
            pages,
            shelf,
        }
    }

    fn shelf() -> Vec<Book> {
        vec![
            book("Dune", 412, 1),
            book("Emma", 474, 2),
            book("Ulysses", 730, 1),
            book("Beloved", 324, 2),
            book("Dracula", 418, 1),
        ]
    }

    fn plan(request: &ListRequest) -> QueryPlan {
        QueryPlan::build(&BOOK, request, None, &QueryLimits::default()).unwrap()
    }

    #[test]
    fn test_limit_bounds_items_and_range() {
        let request = ListRequest::new().with_sort("title:ASC").paginate(1, 2);
        let page = plan(&request).page(shelf());
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.range_start, 1);
        assert_eq!(page.range_end, 3);
        assert_eq!(page.total, 5);
        let titles: Vec<_> = page.items.iter().map(|b| b.title).collect();
        assert_eq!(titles, vec!["Dracula", "Dune"]);
        assert_eq!(page.content_range.to_string(), "books 1-3/5");
    }

    #[test]
    fn test_unlimited_returns_everything_from_skip() {
        let request = ListRequest::new().with_sort("pages").paginate(2, 0);
        let page = plan(&request).page(shelf());
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.range_end, 5);
        assert_eq!(page.content_range.to_string(), "books 2/5");
    }

    #[test]
    fn test_total_counts_filtered_set() {
        let request = ListRequest::new().with_filter("shelf_lte:1").paginate(0, 1);
        let page = plan(&request).page(shelf());
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
    }

    #[test]
    fn test_unknown_filter_is_same_as_omitted() {
        let with_bogus = ListRequest::new()
            .with_filter("title:d")
            .with_filter("author:tolstoy")
            .with_sort("title");
        let without = ListRequest::new().with_filter("title:d").with_sort("title");
        let expected = plan(&without).apply(shelf());
        assert_eq!(plan(&with_bogus).apply(shelf()), expected);
    }

    #[test]
    fn test_composite_sort() {
        let request = ListRequest::new()
            .with_sort("shelf:DESC")
            .with_sort("pages:asc");
        let (items, _) = plan(&request).apply(shelf());
        let titles: Vec<_> = items.iter().map(|b| b.title).collect();
        assert_eq!(
            titles,
            vec!["Beloved", "Emma", "Dune", "Dracula", "Ulysses"]
        );
    }

    #[test]
    fn test_base_filter_is_anded() {
        let request = ListRequest::new().with_filter("pages_gt:400");
        let base = FilterNode::eq("shelf", 2_i64);
        let limits = QueryLimits::default();
        let plan = QueryPlan::build(&BOOK, &request, Some(base), &limits).unwrap();
        let (items, total) = plan.apply(shelf());
        assert_eq!(total, 1);
        assert_eq!(items[0].title, "Emma");
    }

    #[test]
    fn test_limit_above_cap_is_invalid_range() {
        let limits = QueryLimits::default().with_max_limit(10);
        let request = ListRequest::new().paginate(0, 11);
        assert!(matches!(
            QueryPlan::build(&BOOK, &request, None, &limits),
            Err(QueryError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_skip_past_end_is_empty_page() {
        let request = ListRequest::new().paginate(50, 10);
        let page = plan(&request).page(shelf());
        assert!(page.is_empty());
        assert_eq!(page.total, 5);
        assert_eq!(page.range_end, 60);
    }
}
