use std::sync::Arc;

use catalog_db::{DBRunner, Db, Entity};
use catalog_query::{FilterNode, ListRequest, Page, QueryPlan};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::config::CatalogConfig;
use crate::domain::error::DomainError;

/// Query engine entry point shared by every list endpoint.
#[derive(Clone)]
pub struct ListingService {
    db: Db,
    config: Arc<CatalogConfig>,
}

impl ListingService {
    #[must_use]
    pub fn new(db: Db, config: Arc<CatalogConfig>) -> Self {
        Self { db, config }
    }

    /// List `E` with the request's filters, sorts and pagination. `base` is
    /// AND-ed with the parsed filters and cannot be lifted by the caller.
    ///
    /// # Errors
    /// `InvalidRange` for a limit above the configured cap; store failures as
    /// `Database`. Unknown filter or sort fields are dropped, never errors.
    #[instrument(skip(self, request, base), fields(entity = E::schema().name()))]
    pub async fn list<E: Entity>(
        &self,
        request: &ListRequest,
        base: Option<FilterNode>,
    ) -> Result<Page<E>, DomainError> {
        let schema = E::schema();
        let plan = QueryPlan::build(schema, request, base, &self.config.query)?;

        let conn = self.db.conn()?;
        let (items, total) = conn.query::<E>(&plan).await?;

        debug!(returned = items.len(), total, "listed");
        Ok(Page::new(
            schema.resource(),
            items,
            plan.pagination(),
            total,
        ))
    }

    /// [`ListingService::list`] scoped to one shop.
    ///
    /// # Errors
    /// `InvalidArgument` if `E` is not shop-scoped, plus everything `list`
    /// returns.
    pub async fn list_in_shop<E: Entity>(
        &self,
        shop_id: Uuid,
        request: &ListRequest,
    ) -> Result<Page<E>, DomainError> {
        if E::schema().field_exact("shop_id").is_none() {
            return Err(DomainError::invalid_argument(format!(
                "{} is not scoped to a shop",
                E::schema().name()
            )));
        }
        self.list(request, Some(FilterNode::eq("shop_id", shop_id)))
            .await
    }

    /// # Errors
    /// `NotFound` when no `E` has this id.
    #[instrument(skip(self), fields(entity = E::schema().name(), id = %id))]
    pub async fn get<E: Entity>(&self, id: Uuid) -> Result<E, DomainError> {
        let conn = self.db.conn()?;
        Ok(conn.fetch::<E>(id).await?)
    }
}
