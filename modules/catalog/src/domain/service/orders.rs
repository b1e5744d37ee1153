use std::sync::Arc;

use catalog_db::{DBRunner, Db, DbTx};
use catalog_query::{FilterNode, Pagination, QueryPlan, SortClause};
use serde_json::json;
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::CatalogConfig;
use crate::domain::error::DomainError;
use crate::domain::models::{
    Account, AccountRef, NewOrder, ORDER_SEQUENCE_INDEX, Order, OrderItem, OrderPatch, OrderStatus,
    Shop,
};
use crate::domain::ports::{Notifier, RequestContext, notify_best_effort};
use crate::domain::rules::{check_origin, check_weight};

#[derive(Clone)]
pub struct OrderService {
    db: Db,
    notifier: Arc<dyn Notifier>,
    config: Arc<CatalogConfig>,
}

impl OrderService {
    #[must_use]
    pub fn new(db: Db, notifier: Arc<dyn Notifier>, config: Arc<CatalogConfig>) -> Self {
        Self {
            db,
            notifier,
            config,
        }
    }

    /// Validate and persist a new order.
    ///
    /// The order number is one past the highest number the shop has used,
    /// read inside the transaction, so numbers freed by deletes are never
    /// handed out again. When the shop-sequence index still rejects it, the
    /// whole transaction is retried, up to `order_sequence_retries` extra
    /// attempts.
    ///
    /// # Errors
    /// - `NotFound` for an unknown shop, or an account id outside the shop
    /// - `OriginNotAllowed` when the origin fails the shop's allow-list
    /// - `WeightLimitExceeded` when the items weigh too much
    /// - `SequenceTaken` when every attempted number was taken
    #[instrument(skip(self, ctx, new), fields(shop_id = %shop_id, items = new.items.len()))]
    pub async fn create_order(
        &self,
        ctx: &RequestContext,
        shop_id: Uuid,
        new: NewOrder,
    ) -> Result<Order, DomainError> {
        let retries = self.config.order_sequence_retries;
        let mut attempt = 0_u32;
        let order = loop {
            let config = Arc::clone(&self.config);
            let ctx = ctx.clone();
            let new = new.clone();
            let outcome = self
                .db
                .transaction(move |tx| {
                    Box::pin(async move {
                        let order = insert_order(tx, &config, &ctx, shop_id, new).await?;
                        Ok::<_, DomainError>(order)
                    })
                })
                .await;

            match outcome {
                Err(DomainError::SequenceTaken { sequence, .. }) if attempt < retries => {
                    attempt += 1;
                    warn!(sequence, attempt, "order number taken, retrying");
                }
                other => break other?,
            }
        };

        info!(
            order_id = %order.id,
            customer_order_id = order.customer_order_id,
            status = %order.status,
            "order created"
        );
        let channel = match order.status {
            OrderStatus::Complete => &self.config.channels.completed_orders,
            OrderStatus::Pending | OrderStatus::Cancelled => &self.config.channels.pending_orders,
        };
        notify_best_effort(self.notifier.as_ref(), channel, order_payload(&order)).await;
        Ok(order)
    }

    /// Apply a partial update.
    ///
    /// Status rules: `pending` may move to `complete` or `cancelled`; a
    /// terminal status may only be re-applied, which changes nothing. The
    /// first transition records `completed_at` and `completed_by`; later
    /// ones never overwrite them. Replacing the items re-checks the weight
    /// limit and recomputes the total unless the patch sets one.
    ///
    /// # Errors
    /// - `NotFound` for an unknown order
    /// - `InvalidTransition` when leaving a terminal status
    /// - `WeightLimitExceeded` for replacement items that weigh too much
    /// - `InvalidArgument` for a negative or non-finite total
    #[instrument(skip(self, ctx, patch), fields(order_id = %order_id))]
    pub async fn update_order(
        &self,
        ctx: &RequestContext,
        order_id: Uuid,
        patch: OrderPatch,
    ) -> Result<Order, DomainError> {
        if let Some(total) = patch.total
            && !(total.is_finite() && total >= 0.0)
        {
            return Err(DomainError::invalid_argument(format!(
                "total must be a non-negative number, got {total}"
            )));
        }

        let config = Arc::clone(&self.config);
        let actor = ctx.actor_id;
        let (order, previous) = self
            .db
            .transaction(move |tx| {
                Box::pin(async move {
                    let mut order = tx
                        .get::<Order>(order_id)
                        .await?
                        .ok_or_else(|| DomainError::not_found("order", order_id))?;
                    let previous = order.status;

                    if let Some(status) = patch.status {
                        apply_status(&mut order, status, actor)?;
                    }
                    if let Some(items) = patch.items {
                        check_weight(&items, &config)?;
                        order.total = items.iter().map(OrderItem::line_total).sum();
                        order.items = items;
                    }
                    if let Some(total) = patch.total {
                        order.total = total;
                    }
                    if let Some(notes) = patch.notes {
                        order.notes = Some(notes);
                    }

                    let order = tx.update(order).await?;
                    Ok::<_, DomainError>((order, previous))
                })
            })
            .await?;

        if order.status == previous {
            debug!("order updated");
        } else {
            info!(from = %previous, to = %order.status, "order status changed");
            self.notify_transition(&order).await;
        }
        Ok(order)
    }

    /// Shorthand for [`OrderService::update_order`] with only a status.
    ///
    /// # Errors
    /// See [`OrderService::update_order`].
    pub async fn set_order_status(
        &self,
        ctx: &RequestContext,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<Order, DomainError> {
        self.update_order(ctx, order_id, OrderPatch::status(status))
            .await
    }

    async fn notify_transition(&self, order: &Order) {
        let channels = &self.config.channels;
        notify_best_effort(
            self.notifier.as_ref(),
            &channels.pending_orders,
            order_payload(order),
        )
        .await;
        if order.status == OrderStatus::Complete {
            notify_best_effort(
                self.notifier.as_ref(),
                &channels.completed_orders,
                order_payload(order),
            )
            .await;
        }
    }
}

fn order_payload(order: &Order) -> serde_json::Value {
    json!({
        "order_id": order.id,
        "shop_id": order.shop_id,
        "customer_order_id": order.customer_order_id,
        "status": order.status,
    })
}

fn apply_status(
    order: &mut Order,
    status: OrderStatus,
    actor: Option<Uuid>,
) -> Result<(), DomainError> {
    if order.status.is_terminal() && order.status != status {
        return Err(DomainError::InvalidTransition {
            from: order.status,
            to: status,
        });
    }
    order.status = status;
    if status.is_terminal() {
        order.mark_completed(actor, OffsetDateTime::now_utc());
    }
    Ok(())
}

async fn resolve_account(
    tx: &DbTx,
    shop_id: Uuid,
    account: AccountRef,
) -> Result<Account, DomainError> {
    match account {
        AccountRef::Id(id) => tx
            .get::<Account>(id)
            .await?
            .filter(|a| a.shop_id == shop_id)
            .ok_or_else(|| DomainError::not_found("account", id)),
        AccountRef::Name(name) => {
            let account = tx.create(Account::new(shop_id, name)).await?;
            debug!(account_id = %account.id, "account created for order");
            Ok(account)
        }
    }
}

/// One past the highest order number used in the shop so far.
async fn next_sequence(tx: &DbTx, shop_id: Uuid) -> Result<u64, DomainError> {
    let latest = QueryPlan::filtered(FilterNode::eq("shop_id", shop_id))
        .with_order(vec![SortClause::desc("customer_order_id")])
        .with_pagination(Pagination::new(0, 1));
    let (rows, _) = tx.query::<Order>(&latest).await?;
    Ok(rows.first().map_or(0, |o| o.customer_order_id) + 1)
}

async fn insert_order(
    tx: &DbTx,
    config: &CatalogConfig,
    ctx: &RequestContext,
    shop_id: Uuid,
    new: NewOrder,
) -> Result<Order, DomainError> {
    let shop = tx
        .get::<Shop>(shop_id)
        .await?
        .ok_or_else(|| DomainError::not_found("shop", shop_id))?;
    let total = new.total();
    let account = resolve_account(tx, shop_id, new.account).await?;

    if !ctx.test_identity {
        check_origin(&shop, ctx.origin)?;
    }
    check_weight(&new.items, config)?;

    let sequence = next_sequence(tx, shop_id).await?;

    let now = OffsetDateTime::now_utc();
    let status = if ctx.test_identity {
        OrderStatus::Complete
    } else {
        OrderStatus::coerce(new.status.as_deref())
    };
    let mut order = Order {
        id: Uuid::now_v7(),
        shop_id,
        account_id: account.id,
        customer_order_id: sequence,
        items: new.items,
        status,
        total,
        notes: new.notes,
        completed_at: None,
        completed_by: None,
        created_at: now,
    };
    if status.is_terminal() {
        order.mark_completed(ctx.actor_id, now);
    }

    tx.create(order).await.map_err(|e| {
        if e.violates(ORDER_SEQUENCE_INDEX) {
            DomainError::SequenceTaken { shop_id, sequence }
        } else {
            e.into()
        }
    })
}
