use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use catalog_db::{DBRunner, Db, DbTx};
use catalog_query::FilterNode;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::CatalogConfig;
use crate::domain::error::DomainError;
use crate::domain::models::{
    Attribute, AttributeOption, NewProductAttributeValue, PAV_SELECTION_INDEX, Product,
    ProductAttributeValue,
};
use crate::domain::ports::{Notifier, notify_best_effort};

/// Outcome of a reconcile or clear call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub added: Vec<ProductAttributeValue>,
    pub removed: Vec<Uuid>,
}

impl ReconcileReport {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Changes planned for one attribute of the product.
struct GroupPlan {
    attribute_id: Uuid,
    to_add: Vec<Uuid>,
    to_remove: Vec<Uuid>,
}

#[derive(Clone)]
pub struct SelectionService {
    db: Db,
    notifier: Arc<dyn Notifier>,
    config: Arc<CatalogConfig>,
}

impl SelectionService {
    #[must_use]
    pub fn new(db: Db, notifier: Arc<dyn Notifier>, config: Arc<CatalogConfig>) -> Self {
        Self {
            db,
            notifier,
            config,
        }
    }

    /// Make the product's selections under each attribute touched by
    /// `desired` equal the desired options of that attribute. Attributes with
    /// no option in `desired` keep their selections.
    ///
    /// All groups are validated before anything is written, and the writes
    /// run in one transaction.
    ///
    /// # Errors
    /// - `InvalidArgument` if `desired` is empty
    /// - `NotFound` for an unknown product or option, or an attribute outside
    ///   the product's shop
    /// - `Conflict` if a concurrent writer took a selection key
    #[instrument(skip(self, desired), fields(product_id = %product_id, desired = desired.len()))]
    pub async fn reconcile_selections(
        &self,
        product_id: Uuid,
        desired: &[Uuid],
    ) -> Result<ReconcileReport, DomainError> {
        if desired.is_empty() {
            return Err(DomainError::invalid_argument(
                "desired option set is empty; use clear_selections to remove all",
            ));
        }
        let desired: BTreeSet<Uuid> = desired.iter().copied().collect();

        let report = self
            .db
            .transaction(move |tx| {
                Box::pin(async move {
                    let product = load_product(tx, product_id).await?;
                    let groups = group_by_attribute(tx, &desired).await?;

                    let mut plans = Vec::with_capacity(groups.len());
                    for (attribute_id, wanted) in groups {
                        load_attribute_in_shop(tx, attribute_id, product.shop_id)
                            .await?;
                        plans.push(plan_group(tx, product_id, attribute_id, &wanted).await?);
                    }

                    let mut report = ReconcileReport::default();
                    for plan in plans {
                        debug!(
                            attribute_id = %plan.attribute_id,
                            add = plan.to_add.len(),
                            remove = plan.to_remove.len(),
                            "reconciling attribute group"
                        );
                        for id in plan.to_remove {
                            tx.delete::<ProductAttributeValue>(id).await?;
                            report.removed.push(id);
                        }
                        for option_id in plan.to_add {
                            let pav = tx
                                .create(ProductAttributeValue::with_option(
                                    product_id,
                                    plan.attribute_id,
                                    option_id,
                                ))
                                .await?;
                            report.added.push(pav);
                        }
                    }
                    Ok::<_, DomainError>(report)
                })
            })
            .await?;

        if report.is_noop() {
            debug!("selections already match");
        } else {
            info!(
                added = report.added.len(),
                removed = report.removed.len(),
                "selections reconciled"
            );
            self.notify_product(product_id, &report).await;
        }
        Ok(report)
    }

    /// Remove every selection of the product, or only those of
    /// `attribute_id`.
    ///
    /// # Errors
    /// `NotFound` for an unknown product, or an attribute outside the
    /// product's shop.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn clear_selections(
        &self,
        product_id: Uuid,
        attribute_id: Option<Uuid>,
    ) -> Result<ReconcileReport, DomainError> {
        let report = self
            .db
            .transaction(move |tx| {
                Box::pin(async move {
                    let product = load_product(tx, product_id).await?;
                    let mut scope = vec![FilterNode::eq("product_id", product_id)];
                    if let Some(attribute_id) = attribute_id {
                        load_attribute_in_shop(tx, attribute_id, product.shop_id)
                            .await?;
                        scope.push(FilterNode::eq("attribute_id", attribute_id));
                    }

                    let rows: Vec<ProductAttributeValue> =
                        tx.find(FilterNode::and(scope)).await?;
                    let mut report = ReconcileReport::default();
                    for row in rows {
                        tx.delete::<ProductAttributeValue>(row.id).await?;
                        report.removed.push(row.id);
                    }
                    Ok::<_, DomainError>(report)
                })
            })
            .await?;

        if !report.is_noop() {
            info!(removed = report.removed.len(), "selections cleared");
            self.notify_product(product_id, &report).await;
        }
        Ok(report)
    }

    /// Insert one selection. Never upserts: an existing
    /// `(product, attribute, option-or-text)` row is a conflict.
    ///
    /// # Errors
    /// - `InvalidArgument` unless exactly one of option and text is given,
    ///   or when the option does not belong to the given attribute
    /// - `NotFound` for an unknown product, option or attribute, or an
    ///   attribute outside the product's shop
    /// - `Conflict` for a duplicate selection
    #[instrument(skip(self, new), fields(product_id = %new.product_id))]
    pub async fn create_pav(
        &self,
        new: NewProductAttributeValue,
    ) -> Result<ProductAttributeValue, DomainError> {
        let text = new
            .value_text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_owned);
        match (&new.option_id, &text) {
            (Some(_), Some(_)) => {
                return Err(DomainError::invalid_argument(
                    "give either an option or a text value, not both",
                ));
            }
            (None, None) => {
                return Err(DomainError::invalid_argument(
                    "an option or a text value is required",
                ));
            }
            _ => {}
        }

        let created = self
            .db
            .transaction(move |tx| {
                Box::pin(async move {
                    let product = load_product(tx, new.product_id).await?;

                    let row = if let Some(option_id) = new.option_id {
                        let option = tx
                            .get::<AttributeOption>(option_id)
                            .await?
                            .ok_or_else(|| DomainError::not_found("attribute_option", option_id))?;
                        if let Some(attribute_id) =
                            new.attribute_id.filter(|a| *a != option.attribute_id)
                        {
                            return Err(DomainError::invalid_argument(format!(
                                "option {option_id} does not belong to attribute {attribute_id}"
                            )));
                        }
                        ProductAttributeValue::with_option(
                            product.id,
                            option.attribute_id,
                            option_id,
                        )
                    } else {
                        let attribute_id = new.attribute_id.ok_or_else(|| {
                            DomainError::invalid_argument("a text value needs an attribute")
                        })?;
                        ProductAttributeValue::with_text(
                            product.id,
                            attribute_id,
                            text.unwrap_or_default(),
                        )
                    };
                    load_attribute_in_shop(tx, row.attribute_id, product.shop_id)
                        .await?;

                    let key = row.selection_key();
                    let existing: Vec<ProductAttributeValue> = tx
                        .find(FilterNode::and(vec![
                            FilterNode::eq("product_id", row.product_id),
                            FilterNode::eq("attribute_id", row.attribute_id),
                        ]))
                        .await?;
                    if existing.iter().any(|r| r.selection_key() == key) {
                        return Err(DomainError::conflict(format!(
                            "{PAV_SELECTION_INDEX} already holds {key}"
                        )));
                    }

                    Ok::<_, DomainError>(tx.create(row).await?)
                })
            })
            .await?;

        info!(pav_id = %created.id, attribute_id = %created.attribute_id, "selection created");
        let report = ReconcileReport {
            added: vec![created.clone()],
            removed: Vec::new(),
        };
        self.notify_product(created.product_id, &report).await;
        Ok(created)
    }

    async fn notify_product(&self, product_id: Uuid, report: &ReconcileReport) {
        let payload = json!({
            "product_id": product_id,
            "added": report.added.iter().map(|p| p.id).collect::<Vec<_>>(),
            "removed": report.removed,
        });
        notify_best_effort(
            self.notifier.as_ref(),
            &self.config.channels.products,
            payload,
        )
        .await;
    }
}

async fn load_product(tx: &DbTx, product_id: Uuid) -> Result<Product, DomainError> {
    tx.get::<Product>(product_id)
        .await?
        .ok_or_else(|| DomainError::not_found("product", product_id))
}

/// Attributes of another shop are reported as missing.
async fn load_attribute_in_shop(
    tx: &DbTx,
    attribute_id: Uuid,
    shop_id: Uuid,
) -> Result<Attribute, DomainError> {
    tx.get::<Attribute>(attribute_id)
        .await?
        .filter(|a| a.shop_id == shop_id)
        .ok_or_else(|| DomainError::not_found("attribute", attribute_id))
}

/// Resolve every option in one batch and group the ids by attribute.
async fn group_by_attribute(
    tx: &DbTx,
    desired: &BTreeSet<Uuid>,
) -> Result<BTreeMap<Uuid, BTreeSet<Uuid>>, DomainError> {
    let clauses = desired
        .iter()
        .map(|id| FilterNode::eq("id", *id))
        .collect();
    let lookup = FilterNode::or(clauses);
    let options: Vec<AttributeOption> = tx.find(lookup).await?;
    let owner: BTreeMap<Uuid, Uuid> = options.iter().map(|o| (o.id, o.attribute_id)).collect();

    let mut groups: BTreeMap<Uuid, BTreeSet<Uuid>> = BTreeMap::new();
    for id in desired {
        let attribute_id = owner
            .get(id)
            .ok_or_else(|| DomainError::not_found("attribute_option", *id))?;
        groups.entry(*attribute_id).or_default().insert(*id);
    }
    Ok(groups)
}

async fn plan_group(
    tx: &DbTx,
    product_id: Uuid,
    attribute_id: Uuid,
    wanted: &BTreeSet<Uuid>,
) -> Result<GroupPlan, DomainError> {
    let existing: Vec<ProductAttributeValue> = tx
        .find(FilterNode::and(vec![
            FilterNode::eq("product_id", product_id),
            FilterNode::eq("attribute_id", attribute_id),
        ]))
        .await?;

    let held: BTreeSet<Uuid> = existing.iter().filter_map(|r| r.option_id).collect();
    let to_add = wanted.difference(&held).copied().collect();
    let to_remove = existing
        .iter()
        .filter(|r| r.option_id.is_none_or(|o| !wanted.contains(&o)))
        .map(|r| r.id)
        .collect();

    Ok(GroupPlan {
        attribute_id,
        to_add,
        to_remove,
    })
}
