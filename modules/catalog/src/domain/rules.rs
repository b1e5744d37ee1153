//! Order admission rules: aggregate weight and origin allow-list.

use std::net::IpAddr;

use tracing::warn;

use crate::config::CatalogConfig;
use crate::domain::error::DomainError;
use crate::domain::models::{OrderItem, Shop};

/// Slack for float accumulation when comparing against the weight limit.
const WEIGHT_EPSILON: f64 = 1e-9;

/// Sum of `unit_weight(description) * quantity` over `items`.
#[must_use]
pub fn order_weight(items: &[OrderItem], config: &CatalogConfig) -> f64 {
    items.iter().map(|item| line_weight(item, config)).sum()
}

fn line_weight(item: &OrderItem, config: &CatalogConfig) -> f64 {
    config.unit_weight(&item.description) * f64::from(item.quantity)
}

/// # Errors
/// `WeightLimitExceeded` when the aggregate weight is above
/// `config.max_order_weight`.
pub fn check_weight(items: &[OrderItem], config: &CatalogConfig) -> Result<f64, DomainError> {
    let weight = order_weight(items, config);
    if weight > config.max_order_weight + WEIGHT_EPSILON {
        return Err(DomainError::WeightLimitExceeded {
            weight,
            limit: config.max_order_weight,
        });
    }
    Ok(weight)
}

/// An empty allow-list admits every origin. Otherwise the origin must be
/// present and equal one of the listed addresses; entries that are not IP
/// addresses never match.
///
/// # Errors
/// `OriginNotAllowed` when the origin is missing or not listed.
pub fn check_origin(shop: &Shop, origin: Option<IpAddr>) -> Result<(), DomainError> {
    if shop.allowed_ips.is_empty() {
        return Ok(());
    }

    let denied = |origin: String| DomainError::OriginNotAllowed {
        shop_id: shop.id,
        origin,
    };
    let Some(origin) = origin else {
        return Err(denied("<unknown>".to_owned()));
    };

    let listed = shop
        .allowed_ips
        .iter()
        .any(|entry| entry_admits(shop, entry, origin));
    if listed {
        Ok(())
    } else {
        Err(denied(origin.to_string()))
    }
}

fn entry_admits(shop: &Shop, entry: &str, origin: IpAddr) -> bool {
    match entry.trim().parse::<IpAddr>() {
        Ok(ip) => ip == origin,
        Err(_) => {
            warn!(shop_id = %shop.id, entry, "ignoring malformed allow-list entry");
            false
        }
    }
}
