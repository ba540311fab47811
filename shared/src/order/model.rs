//! Order aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::OrderState;

/// A single ordered line with its unit price frozen at order creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    /// Unit price snapshot taken at order creation
    pub unit_price: Decimal,
}

impl LineItem {
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// The authoritative order record
///
/// Owned exclusively by the order ledger. `total` is fixed at creation time
/// (sum of line subtotals) and never changes; `state` only moves along the
/// transition table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Stable, externally referenceable id
    pub order_id: String,
    /// Human-readable order number (e.g. ORD20250829-10001)
    pub order_number: String,
    pub customer_ref: String,
    pub items: Vec<LineItem>,
    pub total: Decimal,
    /// ISO 4217 code, e.g. "EUR"
    pub currency: String,
    pub state: OrderState,
    /// Reference the gateway assigned when the payment intent was created
    pub external_payment_ref: Option<String>,
    pub carrier_code: Option<String>,
    pub tracking_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Build a new order in `Created` state
    ///
    /// The total is computed from the line items here and is immutable
    /// afterwards.
    pub fn new(
        order_id: String,
        order_number: String,
        customer_ref: String,
        items: Vec<LineItem>,
        currency: String,
    ) -> Self {
        let total = items.iter().map(|i| i.subtotal()).sum();
        let now = Utc::now();
        Self {
            order_id,
            order_number,
            customer_ref,
            items,
            total,
            currency,
            state: OrderState::Created,
            external_payment_ref: None,
            carrier_code: None,
            tracking_code: None,
            created_at: now,
            updated_at: now,
        }
    }
}
