use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use super::types::PaymentMethod;

/// Round a currency amount to two places (banker's rounding).
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp(2)
}

/// Subtotal for `quantity` physical units of a product sold in bundles of
/// `bundle_size` units at `bundle_price` per bundle.
///
/// Every cart line, order line and revenue figure goes through this function
/// so they all share one rounding policy. A non-positive bundle size prices
/// the line at zero; products are validated to `bundle_size >= 1` on write.
pub fn bundle_subtotal(quantity: i32, bundle_size: i32, bundle_price: Decimal) -> Decimal {
    if bundle_size <= 0 {
        return Decimal::ZERO;
    }
    let bundles = Decimal::from(quantity) / Decimal::from(bundle_size);
    round_money(bundles * bundle_price)
}

/// Bundle price after the product's percentage discount, if any.
///
/// Not rounded: with a two-place price and a whole percentage the result has
/// at most four places, and only the line subtotal is rounded to money.
pub fn discounted_price(price: Decimal, discount_percent: Option<i32>) -> Decimal {
    match discount_percent {
        Some(percent) if percent > 0 => {
            let discount = Decimal::from(percent) / Decimal::ONE_HUNDRED * price;
            price - discount
        }
        _ => price,
    }
}

/// Delivery and cash-on-delivery surcharges applied at checkout.
#[derive(Debug, Clone)]
pub struct ChargePolicy {
    pub delivery_charge: Decimal,
    /// Subtotals at or above this amount ship free.
    pub free_delivery_threshold: Decimal,
    pub cod_charge: Decimal,
}

impl Default for ChargePolicy {
    fn default() -> Self {
        Self {
            delivery_charge: Decimal::from(50),
            free_delivery_threshold: Decimal::from(300),
            cod_charge: Decimal::from(50),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct OrderCharges {
    pub subtotal: Decimal,
    pub delivery_charge: Decimal,
    pub cod_charge: Decimal,
    pub total_amount: Decimal,
}

impl ChargePolicy {
    pub fn delivery_for(&self, subtotal: Decimal) -> Decimal {
        if subtotal < self.free_delivery_threshold {
            self.delivery_charge
        } else {
            Decimal::ZERO
        }
    }

    pub fn charges_for(&self, subtotal: Decimal, method: PaymentMethod) -> OrderCharges {
        let delivery_charge = self.delivery_for(subtotal);
        let cod_charge = match method {
            PaymentMethod::Cod => self.cod_charge,
            PaymentMethod::Online => Decimal::ZERO,
        };
        OrderCharges {
            subtotal,
            delivery_charge,
            cod_charge,
            total_amount: subtotal + delivery_charge + cod_charge,
        }
    }
}
