use thiserror::Error;
use uuid::Uuid;

use super::status::OrderStatus;

/// Why a (product, customer, order) review is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReviewIneligible {
    #[error("order belongs to another customer")]
    NotOwner,
    #[error("You can review only after delivery.")]
    NotDelivered,
    #[error("You already reviewed this product in this order.")]
    AlreadyReviewed,
}

/// The order whose items are being reviewed.
#[derive(Debug, Clone, Copy)]
pub struct ReviewedOrder {
    pub customer_id: Uuid,
    pub status: OrderStatus,
}

/// A review is accepted once per (product, customer, order), only from the
/// customer who placed the order and only after it was delivered.
pub fn can_review(
    order: ReviewedOrder,
    customer_id: Uuid,
    already_reviewed: bool,
) -> Result<(), ReviewIneligible> {
    if order.customer_id != customer_id {
        return Err(ReviewIneligible::NotOwner);
    }
    if order.status != OrderStatus::Delivered {
        return Err(ReviewIneligible::NotDelivered);
    }
    if already_reviewed {
        return Err(ReviewIneligible::AlreadyReviewed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delivered_for(customer_id: Uuid) -> ReviewedOrder {
        ReviewedOrder {
            customer_id,
            status: OrderStatus::Delivered,
        }
    }

    #[test]
    fn delivered_order_without_review_is_eligible() {
        let customer = Uuid::new_v4();
        assert_eq!(can_review(delivered_for(customer), customer, false), Ok(()));
    }

    #[test]
    fn another_customers_order_is_refused() {
        let order = delivered_for(Uuid::new_v4());
        assert_eq!(
            can_review(order, Uuid::new_v4(), false),
            Err(ReviewIneligible::NotOwner)
        );
    }

    #[test]
    fn undelivered_orders_are_refused_before_duplicate_check() {
        let customer = Uuid::new_v4();
        for status in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Cancelled,
        ] {
            let order = ReviewedOrder {
                customer_id: customer,
                status,
            };
            assert_eq!(
                can_review(order, customer, true),
                Err(ReviewIneligible::NotDelivered)
            );
        }
    }

    #[test]
    fn second_review_is_refused() {
        let customer = Uuid::new_v4();
        assert_eq!(
            can_review(delivered_for(customer), customer, true),
            Err(ReviewIneligible::AlreadyReviewed)
        );
    }
}
