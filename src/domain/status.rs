use std::{fmt, str::FromStr};

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Status vocabulary shared by `orders.status`, `orders.farmer_status` and
/// `order_items.status`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "shipped")]
    Shipped,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Capitalised form used in notification text.
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Position on the fulfilment track; `cancelled` sits off the track.
    fn rank(&self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::Processing => Some(1),
            OrderStatus::Shipped => Some(2),
            OrderStatus::Delivered => Some(3),
            OrderStatus::Cancelled => None,
        }
    }

    /// Allowed-transition table.
    ///
    /// | from \ to   | same | forward | backward | cancelled |
    /// |-------------|------|---------|----------|-----------|
    /// | non-terminal| yes  | yes     | no       | yes       |
    /// | terminal    | yes  | no      | no       | no        |
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        if *self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        if next == OrderStatus::Cancelled {
            return true;
        }
        match (self.rank(), next.rank()) {
            (Some(from), Some(to)) => to > from,
            _ => false,
        }
    }

    /// Lenient parse of a requested status. Values outside the vocabulary
    /// yield `None` and the caller ignores the write.
    pub fn parse_requested(raw: &str) -> Option<OrderStatus> {
        raw.parse().ok()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| format!("unknown order status `{}`", s.trim()))
    }
}

/// Order status derived from its items after an admin edits them one by one.
///
/// All delivered gives `delivered`. Anything else, including a partially
/// cancelled order, stays `processing`: cancelling one line never cancels
/// the whole order.
pub fn derive_aggregate_status<I>(items: I) -> OrderStatus
where
    I: IntoIterator<Item = OrderStatus>,
{
    if items.into_iter().all(|s| s == OrderStatus::Delivered) {
        OrderStatus::Delivered
    } else {
        OrderStatus::Processing
    }
}

#[cfg(test)]
mod tests {
    use super::OrderStatus::*;
    use super::*;

    #[test]
    fn forward_moves_are_allowed_including_skips() {
        assert!(Pending.can_transition_to(Processing));
        assert!(Pending.can_transition_to(Delivered));
        assert!(Processing.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));
    }

    #[test]
    fn backward_moves_are_rejected() {
        assert!(!Shipped.can_transition_to(Pending));
        assert!(!Processing.can_transition_to(Pending));
    }

    #[test]
    fn cancel_is_reachable_from_any_open_state() {
        for from in [Pending, Processing, Shipped] {
            assert!(from.can_transition_to(Cancelled), "{from} -> cancelled");
        }
    }

    #[test]
    fn terminal_states_only_accept_themselves() {
        for next in OrderStatus::ALL {
            assert_eq!(Delivered.can_transition_to(next), next == Delivered);
            assert_eq!(Cancelled.can_transition_to(next), next == Cancelled);
        }
    }

    #[test]
    fn parse_is_lenient_about_case_and_rejects_unknown_values() {
        assert_eq!(OrderStatus::parse_requested(" Shipped "), Some(Shipped));
        assert_eq!(OrderStatus::parse_requested("DELIVERED"), Some(Delivered));
        assert_eq!(OrderStatus::parse_requested("paid"), None);
        assert_eq!(OrderStatus::parse_requested(""), None);
    }

    #[test]
    fn aggregate_is_delivered_only_when_every_item_is() {
        assert_eq!(derive_aggregate_status([Delivered, Delivered]), Delivered);
        assert_eq!(derive_aggregate_status([Delivered, Shipped]), Processing);
    }

    #[test]
    fn partially_cancelled_order_stays_processing() {
        assert_eq!(derive_aggregate_status([Delivered, Cancelled]), Processing);
        assert_eq!(derive_aggregate_status([Cancelled, Cancelled]), Processing);
    }
}
