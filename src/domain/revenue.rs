use std::collections::{BTreeMap, HashSet};

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{PaymentMethod, bundle_subtotal, status::OrderStatus};

/// Entries shown in dashboard rankings.
pub const DASHBOARD_TOP_N: usize = 5;

/// Only delivered orders that an admin has approved count toward revenue.
pub fn revenue_included(status: OrderStatus, admin_approved: bool) -> bool {
    status == OrderStatus::Delivered && admin_approved
}

/// One order item joined with its order and product, as read for reporting.
#[derive(Debug, Clone)]
pub struct RevenueLine {
    pub order_id: Uuid,
    pub order_status: OrderStatus,
    pub admin_approved: bool,
    pub payment_method: PaymentMethod,
    pub delivery_charge: Decimal,
    pub cod_charge: Decimal,
    pub product_id: Uuid,
    pub product_name: String,
    pub farmer_id: Uuid,
    pub farmer_name: String,
    pub quantity: i32,
    pub bundle_size: i32,
    /// Bundle price captured when the order was placed.
    pub price: Decimal,
}

impl RevenueLine {
    pub fn revenue(&self) -> Decimal {
        bundle_subtotal(self.quantity, self.bundle_size, self.price)
    }

    /// Surcharges the platform keeps for this line's order.
    fn surcharges(&self) -> Decimal {
        match self.payment_method {
            PaymentMethod::Cod => self.delivery_charge + self.cod_charge,
            PaymentMethod::Online => self.delivery_charge,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ProductRevenue {
    pub name: String,
    pub quantity: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FarmerRevenue {
    pub farmer_id: Uuid,
    pub name: String,
    pub quantity: i64,
    pub revenue: Decimal,
}

/// Revenue-eligible order items. Lines from orders that are not delivered
/// and approved are dropped on construction.
#[derive(Debug, Clone, Default)]
pub struct RevenueLedger {
    lines: Vec<RevenueLine>,
}

impl RevenueLedger {
    pub fn new(lines: impl IntoIterator<Item = RevenueLine>) -> Self {
        let lines = lines
            .into_iter()
            .filter(|line| revenue_included(line.order_status, line.admin_approved))
            .collect();
        Self { lines }
    }

    /// Restrict to one farmer's products.
    pub fn for_farmer(self, farmer_id: Uuid) -> Self {
        let lines = self
            .lines
            .into_iter()
            .filter(|line| line.farmer_id == farmer_id)
            .collect();
        Self { lines }
    }

    pub fn lines(&self) -> &[RevenueLine] {
        &self.lines
    }

    pub fn order_count(&self) -> usize {
        self.lines
            .iter()
            .map(|line| line.order_id)
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|line| i64::from(line.quantity)).sum()
    }

    /// Sum of item revenue, without delivery or COD surcharges.
    pub fn sales_revenue(&self) -> Decimal {
        self.lines.iter().map(RevenueLine::revenue).sum()
    }

    /// Delivery and COD charges, counted once per order however many of its
    /// items are in the ledger.
    pub fn surcharge_revenue(&self) -> Decimal {
        let mut seen = HashSet::new();
        self.lines
            .iter()
            .filter(|line| seen.insert(line.order_id))
            .map(RevenueLine::surcharges)
            .sum()
    }

    pub fn platform_revenue(&self) -> Decimal {
        self.sales_revenue() + self.surcharge_revenue()
    }

    /// Revenue per product name, highest first.
    pub fn by_product(&self) -> Vec<ProductRevenue> {
        let mut grouped: BTreeMap<&str, (i64, Decimal)> = BTreeMap::new();
        for line in &self.lines {
            let entry = grouped
                .entry(line.product_name.as_str())
                .or_insert((0, Decimal::ZERO));
            entry.0 += i64::from(line.quantity);
            entry.1 += line.revenue();
        }
        let mut rows: Vec<ProductRevenue> = grouped
            .into_iter()
            .map(|(name, (quantity, revenue))| ProductRevenue {
                name: name.to_string(),
                quantity,
                revenue,
            })
            .collect();
        rows.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.name.cmp(&b.name)));
        rows
    }

    /// Revenue per farmer, highest first. Surcharges are never attributed to
    /// farmers.
    pub fn by_farmer(&self) -> Vec<FarmerRevenue> {
        let mut grouped: BTreeMap<Uuid, FarmerRevenue> = BTreeMap::new();
        for line in &self.lines {
            let entry = grouped.entry(line.farmer_id).or_insert_with(|| FarmerRevenue {
                farmer_id: line.farmer_id,
                name: line.farmer_name.clone(),
                quantity: 0,
                revenue: Decimal::ZERO,
            });
            entry.quantity += i64::from(line.quantity);
            entry.revenue += line.revenue();
        }
        let mut rows: Vec<FarmerRevenue> = grouped.into_values().collect();
        rows.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.name.cmp(&b.name)));
        rows
    }
}

pub fn top_n<T>(mut rows: Vec<T>, n: usize) -> Vec<T> {
    rows.truncate(n);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    struct Fixture {
        farmer_a: Uuid,
        farmer_b: Uuid,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                farmer_a: Uuid::new_v4(),
                farmer_b: Uuid::new_v4(),
            }
        }

        fn line(&self, order_id: Uuid, farmer_id: Uuid, product: &str) -> RevenueLine {
            RevenueLine {
                order_id,
                order_status: OrderStatus::Delivered,
                admin_approved: true,
                payment_method: PaymentMethod::Cod,
                delivery_charge: dec!(50),
                cod_charge: dec!(50),
                product_id: Uuid::new_v4(),
                product_name: product.to_string(),
                farmer_id,
                farmer_name: (if farmer_id == self.farmer_a { "asha" } else { "bala" }).to_string(),
                quantity: 10,
                bundle_size: 5,
                price: dec!(100),
            }
        }
    }

    #[test]
    fn inclusion_requires_delivered_and_approved() {
        for status in OrderStatus::ALL {
            for approved in [true, false] {
                assert_eq!(
                    revenue_included(status, approved),
                    status == OrderStatus::Delivered && approved
                );
            }
        }
    }

    #[test]
    fn unapproved_or_undelivered_orders_are_dropped() {
        let fx = Fixture::new();
        let mut pending_approval = fx.line(Uuid::new_v4(), fx.farmer_a, "apples");
        pending_approval.admin_approved = false;
        let mut shipped = fx.line(Uuid::new_v4(), fx.farmer_a, "apples");
        shipped.order_status = OrderStatus::Shipped;

        let ledger = RevenueLedger::new([pending_approval, shipped]);
        assert!(ledger.lines().is_empty());
        assert_eq!(ledger.platform_revenue(), Decimal::ZERO);
    }

    #[test]
    fn surcharges_are_counted_once_per_order() {
        let fx = Fixture::new();
        let order = Uuid::new_v4();
        let ledger = RevenueLedger::new([
            fx.line(order, fx.farmer_a, "apples"),
            fx.line(order, fx.farmer_b, "carrots"),
            fx.line(order, fx.farmer_b, "beans"),
        ]);

        // 3 lines * (10 / 5 * 100) = 600, plus 50 delivery + 50 cod once.
        assert_eq!(ledger.sales_revenue(), dec!(600));
        assert_eq!(ledger.surcharge_revenue(), dec!(100));
        assert_eq!(ledger.platform_revenue(), dec!(700));
        assert_eq!(ledger.order_count(), 1);
        assert_eq!(ledger.total_quantity(), 30);
    }

    #[test]
    fn online_orders_contribute_only_delivery() {
        let fx = Fixture::new();
        let mut line = fx.line(Uuid::new_v4(), fx.farmer_a, "apples");
        line.payment_method = PaymentMethod::Online;
        line.cod_charge = Decimal::ZERO;
        let ledger = RevenueLedger::new([line]);
        assert_eq!(ledger.platform_revenue(), dec!(250));
    }

    #[test]
    fn farmer_scope_excludes_other_farmers_and_surcharges() {
        let fx = Fixture::new();
        let order = Uuid::new_v4();
        let ledger = RevenueLedger::new([
            fx.line(order, fx.farmer_a, "apples"),
            fx.line(order, fx.farmer_b, "carrots"),
        ])
        .for_farmer(fx.farmer_a);

        assert_eq!(ledger.lines().len(), 1);
        assert_eq!(ledger.sales_revenue(), dec!(200));
        let products = ledger.by_product();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "apples");
    }

    #[test]
    fn rankings_are_sorted_by_revenue_descending() {
        let fx = Fixture::new();
        let mut big = fx.line(Uuid::new_v4(), fx.farmer_b, "mangoes");
        big.quantity = 50;
        let ledger = RevenueLedger::new([
            fx.line(Uuid::new_v4(), fx.farmer_a, "apples"),
            big,
            fx.line(Uuid::new_v4(), fx.farmer_a, "apples"),
        ]);

        let products = ledger.by_product();
        assert_eq!(products[0].name, "mangoes");
        assert_eq!(products[0].revenue, dec!(1000));
        assert_eq!(products[1].name, "apples");
        assert_eq!(products[1].quantity, 20);
        assert_eq!(products[1].revenue, dec!(400));

        let farmers = ledger.by_farmer();
        assert_eq!(farmers[0].farmer_id, fx.farmer_b);
        assert_eq!(farmers[1].revenue, dec!(400));
    }

    #[test]
    fn top_n_truncates() {
        assert_eq!(top_n(vec![1, 2, 3, 4, 5, 6, 7], DASHBOARD_TOP_N), vec![1, 2, 3, 4, 5]);
        assert_eq!(top_n(vec![1, 2], DASHBOARD_TOP_N), vec![1, 2]);
    }
}
