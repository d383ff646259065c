use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    audit::AuditEntry,
    domain::{
        OrderStatus,
        revenue::{FarmerRevenue, ProductRevenue},
    },
};

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminDashboard {
    /// All orders regardless of status.
    pub total_orders: i64,
    pub total_products: i64,
    pub total_customers: i64,
    pub total_farmers: i64,
    /// Item revenue of delivered, approved orders.
    pub total_revenue: Decimal,
    /// `total_revenue` plus delivery and COD charges.
    pub total_earnings: Decimal,
    pub status_counts: Vec<StatusCount>,
    pub top_products: Vec<ProductRevenue>,
    pub top_farmers: Vec<FarmerRevenue>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SalesReport {
    /// Delivered, approved orders only.
    pub total_orders: i64,
    pub total_quantity: i64,
    pub total_earnings: Decimal,
    pub status_counts: Vec<StatusCount>,
    pub products: Vec<ProductRevenue>,
    pub farmers: Vec<FarmerRevenue>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FarmerSalesReport {
    pub farmer_id: Uuid,
    pub total_orders: i64,
    pub total_quantity: i64,
    pub total_earnings: Decimal,
    pub products: Vec<ProductRevenue>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FarmerDashboard {
    pub product_count: i64,
    /// Orders that contain at least one of the farmer's products.
    pub order_count: i64,
    pub total_sales: Decimal,
    pub top_products: Vec<ProductRevenue>,
    pub average_rating: Option<Decimal>,
    pub review_count: i64,
    pub unread_notifications: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ActivityList {
    pub items: Vec<AuditEntry>,
}
