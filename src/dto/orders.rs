use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    domain::{OrderCharges, OrderStatus, PaymentMethod},
    models::Order,
    payment::PaymentIntent,
};

/// Contact fields fall back to the customer's profile and default address.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PlaceOrderRequest {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NextStep {
    /// Cash on delivery: nothing left to do.
    Success,
    /// Online: complete payment with the returned intent.
    Payment,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlaceOrderResponse {
    pub order: Order,
    pub items: Vec<OrderLine>,
    pub charges: OrderCharges,
    pub payment: Option<PaymentIntent>,
    pub next_step: NextStep,
}

/// An order item with the product details needed for display.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub farmer_id: Uuid,
    pub quantity: i32,
    pub bundle_size: i32,
    /// Bundle price captured at placement.
    pub price: Decimal,
    pub subtotal: Decimal,
    pub status: OrderStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderLine>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerOrderDetail {
    pub order: Order,
    pub items: Vec<OrderLine>,
    /// Products in this order the customer has already reviewed.
    pub reviewed_products: Vec<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

/// The farmer's share of one order.
#[derive(Debug, Serialize, ToSchema)]
pub struct FarmerOrderDetail {
    pub order: Order,
    pub items: Vec<OrderLine>,
    pub farmer_subtotal: Decimal,
    /// Order-level charges, shown for reference; they are platform income.
    pub delivery_charge: Decimal,
    pub cod_charge: Decimal,
    pub farmer_total: Decimal,
}

/// Status as sent by clients. Unknown values are ignored, not rejected.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ItemStatusUpdate {
    pub item_id: Uuid,
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateItemStatusesRequest {
    pub items: Vec<ItemStatusUpdate>,
}
