use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    domain::{OrderStatus, PaymentMethod},
    entity::{addresses, notifications, orders, products, reviews},
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub farmer_id: Uuid,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    /// Price of one bundle before discount.
    pub price: Decimal,
    pub discount_percent: Option<i32>,
    pub discounted_price: Decimal,
    pub stock: i32,
    pub bundle_size: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<products::Model> for Product {
    fn from(model: products::Model) -> Self {
        Self {
            discounted_price: model.discounted_price(),
            id: model.id,
            farmer_id: model.farmer_id,
            name: model.name,
            category: model.category,
            description: model.description,
            price: model.price,
            discount_percent: model.discount_percent,
            stock: model.stock,
            bundle_size: model.bundle_size,
            is_active: model.is_active,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub invoice_number: String,
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub payment_method: PaymentMethod,
    pub delivery_charge: Decimal,
    pub cod_charge: Decimal,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub farmer_status: OrderStatus,
    pub admin_approved: bool,
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<orders::Model> for Order {
    fn from(model: orders::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            invoice_number: model.invoice_number,
            full_name: model.full_name,
            phone: model.phone,
            email: model.email,
            address: model.address,
            payment_method: model.payment_method,
            delivery_charge: model.delivery_charge,
            cod_charge: model.cod_charge,
            total_amount: model.total_amount,
            status: model.status,
            farmer_status: model.farmer_status,
            admin_approved: model.admin_approved,
            payment_reference: model.payment_reference,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Review {
    pub id: Uuid,
    pub product_id: Uuid,
    pub customer_id: Uuid,
    pub order_id: Uuid,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl From<reviews::Model> for Review {
    fn from(model: reviews::Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            customer_id: model.customer_id,
            order_id: model.order_id,
            rating: model.rating,
            comment: model.comment,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub id: Uuid,
    pub message: String,
    pub link: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<notifications::Model> for Notification {
    fn from(model: notifications::Model) -> Self {
        Self {
            id: model.id,
            message: model.message,
            link: model.link,
            is_read: model.is_read,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Address {
    pub id: Uuid,
    pub address_line: String,
    pub state: String,
    pub district: String,
    pub pincode: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl Address {
    pub fn from_entity(model: addresses::Model, default_id: Option<Uuid>) -> Self {
        Self {
            is_default: default_id == Some(model.id),
            id: model.id,
            address_line: model.address_line,
            state: model.state,
            district: model.district,
            pincode: model.pincode,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}
