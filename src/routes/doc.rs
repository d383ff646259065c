use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    domain::{OrderCharges, OrderStatus, PaymentMethod, Role},
    dto::{
        addresses::{AddressList, CreateAddressRequest},
        cart::{AddToCartRequest, CartLine, CartView, UpdateCartItemRequest},
        notifications::NotificationList,
        orders::{
            CustomerOrderDetail, FarmerOrderDetail, ItemStatusUpdate, NextStep, OrderLine,
            OrderList, OrderWithItems, PlaceOrderRequest, PlaceOrderResponse,
            UpdateItemStatusesRequest, UpdateOrderStatusRequest,
        },
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
        reports::{
            ActivityList, AdminDashboard, FarmerDashboard, FarmerSalesReport, SalesReport,
            StatusCount,
        },
        reviews::SubmitReviewRequest,
    },
    models::{Address, Notification, Order, Product, Review},
    payment::PaymentIntent,
    response::{ApiResponse, Meta},
    routes::{addresses, admin, cart, farmer, health, notifications, orders, params, products},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        cart::cart_list,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        orders::list_order,
        orders::place_order,
        orders::get_order,
        orders::submit_review,
        addresses::list_addresses,
        addresses::create_address,
        addresses::set_default_address,
        notifications::list_notifications,
        notifications::mark_all_read,
        farmer::list_farmer_orders,
        farmer::get_farmer_order,
        farmer::update_order_status,
        farmer::farmer_sales,
        farmer::farmer_dashboard,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status,
        admin::update_item_statuses,
        admin::cancel_order,
        admin::dashboard,
        admin::sales,
        admin::farmer_sales,
        admin::activity
    ),
    components(
        schemas(
            Role,
            OrderStatus,
            PaymentMethod,
            OrderCharges,
            Product,
            Order,
            Review,
            Notification,
            Address,
            PaymentIntent,
            CartLine,
            CartView,
            AddToCartRequest,
            UpdateCartItemRequest,
            PlaceOrderRequest,
            PlaceOrderResponse,
            NextStep,
            OrderLine,
            OrderList,
            OrderWithItems,
            CustomerOrderDetail,
            FarmerOrderDetail,
            UpdateOrderStatusRequest,
            ItemStatusUpdate,
            UpdateItemStatusesRequest,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            SubmitReviewRequest,
            CreateAddressRequest,
            AddressList,
            NotificationList,
            StatusCount,
            AdminDashboard,
            SalesReport,
            FarmerSalesReport,
            FarmerDashboard,
            ActivityList,
            params::Pagination,
            params::OrderListQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartView>,
            ApiResponse<PlaceOrderResponse>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Products", description = "Product endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Order placement, history and reviews"),
        (name = "Addresses", description = "Address book"),
        (name = "Notifications", description = "In-app notifications"),
        (name = "Farmer", description = "Farmer order slice, status requests and sales"),
        (name = "Admin", description = "Order reconciliation and platform reports"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
