pub mod address_service;
pub mod admin_service;
pub mod cart_service;
pub mod farmer_service;
pub mod notification_service;
pub mod order_service;
pub mod product_service;
pub mod report_service;
pub mod review_service;
