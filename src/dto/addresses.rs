use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Address;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAddressRequest {
    pub address_line: String,
    pub state: String,
    pub district: String,
    pub pincode: String,
    /// Also make this the default address. The first address always is.
    #[serde(default)]
    pub make_default: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AddressList {
    pub items: Vec<Address>,
}
