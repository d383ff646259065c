//! External payment gateway. The service only creates a payment intent for
//! online orders and stores the returned reference; confirming the payment
//! belongs to the gateway's callback flow.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::config::PaymentConfig;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment gateway is not configured")]
    NotConfigured,

    #[error("amount {0} cannot be expressed in minor units")]
    InvalidAmount(Decimal),

    #[error("payment gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("payment gateway rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PaymentIntent {
    /// Gateway-side order id to hand to the checkout widget.
    pub reference: String,
    pub amount_minor: i64,
    pub currency: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment_intent(
        &self,
        amount_minor: i64,
        currency: &str,
    ) -> Result<PaymentIntent, PaymentError>;

    fn currency(&self) -> &str;
}

/// Convert a two-decimal amount to the gateway's integer minor units.
pub fn to_minor_units(amount: Decimal) -> Result<i64, PaymentError> {
    (amount * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .ok_or(PaymentError::InvalidAmount(amount))
}

/// Razorpay-compatible orders API.
pub struct RazorpayGateway {
    client: reqwest::Client,
    api_base: String,
    key_id: String,
    key_secret: String,
    currency: String,
}

#[derive(Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    payment_capture: u8,
}

#[derive(Deserialize)]
struct CreateOrderReply {
    id: String,
}

impl RazorpayGateway {
    pub fn new(config: &PaymentConfig, key_id: String, key_secret: String) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            key_id,
            key_secret,
            currency: config.currency.clone(),
        })
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    async fn create_payment_intent(
        &self,
        amount_minor: i64,
        currency: &str,
    ) -> Result<PaymentIntent, PaymentError> {
        let response = self
            .client
            .post(format!("{}/v1/orders", self.api_base))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&CreateOrderBody {
                amount: amount_minor,
                currency,
                payment_capture: 1,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let reply: CreateOrderReply = response.json().await?;
        Ok(PaymentIntent {
            reference: reply.id,
            amount_minor,
            currency: currency.to_string(),
        })
    }

    fn currency(&self) -> &str {
        &self.currency
    }
}

/// Used when no gateway credentials are configured; online orders stay
/// pending without a payment reference.
pub struct DisabledGateway {
    currency: String,
}

impl DisabledGateway {
    pub fn new(currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
        }
    }
}

#[async_trait]
impl PaymentGateway for DisabledGateway {
    async fn create_payment_intent(
        &self,
        _amount_minor: i64,
        _currency: &str,
    ) -> Result<PaymentIntent, PaymentError> {
        Err(PaymentError::NotConfigured)
    }

    fn currency(&self) -> &str {
        &self.currency
    }
}

pub fn gateway_from_config(config: &PaymentConfig) -> anyhow::Result<Arc<dyn PaymentGateway>> {
    match (&config.key_id, &config.key_secret) {
        (Some(key_id), Some(key_secret)) => {
            let gateway = RazorpayGateway::new(config, key_id.clone(), key_secret.clone())?;
            Ok(Arc::new(gateway))
        }
        _ => {
            tracing::warn!("payment gateway credentials missing; online payments disabled");
            Ok(Arc::new(DisabledGateway::new(config.currency.clone())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn minor_units_are_rounded_cents() {
        assert_eq!(to_minor_units(dec!(300)).unwrap(), 30000);
        assert_eq!(to_minor_units(dec!(204.5)).unwrap(), 20450);
        assert_eq!(to_minor_units(dec!(0.01)).unwrap(), 1);
    }

    #[tokio::test]
    async fn disabled_gateway_refuses() {
        let gateway = DisabledGateway::new("INR");
        let err = gateway.create_payment_intent(100, "INR").await.unwrap_err();
        assert!(matches!(err, PaymentError::NotConfigured));
        assert_eq!(gateway.currency(), "INR");
    }
}
