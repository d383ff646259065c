use std::{env, str::FromStr, time::Duration};

use rust_decimal::Decimal;

use crate::domain::ChargePolicy;

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub api_base: String,
    pub key_id: Option<String>,
    pub key_secret: Option<String>,
    pub currency: String,
    pub timeout: Duration,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.razorpay.com".to_string(),
            key_id: None,
            key_secret: None,
            currency: "INR".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub charges: ChargePolicy,
    pub payment: PaymentConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_or("APP_PORT", 3000);

        let defaults = ChargePolicy::default();
        let charges = ChargePolicy {
            delivery_charge: parse_or::<Decimal>("DELIVERY_CHARGE", defaults.delivery_charge),
            free_delivery_threshold: parse_or::<Decimal>(
                "FREE_DELIVERY_THRESHOLD",
                defaults.free_delivery_threshold,
            ),
            cod_charge: parse_or::<Decimal>("COD_CHARGE", defaults.cod_charge),
        };

        let payment_defaults = PaymentConfig::default();
        let payment = PaymentConfig {
            api_base: env::var("PAYMENT_API_BASE").unwrap_or(payment_defaults.api_base),
            key_id: env::var("PAYMENT_KEY_ID").ok().filter(|v| !v.is_empty()),
            key_secret: env::var("PAYMENT_KEY_SECRET").ok().filter(|v| !v.is_empty()),
            currency: env::var("PAYMENT_CURRENCY").unwrap_or(payment_defaults.currency),
            timeout: Duration::from_secs(parse_or("PAYMENT_TIMEOUT_SECS", 10)),
        };

        Ok(Self {
            port,
            database_url,
            host,
            charges,
            payment,
        })
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}
