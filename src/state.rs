use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::{DbPool, OrmConn, create_orm_conn},
    domain::ChargePolicy,
    payment::PaymentGateway,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub charges: Arc<ChargePolicy>,
    pub gateway: Arc<dyn PaymentGateway>,
}

impl AppState {
    pub fn new(pool: DbPool, charges: ChargePolicy, gateway: Arc<dyn PaymentGateway>) -> Self {
        let orm = create_orm_conn(&pool);
        Self {
            pool,
            orm,
            charges: Arc::new(charges),
            gateway,
        }
    }

    pub fn from_config(pool: DbPool, config: &AppConfig) -> anyhow::Result<Self> {
        let gateway = crate::payment::gateway_from_config(&config.payment)?;
        Ok(Self::new(pool, config.charges.clone(), gateway))
    }
}
