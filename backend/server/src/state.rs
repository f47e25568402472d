use std::sync::Arc;

use shop::Catalog;
use tracing::info;

use super::{checkout::Payments, config::Config};

pub struct State {
    pub catalog: Catalog,
    pub config: Config,
    pub payments: Payments,
}

impl State {
    pub fn new(config: Config) -> Arc<Self> {
        Self::with_catalog(config, Catalog::default())
    }

    pub fn with_catalog(config: Config, catalog: Catalog) -> Arc<Self> {
        info!("Loaded {} products", catalog.len());

        Arc::new(Self {
            catalog,
            payments: Payments::new(config.payment_processing_time, config.payment_retention),
            config,
        })
    }
}
