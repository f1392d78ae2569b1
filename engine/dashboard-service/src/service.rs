//! Service state: the data stores, loaded once before serving

use market_data::{EventStore, PriceStore};
use tracing::{info, warn};

use crate::config::DataSettings;

/// Read-only state shared by every request handler
#[derive(Debug)]
pub struct DashboardState {
    pub prices: PriceStore,
    pub events: EventStore,
}

impl DashboardState {
    /// Load both stores from the configured paths.
    ///
    /// A store that fails to load stays unavailable for the lifetime of the
    /// process; startup continues regardless.
    pub fn load(data: &DataSettings) -> Self {
        let prices = PriceStore::load(&data.prices_path);
        let events = EventStore::load(&data.events_path);

        let state = Self { prices, events };
        if state.is_fully_loaded() {
            info!("Data loaded successfully");
        } else {
            warn!(
                "Serving with unavailable data (prices: {}, events: {})",
                describe(state.prices.failure()),
                describe(state.events.failure())
            );
        }
        state
    }

    pub fn new(prices: PriceStore, events: EventStore) -> Self {
        Self { prices, events }
    }

    pub fn is_fully_loaded(&self) -> bool {
        self.prices.is_available() && self.events.is_available()
    }
}

fn describe(failure: Option<&market_data::LoadError>) -> String {
    failure.map_or_else(|| "ok".to_string(), |e| e.to_string())
}
