use std::collections::HashMap;
use std::env;

/// Where conversion rates come from. Settlements recorded in a foreign
/// currency are converted at the API boundary, so the settlement engine
/// only ever sees ledger-currency amounts.
pub trait RateSource: Send + Sync {
    /// Units of `to` per unit of `from`, or `None` when the pair is unknown.
    fn rate(&self, from: &str, to: &str) -> Option<f64>;
}

/// Fixed rate table read from the `LEDGER_RATES` environment variable,
/// e.g. `{"EUR": {"USD": 1.08}}`. Pairs work in both directions.
pub struct StaticRates {
    rates: HashMap<String, HashMap<String, f64>>,
}

impl StaticRates {
    pub fn from_env() -> Self {
        let rates = env::var("LEDGER_RATES")
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        StaticRates { rates }
    }

    pub fn new(rates: HashMap<String, HashMap<String, f64>>) -> Self {
        StaticRates { rates }
    }
}

impl RateSource for StaticRates {
    fn rate(&self, from: &str, to: &str) -> Option<f64> {
        if from == to {
            return Some(1.0);
        }
        self.rates
            .get(from)
            .and_then(|table| table.get(to).copied())
            .or_else(|| {
                self.rates
                    .get(to)
                    .and_then(|table| table.get(from).copied())
                    .map(|rate| 1.0 / rate)
            })
    }
}
