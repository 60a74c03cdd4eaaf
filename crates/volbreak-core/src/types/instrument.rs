//! Instrument reference data.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tradable instrument with its per-strategy order volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    /// Instrument code
    pub code: String,
    /// Minimum price increment
    pub price_step: Decimal,
    /// Volume of every entry order placed on this instrument
    pub volume: Decimal,
}

impl Instrument {
    pub fn new(code: impl Into<String>, price_step: Decimal, volume: Decimal) -> Self {
        Self {
            code: code.into(),
            price_step,
            volume,
        }
    }

    /// Round a price to the nearest multiple of the price step.
    ///
    /// An exact half step goes away from zero, the way exchanges snap limit
    /// prices to the tick grid. Indicator percentages in the signal crate keep
    /// `round_dp`'s banker's rounding instead, since they are never sent to a
    /// venue. A non-positive step leaves the price untouched.
    pub fn shrink_price(&self, price: Decimal) -> Decimal {
        if self.price_step <= Decimal::ZERO {
            return price;
        }
        let steps = (price / self.price_step)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        (steps * self.price_step).normalize()
    }
}

/// Lookup of instruments by code.
#[derive(Debug, Clone, Default)]
pub struct InstrumentRegistry {
    instruments: HashMap<String, Instrument>,
}

impl InstrumentRegistry {
    pub fn new(instruments: impl IntoIterator<Item = Instrument>) -> Self {
        Self {
            instruments: instruments
                .into_iter()
                .map(|i| (i.code.clone(), i))
                .collect(),
        }
    }

    pub fn get(&self, code: &str) -> Option<&Instrument> {
        self.instruments.get(code)
    }

    pub fn insert(&mut self, instrument: Instrument) {
        self.instruments.insert(instrument.code.clone(), instrument);
    }

    /// Instrument codes in a stable order.
    pub fn codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.instruments.keys().cloned().collect();
        codes.sort();
        codes
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_shrink_price() {
        let sber = Instrument::new("SBER", dec!(0.01), dec!(10));
        assert_eq!(sber.shrink_price(dec!(109.2)), dec!(109.2));
        assert_eq!(sber.shrink_price(dec!(107.1049)), dec!(107.1));

        let ri = Instrument::new("RIM4", dec!(10), dec!(1));
        // half a step rounds up, not to the even step
        assert_eq!(ri.shrink_price(dec!(112345)), dec!(112350));
        assert_eq!(ri.shrink_price(dec!(112355)), dec!(112360));
        assert_eq!(ri.shrink_price(dec!(112344.9)), dec!(112340));
    }

    #[test]
    fn test_zero_step_is_passthrough() {
        let odd = Instrument::new("ODD", Decimal::ZERO, dec!(1));
        assert_eq!(odd.shrink_price(dec!(1.23456)), dec!(1.23456));
    }

    #[test]
    fn test_registry_lookup() {
        let registry = InstrumentRegistry::new([
            Instrument::new("SBER", dec!(0.01), dec!(10)),
            Instrument::new("GAZP", dec!(0.01), dec!(20)),
        ]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("GAZP").map(|i| i.volume), Some(dec!(20)));
        assert!(registry.get("LKOH").is_none());
        assert_eq!(registry.codes(), vec!["GAZP".to_string(), "SBER".to_string()]);
    }
}
