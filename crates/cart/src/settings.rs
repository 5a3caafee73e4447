use core::time::Duration;

use serde::{Deserialize, Serialize};

/// Default debounce window for quantity widgets (150 ms).
pub const DEFAULT_QUANTITY_DEBOUNCE_MS: u64 = 150;

/// Default debounce window for the cart note (200 ms).
pub const DEFAULT_NOTE_DEBOUNCE_MS: u64 = 200;

/// Default number of broadcasts buffered per subscriber.
pub const DEFAULT_BUS_CAPACITY: usize = 64;

/// Largest buffer the event bus allocates; larger requests are clamped.
pub const MAX_BUS_CAPACITY: usize = 1 << 16;

/// What a widget does with input that arrives while its request is in flight.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InFlightPolicy {
    /// Cancel the in-flight request and replace it.
    #[default]
    Supersede,
    /// Drop the new input until the in-flight request settles.
    Ignore,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CartSettings {
    pub quantity_debounce: Duration,
    pub note_debounce: Duration,
    pub in_flight: InFlightPolicy,
    pub bus_capacity: usize,
}

impl Default for CartSettings {
    fn default() -> Self {
        Self {
            quantity_debounce: Duration::from_millis(DEFAULT_QUANTITY_DEBOUNCE_MS),
            note_debounce: Duration::from_millis(DEFAULT_NOTE_DEBOUNCE_MS),
            in_flight: InFlightPolicy::default(),
            bus_capacity: DEFAULT_BUS_CAPACITY,
        }
    }
}
