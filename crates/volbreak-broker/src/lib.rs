//! Order-routing venues.

mod paper;

pub use paper::{PaperVenue, PaperVenueConfig};
