//! Lowest-fare selection.

use crate::flight::FlightRecord;

/// The cheapest flight with a known price, or `None` if no listing has one.
///
/// Listings priced `0` carry no usable price and are ignored. When several flights
/// share the minimum, the earliest one in `flights` is returned.
pub fn lowest_price(flights: &[FlightRecord]) -> Option<&FlightRecord> {
    flights
        .iter()
        .filter(|flight| flight.price > 0)
        .min_by_key(|flight| flight.price)
}
