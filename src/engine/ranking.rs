use std::cmp::Ordering;

use crate::models::carrier::Carrier;
use crate::models::order::Order;

/// A carrier that can take an order, with the quote it would charge.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub carrier: &'a Carrier,
    pub price: f64,
    pub distance_km: f64,
}

pub fn quote<'a>(carrier: &'a Carrier, order: &Order) -> Candidate<'a> {
    Candidate {
        carrier,
        price: carrier.delivery_price(&order.store, &order.customer),
        distance_km: carrier.delivery_distance(&order.store, &order.customer),
    }
}

/// Cheapest first, then shortest, then lowest carrier id.
pub fn compare_candidates(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    a.price
        .total_cmp(&b.price)
        .then_with(|| a.distance_km.total_cmp(&b.distance_km))
        .then_with(|| a.carrier.id().cmp(b.carrier.id()))
}

/// Eligible carriers for `order`, best quote first.
pub fn find_eligible_carriers<'a>(order: &Order, carriers: &'a [Carrier]) -> Vec<Candidate<'a>> {
    let mut candidates: Vec<Candidate<'a>> = carriers
        .iter()
        .filter(|carrier| carrier.is_eligible_for(order))
        .map(|carrier| quote(carrier, order))
        .collect();

    candidates.sort_by(compare_candidates);
    candidates
}
