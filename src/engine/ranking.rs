use std::cmp::Ordering;
use std::collections::HashMap;

use uuid::Uuid;

use crate::geo::haversine_km;
use crate::models::candidate::{CandidateScore, RankedCandidate};
use crate::models::nurse::{Coordinate, NurseProfile};

/// Orders candidates by probability (desc), then distance (asc, known before
/// unknown), then nurse id (asc).
///
/// Scores without a resolvable profile are dropped. Nothing else is filtered;
/// availability is left to the caller. The output depends only on the inputs,
/// never on the order `scores` arrives in.
pub fn rank(
    scores: &[CandidateScore],
    profiles: &HashMap<Uuid, NurseProfile>,
    patient: Option<&Coordinate>,
) -> Vec<RankedCandidate> {
    let mut ranked: Vec<RankedCandidate> = scores
        .iter()
        .filter_map(|score| {
            let profile = profiles.get(&score.nurse_id)?;
            let distance_km =
                patient.map(|origin| haversine_km(origin, &profile.location.coordinate));

            Some(RankedCandidate {
                nurse_id: score.nurse_id,
                probability: score.probability,
                distance_km,
                nurse: profile.clone(),
            })
        })
        .collect();

    ranked.sort_by(compare_candidates);
    ranked
}

fn compare_candidates(a: &RankedCandidate, b: &RankedCandidate) -> Ordering {
    b.probability
        .total_cmp(&a.probability)
        .then_with(|| compare_distance(a.distance_km, b.distance_km))
        .then_with(|| a.nurse_id.cmp(&b.nurse_id))
}

fn compare_distance(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
