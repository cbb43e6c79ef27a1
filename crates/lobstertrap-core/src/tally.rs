use std::collections::HashMap;

use rand::Rng;
use rand::seq::IndexedRandom;
use uuid::Uuid;

use crate::game::Vote;

/// The targets tied at the maximum vote count, sorted for determinism.
/// Empty when no votes were cast.
pub fn leading_targets(votes: &[Vote]) -> Vec<Uuid> {
    let mut counts: HashMap<Uuid, usize> = HashMap::new();
    for v in votes {
        *counts.entry(v.target_id).or_insert(0) += 1;
    }
    let Some(&max) = counts.values().max() else {
        return Vec::new();
    };
    let mut leaders: Vec<Uuid> = counts
        .iter()
        .filter(|&(_, &c)| c == max)
        .map(|(&id, _)| id)
        .collect();
    leaders.sort();
    leaders
}

/// The single player voted out this round: the unique plurality target, or
/// one of the tied leaders chosen uniformly at random. None when the round
/// saw no votes at all.
pub fn select_eliminated<R: Rng + ?Sized>(votes: &[Vote], rng: &mut R) -> Option<Uuid> {
    leading_targets(votes).choose(rng).copied()
}
