//! Weighted lottery over artists, without replacement.

use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::Rng;

use super::models::{AffinityMap, ArtistStat};

const RECENT_60_WEIGHT: f64 = 60.0;
const RECENT_14_WEIGHT: f64 = 10.0;
const LIKED_BONUS: f64 = 5.0;

/// An artist eligible for the lottery.
#[derive(Debug, Clone, PartialEq)]
pub struct LotteryTicket {
    pub artist_id: String,
    pub name: String,
    pub weight: f64,
}

/// Draws artists one at a time, each at most once.
///
/// Weights are computed once from the stats snapshot. A drawn artist is removed
/// from the pool; the remaining weights are not renormalized.
#[derive(Debug, Clone)]
pub struct WeightedLottery {
    pool: Vec<LotteryTicket>,
}

/// Lottery weight of one artist given the pool maxima.
pub fn artist_weight(
    stat: &ArtistStat,
    max_recent_60: u32,
    max_recent_14: u32,
    bonus_min_likes: u32,
) -> f64 {
    let recent_60 = stat.recent_60 as f64 / max_recent_60.max(1) as f64 * RECENT_60_WEIGHT;
    let recent_14 = stat.recent_14 as f64 / max_recent_14.max(1) as f64 * RECENT_14_WEIGHT;
    let bonus = if stat.total_liked > bonus_min_likes {
        LIKED_BONUS
    } else {
        0.0
    };
    recent_60 + recent_14 + bonus
}

impl WeightedLottery {
    /// Build the pool from artists with at least one play in this pull.
    pub fn new(stats: &AffinityMap, bonus_min_likes: u32) -> Self {
        let eligible: Vec<&ArtistStat> = stats.values().filter(|s| s.scrobbles > 0).collect();

        let max_recent_60 = eligible.iter().map(|s| s.recent_60).max().unwrap_or(0);
        let max_recent_14 = eligible.iter().map(|s| s.recent_14).max().unwrap_or(0);

        // AffinityMap iterates in artist id order, so the pool is deterministic.
        let pool = eligible
            .into_iter()
            .map(|s| LotteryTicket {
                artist_id: s.artist_id.clone(),
                name: s.name.clone(),
                weight: artist_weight(s, max_recent_60, max_recent_14, bonus_min_likes),
            })
            .collect();

        Self { pool }
    }

    pub fn remaining(&self) -> usize {
        self.pool.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.pool.is_empty()
    }

    pub fn contains(&self, artist_id: &str) -> bool {
        self.pool.iter().any(|t| t.artist_id == artist_id)
    }

    /// Draw the next artist, or `None` once every artist has been drawn.
    ///
    /// When every remaining weight is zero the draw is uniform.
    pub fn draw<R: Rng>(&mut self, rng: &mut R) -> Option<LotteryTicket> {
        if self.pool.is_empty() {
            return None;
        }

        let index = match WeightedIndex::new(self.pool.iter().map(|t| t.weight)) {
            Ok(dist) => dist.sample(rng),
            Err(_) => rng.random_range(0..self.pool.len()),
        };
        Some(self.pool.swap_remove(index))
    }
}
