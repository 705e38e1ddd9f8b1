//! Composite scoring and ranking
//!
//! Filters the universe by breadth and liquidity, z-normalizes a
//! risk-penalized momentum score across survivors, and produces a totally
//! ordered ranking. Equal inputs always produce identical output.

use crate::analytics::indicators::breadth_ok;
use crate::analytics::types::IndicatorSet;
use crate::error::{AppError, Result};
use std::cmp::Ordering;

/// Score differences at or below this are treated as ties.
const SCORE_EPSILON: f64 = 1e-10;

/// Momentum scoring parameters
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// Volatility penalty factor in [0, 1]
    pub penalty_lambda: f64,
    /// Minimum average dollar volume
    pub min_adv: f64,
    /// Minimum number of strictly positive horizon returns
    pub breadth_min_positive: usize,
    /// Total number of horizons checked by the breadth gate
    pub breadth_total: usize,
}

/// Computes composite scores and rankings across a universe
pub struct Scorer {
    config: ScoringConfig,
}

impl Scorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Whether an indicator survives the breadth and liquidity filters.
    pub fn passes_filters(&self, ind: &IndicatorSet) -> bool {
        let returns = [ind.r_1m, ind.r_3m, ind.r_6m, ind.r_12m];
        breadth_ok(&returns, self.config.breadth_min_positive) && ind.adv >= self.config.min_adv
    }

    /// Filter, score, normalize, and rank. Returns survivors ordered by
    /// rank 1..N with score and rank populated.
    pub fn score_and_rank(&self, indicators: &[IndicatorSet]) -> Result<Vec<IndicatorSet>> {
        let mut survivors: Vec<IndicatorSet> = indicators
            .iter()
            .filter(|ind| self.passes_filters(ind))
            .cloned()
            .collect();

        if survivors.is_empty() {
            return Err(AppError::NoSurvivors);
        }

        let raw: Vec<f64> = survivors
            .iter()
            .map(|ind| raw_score(ind, self.config.penalty_lambda))
            .collect();
        let normalized = z_normalize(&raw);

        for (ind, score) in survivors.iter_mut().zip(normalized) {
            ind.score = score;
        }

        survivors.sort_by(rank_ordering);
        for (i, ind) in survivors.iter_mut().enumerate() {
            ind.rank = (i + 1) as i64;
        }

        Ok(survivors)
    }
}

/// Risk-penalized raw score: mean of the four horizon returns minus
/// lambda times the long volatility.
pub fn raw_score(ind: &IndicatorSet, penalty_lambda: f64) -> f64 {
    let avg_return = (ind.r_1m + ind.r_3m + ind.r_6m + ind.r_12m) / 4.0;
    avg_return - penalty_lambda * ind.vol_6m
}

/// Z-score normalization with the population standard deviation. All
/// outputs are zero when the inputs do not vary.
pub fn z_normalize(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>()
        / values.len() as f64;
    let std_dev = variance.sqrt();

    if std_dev == 0.0 {
        return vec![0.0; values.len()];
    }

    values.iter().map(|v| (v - mean) / std_dev).collect()
}

/// Descending-quality ordering: higher score, then lower vol_6m, then
/// higher adv, then lexicographically smaller symbol. The symbol level
/// makes the order total, so equal inputs always rank identically.
fn rank_ordering(a: &IndicatorSet, b: &IndicatorSet) -> Ordering {
    if (a.score - b.score).abs() > SCORE_EPSILON {
        return b.score.total_cmp(&a.score);
    }
    if (a.vol_6m - b.vol_6m).abs() > SCORE_EPSILON {
        return a.vol_6m.total_cmp(&b.vol_6m);
    }
    if (a.adv - b.adv).abs() > SCORE_EPSILON {
        return b.adv.total_cmp(&a.adv);
    }
    a.symbol.cmp(&b.symbol)
}

/// First `n` entries of a ranked slice.
pub fn top_n(ranked: &[IndicatorSet], n: usize) -> &[IndicatorSet] {
    &ranked[..n.min(ranked.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn config() -> ScoringConfig {
        ScoringConfig {
            penalty_lambda: 0.35,
            min_adv: 1_000_000.0,
            breadth_min_positive: 3,
            breadth_total: 4,
        }
    }

    fn ind(symbol: &str, returns: [f64; 4], vol_6m: f64, adv: f64) -> IndicatorSet {
        IndicatorSet {
            symbol: symbol.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            r_1m: returns[0],
            r_3m: returns[1],
            r_6m: returns[2],
            r_12m: returns[3],
            vol_3m: vol_6m * 0.9,
            vol_6m,
            adv,
            score: 0.0,
            rank: 0,
        }
    }

    #[test]
    fn identical_metrics_tie_break_lexicographically() {
        let scorer = Scorer::new(config());
        let returns = [0.1, 0.1, 0.1, 0.1];

        let ranked = scorer
            .score_and_rank(&[
                ind("ZZZ", returns, 0.2, 5_000_000.0),
                ind("AAA", returns, 0.2, 5_000_000.0),
            ])
            .unwrap();

        assert_eq!(ranked[0].symbol, "AAA");
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].symbol, "ZZZ");
        assert_eq!(ranked[1].rank, 2);
    }

    #[test]
    fn breadth_gate_at_threshold() {
        let scorer = Scorer::new(config());

        // Three positives of four at min_positive = 3: survives
        let pass = ind("PASS", [0.10, 0.10, 0.10, -0.05], 0.2, 5_000_000.0);
        // Two positives: filtered out
        let fail = ind("FAIL", [0.10, 0.10, -0.05, -0.05], 0.2, 5_000_000.0);

        assert!(scorer.passes_filters(&pass));
        assert!(!scorer.passes_filters(&fail));

        let ranked = scorer.score_and_rank(&[pass, fail]).unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].symbol, "PASS");
    }

    #[test]
    fn liquidity_gate_drops_thin_names() {
        let scorer = Scorer::new(config());
        let returns = [0.1, 0.1, 0.1, 0.1];

        let thin = ind("THIN", returns, 0.2, 999_999.0);
        let liquid = ind("LIQ", returns, 0.2, 1_000_000.0);
        assert!(!scorer.passes_filters(&thin));
        assert!(scorer.passes_filters(&liquid));
    }

    #[test]
    fn no_survivors_is_an_error() {
        let scorer = Scorer::new(config());
        let all_negative = ind("DOWN", [-0.1, -0.2, -0.1, -0.3], 0.2, 5_000_000.0);
        assert!(matches!(
            scorer.score_and_rank(&[all_negative]),
            Err(AppError::NoSurvivors)
        ));
    }

    #[test]
    fn single_survivor_ranks_first_with_zero_score() {
        let scorer = Scorer::new(config());
        let only = ind("SPY", [0.1, 0.1, 0.1, 0.1], 0.2, 5_000_000.0);

        let ranked = scorer.score_and_rank(&[only]).unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].rank, 1);
        // Universe of one has no dispersion to normalize against
        assert_eq!(ranked[0].score, 0.0);
    }

    #[test]
    fn ranks_follow_normalized_score() {
        let scorer = Scorer::new(config());

        let strong = ind("UP", [0.2, 0.2, 0.2, 0.2], 0.1, 5_000_000.0);
        let weak = ind("MEH", [0.05, 0.05, 0.05, 0.05], 0.3, 5_000_000.0);
        let ranked = scorer.score_and_rank(&[weak, strong]).unwrap();

        assert_eq!(ranked[0].symbol, "UP");
        assert!(ranked[0].score > ranked[1].score);
        // Two-element z-scores are symmetric around zero
        assert!((ranked[0].score + ranked[1].score).abs() < 1e-12);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].rank, 2);
    }

    #[test]
    fn vol_then_adv_tie_breaks() {
        let scorer = Scorer::new(ScoringConfig {
            penalty_lambda: 0.0,
            ..config()
        });
        let returns = [0.1, 0.1, 0.1, 0.1];

        // Same returns; lambda 0 keeps raw scores tied despite vol
        let calm = ind("CALM", returns, 0.10, 5_000_000.0);
        let wild = ind("WILD", returns, 0.30, 9_000_000.0);
        let ranked = scorer.score_and_rank(&[wild.clone(), calm.clone()]).unwrap();
        assert_eq!(ranked[0].symbol, "CALM");

        // Same vol: higher adv wins
        let rich = ind("RICH", returns, 0.10, 9_000_000.0);
        let poor = ind("POOR", returns, 0.10, 2_000_000.0);
        let ranked = scorer.score_and_rank(&[poor, rich]).unwrap();
        assert_eq!(ranked[0].symbol, "RICH");
    }

    #[test]
    fn ranking_is_deterministic_under_permutation() {
        let scorer = Scorer::new(config());
        let universe = vec![
            ind("SPY", [0.12, 0.10, 0.08, 0.15], 0.18, 9e7),
            ind("QQQ", [0.20, 0.18, 0.15, 0.25], 0.25, 8e7),
            ind("IWM", [0.05, 0.06, 0.04, 0.08], 0.22, 3e7),
            ind("DIA", [0.08, 0.07, 0.09, 0.11], 0.15, 2e7),
        ];

        let forward = scorer.score_and_rank(&universe).unwrap();

        let mut reversed = universe.clone();
        reversed.reverse();
        let backward = scorer.score_and_rank(&reversed).unwrap();

        assert_eq!(forward.len(), backward.len());
        for (a, b) in forward.iter().zip(backward.iter()) {
            assert_eq!(a.symbol, b.symbol);
            assert_eq!(a.rank, b.rank);
            assert_eq!(a.score.to_bits(), b.score.to_bits());
        }
    }

    #[test]
    fn ranks_are_exactly_one_through_n() {
        let scorer = Scorer::new(config());
        let universe: Vec<IndicatorSet> = (0..7)
            .map(|i| {
                ind(
                    &format!("SYM{i}"),
                    [0.1 + i as f64 * 0.01, 0.1, 0.1, 0.1],
                    0.2,
                    5_000_000.0,
                )
            })
            .collect();

        let ranked = scorer.score_and_rank(&universe).unwrap();
        let ranks: Vec<i64> = ranked.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, (1..=7).collect::<Vec<i64>>());
    }

    #[test]
    fn z_normalize_handles_degenerate_inputs() {
        assert!(z_normalize(&[]).is_empty());
        assert_eq!(z_normalize(&[5.0]), vec![0.0]);
        assert_eq!(z_normalize(&[3.0, 3.0, 3.0]), vec![0.0, 0.0, 0.0]);

        let normalized = z_normalize(&[1.0, 2.0, 3.0]);
        assert!((normalized.iter().sum::<f64>()).abs() < 1e-12);
        assert!(normalized[0] < normalized[1] && normalized[1] < normalized[2]);
    }

    #[test]
    fn top_n_clamps_to_length() {
        let scorer = Scorer::new(config());
        let universe = vec![
            ind("SPY", [0.1, 0.1, 0.1, 0.1], 0.1, 5e6),
            ind("QQQ", [0.2, 0.2, 0.2, 0.2], 0.2, 5e6),
        ];
        let ranked = scorer.score_and_rank(&universe).unwrap();

        assert_eq!(top_n(&ranked, 1).len(), 1);
        assert_eq!(top_n(&ranked, 10).len(), 2);
    }
}
