use crate::scoring::{
    DifficultyProfile, MatchMode, Phoneme, PhonemeSequence, WordPhonemes,
    similarity::{EXACT_SIMILARITY, MATCH_THRESHOLD, phoneme_similarity},
    validate_partition,
};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Outcome of scoring one attempt against a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringResult {
    /// Final score, 0 to 100.
    pub score: u8,
    /// Unrounded composite in [0, 1] that `score` is derived from.
    pub raw_score: f64,
    /// One flag per target phoneme, true when the attempt covered it.
    /// Display only; never feeds back into `score`.
    pub phoneme_matches: Vec<bool>,
    /// Attempt duration divided by target duration (0 when unknown).
    pub duration_ratio: f64,
    /// Phoneme overlap in [0, 1] under the profile's match mode.
    pub overlap_ratio: f64,
    /// Timing bonus actually awarded, in [0, bonus_weight].
    pub duration_bonus: f64,
}

impl ScoringResult {
    /// A zero score with one unmatched flag per target phoneme.
    pub fn zero(target_len: usize) -> Self {
        Self {
            score: 0,
            raw_score: 0.0,
            phoneme_matches: vec![false; target_len],
            duration_ratio: 0.0,
            overlap_ratio: 0.0,
            duration_bonus: 0.0,
        }
    }
}

/// Overlap ratio plus per-target-phoneme match flags.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Overlap {
    pub(crate) ratio: f64,
    pub(crate) matches: Vec<bool>,
}

/// Stateless phoneme scorer.
///
/// Carries no state between calls; identical inputs always produce identical
/// results, so it can be shared freely or built per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhonemeScorer;

impl PhonemeScorer {
    /// Creates a scorer.
    pub fn new() -> Self {
        Self
    }

    /// Scores `attempt` against `target` under `profile`.
    ///
    /// `score = round(100 * (sqrt(overlap) * (1 - bonus_weight) + bonus))`,
    /// clamped to [0, 100]. An empty target scores 0.
    #[instrument(level = "debug", skip_all, fields(
        target_len = target.len(),
        attempt_len = attempt.len(),
        mode = ?profile.match_mode,
    ))]
    pub fn score(
        &self,
        target: &[Phoneme],
        attempt: &[Phoneme],
        target_duration_ms: u64,
        attempt_duration_ms: u64,
        profile: &DifficultyProfile,
    ) -> ScoringResult {
        if target.is_empty() {
            debug!("Empty target, scoring 0");
            return ScoringResult::zero(0);
        }

        let overlap = match profile.match_mode {
            MatchMode::Fuzzy => fuzzy_overlap(target, attempt),
            MatchMode::Exact => exact_overlap(target, attempt),
            MatchMode::Ordered => ordered_overlap(target, attempt),
        };

        let duration_ratio = duration_ratio(target_duration_ms, attempt_duration_ms);
        let bonus = if target_duration_ms == 0 {
            0.0
        } else {
            duration_bonus(duration_ratio, profile)
        };

        let bonus_weight = profile.bonus_weight.clamp(0.0, 1.0);
        let raw_score = overlap.ratio.max(0.0).sqrt() * (1.0 - bonus_weight) + bonus;
        let score = (100.0 * raw_score).round().clamp(0.0, 100.0) as u8;

        debug!(
            overlap = overlap.ratio,
            duration_ratio,
            bonus,
            score,
            "Attempt scored"
        );

        ScoringResult {
            score,
            raw_score,
            phoneme_matches: overlap.matches,
            duration_ratio,
            overlap_ratio: overlap.ratio,
            duration_bonus: bonus,
        }
    }

    /// Scores two already-validated sequences.
    pub fn score_sequences(
        &self,
        target: &PhonemeSequence,
        attempt: &PhonemeSequence,
        target_duration_ms: u64,
        attempt_duration_ms: u64,
        profile: &DifficultyProfile,
    ) -> ScoringResult {
        self.score(
            target.phonemes(),
            attempt.phonemes(),
            target_duration_ms,
            attempt_duration_ms,
            profile,
        )
    }

    /// Scores raw collaborator output, checking each word partition first.
    ///
    /// A broken partition on either side is logged and scores 0.
    #[allow(clippy::too_many_arguments)]
    pub fn score_partitioned(
        &self,
        target_words: &[WordPhonemes],
        target: &[Phoneme],
        attempt_words: &[WordPhonemes],
        attempt: &[Phoneme],
        target_duration_ms: u64,
        attempt_duration_ms: u64,
        profile: &DifficultyProfile,
    ) -> ScoringResult {
        for (side, words, phonemes) in [
            ("target", target_words, target),
            ("attempt", attempt_words, attempt),
        ] {
            if let Err(e) = validate_partition(words, phonemes) {
                warn!(side, error = ?e, "Rejected phoneme partition, scoring 0");
                return ScoringResult::zero(target.len());
            }
        }

        self.score(
            target,
            attempt,
            target_duration_ms,
            attempt_duration_ms,
            profile,
        )
    }
}

/// `attempt / target`, or 0 when the target duration is unknown.
pub(crate) fn duration_ratio(target_duration_ms: u64, attempt_duration_ms: u64) -> f64 {
    if target_duration_ms == 0 {
        return 0.0;
    }
    attempt_duration_ms as f64 / target_duration_ms as f64
}

/// Continuous Gaussian timing bonus, peaking at `bonus_weight` when `ratio == 1`.
pub fn duration_bonus(ratio: f64, profile: &DifficultyProfile) -> f64 {
    if !ratio.is_finite() || !(profile.gaussian_width.is_finite() && profile.gaussian_width > 0.0)
    {
        return 0.0;
    }
    let distance = ratio - 1.0;
    profile.bonus_weight.clamp(0.0, 1.0) * (-(distance * distance) / profile.gaussian_width).exp()
}

/// Best one-to-one alignment with partial credit.
///
/// Every target phoneme is paired with at most one attempt phoneme so that
/// the summed pair similarity is maximal, independent of either order.
/// Identical pairs earn full credit, so the ratio is never below the
/// exact-mode ratio for the same inputs.
pub(crate) fn fuzzy_overlap(target: &[Phoneme], attempt: &[Phoneme]) -> Overlap {
    if target.is_empty() || attempt.is_empty() {
        return Overlap {
            ratio: 0.0,
            matches: vec![false; target.len()],
        };
    }

    // Square cost matrix; padded cells cost a full miss.
    let size = target.len().max(attempt.len());
    let mut cost = vec![EXACT_SIMILARITY; size * size];
    for (t, phoneme) in target.iter().enumerate() {
        for (a, candidate) in attempt.iter().enumerate() {
            let similarity = phoneme_similarity(phoneme, candidate).clamp(0.0, EXACT_SIMILARITY);
            cost[t * size + a] = EXACT_SIMILARITY - similarity;
        }
    }

    let assignment = min_cost_assignment(&cost, size);
    let credit: Vec<f64> = target
        .iter()
        .zip(&assignment)
        .map(|(phoneme, &a)| {
            attempt
                .get(a)
                .map_or(0.0, |candidate| phoneme_similarity(phoneme, candidate))
        })
        .collect();

    let total: f64 = credit.iter().sum();
    Overlap {
        ratio: (total / target.len() as f64).clamp(0.0, 1.0),
        matches: credit.iter().map(|&c| c >= MATCH_THRESHOLD).collect(),
    }
}

/// Hungarian method over a square `size * size` row-major cost matrix.
///
/// Returns the column assigned to each row. Costs must be finite.
pub(crate) fn min_cost_assignment(cost: &[f64], size: usize) -> Vec<usize> {
    // Potentials and matching are 1-based; column 0 is the search root.
    let mut row_potential = vec![0.0f64; size + 1];
    let mut col_potential = vec![0.0f64; size + 1];
    let mut row_of_col = vec![0usize; size + 1];
    let mut previous_col = vec![0usize; size + 1];

    for row in 1..=size {
        row_of_col[0] = row;
        let mut col = 0usize;
        let mut slack = vec![f64::INFINITY; size + 1];
        let mut visited = vec![false; size + 1];

        loop {
            visited[col] = true;
            let current_row = row_of_col[col];
            let mut delta = f64::INFINITY;
            let mut next_col = 0usize;

            for candidate in 1..=size {
                if visited[candidate] {
                    continue;
                }
                let reduced = cost[(current_row - 1) * size + (candidate - 1)]
                    - row_potential[current_row]
                    - col_potential[candidate];
                if reduced < slack[candidate] {
                    slack[candidate] = reduced;
                    previous_col[candidate] = col;
                }
                if slack[candidate] < delta {
                    delta = slack[candidate];
                    next_col = candidate;
                }
            }

            for candidate in 0..=size {
                if visited[candidate] {
                    row_potential[row_of_col[candidate]] += delta;
                    col_potential[candidate] -= delta;
                } else {
                    slack[candidate] -= delta;
                }
            }

            col = next_col;
            if col == 0 || row_of_col[col] == 0 {
                break;
            }
        }

        // Flip the augmenting path back to the root.
        while col != 0 {
            let prior = previous_col[col];
            row_of_col[col] = row_of_col[prior];
            col = prior;
        }
    }

    let mut assignment = vec![0usize; size];
    for (col, &row) in row_of_col.iter().enumerate().skip(1) {
        if row != 0 {
            assignment[row - 1] = col - 1;
        }
    }
    assignment
}

/// Multiset Jaccard overlap: |intersection| / |union|.
pub(crate) fn exact_overlap(target: &[Phoneme], attempt: &[Phoneme]) -> Overlap {
    let mut counts: BTreeMap<&Phoneme, (usize, usize)> = BTreeMap::new();
    for phoneme in target {
        counts.entry(phoneme).or_default().0 += 1;
    }
    for phoneme in attempt {
        counts.entry(phoneme).or_default().1 += 1;
    }

    let (intersection, union) = counts
        .values()
        .fold((0usize, 0usize), |(i, u), &(t, a)| (i + t.min(a), u + t.max(a)));

    // A target occurrence is matched while the attempt still has copies left.
    let mut seen: BTreeMap<&Phoneme, usize> = BTreeMap::new();
    let matches = target
        .iter()
        .map(|phoneme| {
            let occurrence = seen.entry(phoneme).or_default();
            *occurrence += 1;
            let available = counts.get(phoneme).map_or(0, |&(_, a)| a);
            *occurrence <= available
        })
        .collect();

    Overlap {
        ratio: if union == 0 {
            0.0
        } else {
            intersection as f64 / union as f64
        },
        matches,
    }
}

/// Longest common subsequence length over target length.
pub(crate) fn ordered_overlap(target: &[Phoneme], attempt: &[Phoneme]) -> Overlap {
    let (n, m) = (target.len(), attempt.len());
    let width = m + 1;
    let mut table = vec![0usize; (n + 1) * width];

    for i in 1..=n {
        for j in 1..=m {
            table[i * width + j] = if target[i - 1] == attempt[j - 1] {
                table[(i - 1) * width + (j - 1)] + 1
            } else {
                table[(i - 1) * width + j].max(table[i * width + (j - 1)])
            };
        }
    }

    let mut matches = vec![false; n];
    let (mut i, mut j) = (n, m);
    while i > 0 && j > 0 {
        if target[i - 1] == attempt[j - 1] {
            matches[i - 1] = true;
            i -= 1;
            j -= 1;
        } else if table[(i - 1) * width + j] >= table[i * width + (j - 1)] {
            i -= 1;
        } else {
            j -= 1;
        }
    }

    let lcs = table[n * width + m];
    Overlap {
        ratio: if n == 0 { 0.0 } else { lcs as f64 / n as f64 },
        matches,
    }
}
