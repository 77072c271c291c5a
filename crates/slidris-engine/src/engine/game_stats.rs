use crate::PLAYABLE_HEIGHT;

/// Points for the first line of a batch; each further line doubles.
pub const BASE_SCORE: u64 = 100;

/// Points for clearing `lines` rows in one batch: `Σ BASE_SCORE·2^i`.
///
/// Saturates at `u64::MAX` for absurdly large batches.
///
/// ```
/// use slidris_engine::calculate_score;
///
/// assert_eq!(calculate_score(0), 0);
/// assert_eq!(calculate_score(1), 100);
/// assert_eq!(calculate_score(2), 300);
/// assert_eq!(calculate_score(3), 700);
/// assert_eq!(calculate_score(4), 1500);
/// ```
#[must_use]
pub const fn calculate_score(lines: usize) -> u64 {
    let mut total: u64 = 0;
    let mut term = BASE_SCORE;
    let mut i = 0;
    while i < lines && total < u64::MAX {
        total = total.saturating_add(term);
        term = term.saturating_mul(2);
        i += 1;
    }
    total
}

/// Running statistics of one game.
///
/// - **Score**: sum of all batch clears
/// - **Turns**: confirmed turns, including the one that ended the game
/// - **Clear histogram**: how many batches cleared 1, 2, … rows
///
/// # Example
///
/// ```
/// use slidris_engine::GameStats;
///
/// let mut stats = GameStats::new();
/// assert_eq!(stats.record_clear(2), 300);
/// stats.complete_turn();
///
/// assert_eq!(stats.score(), 300);
/// assert_eq!(stats.total_cleared_lines(), 2);
/// assert_eq!(stats.combos(), 1);
/// assert_eq!(stats.turns(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameStats {
    score: u64,
    turns: usize,
    total_cleared_lines: usize,
    line_cleared_counter: [usize; PLAYABLE_HEIGHT + 1],
}

impl GameStats {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            score: 0,
            turns: 0,
            total_cleared_lines: 0,
            line_cleared_counter: [0; PLAYABLE_HEIGHT + 1],
        }
    }

    #[must_use]
    pub const fn score(&self) -> u64 {
        self.score
    }

    #[must_use]
    pub const fn turns(&self) -> usize {
        self.turns
    }

    #[must_use]
    pub const fn total_cleared_lines(&self) -> usize {
        self.total_cleared_lines
    }

    /// Histogram of batch sizes; index `n` counts batches that cleared `n`
    /// rows. Index 0 is unused.
    #[must_use]
    pub const fn line_cleared_counter(&self) -> &[usize; PLAYABLE_HEIGHT + 1] {
        &self.line_cleared_counter
    }

    /// Batches that cleared at least two rows.
    #[must_use]
    pub fn combos(&self) -> usize {
        self.line_cleared_counter[2..].iter().sum()
    }

    /// Scores a batch clear and returns the points awarded.
    pub fn record_clear(&mut self, lines: usize) -> u64 {
        if lines == 0 {
            return 0;
        }
        let points = calculate_score(lines);
        self.score += points;
        self.total_cleared_lines += lines;
        if let Some(count) = self.line_cleared_counter.get_mut(lines) {
            *count += 1;
        }
        points
    }

    pub const fn complete_turn(&mut self) {
        self.turns += 1;
    }
}
