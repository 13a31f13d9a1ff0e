use crate::outcome::{
    Multiplier,
    OutcomeTable,
    TableError,
    build_table,
};
use tracing::debug;

/// The player's pending bet: wager, roll-under threshold and the table derived
/// from it. The table is rebuilt on every threshold change.
#[derive(Clone, Debug)]
pub struct BetSlip {
    max_threshold: u32,
    wager: u64,
    pool_max_payout: Option<u64>,
    table: OutcomeTable,
}

impl BetSlip {
    pub fn new(
        side_count: u32,
        max_threshold: u32,
        initial_threshold: u32,
        wager: u64,
        pool_max_payout: Option<u64>,
    ) -> Result<Self, TableError> {
        if side_count == 0 {
            return Err(TableError::ZeroSides);
        }
        if max_threshold == 0 || max_threshold >= side_count {
            return Err(TableError::InvalidThreshold {
                threshold: max_threshold,
                side_count,
            });
        }
        let threshold = initial_threshold.clamp(1, max_threshold);
        let table = build_table(threshold, side_count)?;
        let slip = Self {
            max_threshold,
            wager,
            pool_max_payout,
            table,
        };
        slip.log_recompute();
        Ok(slip)
    }

    pub fn side_count(&self) -> u32 {
        self.table.side_count()
    }

    pub fn threshold(&self) -> u32 {
        self.table.threshold()
    }

    pub fn max_threshold(&self) -> u32 {
        self.max_threshold
    }

    pub fn wager(&self) -> u64 {
        self.wager
    }

    pub fn pool_max_payout(&self) -> Option<u64> {
        self.pool_max_payout
    }

    pub fn table(&self) -> &OutcomeTable {
        &self.table
    }

    pub fn multiplier(&self) -> Multiplier {
        self.table.win_multiplier()
    }

    pub fn clamp_threshold(&self, raw: i64) -> u32 {
        let clamped = raw.clamp(1, i64::from(self.max_threshold));
        u32::try_from(clamped).unwrap_or(1)
    }

    /// Clamps `raw` into the playable range and rebuilds the table. Returns
    /// whether the threshold actually changed.
    pub fn set_threshold(&mut self, raw: i64) -> Result<bool, TableError> {
        let threshold = self.clamp_threshold(raw);
        if threshold == self.threshold() {
            return Ok(false);
        }
        self.table = build_table(threshold, self.side_count())?;
        self.log_recompute();
        Ok(true)
    }

    pub fn nudge_threshold(&mut self, delta: i64) -> Result<bool, TableError> {
        self.set_threshold(i64::from(self.threshold()).saturating_add(delta))
    }

    pub fn set_wager(&mut self, wager: u64) {
        self.wager = wager;
        self.log_recompute();
    }

    pub fn set_pool_max_payout(&mut self, cap: Option<u64>) {
        self.pool_max_payout = cap;
    }

    pub fn win_chance(&self) -> f64 {
        self.table.win_chance()
    }

    pub fn potential_payout(&self) -> u64 {
        self.multiplier().apply(self.wager)
    }

    /// True when a win would pay more than the pool allows; the engine will
    /// refuse such a bet.
    pub fn exceeds_pool(&self) -> bool {
        self.pool_max_payout
            .is_some_and(|cap| self.potential_payout() > cap)
    }

    /// One-based label shown next to the slider.
    pub fn roll_under_label(&self) -> u32 {
        self.threshold() + 1
    }

    fn log_recompute(&self) {
        debug!(
            threshold = self.threshold(),
            multiplier = %self.multiplier(),
            wager = self.wager,
            max_win = self.potential_payout(),
            pool_max_payout = ?self.pool_max_payout,
            exceeded = self.exceeds_pool(),
            "bet slip recomputed"
        );
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;

    fn slip() -> BetSlip {
        BetSlip::new(100, 95, 50, 1_000, Some(50_000)).unwrap()
    }

    #[test]
    fn set_threshold__out_of_range__clamps_to_slider_bounds() {
        let mut slip = slip();

        slip.set_threshold(0).unwrap();
        assert_eq!(slip.threshold(), 1);

        slip.set_threshold(-40).unwrap();
        assert_eq!(slip.threshold(), 1);

        slip.set_threshold(250).unwrap();
        assert_eq!(slip.threshold(), 95);
    }

    #[test]
    fn set_threshold__new_value__rebuilds_table() {
        // given
        let mut slip = slip();

        // when
        let changed = slip.set_threshold(25).unwrap();

        // then
        assert!(changed);
        assert_eq!(slip.table().threshold(), 25);
        assert_eq!(slip.multiplier().scaled(), 40_000);
        assert_eq!(slip.roll_under_label(), 26);
    }

    #[test]
    fn set_threshold__same_value__reports_unchanged() {
        let mut slip = slip();

        assert!(!slip.set_threshold(50).unwrap());
        assert!(!slip.nudge_threshold(0).unwrap());
        assert!(slip.nudge_threshold(-1).unwrap());
        assert_eq!(slip.threshold(), 49);
    }

    #[test]
    fn exceeds_pool__payout_above_cap__flags_bet() {
        // given
        let mut slip = slip();
        slip.set_wager(1_000);

        // when
        slip.set_threshold(10).unwrap();

        // then
        assert_eq!(slip.potential_payout(), 10_000);
        assert!(!slip.exceeds_pool());

        slip.set_threshold(1).unwrap();
        assert_eq!(slip.potential_payout(), 100_000);
        assert!(slip.exceeds_pool());

        slip.set_pool_max_payout(None);
        assert!(!slip.exceeds_pool());
    }

    #[test]
    fn new__max_threshold_outside_sides__rejected() {
        assert!(BetSlip::new(100, 100, 50, 1, None).is_err());
        assert!(BetSlip::new(100, 0, 50, 1, None).is_err());
        assert_eq!(
            BetSlip::new(0, 1, 1, 1, None).unwrap_err(),
            TableError::ZeroSides
        );
    }

    #[test]
    fn win_chance__matches_threshold_share() {
        let slip = slip();

        assert!((slip.win_chance() - 50.0).abs() < f64::EPSILON);
    }
}
