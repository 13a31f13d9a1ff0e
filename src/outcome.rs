use serde::{
    Deserialize,
    Serialize,
};
use sha2::{
    Digest,
    Sha256,
};
use std::fmt;

/// Fixed-point representation of 1.0x (basis points per whole).
pub const SCALE: u64 = 10_000;

/// Number of faces on the house die.
pub const DEFAULT_SIDE_COUNT: u32 = 100;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableError {
    #[error("threshold {threshold} outside 1..{side_count}")]
    InvalidThreshold { threshold: u32, side_count: u32 },
    #[error("side count must be positive")]
    ZeroSides,
}

/// A payout multiplier scaled by [`SCALE`].
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Multiplier(u64);

impl Multiplier {
    pub const ONE: Multiplier = Multiplier(SCALE);

    pub fn from_scaled(scaled: u64) -> Self {
        Self(scaled)
    }

    pub fn scaled(self) -> u64 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / SCALE as f64
    }

    /// Payout for `wager` at this multiplier, truncated to whole units.
    pub fn apply(self, wager: u64) -> u64 {
        let payout = u128::from(wager) * u128::from(self.0) / u128::from(SCALE);
        u64::try_from(payout).unwrap_or(u64::MAX)
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}x", self.as_f64())
    }
}

/// Per-outcome multiplier schedule sent to the settlement engine with a wager.
///
/// Built only through [`build_table`]; there are no mutators, so a table handed
/// to the engine is exactly the one that was computed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutcomeTable {
    side_count: u32,
    threshold: u32,
    win_multiplier: Multiplier,
    entries: Vec<u64>,
}

impl OutcomeTable {
    pub fn side_count(&self) -> u32 {
        self.side_count
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn win_multiplier(&self) -> Multiplier {
        self.win_multiplier
    }

    pub fn entries(&self) -> &[u64] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all scaled entries. Never above `side_count * SCALE`.
    pub fn total(&self) -> u64 {
        self.entries.iter().sum()
    }

    /// Expected return of one unit wagered, descaled.
    pub fn expected_value(&self) -> f64 {
        self.total() as f64 / (u64::from(self.side_count) * SCALE) as f64
    }

    /// Win probability in percent.
    pub fn win_chance(&self) -> f64 {
        f64::from(self.threshold) / f64::from(self.side_count) * 100.0
    }

    pub fn payout_at(&self, index: usize, wager: u64) -> Option<u64> {
        self.entries
            .get(index)
            .map(|scaled| Multiplier::from_scaled(*scaled).apply(wager))
    }

    /// Hex sha256 over the little-endian entries; identifies the exact table in logs.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for entry in &self.entries {
            hasher.update(entry.to_le_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

/// Scaled multiplier paid when the roll lands under `threshold`.
///
/// Floor division in scaled integer space, so the implied expected value never
/// rounds above 1.0.
pub fn win_multiplier(threshold: u32, side_count: u32) -> Result<Multiplier, TableError> {
    if side_count == 0 {
        return Err(TableError::ZeroSides);
    }
    if threshold == 0 || threshold >= side_count {
        return Err(TableError::InvalidThreshold {
            threshold,
            side_count,
        });
    }
    let scaled = u64::from(side_count) * SCALE / u64::from(threshold);
    Ok(Multiplier::from_scaled(scaled))
}

pub fn build_table(threshold: u32, side_count: u32) -> Result<OutcomeTable, TableError> {
    let win_multiplier = win_multiplier(threshold, side_count)?;
    let entries = (0..side_count)
        .map(|i| {
            if i < threshold {
                win_multiplier.scaled()
            } else {
                0
            }
        })
        .collect();
    Ok(OutcomeTable {
        side_count,
        threshold,
        win_multiplier,
        entries,
    })
}
