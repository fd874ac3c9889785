use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of reels on the machine
pub const SYMBOL_COUNT: usize = 3;

/// Lowest symbol a reel can show
pub const MIN_SYMBOL: u8 = 1;

/// Highest symbol a reel can show
pub const MAX_SYMBOL: u8 = 9;

/// Outcome tier of a spin, derived from the equality pattern of the symbols
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SpinOutcome {
    Lose,
    Win,
    SuperWin,
}

impl SpinOutcome {
    pub const ALL: [SpinOutcome; 3] = [SpinOutcome::Lose, SpinOutcome::Win, SpinOutcome::SuperWin];

    /// Multiplier applied to the bet. Negative for a loss: the bet is forfeited.
    pub const fn multiplier(self) -> i64 {
        match self {
            SpinOutcome::Lose => -1,
            SpinOutcome::Win => 2,
            SpinOutcome::SuperWin => 10,
        }
    }

    /// Signed balance delta for `bet_amount`. `None` on overflow.
    pub fn payout(self, bet_amount: i64) -> Option<i64> {
        bet_amount.checked_mul(self.multiplier())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SpinOutcome::Lose => "Lose",
            SpinOutcome::Win => "Win",
            SpinOutcome::SuperWin => "SuperWin",
        }
    }
}

impl fmt::Display for SpinOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// The symbols shown by the three reels after one spin
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Combination(pub [u8; SYMBOL_COUNT]);

impl Combination {
    pub fn new(symbols: [u8; SYMBOL_COUNT]) -> Self {
        Self(symbols)
    }

    pub fn symbols(&self) -> [u8; SYMBOL_COUNT] {
        self.0
    }

    /// Classify by the number of distinct symbols; symbol values do not matter.
    pub fn classify(&self) -> SpinOutcome {
        let mut symbols = self.0;
        symbols.sort_unstable();
        let distinct = 1 + symbols.windows(2).filter(|w| w[0] != w[1]).count();

        match distinct {
            1 => SpinOutcome::SuperWin,
            2 => SpinOutcome::Win,
            _ => SpinOutcome::Lose,
        }
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.0;
        write!(f, "{},{},{}", a, b, c)
    }
}

/// Error parsing the textual `"a,b,c"` form of a combination
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid combination {input:?}: {reason}")]
pub struct ParseCombinationError {
    pub input: String,
    pub reason: &'static str,
}

impl FromStr for Combination {
    type Err = ParseCombinationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fail = |reason| ParseCombinationError {
            input: s.to_string(),
            reason,
        };

        let mut symbols = [0u8; SYMBOL_COUNT];
        let mut parts = s.split(',');
        for slot in symbols.iter_mut() {
            let part = parts.next().ok_or_else(|| fail("expected three symbols"))?;
            let symbol: u8 = part.trim().parse().map_err(|_| fail("symbol is not a number"))?;
            if !(MIN_SYMBOL..=MAX_SYMBOL).contains(&symbol) {
                return Err(fail("symbol out of range"));
            }
            *slot = symbol;
        }
        if parts.next().is_some() {
            return Err(fail("expected three symbols"));
        }

        Ok(Combination(symbols))
    }
}
