use crate::errors::{WalletError, WalletResult};
use crate::games::types::{Combination, SpinOutcome, MAX_SYMBOL, MIN_SYMBOL, SYMBOL_COUNT};
use rand::rngs::OsRng;
use rand::RngCore;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Largest accepted bet; keeps the SuperWin payout inside `i64`.
pub const MAX_BET: i64 = i64::MAX / SpinOutcome::SuperWin.multiplier();

// Largest multiple of the symbol span that fits in a byte; bytes at or above
// it are redrawn so every symbol is equally likely.
const SYMBOL_SPAN: u8 = MAX_SYMBOL - MIN_SYMBOL + 1;
const REJECTION_BOUND: u8 = (u8::MAX / SYMBOL_SPAN) * SYMBOL_SPAN;

#[derive(Debug, Error)]
pub enum EntropyError {
    #[error("random source failed: {0}")]
    Source(#[from] rand::Error),

    #[error("scripted source exhausted after {0} draws")]
    Exhausted(usize),
}

/// Produces one combination per call
pub trait CombinationSource: Send + Sync {
    fn next_combination(&self) -> Result<Combination, EntropyError>;
}

/// Operating-system CSPRNG; outcomes cannot be predicted from earlier draws.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRngSource;

impl CombinationSource for OsRngSource {
    fn next_combination(&self) -> Result<Combination, EntropyError> {
        let mut rng = OsRng;
        let mut symbols = [0u8; SYMBOL_COUNT];
        for symbol in symbols.iter_mut() {
            *symbol = draw_symbol(&mut rng)?;
        }
        Ok(Combination(symbols))
    }
}

/// Draw one symbol uniformly from `[MIN_SYMBOL, MAX_SYMBOL]`.
pub fn draw_symbol<R: RngCore + ?Sized>(rng: &mut R) -> Result<u8, rand::Error> {
    let mut byte = [0u8; 1];
    loop {
        rng.try_fill_bytes(&mut byte)?;
        if byte[0] < REJECTION_BOUND {
            return Ok(MIN_SYMBOL + byte[0] % SYMBOL_SPAN);
        }
    }
}

/// Replays a fixed list of combinations. Used to force outcomes in tests.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    script: Mutex<VecDeque<Combination>>,
    draws: AtomicUsize,
}

impl ScriptedSource {
    pub fn new<I>(combinations: I) -> Self
    where
        I: IntoIterator<Item = Combination>,
    {
        Self {
            script: Mutex::new(combinations.into_iter().collect()),
            draws: AtomicUsize::new(0),
        }
    }

    /// Number of combinations handed out so far
    pub fn draws(&self) -> usize {
        self.draws.load(Ordering::SeqCst)
    }

    pub fn push(&self, combination: Combination) {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(combination);
    }
}

impl CombinationSource for ScriptedSource {
    fn next_combination(&self) -> Result<Combination, EntropyError> {
        let next = self
            .script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();

        match next {
            Some(combination) => {
                self.draws.fetch_add(1, Ordering::SeqCst);
                Ok(combination)
            }
            None => Err(EntropyError::Exhausted(self.draws())),
        }
    }
}

/// Result of one draw: the symbols, their tier and the signed balance delta
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpinDraw {
    pub combination: Combination,
    pub outcome: SpinOutcome,
    pub payout: i64,
}

/// Slot outcome engine: validates the bet, draws a combination, prices it
#[derive(Clone)]
pub struct SlotMachine {
    source: Arc<dyn CombinationSource>,
}

impl SlotMachine {
    pub fn new() -> Self {
        Self::with_source(Arc::new(OsRngSource))
    }

    pub fn with_source(source: Arc<dyn CombinationSource>) -> Self {
        Self { source }
    }

    pub fn validate_bet(bet_amount: i64) -> WalletResult<()> {
        if bet_amount <= 0 || bet_amount > MAX_BET {
            return Err(WalletError::InvalidBetAmount(bet_amount));
        }
        Ok(())
    }

    /// Spin once. The bet is checked before any entropy is consumed.
    pub fn spin(&self, bet_amount: i64) -> WalletResult<SpinDraw> {
        Self::validate_bet(bet_amount)?;

        let combination = self
            .source
            .next_combination()
            .map_err(|e| WalletError::Entropy(e.to_string()))?;
        let outcome = combination.classify();
        let payout = outcome
            .payout(bet_amount)
            .ok_or(WalletError::InvalidBetAmount(bet_amount))?;

        Ok(SpinDraw {
            combination,
            outcome,
            payout,
        })
    }
}

impl Default for SlotMachine {
    fn default() -> Self {
        Self::new()
    }
}
