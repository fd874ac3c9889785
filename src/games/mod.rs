pub mod slot_machine;
pub mod types;

pub use slot_machine::{CombinationSource, OsRngSource, ScriptedSource, SlotMachine, SpinDraw, MAX_BET};
pub use types::*;
