mod engine;
mod mode;
mod ticker;

pub use engine::{TimerEngine, TimerPhase};
pub use mode::{format_clock, BreakKind, Presets, TimerMode};
pub use ticker::{ManualTicker, Tick, TickSource, TokioTicker};
