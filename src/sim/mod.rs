//! Round simulation module
//!
//! All game logic lives here. This module must stay free of rendering and
//! platform code:
//! - Injected clock only (every entry point takes `now_ms`)
//! - Seeded RNG only
//! - Timers are owned and cancelled by the engine

pub mod crash_table;
pub mod engine;
pub mod growth;
pub mod schedule;
pub mod state;

pub use crash_table::{CrashBand, CrashTable};
pub use engine::RoundEngine;
pub use growth::{discount_at, time_to_reach};
pub use schedule::{Scheduler, TaskId, TaskKind};
pub use state::{EngineEvent, EnginePhase, Round, RoundStatus, RngState, Session, Snapshot};
