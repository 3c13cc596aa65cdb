//! Presentation boundary
//!
//! Whatever draws the rocket implements [`Observer`]. It is told about every
//! tick and transition and never writes back except through the engine's
//! `ignite`/`cash_out` commands.

use crate::format_percent;
use crate::sim::{EngineEvent, Snapshot};

pub trait Observer {
    fn notify(&mut self, event: &EngineEvent, snapshot: &Snapshot);
}

/// Writes transitions to the log; ticks only at trace level
#[derive(Debug, Default)]
pub struct LogObserver;

impl Observer for LogObserver {
    fn notify(&mut self, event: &EngineEvent, snapshot: &Snapshot) {
        match event {
            EngineEvent::Tick { discount } => {
                log::trace!("Discount {}", format_percent(*discount));
            }
            EngineEvent::CountdownStarted { seconds } => {
                log::info!("Next launch in {}s", seconds);
            }
            EngineEvent::CountdownStep { remaining } => {
                log::debug!("Launch in {}s", remaining);
            }
            EngineEvent::RoundStarted { round, joined } => {
                log::info!("Round {} lift-off (joined: {})", round, joined);
            }
            EngineEvent::Crashed {
                round,
                discount,
                crash_point,
            } => {
                log::info!(
                    "Round {} crashed at {} (frozen {}), total {}",
                    round,
                    format_percent(*crash_point),
                    format_percent(*discount),
                    format_percent(snapshot.accumulated_discount)
                );
            }
            EngineEvent::CashedOut {
                round,
                discount,
                accumulated,
            } => {
                log::info!(
                    "Round {} cashed out at {}, total {}",
                    round,
                    format_percent(*discount),
                    format_percent(*accumulated)
                );
            }
            EngineEvent::Rearmed { phase } => {
                log::info!("Re-armed into {:?}", phase);
            }
        }
    }
}
