//! Production task definitions.
//!
//! Each submodule owns one task: its name, default cadence, selection,
//! retry policy, and processor. [`register_all`] assembles the full set at
//! process startup.

mod candles;
mod exchange_rates;
mod pin_media;
mod rarity;

use std::sync::Arc;

use primemkt_core::CandleInterval;
use primemkt_oracle::OracleClient;
use primemkt_pinner::PinClient;

use crate::error::JobError;
use crate::registry::SchedulerRegistry;

/// External-service clients and tuning shared by the task constructors.
pub struct TaskContext {
    pub oracle: Arc<OracleClient>,
    pub pinner: Arc<PinClient>,
    pub batch_size: i64,
}

/// Registers every production task: media pinning, exchange-rate polling,
/// rarity recomputation, and one candle aggregation task per interval.
///
/// # Errors
///
/// Returns [`JobError`] if any definition fails registration — a
/// configuration error that is fatal at startup.
pub fn register_all(registry: &mut SchedulerRegistry, ctx: &TaskContext) -> Result<(), JobError> {
    registry.register(pin_media::definition(Arc::clone(&ctx.pinner), ctx.batch_size))?;
    registry.register(exchange_rates::definition(
        Arc::clone(&ctx.oracle),
        ctx.batch_size,
    ))?;
    registry.register(rarity::definition(ctx.batch_size))?;
    for interval in CandleInterval::all() {
        registry.register(candles::definition(interval, ctx.batch_size))?;
    }
    Ok(())
}
