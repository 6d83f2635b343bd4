//! Motion loop
//!
//! Polls the engine as fast as the executor allows and runs operator
//! commands between ticks, so the engine is only ever touched from here.

use defmt::*;
use embassy_futures::yield_now;
use embassy_time::Instant;

use winder_core::state::State;
use winder_core::{handle_line, Winder};

use crate::board::{HomeSwitch, Steppers};
use crate::channels::{Reply, LINE_CHANNEL, REPLY_CHANNEL};
use crate::storage::FlashSettings;

/// Motion task - owns the engine, the settings storage and the motor pins
#[embassy_executor::task]
pub async fn motion_task(
    mut winder: Winder,
    mut storage: FlashSettings,
    mut steppers: Steppers,
    mut home: HomeSwitch,
) {
    info!("Motion task started");

    let mut reply = Reply::new();

    loop {
        let now = Instant::now();
        winder.tick(now.as_micros(), &mut steppers, &mut home);

        if let Ok(line) = LINE_CHANNEL.try_receive() {
            reply.clear();
            match handle_line(&mut winder, &mut storage, &line, now.as_millis(), &mut reply) {
                Ok(()) => debug!("Command: {}", line.as_str()),
                Err(e) => warn!("Command rejected: {} ({})", line.as_str(), e),
            }
            if REPLY_CHANNEL.try_send(core::mem::take(&mut reply)).is_err() {
                warn!("Reply channel full, dropping reply");
            }
        }

        while let Some(transition) = winder.take_transition() {
            info!(
                "State {} -> {} on {}",
                transition.from.name(),
                transition.to.name(),
                transition.event
            );
            if let State::Error(kind) = transition.to {
                error!("Fault: {}", kind.as_token());
            }
        }

        yield_now().await;
    }
}
