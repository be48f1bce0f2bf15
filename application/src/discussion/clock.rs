//! Turn clock
//!
//! Turns the orchestrator's [`ClockDirective`]s into tokio timers. Each
//! arming gets its own [`CancellationToken`]; re-arming or disarming cancels
//! every timer of the previous arming. A timer that fires reports back to the
//! worker with the generation it was armed with, so a timeout that raced a
//! re-arm is recognised as stale by the orchestrator.

use super::command::Command;
use colloquy_domain::{ClockArm, ClockDirective, TimeoutKind};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

pub struct TurnClock {
    /// Weak so pending timers never keep a finished worker's channel open
    commands: mpsc::WeakSender<Command>,
    armed: Option<(u64, CancellationToken)>,
}

impl TurnClock {
    pub fn new(commands: mpsc::WeakSender<Command>) -> Self {
        Self {
            commands,
            armed: None,
        }
    }

    pub fn apply(&mut self, directive: ClockDirective) {
        match directive {
            ClockDirective::Unchanged => {}
            ClockDirective::Disarm => self.disarm(),
            ClockDirective::Arm(arm) => self.arm(arm),
        }
    }

    /// Generation of the live arming, if any timer is pending.
    pub fn armed_generation(&self) -> Option<u64> {
        self.armed.as_ref().map(|(generation, _)| *generation)
    }

    pub fn disarm(&mut self) {
        if let Some((generation, token)) = self.armed.take() {
            trace!(generation, "Disarming turn clock");
            token.cancel();
        }
    }

    fn arm(&mut self, arm: ClockArm) {
        self.disarm();
        if arm.is_idle() {
            return;
        }

        let token = CancellationToken::new();
        let timers = [
            (TimeoutKind::Turn, arm.turn_in),
            (TimeoutKind::Response, arm.response_in),
        ];
        for (kind, delay) in timers {
            if let Some(delay) = delay {
                tokio::spawn(fire(
                    kind,
                    delay,
                    arm.generation,
                    token.clone(),
                    self.commands.clone(),
                ));
            }
        }
        debug!(
            generation = arm.generation,
            turn_in = ?arm.turn_in,
            response_in = ?arm.response_in,
            "Turn clock armed"
        );
        self.armed = Some((arm.generation, token));
    }
}

impl Drop for TurnClock {
    fn drop(&mut self) {
        self.disarm();
    }
}

async fn fire(
    kind: TimeoutKind,
    delay: Duration,
    generation: u64,
    token: CancellationToken,
    commands: mpsc::WeakSender<Command>,
) {
    tokio::select! {
        _ = token.cancelled() => {}
        _ = tokio::time::sleep(delay) => {
            let Some(tx) = commands.upgrade() else {
                return;
            };
            if tx.send(Command::Timeout { kind, generation }).await.is_err() {
                trace!(%kind, generation, "Worker gone before timeout was delivered");
            }
        }
    }
}
