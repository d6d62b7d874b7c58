#![deny(missing_docs)]
//! Countdown/Timeout Coordinator — the wall-clock deadline that races a
//! player's input after a Phase-B result is emitted.
//!
//! Exactly one of `PlayerInput`/`Deadline` is ever delivered per
//! countdown, enforced structurally by [`engine_core::ResolveOnce`]
//! rather than by "disable the button in the callback" discipline. A
//! concurrent progress-tick stream is purely cosmetic — it is never
//! consulted to decide the winner.

use std::sync::Arc;
use std::time::Duration;

use engine_core::{DurationMs, ResolveOnce};
use tokio::sync::{watch, Notify};

/// The outcome of one countdown race.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountdownOutcome {
    /// The player answered before the deadline. Carries the choice text.
    PlayerInput(String),
    /// The deadline elapsed with no player input.
    Deadline,
    /// Neither event fired — an explicit cancel (Restart, or a caller
    /// tearing the countdown down early) resolved the race as a no-op.
    Cancelled,
}

/// Coarse progress signal for a UI progress bar. Has no bearing on
/// resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CountdownProgress {
    /// Time elapsed since the countdown started.
    pub elapsed: Duration,
    /// The countdown's total deadline duration.
    pub total: Duration,
}

/// One countdown instance: a deadline race between player input and a
/// timer, with at most one delivered resolution.
pub struct Countdown {
    deadline: Duration,
    resolved: ResolveOnce<CountdownOutcome>,
    notify: Notify,
    progress_tx: watch::Sender<CountdownProgress>,
}

impl Countdown {
    /// Start a new countdown with deadline `D`.
    pub fn new(deadline: DurationMs) -> Arc<Self> {
        let total = deadline.to_std();
        let (progress_tx, _rx) = watch::channel(CountdownProgress {
            elapsed: Duration::ZERO,
            total,
        });
        Arc::new(Self {
            deadline: total,
            resolved: ResolveOnce::new(),
            notify: Notify::new(),
            progress_tx,
        })
    }

    /// Subscribe to the coarse progress-tick stream (updated roughly once
    /// a second). Purely cosmetic.
    pub fn progress(&self) -> watch::Receiver<CountdownProgress> {
        self.progress_tx.subscribe()
    }

    /// Resolve the countdown with player input, if it has not already
    /// been resolved by the deadline (or a concurrent input / cancel).
    /// Returns whether this call won the race.
    pub fn resolve_player_input(&self, choice: impl Into<String>) -> bool {
        let won = self
            .resolved
            .try_resolve(CountdownOutcome::PlayerInput(choice.into()))
            .is_some();
        self.notify.notify_waiters();
        won
    }

    /// Resolve the countdown as cancelled (Restart, or explicit teardown).
    /// Neither `PlayerInput` nor `Deadline` is delivered to [`Countdown::race`].
    pub fn cancel(&self) -> bool {
        let won = self.resolved.try_resolve(CountdownOutcome::Cancelled).is_some();
        self.notify.notify_waiters();
        won
    }

    /// Race the deadline against player input (or cancellation), emitting
    /// progress ticks roughly every second. Resolves exactly once.
    pub async fn race(self: &Arc<Self>) -> CountdownOutcome {
        if let Some(outcome) = self.resolved.winner() {
            return outcome;
        }

        let sleep = tokio::time::sleep(self.deadline);
        tokio::pin!(sleep);
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let started = tokio::time::Instant::now();

        loop {
            tokio::select! {
                biased;
                _ = &mut sleep => {
                    if let Some(outcome) = self.resolved.try_resolve(CountdownOutcome::Deadline) {
                        tracing::debug!("engine.countdown.resolve deadline");
                        return outcome;
                    }
                    return self.resolved.winner().expect("resolved by a concurrent caller");
                }
                _ = self.notify.notified() => {
                    if let Some(outcome) = self.resolved.winner() {
                        tracing::debug!(?outcome, "engine.countdown.resolve notified");
                        return outcome;
                    }
                }
                _ = ticker.tick() => {
                    let _ = self.progress_tx.send(CountdownProgress {
                        elapsed: started.elapsed(),
                        total: self.deadline,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc as StdArc;

    #[tokio::test(start_paused = true)]
    async fn deadline_wins_when_nobody_answers() {
        let countdown = Countdown::new(DurationMs::from_millis(50));
        let outcome = countdown.race().await;
        assert_eq!(outcome, CountdownOutcome::Deadline);
    }

    #[tokio::test(start_paused = true)]
    async fn player_input_wins_when_it_arrives_first() {
        let countdown = Countdown::new(DurationMs::from_secs(15));
        let race_handle = {
            let countdown = StdArc::clone(&countdown);
            tokio::spawn(async move { countdown.race().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        let won = countdown.resolve_player_input("Sprint");
        assert!(won);

        let outcome = race_handle.await.unwrap();
        assert_eq!(outcome, CountdownOutcome::PlayerInput("Sprint".to_string()));
    }

    #[tokio::test]
    async fn exactly_one_event_delivered_under_contention() {
        // A race between resolve_player_input and cancel: exactly one wins,
        // and it is visible to every caller via `winner()`.
        let countdown = Countdown::new(DurationMs::from_secs(30));
        let a = StdArc::clone(&countdown);
        let b = StdArc::clone(&countdown);

        let h1 = tokio::spawn(async move { a.resolve_player_input("choice") });
        let h2 = tokio::spawn(async move { b.cancel() });

        let (r1, r2) = tokio::join!(h1, h2);
        let wins = [r1.unwrap(), r2.unwrap()].into_iter().filter(|w| *w).count();
        assert_eq!(wins, 1);
        assert!(countdown.resolved.is_resolved());
    }

    #[tokio::test]
    async fn resolve_player_input_after_deadline_loses() {
        let countdown = Countdown::new(DurationMs::from_millis(10));
        let outcome = countdown.race().await;
        assert_eq!(outcome, CountdownOutcome::Deadline);

        let won = countdown.resolve_player_input("too late");
        assert!(!won);
    }

    #[tokio::test]
    async fn cancel_resolves_with_neither_event_as_a_no_op() {
        let countdown = Countdown::new(DurationMs::from_secs(30));
        assert!(countdown.cancel());
        let outcome = countdown.resolved.winner().unwrap();
        assert_eq!(outcome, CountdownOutcome::Cancelled);
    }
}
