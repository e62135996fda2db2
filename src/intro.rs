//! Intro splash sequencing.
//!
//! The splash screen shows for a fixed wait (the sum of the four animation
//! phases in [`IntroConfig`]), fades out for the exit-animation duration,
//! then navigates to the configured login path. The two waits are strictly
//! sequential: the exit wait is scheduled only after the intro wait has
//! fired.
//!
//! The timeline is an explicit state machine
//! (`Idle → Waiting → FadingOut → Navigated`) driven by a single scheduler
//! primitive (`tokio::time::sleep`). Side effects go through the
//! [`IntroEffects`] trait so the timing contract is testable, and a
//! cancellable variant stops cleanly between phases when the viewer leaves
//! early.
//!
//! Guarantees: at most one navigation per run, no retry, and independent
//! runs share no state.

use tokio::sync::watch;
use tokio::time::{sleep, Duration};

use crate::config::IntroConfig;

/// Where a sequence currently is on its timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Waiting,
    FadingOut,
    Navigated,
}

/// Side effects the sequence performs: marking the page for its exit
/// animation and the final navigation.
pub trait IntroEffects {
    fn apply_exit_state(&mut self);
    fn navigate(&mut self, path: &str);
}

/// A single splash-to-login timeline.
pub struct IntroSequence {
    config: IntroConfig,
    phase: Phase,
}

impl IntroSequence {
    pub fn new(config: IntroConfig) -> Self {
        Self {
            config,
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Run the timeline to completion.
    pub async fn run<E: IntroEffects>(&mut self, effects: &mut E) {
        // Sender stays alive until the run finishes, so the stop channel
        // never fires.
        let (_tx, rx) = watch::channel(false);
        let _ = self.run_cancellable(effects, rx).await;
    }

    /// Run the timeline, stopping between phases when `stop` flips to true.
    /// Returns `true` when navigation happened, `false` when cancelled.
    pub async fn run_cancellable<E: IntroEffects>(
        &mut self,
        effects: &mut E,
        mut stop: watch::Receiver<bool>,
    ) -> bool {
        debug_assert_eq!(self.phase, Phase::Idle);

        self.phase = Phase::Waiting;
        if !wait_or_stop(self.config.intro_wait_ms(), &mut stop).await {
            return false;
        }

        effects.apply_exit_state();
        self.phase = Phase::FadingOut;
        if !wait_or_stop(self.config.exit_anim_ms, &mut stop).await {
            return false;
        }

        effects.navigate(&self.config.redirect_path);
        self.phase = Phase::Navigated;
        true
    }
}

/// Sleep for `ms`, returning false if the stop signal fires first.
async fn wait_or_stop(ms: u64, stop: &mut watch::Receiver<bool>) -> bool {
    if *stop.borrow() {
        return false;
    }
    tokio::select! {
        _ = sleep(Duration::from_millis(ms)) => true,
        changed = stop.changed() => {
            match changed {
                Ok(()) => !*stop.borrow(),
                // Sender dropped: nobody can cancel any more, keep going.
                Err(_) => {
                    sleep(Duration::from_millis(ms)).await;
                    true
                }
            }
        }
    }
}
