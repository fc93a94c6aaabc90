use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How often the background thread checks for expiry
const TICK: Duration = Duration::from_millis(100);

/// Countdown state shared between the ticker thread and callers
#[derive(Debug)]
struct TimerState {
    /// Seconds remaining as of the last freeze point
    frozen: u64,
    /// Set while running; wall-clock time since this instant counts down from `frozen`
    started_at: Option<Instant>,
}

impl TimerState {
    fn remaining(&self) -> u64 {
        match self.started_at {
            Some(at) => self.frozen.saturating_sub(at.elapsed().as_secs()),
            None => self.frozen,
        }
    }

    /// Fold elapsed time into `frozen` and stop counting
    fn freeze(&mut self) {
        if let Some(at) = self.started_at.take() {
            self.frozen = self.frozen.saturating_sub(at.elapsed().as_secs());
        }
    }
}

/// A pausable countdown timer.
///
/// The countdown itself is derived from wall-clock instants, so reads are
/// exact regardless of scheduling. A background thread watches for expiry
/// so the countdown self-terminates at zero; it is joined on drop, and all
/// shared state sits behind a mutex so `remaining_seconds` and `pause`
/// are safe to call from a different thread than the ticker.
#[derive(Debug)]
pub struct Timer {
    initial: u64,
    state: Arc<Mutex<TimerState>>,
    shutdown: Arc<AtomicBool>,
    ticker: Option<JoinHandle<()>>,
}

impl Timer {
    /// Construct with a full countdown, not yet running
    pub fn new(seconds: u64) -> Self {
        Self {
            initial: seconds,
            state: Arc::new(Mutex::new(TimerState {
                frozen: seconds,
                started_at: None,
            })),
            shutdown: Arc::new(AtomicBool::new(false)),
            ticker: None,
        }
    }

    /// Begin (or continue) the countdown.
    ///
    /// Calling `start` while already running is a no-op, not a reset:
    /// remaining time is never restored to the initial value. Starting an
    /// expired timer does nothing.
    pub fn start(&mut self) {
        {
            let mut state = self.state.lock().unwrap();
            if state.started_at.is_some() || state.frozen == 0 {
                return;
            }
            state.started_at = Some(Instant::now());
        }
        if self.ticker.is_none() {
            let state = Arc::clone(&self.state);
            let shutdown = Arc::clone(&self.shutdown);
            self.ticker = Some(thread::spawn(move || loop {
                thread::sleep(TICK);
                if shutdown.load(Ordering::Relaxed) {
                    return;
                }
                let mut state = state.lock().unwrap();
                if state.remaining() == 0 {
                    state.freeze();
                    state.frozen = 0;
                    return;
                }
            }));
        }
    }

    /// Freeze the countdown at its current value. No-op while paused.
    pub fn pause(&self) {
        self.state.lock().unwrap().freeze();
    }

    /// Continue counting down from the frozen value. No-op while running
    /// or once expired.
    pub fn resume(&mut self) {
        self.start();
    }

    /// Seconds remaining, clamped at zero
    pub fn remaining_seconds(&self) -> u64 {
        self.state.lock().unwrap().remaining()
    }

    pub fn is_expired(&self) -> bool {
        self.remaining_seconds() == 0
    }

    pub fn is_running(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.started_at.is_some() && state.remaining() > 0
    }

    pub fn initial_seconds(&self) -> u64 {
        self.initial
    }

    /// Freeze the countdown and shut the ticker thread down
    pub fn stop(&mut self) {
        self.pause();
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.ticker.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.ticker.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_timer_is_frozen_at_initial() {
        let timer = Timer::new(1800);
        assert_eq!(timer.remaining_seconds(), 1800);
        assert_eq!(timer.initial_seconds(), 1800);
        assert!(!timer.is_running());
        assert!(!timer.is_expired());
    }

    #[test]
    fn test_start_is_idempotent_not_a_reset() {
        let mut timer = Timer::new(10);
        timer.start();
        thread::sleep(Duration::from_millis(1200));
        timer.start();
        // A second start must not restore the initial value
        assert!(timer.remaining_seconds() < 10);
        assert!(timer.is_running());
    }

    #[test]
    fn test_pause_resume_arithmetic() {
        let mut timer = Timer::new(10);
        timer.start();
        thread::sleep(Duration::from_millis(1200));
        timer.pause();
        let after_pause = timer.remaining_seconds();
        assert!(after_pause >= 8 && after_pause < 10);

        // Frozen value holds while paused
        thread::sleep(Duration::from_millis(300));
        assert_eq!(timer.remaining_seconds(), after_pause);
        timer.pause(); // no-op while paused
        assert_eq!(timer.remaining_seconds(), after_pause);

        timer.resume();
        timer.resume(); // no-op while running
        thread::sleep(Duration::from_millis(1200));
        let after_resume = timer.remaining_seconds();
        assert!(after_resume < after_pause);
        assert!(after_resume >= after_pause.saturating_sub(2));
    }

    #[test]
    fn test_expires_and_self_terminates() {
        let mut timer = Timer::new(1);
        timer.start();
        thread::sleep(Duration::from_millis(1500));
        assert!(timer.is_expired());
        assert!(!timer.is_running());
        assert_eq!(timer.remaining_seconds(), 0);

        // Neither start nor resume revives an expired countdown
        timer.start();
        timer.resume();
        assert!(!timer.is_running());
    }

    #[test]
    fn test_zero_timer_never_runs() {
        let mut timer = Timer::new(0);
        assert!(timer.is_expired());
        timer.start();
        assert!(!timer.is_running());
    }

    #[test]
    fn test_stop_joins_ticker() {
        let mut timer = Timer::new(30);
        timer.start();
        timer.stop();
        assert!(!timer.is_running());
        let frozen = timer.remaining_seconds();
        thread::sleep(Duration::from_millis(200));
        assert_eq!(timer.remaining_seconds(), frozen);
    }
}
