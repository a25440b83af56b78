//! Periodic reconciliation for a [`CycleSession`].
//!
//! While the session is running, a tokio task reconciles it every tick
//! period. The task is torn down whenever the session stops (pause, reset,
//! task switch, phase boundary). Each armed task carries a generation
//! number and only touches the session while that generation is current,
//! so a callback already in flight when it is cancelled cannot mutate
//! state afterwards.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::clock::{Clock, SystemClock};
use crate::events::Event;
use crate::session::CycleSession;
use crate::timer::CycleSnapshot;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(1000);

pub struct CycleDriver<C: Clock = SystemClock> {
    session: Arc<Mutex<CycleSession>>,
    clock: C,
    period: Duration,
    events: mpsc::UnboundedSender<Event>,
    ticker: Option<JoinHandle<()>>,
    generation: Arc<AtomicU64>,
}

fn lock(session: &Mutex<CycleSession>) -> MutexGuard<'_, CycleSession> {
    session.lock().unwrap_or_else(|e| e.into_inner())
}

impl<C: Clock> CycleDriver<C> {
    /// Wrap `session`. Every event the session produces, from commands or
    /// from ticks, is sent to the returned receiver.
    pub fn new(
        session: CycleSession,
        clock: C,
        period: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let driver = Self {
            session: Arc::new(Mutex::new(session)),
            clock,
            period,
            events: tx,
            ticker: None,
            generation: Arc::new(AtomicU64::new(0)),
        };
        (driver, rx)
    }

    pub fn snapshot(&self) -> CycleSnapshot {
        lock(&self.session).snapshot()
    }

    /// Whether a reconciliation callback is currently armed.
    pub fn is_ticking(&self) -> bool {
        self.ticker.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn start(&mut self) {
        self.apply(|s, now| s.start(now));
    }

    pub fn pause(&mut self) {
        self.apply(|s, now| s.pause(now));
    }

    pub fn reset(&mut self) {
        self.apply(|s, now| s.reset_to_focus(now));
    }

    pub fn select_task(&mut self, task_id: &str) {
        self.apply(|s, now| s.select_task(task_id, now));
    }

    pub fn clear_task(&mut self) {
        self.apply(|s, now| s.clear_task(now));
    }

    pub fn task_completed(&mut self, task_id: &str) {
        self.apply(|s, now| s.task_completed(task_id, now));
    }

    pub fn reset_cycle(&mut self) {
        self.apply(|s, now| s.reset_cycle(now));
    }

    /// The host became visible again: reconcile now instead of waiting
    /// for the next tick.
    pub fn on_visible(&mut self) {
        self.apply(|s, now| s.reconcile(now));
    }

    /// Cancel any armed callback.
    pub fn shutdown(&mut self) {
        let session = Arc::clone(&self.session);
        let _guard = lock(&session);
        self.disarm();
    }

    fn apply<F>(&mut self, op: F)
    where
        F: FnOnce(&mut CycleSession, DateTime<Utc>) -> Vec<Event>,
    {
        let session = Arc::clone(&self.session);
        let mut guard = lock(&session);
        let events = op(&mut *guard, self.clock.now());
        for event in events {
            let _ = self.events.send(event);
        }

        // Still holding the session lock: a tick waiting on it will see the
        // new generation before it can reconcile.
        if !guard.is_running() {
            self.disarm();
        } else if !self.is_ticking() {
            self.arm();
        }
    }

    fn disarm(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }

    fn arm(&mut self) {
        self.disarm();
        let generation = self.generation.load(Ordering::SeqCst);
        let current = Arc::clone(&self.generation);
        let session = Arc::clone(&self.session);
        let clock = self.clock.clone();
        let events = self.events.clone();
        let period = self.period;

        tracing::debug!(generation, period_ms = period.as_millis() as u64, "reconcile timer armed");
        self.ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                let mut guard = lock(&session);
                if current.load(Ordering::SeqCst) != generation {
                    return;
                }
                for event in guard.reconcile(clock.now()) {
                    let _ = events.send(event);
                }
                if !guard.is_running() {
                    return;
                }
            }
        }));
    }
}

impl<C: Clock> Drop for CycleDriver<C> {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::fatigue::FatigueConfig;
    use crate::timer::{CycleDurations, TimerMode};

    fn driver(clock: &FakeClock) -> (CycleDriver<FakeClock>, mpsc::UnboundedReceiver<Event>) {
        let session = CycleSession::new(CycleDurations::new(5, 3, 7, 4), FatigueConfig::default());
        CycleDriver::new(session, clock.clone(), DEFAULT_TICK_INTERVAL)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Event>) -> Vec<Event> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    /// Step half a period past the armed interval so test wakeups never
    /// coincide with ticks.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    /// Advance both clocks together, one second at a time.
    async fn run_for(clock: &FakeClock, secs: u64) {
        for _ in 0..secs {
            clock.advance_secs(1);
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_count_down_and_stop_at_boundary() {
        let clock = FakeClock::new();
        let (mut driver, mut rx) = driver(&clock);
        driver.start();
        assert!(driver.is_ticking());
        settle().await;

        run_for(&clock, 2).await;
        assert_eq!(driver.snapshot().seconds_left, 3);

        run_for(&clock, 4).await;
        let snap = driver.snapshot();
        assert_eq!(snap.mode, TimerMode::ShortBreak);
        assert!(!snap.is_running);
        assert!(!driver.is_ticking());

        let events = drain(&mut rx);
        assert!(matches!(events.first(), Some(Event::TimerStarted { .. })));
        let completions = events
            .iter()
            .filter(|e| matches!(e, Event::PhaseCompleted { .. }))
            .count();
        assert_eq!(completions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_cancels_ticker() {
        let clock = FakeClock::new();
        let (mut driver, mut rx) = driver(&clock);
        driver.start();
        settle().await;
        run_for(&clock, 1).await;
        driver.pause();
        assert!(!driver.is_ticking());

        run_for(&clock, 30).await;
        assert_eq!(driver.snapshot().seconds_left, 4);
        let events = drain(&mut rx);
        assert!(matches!(events.last(), Some(Event::TimerPaused { seconds_left: 4, .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn visible_reconciles_immediately() {
        let clock = FakeClock::new();
        let (mut driver, _rx) = driver(&clock);
        driver.start();
        // Host was hidden: wall clock jumps, no ticks ran.
        clock.advance_secs(3);
        driver.on_visible();
        assert_eq!(driver.snapshot().seconds_left, 2);
        assert!(driver.is_ticking());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_after_boundary_rearms() {
        let clock = FakeClock::new();
        let (mut driver, _rx) = driver(&clock);
        driver.start();
        settle().await;
        run_for(&clock, 6).await;
        assert!(!driver.is_ticking());

        driver.start();
        assert!(driver.is_ticking());
        settle().await;
        run_for(&clock, 4).await;
        assert_eq!(driver.snapshot().mode, TimerMode::Focus);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_start_pause_leaves_no_orphans() {
        let clock = FakeClock::new();
        let (mut driver, _rx) = driver(&clock);
        for _ in 0..10 {
            driver.start();
            driver.pause();
        }
        assert!(!driver.is_ticking());
        driver.shutdown();
        run_for(&clock, 10).await;
        assert_eq!(driver.snapshot().seconds_left, 5);
    }
}
