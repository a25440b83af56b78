//! A cycle session: one engine, one detector, and the collaborators
//! they report to.
//!
//! The session is the explicitly owned replacement for an app-wide timer
//! context. Whoever drives it (the CLI loop, [`crate::CycleDriver`], a
//! GUI bridge) passes in `now` and gets back the events the call produced.

use chrono::{DateTime, Utc};

use crate::events::Event;
use crate::fatigue::{FatigueConfig, FatigueSignal, OverworkDetector};
use crate::hooks::{FatigueSink, Noop, OverworkLog, SessionEmitter, TaskLookup, TaskProgressUpdater};
use crate::timer::{CompletedPomodoro, CycleDurations, CycleEngine, CycleSnapshot, TimerMode};

pub struct CycleSession {
    engine: CycleEngine,
    detector: OverworkDetector,
    sessions: Box<dyn SessionEmitter>,
    progress: Box<dyn TaskProgressUpdater>,
    fatigue_sink: Box<dyn FatigueSink>,
    overwork_log: Box<dyn OverworkLog>,
    tasks: Box<dyn TaskLookup + Send>,
}

impl CycleSession {
    /// A session with every collaborator stubbed out.
    pub fn new(durations: CycleDurations, fatigue: FatigueConfig) -> Self {
        Self {
            engine: CycleEngine::new(durations),
            detector: OverworkDetector::new(fatigue),
            sessions: Box::new(Noop),
            progress: Box::new(Noop),
            fatigue_sink: Box::new(Noop),
            overwork_log: Box::new(Noop),
            tasks: Box::new(Noop),
        }
    }

    pub fn with_session_emitter(mut self, emitter: impl SessionEmitter + 'static) -> Self {
        self.sessions = Box::new(emitter);
        self
    }

    pub fn with_progress_updater(mut self, updater: impl TaskProgressUpdater + 'static) -> Self {
        self.progress = Box::new(updater);
        self
    }

    pub fn with_fatigue_sink(mut self, sink: impl FatigueSink + 'static) -> Self {
        self.fatigue_sink = Box::new(sink);
        self
    }

    pub fn with_overwork_log(mut self, log: impl OverworkLog + 'static) -> Self {
        self.overwork_log = Box::new(log);
        self
    }

    pub fn with_task_lookup(mut self, tasks: impl TaskLookup + Send + 'static) -> Self {
        self.tasks = Box::new(tasks);
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn engine(&self) -> &CycleEngine {
        &self.engine
    }

    pub fn detector(&self) -> &OverworkDetector {
        &self.detector
    }

    pub fn snapshot(&self) -> CycleSnapshot {
        self.engine.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.engine.is_running()
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        let mut events = Vec::new();
        if self.engine.start(now) {
            events.push(Event::TimerStarted {
                mode: self.engine.mode(),
                seconds_left: self.engine.seconds_left(),
                at: now,
            });
        }
        self.observe(0, now, &mut events);
        events
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        let mut events = Vec::new();
        if self.engine.pause() {
            events.push(Event::TimerPaused {
                seconds_left: self.engine.seconds_left(),
                at: now,
            });
        }
        self.observe(0, now, &mut events);
        events
    }

    pub fn reset(&mut self, to_duration: u64, now: DateTime<Utc>) -> Vec<Event> {
        self.engine.reset(to_duration);
        let mut events = vec![Event::TimerReset {
            seconds_left: self.engine.seconds_left(),
            at: now,
        }];
        self.observe(0, now, &mut events);
        events
    }

    /// Manual reset to a full focus phase.
    pub fn reset_to_focus(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        let focus = self.engine.durations().focus_secs;
        self.reset(focus, now)
    }

    /// Apply elapsed time. Safe to call at any rate and from any trigger.
    pub fn reconcile(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        let step = self.engine.reconcile(now);
        let mut events = Vec::new();

        if let Some(pomodoro) = &step.pomodoro {
            self.dispatch_pomodoro(pomodoro);
        }
        if let Some(completion) = step.completion {
            events.push(Event::PhaseCompleted {
                completed: completion.completed,
                next: completion.next,
                pomodoros_done_in_cycle: completion.pomodoros_done_in_cycle,
                prompt: self.engine.snapshot().transition_prompt().to_string(),
                at: now,
            });
        }

        self.observe(step.elapsed_secs, now, &mut events);
        events
    }

    /// Bind an active task. Unknown or completed tasks are silently
    /// ignored and produce no events.
    pub fn select_task(&mut self, task_id: &str, now: DateTime<Utc>) -> Vec<Event> {
        let mut events = Vec::new();
        if !self.engine.select_task(task_id, self.tasks.as_ref()) {
            return events;
        }
        events.push(Event::TaskSelected {
            task_id: task_id.to_string(),
            at: now,
        });
        events.push(Event::TimerReset {
            seconds_left: self.engine.seconds_left(),
            at: now,
        });
        self.observe(0, now, &mut events);
        events
    }

    pub fn clear_task(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        match self.engine.clear_task() {
            Some(task_id) => vec![Event::TaskCleared { task_id, at: now }],
            None => Vec::new(),
        }
    }

    /// The user marked `task_id` as done outside the timer. If it is the
    /// selected task, drop it and go back to a fresh focus phase.
    pub fn task_completed(&mut self, task_id: &str, now: DateTime<Utc>) -> Vec<Event> {
        if self.engine.selected_task() != Some(task_id) {
            return Vec::new();
        }
        let mut events = self.clear_task(now);
        events.extend(self.reset_to_focus(now));
        events
    }

    /// Start a new cycle window.
    pub fn reset_cycle(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        let mut events = Vec::new();
        if self.engine.reset_cycle() {
            events.push(Event::CycleReset { at: now });
        }
        self.observe(0, now, &mut events);
        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn dispatch_pomodoro(&mut self, pomodoro: &CompletedPomodoro) {
        let task_id = pomodoro.task_id.as_deref();
        if let Err(e) =
            self.sessions
                .record_completed_session(task_id, pomodoro.duration_minutes, TimerMode::Focus)
        {
            tracing::warn!(error = %e, "failed to record completed session");
        }
        if let Some(task_id) = task_id {
            if let Err(e) = self.progress.increment_task_progress(task_id) {
                tracing::warn!(error = %e, task_id, "failed to update task progress");
            }
        }
    }

    fn observe(&mut self, elapsed_secs: u64, now: DateTime<Utc>, events: &mut Vec<Event>) {
        let snapshot = self.engine.snapshot();
        for signal in self.detector.observe(&snapshot, elapsed_secs, now) {
            self.dispatch_fatigue(&signal);
            events.push(Event::FatigueDetected {
                rule: signal.rule,
                message: signal.rule.recommendation().message.to_string(),
                at: signal.detected_at,
            });
        }
    }

    fn dispatch_fatigue(&mut self, signal: &FatigueSignal) {
        self.fatigue_sink.on_fatigue_detected(signal);
        if !self.detector.config().log_events {
            return;
        }
        let notes = signal.rule.recommendation().message;
        if let Err(e) = self.overwork_log.log_overwork_event(signal.rule, notes) {
            tracing::warn!(error = %e, rule = signal.rule.code(), "failed to log overwork event");
        }
    }
}

impl std::fmt::Debug for CycleSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CycleSession")
            .field("engine", &self.engine)
            .field("detector", &self.detector)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fatigue::FatigueRule;
    use crate::hooks::HookResult;
    use crate::task::{TaskCategory, TaskRecord};
    use chrono::Duration;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder {
        sessions: Arc<Mutex<Vec<(Option<String>, u64)>>>,
        progress: Arc<Mutex<Vec<String>>>,
        signals: Arc<Mutex<Vec<FatigueRule>>>,
        overwork: Arc<Mutex<Vec<FatigueRule>>>,
        fail: bool,
    }

    impl SessionEmitter for Recorder {
        fn record_completed_session(
            &mut self,
            task_id: Option<&str>,
            minutes: u64,
            _: TimerMode,
        ) -> HookResult {
            self.sessions.lock().unwrap().push((task_id.map(String::from), minutes));
            if self.fail {
                return Err("offline".into());
            }
            Ok(())
        }
    }

    impl TaskProgressUpdater for Recorder {
        fn increment_task_progress(&mut self, task_id: &str) -> HookResult {
            self.progress.lock().unwrap().push(task_id.to_string());
            if self.fail {
                return Err("offline".into());
            }
            Ok(())
        }
    }

    impl FatigueSink for Recorder {
        fn on_fatigue_detected(&mut self, signal: &FatigueSignal) {
            self.signals.lock().unwrap().push(signal.rule);
        }
    }

    impl OverworkLog for Recorder {
        fn log_overwork_event(&mut self, rule: FatigueRule, _notes: &str) -> HookResult {
            self.overwork.lock().unwrap().push(rule);
            if self.fail {
                return Err("offline".into());
            }
            Ok(())
        }
    }

    fn session_with(recorder: &Recorder, tasks: Vec<TaskRecord>) -> CycleSession {
        CycleSession::new(CycleDurations::new(5, 3, 7, 4), FatigueConfig::default())
            .with_session_emitter(recorder.clone())
            .with_progress_updater(recorder.clone())
            .with_fatigue_sink(recorder.clone())
            .with_overwork_log(recorder.clone())
            .with_task_lookup(tasks)
    }

    fn run_focus(session: &mut CycleSession, now: &mut DateTime<Utc>) -> Vec<Event> {
        session.start(*now);
        *now += Duration::seconds(5);
        session.reconcile(*now)
    }

    fn run_break(session: &mut CycleSession, now: &mut DateTime<Utc>) {
        session.start(*now);
        *now += Duration::seconds(10);
        session.reconcile(*now);
    }

    #[test]
    fn focus_completion_notifies_collaborators() {
        let recorder = Recorder::default();
        let task = TaskRecord::new("Essay", TaskCategory::Study, 4).unwrap();
        let mut session = session_with(&recorder, vec![task.clone()]);
        let mut now = Utc::now();

        session.select_task(&task.id, now);
        let events = run_focus(&mut session, &mut now);

        assert!(matches!(
            events.as_slice(),
            [Event::PhaseCompleted { next: TimerMode::ShortBreak, .. }]
        ));
        assert_eq!(
            recorder.sessions.lock().unwrap().as_slice(),
            &[(Some(task.id.clone()), 0)]
        );
        assert_eq!(recorder.progress.lock().unwrap().as_slice(), &[task.id]);
    }

    #[test]
    fn no_task_means_no_progress_update() {
        let recorder = Recorder::default();
        let mut session = session_with(&recorder, Vec::new());
        let mut now = Utc::now();
        run_focus(&mut session, &mut now);
        assert_eq!(recorder.sessions.lock().unwrap().len(), 1);
        assert!(recorder.progress.lock().unwrap().is_empty());
    }

    #[test]
    fn collaborator_failure_does_not_roll_back() {
        let recorder = Recorder {
            fail: true,
            ..Recorder::default()
        };
        let task = TaskRecord::new("Essay", TaskCategory::Study, 4).unwrap();
        let mut session = session_with(&recorder, vec![task.clone()]);
        let mut now = Utc::now();
        session.select_task(&task.id, now);
        run_focus(&mut session, &mut now);
        assert_eq!(session.engine().mode(), TimerMode::ShortBreak);
        assert_eq!(session.engine().pomodoros_done_in_cycle(), 1);
    }

    #[test]
    fn fourth_pomodoro_reaches_long_break_and_fatigue() {
        let recorder = Recorder::default();
        let mut session = session_with(&recorder, Vec::new());
        let mut now = Utc::now();

        for _ in 0..3 {
            run_focus(&mut session, &mut now);
            assert_eq!(session.engine().mode(), TimerMode::ShortBreak);
            run_break(&mut session, &mut now);
        }
        let events = run_focus(&mut session, &mut now);

        assert_eq!(session.engine().mode(), TimerMode::LongBreak);
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::FatigueDetected { rule: FatigueRule::PomodoroCycle, .. })));
        assert_eq!(recorder.signals.lock().unwrap().as_slice(), &[FatigueRule::PomodoroCycle]);
        assert_eq!(recorder.overwork.lock().unwrap().as_slice(), &[FatigueRule::PomodoroCycle]);
    }

    #[test]
    fn overwork_logging_can_be_disabled() {
        let recorder = Recorder::default();
        let mut session = CycleSession::new(
            CycleDurations::new(5, 3, 7, 1),
            FatigueConfig {
                log_events: false,
                ..FatigueConfig::default()
            },
        )
        .with_fatigue_sink(recorder.clone())
        .with_overwork_log(recorder.clone());
        let mut now = Utc::now();
        run_focus(&mut session, &mut now);
        assert_eq!(recorder.signals.lock().unwrap().len(), 1);
        assert!(recorder.overwork.lock().unwrap().is_empty());
    }

    #[test]
    fn task_completed_clears_selection_and_resets() {
        let task = TaskRecord::new("Essay", TaskCategory::Study, 4).unwrap();
        let mut session = session_with(&Recorder::default(), vec![task.clone()]);
        let now = Utc::now();
        session.select_task(&task.id, now);
        session.start(now);
        session.reconcile(now + Duration::seconds(2));

        assert!(session.task_completed("someone-else", now).is_empty());
        let events = session.task_completed(&task.id, now);
        assert!(matches!(events.first(), Some(Event::TaskCleared { .. })));
        assert!(session.engine().selected_task().is_none());
        assert!(!session.is_running());
        assert_eq!(session.engine().seconds_left(), 5);
    }

    #[test]
    fn ignored_selection_emits_nothing() {
        let mut session = session_with(&Recorder::default(), Vec::new());
        assert!(session.select_task("nope", Utc::now()).is_empty());
    }

    #[test]
    fn fatigue_sink_accepts_closures() {
        let seen = Arc::new(Mutex::new(0));
        let counter = seen.clone();
        let mut session =
            CycleSession::new(CycleDurations::new(5, 3, 7, 1), FatigueConfig::default())
                .with_fatigue_sink(move |_: &FatigueSignal| *counter.lock().unwrap() += 1);
        let mut now = Utc::now();
        run_focus(&mut session, &mut now);
        assert_eq!(*seen.lock().unwrap(), 1);
    }
}
