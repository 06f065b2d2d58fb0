//! Debounced, composition-aware search input.
//!
//! Raw keystrokes become committed search terms only after the input has been
//! quiet for the debounce delay. While an input method is composing (for
//! example assembling Hangul or kana), nothing is emitted; the term is
//! scheduled once composition ends. Clearing emits the empty term at once.
//!
//! [`SearchCoordinator`] is the synchronous state machine, driven by explicit
//! instants. [`spawn_search`] runs it on tokio and forwards committed terms.

use std::time::Duration;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Idle,
    Composing,
    PendingEmit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceTimer {
    deadline: Instant,
}

impl DebounceTimer {
    fn start(now: Instant, delay: Duration) -> Self {
        Self {
            deadline: now + delay,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    fn expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
    Input(String),
    CompositionStart,
    CompositionEnd(String),
    Clear,
}

#[derive(Debug, Clone)]
pub struct SearchCoordinator {
    delay: Duration,
    value: String,
    committed: String,
    composing: bool,
    timer: Option<DebounceTimer>,
}

impl Default for SearchCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl SearchCoordinator {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            value: String::new(),
            committed: String::new(),
            composing: false,
            timer: None,
        }
    }

    pub fn phase(&self) -> SearchPhase {
        if self.composing {
            SearchPhase::Composing
        } else if self.timer.is_some() {
            SearchPhase::PendingEmit
        } else {
            SearchPhase::Idle
        }
    }

    /// Text as currently typed.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Last term emitted downstream.
    pub fn committed(&self) -> &str {
        &self.committed
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.timer.map(|timer| timer.deadline())
    }

    pub fn input(&mut self, value: impl Into<String>, now: Instant) {
        self.value = value.into();
        if self.composing {
            return;
        }
        self.restart_timer(now);
    }

    pub fn composition_start(&mut self) {
        self.composing = true;
        self.cancel_timer();
    }

    pub fn composition_end(&mut self, value: impl Into<String>, now: Instant) {
        self.composing = false;
        self.value = value.into();
        self.restart_timer(now);
    }

    /// Reset to an empty term and return it for immediate emission.
    pub fn clear(&mut self) -> String {
        self.cancel_timer();
        self.composing = false;
        self.value.clear();
        self.committed.clear();
        String::new()
    }

    /// Commit the pending term if the timer has expired.
    ///
    /// Every expired window emits, even when the term matches the committed
    /// one.
    pub fn poll_timer(&mut self, now: Instant) -> Option<String> {
        let timer = self.timer?;
        if !timer.expired(now) {
            return None;
        }
        self.timer = None;
        self.committed = self.value.clone();
        Some(self.committed.clone())
    }

    /// Apply an event. Only `Clear` produces an emission directly; debounced
    /// terms come out of [`poll_timer`](Self::poll_timer).
    pub fn handle(&mut self, event: SearchEvent, now: Instant) -> Option<String> {
        match event {
            SearchEvent::Input(value) => self.input(value, now),
            SearchEvent::CompositionStart => self.composition_start(),
            SearchEvent::CompositionEnd(value) => self.composition_end(value, now),
            SearchEvent::Clear => return Some(self.clear()),
        }
        None
    }

    fn restart_timer(&mut self, now: Instant) {
        self.cancel_timer();
        self.timer = Some(DebounceTimer::start(now, self.delay));
    }

    fn cancel_timer(&mut self) {
        self.timer = None;
    }
}

/// Sender side of a running search coordinator.
#[derive(Debug, Clone)]
pub struct SearchHandle {
    events: UnboundedSender<SearchEvent>,
}

impl SearchHandle {
    /// Returns false once the coordinator task has stopped.
    pub fn send(&self, event: SearchEvent) -> bool {
        self.events.send(event).is_ok()
    }

    pub fn input(&self, value: impl Into<String>) -> bool {
        self.send(SearchEvent::Input(value.into()))
    }

    pub fn composition_start(&self) -> bool {
        self.send(SearchEvent::CompositionStart)
    }

    pub fn composition_end(&self, value: impl Into<String>) -> bool {
        self.send(SearchEvent::CompositionEnd(value.into()))
    }

    pub fn clear(&self) -> bool {
        self.send(SearchEvent::Clear)
    }
}

/// Run a coordinator on the current runtime.
///
/// Committed terms arrive on the returned receiver. The task ends when every
/// handle is dropped or the receiver is closed. A term still waiting on its
/// timer when the last handle goes away is flushed at its deadline.
pub fn spawn_search(delay: Duration) -> (SearchHandle, UnboundedReceiver<String>, JoinHandle<()>) {
    let (event_tx, mut event_rx) = unbounded_channel();
    let (term_tx, term_rx) = unbounded_channel();

    let task = tokio::spawn(async move {
        let mut coordinator = SearchCoordinator::new(delay);
        loop {
            let deadline = coordinator.deadline();
            let emitted = tokio::select! {
                event = event_rx.recv() => match event {
                    Some(event) => coordinator.handle(event, Instant::now()),
                    None => {
                        if let Some(deadline) = deadline {
                            sleep_until(deadline).await;
                            if let Some(term) = coordinator.poll_timer(deadline) {
                                let _ = term_tx.send(term);
                            }
                        }
                        break;
                    }
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    coordinator.poll_timer(Instant::now())
                }
            };

            if let Some(term) = emitted {
                debug!(term = %term, "search term committed");
                if term_tx.send(term).is_err() {
                    break;
                }
            }
        }
        debug!("search coordinator stopped");
    });

    (SearchHandle { events: event_tx }, term_rx, task)
}
