//! Restarts background autoplay videos when a page comes back into view.
//!
//! Browsers pause `<video autoplay>` elements when a page is stored in the
//! back/forward cache or when its tab is hidden, and don't always resume them.
//! [`install`] subscribes a listener to a page's [`EventTarget`] that, on a
//! back/forward-cache restore or on the page becoming visible again, schedules
//! a short-delayed `play()` for every paused autoplay video. Videos without
//! the autoplay marker are left alone; call [`restart_autoplay_videos`]
//! directly for anything else.
//!
//! The host environment is abstracted behind [`Document`], [`VideoElement`],
//! and [`Scheduler`] so the behaviour can be driven by any event loop.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;
use tracing::debug;

/// How long to wait before resuming a paused video.
pub const RESTART_DELAY: Duration = Duration::from_millis(100);

/// A video element in the page.
pub trait VideoElement {
    /// Whether the element carries the `autoplay` attribute.
    fn has_autoplay(&self) -> bool;

    fn paused(&self) -> bool;

    /// Attempts to resume playback. Hosts may refuse, e.g. when autoplay
    /// requires a user gesture.
    fn play(&self) -> Result<(), PlaybackError>;
}

/// The page's visibility state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// The page, as far as restarting videos is concerned.
pub trait Document {
    /// Every video element currently in the page.
    fn videos(&self) -> Vec<Rc<dyn VideoElement>>;

    fn visibility(&self) -> Visibility;
}

/// Runs tasks after a delay.
pub trait Scheduler {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>);
}

/// Returned by [`VideoElement::play`] when the host refuses to play.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaybackError(pub String);

impl fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "playback refused: {}", self.0)
    }
}

impl std::error::Error for PlaybackError {}

/// Page lifecycle events the restarter reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageEvent {
    /// The page was shown. `persisted` is `true` only when it was restored
    /// from the back/forward cache.
    PageShow { persisted: bool },

    /// The page's visibility changed; read the new state from the
    /// [`Document`].
    VisibilityChange,
}

/// Schedules a delayed resume for every paused video that has the autoplay
/// marker. A refused resume is logged and otherwise ignored. Returns the
/// number of resumes scheduled.
pub fn restart_autoplay_videos(document: &dyn Document, scheduler: &dyn Scheduler) -> usize {
    let mut scheduled = 0;
    for video in document.videos() {
        if !video.has_autoplay() || !video.paused() {
            continue;
        }
        scheduler.schedule(
            RESTART_DELAY,
            Box::new(move || {
                if let Err(err) = video.play() {
                    debug!(error = %err, "autoplay video restart prevented");
                }
            }),
        );
        scheduled += 1;
    }
    scheduled
}

/// Reacts to a single [`PageEvent`]: restarts videos on a back/forward-cache
/// restore or when the page is visible again. Returns the number of resumes
/// scheduled.
pub fn handle_event(
    event: &PageEvent,
    document: &dyn Document,
    scheduler: &dyn Scheduler,
) -> usize {
    match event {
        PageEvent::PageShow { persisted: true } => {
            restart_autoplay_videos(document, scheduler)
        }
        PageEvent::PageShow { persisted: false } => 0,
        PageEvent::VisibilityChange => match document.visibility() {
            Visibility::Visible => restart_autoplay_videos(document, scheduler),
            Visibility::Hidden => 0,
        },
    }
}

/// Subscribes the restarter to `target`. It stays active until the returned
/// [`Subscription`] is dropped or unsubscribed.
pub fn install<D, S>(target: &EventTarget, document: Rc<D>, scheduler: Rc<S>) -> Subscription
where
    D: Document + 'static,
    S: Scheduler + 'static,
{
    target.subscribe(move |event| {
        handle_event(event, &*document, &*scheduler);
    })
}

type Listener = Rc<dyn Fn(&PageEvent)>;

/// A list of [`PageEvent`] listeners.
#[derive(Default)]
pub struct EventTarget {
    listeners: Rc<RefCell<Vec<(u64, Listener)>>>,
    next_id: Cell<u64>,
}

impl EventTarget {
    pub fn new() -> EventTarget {
        EventTarget::default()
    }

    pub fn subscribe(&self, listener: impl Fn(&PageEvent) + 'static) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        Subscription {
            id,
            listeners: Rc::downgrade(&self.listeners),
        }
    }

    /// Calls every listener with `event`, in subscription order. Listeners
    /// added or removed while dispatching take effect on the next event.
    pub fn dispatch(&self, event: &PageEvent) {
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

/// Keeps a listener attached to an [`EventTarget`]. Dropping it detaches the
/// listener.
#[must_use = "dropping a Subscription detaches its listener"]
pub struct Subscription {
    id: u64,
    listeners: Weak<RefCell<Vec<(u64, Listener)>>>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.borrow_mut().retain(|(id, _)| *id != self.id);
        }
    }
}

struct Timer {
    due: Duration,
    seq: u64,
    task: Box<dyn FnOnce()>,
}

#[derive(Default)]
struct TimerState {
    now: Duration,
    seq: u64,
    timers: Vec<Timer>,
}

/// A single-threaded [`Scheduler`] driven by its host: tasks run when
/// [`TimerQueue::advance`] moves the clock past their due time, in due order
/// (ties in scheduling order).
#[derive(Default)]
pub struct TimerQueue {
    state: RefCell<TimerState>,
}

impl TimerQueue {
    pub fn new() -> TimerQueue {
        TimerQueue::default()
    }

    /// Moves the clock forward by `elapsed` and runs every task that comes
    /// due, including tasks scheduled by those tasks. While a task runs the
    /// clock reads its due time.
    pub fn advance(&self, elapsed: Duration) {
        let deadline = self.state.borrow().now + elapsed;
        while let Some(timer) = self.pop_due(deadline) {
            (timer.task)();
        }
        self.state.borrow_mut().now = deadline;
    }

    pub fn pending(&self) -> usize {
        self.state.borrow().timers.len()
    }

    fn pop_due(&self, deadline: Duration) -> Option<Timer> {
        let mut state = self.state.borrow_mut();
        let next = state
            .timers
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.due <= deadline)
            .min_by_key(|(_, timer)| (timer.due, timer.seq))
            .map(|(i, _)| i)?;
        let timer = state.timers.remove(next);
        state.now = timer.due;
        Some(timer)
    }
}

impl Scheduler for TimerQueue {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) {
        let mut state = self.state.borrow_mut();
        let timer = Timer {
            due: state.now + delay,
            seq: state.seq,
            task,
        };
        state.seq += 1;
        state.timers.push(timer);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct FakeVideo {
        autoplay: bool,
        paused: Cell<bool>,
        refuse: bool,
        attempts: Cell<usize>,
    }

    impl FakeVideo {
        fn new(autoplay: bool, paused: bool, refuse: bool) -> Rc<FakeVideo> {
            Rc::new(FakeVideo {
                autoplay,
                paused: Cell::new(paused),
                refuse,
                attempts: Cell::new(0),
            })
        }
    }

    impl VideoElement for FakeVideo {
        fn has_autoplay(&self) -> bool {
            self.autoplay
        }

        fn paused(&self) -> bool {
            self.paused.get()
        }

        fn play(&self) -> Result<(), PlaybackError> {
            self.attempts.set(self.attempts.get() + 1);
            if self.refuse {
                return Err(PlaybackError("user gesture required".to_owned()));
            }
            self.paused.set(false);
            Ok(())
        }
    }

    struct FakeDocument {
        videos: Vec<Rc<FakeVideo>>,
        visibility: Cell<Visibility>,
    }

    impl Document for FakeDocument {
        fn videos(&self) -> Vec<Rc<dyn VideoElement>> {
            self.videos
                .iter()
                .map(|v| v.clone() as Rc<dyn VideoElement>)
                .collect()
        }

        fn visibility(&self) -> Visibility {
            self.visibility.get()
        }
    }

    fn document(videos: &[&Rc<FakeVideo>]) -> Rc<FakeDocument> {
        Rc::new(FakeDocument {
            videos: videos.iter().map(|v| Rc::clone(*v)).collect(),
            visibility: Cell::new(Visibility::Visible),
        })
    }

    #[test]
    fn test_restart_only_paused_autoplay_videos() {
        let paused = FakeVideo::new(true, true, false);
        let playing = FakeVideo::new(true, false, false);
        let interactive = FakeVideo::new(false, true, false);
        let document = document(&[&paused, &playing, &interactive]);
        let timers = TimerQueue::new();

        assert_eq!(1, restart_autoplay_videos(&*document, &timers));

        timers.advance(Duration::from_millis(99));
        assert_eq!(0, paused.attempts.get());

        timers.advance(Duration::from_millis(1));
        assert_eq!(1, paused.attempts.get());
        assert!(!paused.paused());
        assert_eq!(0, playing.attempts.get());
        assert_eq!(0, interactive.attempts.get());
    }

    #[test]
    fn test_pageshow_not_persisted_schedules_nothing() {
        let video = FakeVideo::new(true, true, false);
        let document = document(&[&video]);
        let timers = TimerQueue::new();

        let event = PageEvent::PageShow { persisted: false };
        assert_eq!(0, handle_event(&event, &*document, &timers));
        assert_eq!(0, timers.pending());
    }

    #[test]
    fn test_pageshow_persisted_refusal_is_swallowed() {
        let video = FakeVideo::new(true, true, true);
        let document = document(&[&video]);
        let timers = Rc::new(TimerQueue::new());
        let target = EventTarget::new();
        let _subscription = install(&target, document, timers.clone());

        target.dispatch(&PageEvent::PageShow { persisted: true });
        assert_eq!(1, timers.pending());

        timers.advance(RESTART_DELAY);
        assert_eq!(1, video.attempts.get());
        assert!(video.paused());
        assert_eq!(0, timers.pending());
    }

    #[test]
    fn test_visibility_change() {
        let video = FakeVideo::new(true, true, false);
        let document = document(&[&video]);
        let timers = Rc::new(TimerQueue::new());
        let target = EventTarget::new();
        let _subscription = install(&target, document.clone(), timers.clone());

        document.visibility.set(Visibility::Hidden);
        target.dispatch(&PageEvent::VisibilityChange);
        assert_eq!(0, timers.pending());

        document.visibility.set(Visibility::Visible);
        target.dispatch(&PageEvent::VisibilityChange);
        timers.advance(RESTART_DELAY);
        assert_eq!(1, video.attempts.get());
    }

    #[test]
    fn test_unsubscribe() {
        let video = FakeVideo::new(true, true, false);
        let document = document(&[&video]);
        let timers = Rc::new(TimerQueue::new());
        let target = EventTarget::new();

        let subscription = install(&target, document.clone(), timers.clone());
        assert_eq!(1, target.listener_count());
        subscription.unsubscribe();
        assert_eq!(0, target.listener_count());

        target.dispatch(&PageEvent::PageShow { persisted: true });
        assert_eq!(0, timers.pending());

        {
            let _scoped = install(&target, document, timers.clone());
            assert_eq!(1, target.listener_count());
        }
        assert_eq!(0, target.listener_count());
    }

    #[test]
    fn test_timer_queue_order() {
        let timers = Rc::new(TimerQueue::new());
        let log = Rc::new(RefCell::new(Vec::new()));

        for (name, delay) in &[("late", 50), ("early", 10), ("tie", 10)] {
            let log = log.clone();
            let name = *name;
            timers.schedule(
                Duration::from_millis(*delay),
                Box::new(move || log.borrow_mut().push(name)),
            );
        }
        {
            let log = log.clone();
            let inner = timers.clone();
            timers.schedule(
                Duration::from_millis(20),
                Box::new(move || {
                    log.borrow_mut().push("outer");
                    let log = log.clone();
                    inner.schedule(
                        Duration::from_millis(5),
                        Box::new(move || log.borrow_mut().push("nested")),
                    );
                }),
            );
        }

        timers.advance(Duration::from_millis(100));
        assert_eq!(
            vec!["early", "tie", "outer", "nested", "late"],
            *log.borrow()
        );
        assert_eq!(0, timers.pending());
    }
}
