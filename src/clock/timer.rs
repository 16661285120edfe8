//! Delayable work item driving the tick generator
//!
//! A [`Timer`] holds at most one pending firing. When it comes due the timer
//! runs the firing callback, which returns the delay to the next firing or
//! `None` to stop. Each period is measured from the previous deadline rather
//! than from when the callback finished, so callback latency never
//! accumulates into drift.

use crate::error::{ClockError, Result};
use crate::tempo::Timebase;
use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, error, trace};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Callback run at each deadline. Returns the next delay, `None` to stop.
pub type Firing = Arc<dyn Fn() -> Option<u32> + Send + Sync>;

pub trait Timer: Send {
    /// Unit of every delay passed to this timer.
    fn timebase(&self) -> Timebase;

    /// Arms the timer `delay` units from now, replacing anything pending.
    fn schedule(&mut self, delay: u32, firing: Firing) -> Result<()>;

    /// Moves the pending deadline to `delay` units after the start of the
    /// current period. A deadline already in the past fires immediately and
    /// the following period counts from that firing. Does nothing when no
    /// firing is pending.
    fn reschedule(&mut self, delay: u32) -> Result<()>;

    /// Drops the pending firing, if any. A firing already in progress
    /// completes but is not rearmed.
    fn cancel(&mut self);
}

enum Command {
    Schedule { delay: Duration, firing: Firing },
    Reschedule(Duration),
    Cancel,
    Shutdown,
}

struct Pending {
    anchor: Instant,
    period: Duration,
    firing: Firing,
}

/// Timer backed by a dedicated thread sleeping on a command channel.
pub struct ThreadTimer {
    clock_hz: u32,
    tx: Sender<Command>,
    handle: Option<JoinHandle<()>>,
}

impl ThreadTimer {
    /// A timer taking delays in microseconds.
    pub fn new() -> Result<Self> {
        Self::with_frequency(1_000_000)
    }

    /// A timer taking delays in ticks of a `clock_hz` counter.
    pub fn with_frequency(clock_hz: u32) -> Result<Self> {
        if clock_hz == 0 {
            return Err(ClockError::SchedulingFailure(
                "timer frequency must be non-zero".to_string(),
            ));
        }
        let (tx, rx) = unbounded();
        let handle = thread::Builder::new()
            .name("clock-timer".to_string())
            .spawn(move || run_timer(rx, clock_hz))
            .map_err(|e| ClockError::SchedulingFailure(e.to_string()))?;

        Ok(Self {
            clock_hz,
            tx,
            handle: Some(handle),
        })
    }

    fn duration(&self, delay: u32) -> Duration {
        ticks_to_duration(delay, self.clock_hz)
    }

    fn command(&self, command: Command) -> Result<()> {
        self.tx
            .send(command)
            .map_err(|_| ClockError::SchedulingFailure("timer thread has exited".to_string()))
    }
}

impl Timer for ThreadTimer {
    fn timebase(&self) -> Timebase {
        if self.clock_hz == 1_000_000 {
            Timebase::Micros
        } else {
            Timebase::Ticks {
                clock_hz: self.clock_hz,
            }
        }
    }

    fn schedule(&mut self, delay: u32, firing: Firing) -> Result<()> {
        let delay = self.duration(delay);
        self.command(Command::Schedule { delay, firing })
    }

    fn reschedule(&mut self, delay: u32) -> Result<()> {
        let delay = self.duration(delay);
        self.command(Command::Reschedule(delay))
    }

    fn cancel(&mut self) {
        // A vanished thread has nothing left to cancel.
        let _ = self.command(Command::Cancel);
    }
}

impl Drop for ThreadTimer {
    fn drop(&mut self) {
        let _ = self.tx.send(Command::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Clock timer thread panicked");
            }
        }
    }
}

fn ticks_to_duration(delay: u32, clock_hz: u32) -> Duration {
    Duration::from_nanos(u64::from(delay) * 1_000_000_000 / u64::from(clock_hz))
}

fn run_timer(rx: Receiver<Command>, clock_hz: u32) {
    let mut pending: Option<Pending> = None;

    loop {
        let command = match &pending {
            Some(p) => match rx.recv_deadline(p.anchor + p.period) {
                Ok(command) => Some(command),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match rx.recv() {
                Ok(command) => Some(command),
                Err(_) => break,
            },
        };

        match command {
            None => {
                if let Some(due) = pending.take() {
                    let deadline = due.anchor + due.period;
                    if let Some(next) = (due.firing)().filter(|&d| d > 0) {
                        let period = ticks_to_duration(next, clock_hz);
                        // Too far behind to catch up without a burst; restart from now.
                        let now = Instant::now();
                        let anchor = if now.saturating_duration_since(deadline) > period {
                            now
                        } else {
                            deadline
                        };
                        pending = Some(Pending {
                            anchor,
                            period,
                            firing: due.firing,
                        });
                    } else {
                        trace!("Firing did not rearm");
                    }
                }
            }
            Some(Command::Schedule { delay, firing }) => {
                pending = Some(Pending {
                    anchor: Instant::now(),
                    period: delay,
                    firing,
                });
            }
            Some(Command::Reschedule(delay)) => {
                if let Some(p) = pending.as_mut() {
                    // A missed deadline fires now and the next period counts
                    // from this firing.
                    let now = Instant::now();
                    if p.anchor + delay <= now {
                        p.anchor = now;
                        p.period = Duration::ZERO;
                    } else {
                        p.period = delay;
                    }
                }
            }
            Some(Command::Cancel) => pending = None,
            Some(Command::Shutdown) => break,
        }
    }
    debug!("Clock timer thread exiting");
}

struct VirtualPending {
    anchor: u64,
    period: u32,
    firing: Firing,
}

#[derive(Default)]
struct VirtualState {
    now: u64,
    pending: Option<VirtualPending>,
    fail_next: bool,
    fired_at: Vec<u64>,
}

/// Timer running on virtual time, advanced explicitly.
///
/// Clones share one timeline, so a test can keep a handle while the
/// generator owns another.
#[derive(Clone)]
pub struct ManualTimer {
    timebase: Timebase,
    state: Arc<Mutex<VirtualState>>,
}

impl ManualTimer {
    /// Virtual microseconds.
    pub fn new() -> Self {
        Self::with_timebase(Timebase::Micros)
    }

    pub fn with_timebase(timebase: Timebase) -> Self {
        Self {
            timebase,
            state: Arc::new(Mutex::new(VirtualState::default())),
        }
    }

    /// Current virtual time.
    pub fn now(&self) -> u64 {
        self.state.lock().map(|s| s.now).unwrap_or(0)
    }

    /// Virtual times at which firings ran, in order.
    pub fn fired_at(&self) -> Vec<u64> {
        self.state
            .lock()
            .map(|s| s.fired_at.clone())
            .unwrap_or_default()
    }

    /// Deadline of the pending firing.
    pub fn next_deadline(&self) -> Option<u64> {
        self.state.lock().ok().and_then(|s| {
            s.pending
                .as_ref()
                .map(|p| p.anchor + u64::from(p.period))
        })
    }

    pub fn is_armed(&self) -> bool {
        self.next_deadline().is_some()
    }

    /// Makes the next `schedule` or `reschedule` call fail.
    pub fn fail_next(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_next = true;
        }
    }

    /// Moves virtual time forward by `units`, running every firing that
    /// comes due on the way.
    pub fn advance(&self, units: u64) {
        let target = self.now() + units;

        loop {
            let due = {
                let Ok(mut state) = self.state.lock() else {
                    return;
                };
                let deadline = match &state.pending {
                    Some(p) => p.anchor + u64::from(p.period),
                    None => break,
                };
                if deadline > target {
                    break;
                }
                state.now = deadline;
                state.fired_at.push(deadline);
                state.pending.take().map(|p| (deadline, p.firing))
            };

            // The lock is released while the firing runs.
            let Some((deadline, firing)) = due else {
                break;
            };
            let next = firing().filter(|&d| d > 0);

            let Ok(mut state) = self.state.lock() else {
                return;
            };
            if state.pending.is_none() {
                if let Some(period) = next {
                    state.pending = Some(VirtualPending {
                        anchor: deadline,
                        period,
                        firing,
                    });
                }
            }
        }

        if let Ok(mut state) = self.state.lock() {
            state.now = target;
        }
    }

    fn take_failure(state: &mut VirtualState) -> Result<()> {
        if std::mem::take(&mut state.fail_next) {
            Err(ClockError::SchedulingFailure(
                "injected timer failure".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

impl Default for ManualTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer for ManualTimer {
    fn timebase(&self) -> Timebase {
        self.timebase
    }

    fn schedule(&mut self, delay: u32, firing: Firing) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| ClockError::SchedulingFailure("timer state poisoned".to_string()))?;
        Self::take_failure(&mut state)?;
        state.pending = Some(VirtualPending {
            anchor: state.now,
            period: delay,
            firing,
        });
        Ok(())
    }

    fn reschedule(&mut self, delay: u32) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| ClockError::SchedulingFailure("timer state poisoned".to_string()))?;
        Self::take_failure(&mut state)?;
        let now = state.now;
        if let Some(p) = state.pending.as_mut() {
            // Past deadlines come due on the next advance.
            p.period = delay;
            if p.anchor + u64::from(delay) < now {
                p.anchor = now;
                p.period = 0;
            }
        }
        Ok(())
    }

    fn cancel(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.pending = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_firing(period: u32) -> (Firing, Arc<AtomicU32>) {
        let count = Arc::new(AtomicU32::new(0));
        let counter = count.clone();
        let firing: Firing = Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Some(period)
        });
        (firing, count)
    }

    #[test]
    fn test_manual_timer_fires_on_deadlines() {
        let mut timer = ManualTimer::new();
        let (firing, count) = counting_firing(100);

        timer.schedule(100, firing).unwrap();
        timer.advance(99);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        timer.advance(1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        timer.advance(250);
        assert_eq!(timer.fired_at(), vec![100, 200, 300]);
        assert_eq!(timer.now(), 350);
    }

    #[test]
    fn test_manual_timer_reschedule_is_anchored() {
        let mut timer = ManualTimer::new();
        let (firing, _) = counting_firing(100);

        timer.schedule(100, firing).unwrap();
        timer.advance(30);
        timer.reschedule(50).unwrap();
        assert_eq!(timer.next_deadline(), Some(50));
    }

    #[test]
    fn test_manual_timer_past_deadline_fires_next_advance() {
        let mut timer = ManualTimer::new();
        let (firing, count) = counting_firing(100);

        timer.schedule(100, firing).unwrap();
        timer.advance(80);
        timer.reschedule(20).unwrap();
        timer.advance(0);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(timer.fired_at(), vec![80]);
        assert_eq!(timer.next_deadline(), Some(180));
    }

    #[test]
    fn test_cancel_twice() {
        let mut timer = ManualTimer::new();
        let (firing, count) = counting_firing(10);
        timer.schedule(10, firing).unwrap();
        timer.cancel();
        timer.cancel();
        timer.advance(100);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!timer.is_armed());
    }

    #[test]
    fn test_injected_failure() {
        let mut timer = ManualTimer::new();
        let (firing, _) = counting_firing(10);
        timer.fail_next();
        assert!(timer.schedule(10, firing.clone()).is_err());
        assert!(timer.schedule(10, firing).is_ok());
    }

    #[test]
    fn test_thread_timer_fires() {
        let mut timer = ThreadTimer::new().unwrap();
        let (firing, count) = counting_firing(2_000);

        timer.schedule(2_000, firing).unwrap();
        thread::sleep(Duration::from_millis(50));
        timer.cancel();
        thread::sleep(Duration::from_millis(5));
        let fired = count.load(Ordering::SeqCst);
        assert!(fired >= 5, "only {} firings", fired);

        thread::sleep(Duration::from_millis(20));
        assert_eq!(count.load(Ordering::SeqCst), fired);
    }

    #[test]
    fn test_thread_timer_past_due_reschedule_restarts_period() {
        let mut timer = ThreadTimer::new().unwrap();
        let fired = Arc::new(Mutex::new(Vec::new()));
        let period = Arc::new(AtomicU32::new(100_000));
        let firing: Firing = {
            let fired = fired.clone();
            let period = period.clone();
            Arc::new(move || {
                fired.lock().unwrap().push(Instant::now());
                Some(period.load(Ordering::SeqCst))
            })
        };

        timer.schedule(100_000, firing).unwrap();
        thread::sleep(Duration::from_millis(170));
        period.store(50_000, Ordering::SeqCst);
        timer.reschedule(50_000).unwrap();
        thread::sleep(Duration::from_millis(100));
        timer.cancel();

        let fired = fired.lock().unwrap().clone();
        assert!(fired.len() >= 3, "only {} firings", fired.len());
        let catch_up = fired[2].duration_since(fired[1]);
        assert!(
            catch_up >= Duration::from_millis(40) && catch_up <= Duration::from_millis(80),
            "next firing {:?} after the immediate one",
            catch_up
        );
    }
}
