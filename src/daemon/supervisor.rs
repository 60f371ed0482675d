use crate::daemon::history::HistoryTracker;
use crate::util::threads::{ThreadHandle, ThreadRegistry};
use anyhow::Result;
use log::{info, warn};
use std::io::{BufRead, BufReader};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// Granularity of backoff sleeps, so shutdown is observed promptly.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Command line producing the event stream on stdout. Kept as plain data so
/// tests can substitute a scripted stream for the real compositor.
#[derive(Debug, Clone)]
pub struct StreamSpec {
    pub program: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct RestartPolicy {
    pub backoff_floor: Duration,
    pub backoff_ceiling: Duration,
    /// Minimum uptime after which a run counts as healthy and earns a
    /// backoff reset on its eventual exit.
    pub cooldown: Duration,
}

/// How one supervision attempt finished.
#[derive(Debug, Clone, Copy)]
pub enum StreamOutcome {
    SpawnFailed,
    Ended { uptime: Duration },
}

/// Backoff schedule for restarting the stream, separated from the supervisor
/// loop so the cooldown-reset rule is testable without real subprocess timing.
pub struct RestartBackoff {
    policy: RestartPolicy,
    current: Duration,
}

impl RestartBackoff {
    pub fn new(policy: RestartPolicy) -> Self {
        Self {
            current: policy.backoff_floor,
            policy,
        }
    }

    /// Delay to sleep before the next attempt, advancing the schedule.
    ///
    /// A failed spawn sleeps the current delay and doubles it afterwards; a
    /// stream that ended quickly doubles first (crash loops slow down
    /// immediately); a stream that stayed up past the cooldown resets the
    /// schedule to the floor.
    pub fn next_delay(&mut self, outcome: StreamOutcome) -> Duration {
        match outcome {
            StreamOutcome::SpawnFailed => {
                let delay = self.current;
                self.current = self.doubled();
                delay
            }
            StreamOutcome::Ended { uptime } if uptime >= self.policy.cooldown => {
                self.current = self.policy.backoff_floor;
                self.current
            }
            StreamOutcome::Ended { .. } => {
                self.current = self.doubled();
                self.current
            }
        }
    }

    fn doubled(&self) -> Duration {
        (self.current * 2).min(self.policy.backoff_ceiling)
    }
}

/// Keeps the compositor event-stream subscription alive for the lifetime of
/// the daemon: spawns the subprocess, feeds every stdout line to the history
/// tracker, and restarts with backoff when the subprocess dies. Never fatal:
/// while disconnected, queries keep serving the last known history.
pub struct EventStreamSupervisor {
    spec: StreamSpec,
    policy: RestartPolicy,
    tracker: Arc<HistoryTracker>,
    shutdown: AtomicBool,
    child: Mutex<Option<Child>>,
}

impl EventStreamSupervisor {
    pub fn new(spec: StreamSpec, policy: RestartPolicy, tracker: Arc<HistoryTracker>) -> Self {
        Self {
            spec,
            policy,
            tracker,
            shutdown: AtomicBool::new(false),
            child: Mutex::new(None),
        }
    }

    pub fn spawn(self: &Arc<Self>, threads: &ThreadRegistry) -> Result<ThreadHandle> {
        let supervisor = Arc::clone(self);
        threads.spawn("event-stream", move || supervisor.run())
    }

    /// Stop the loop and kill the live subprocess, unblocking the reader.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(child) = self.child.lock().expect("child slot poisoned").as_mut() {
            let _ = child.kill();
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    pub fn run(&self) {
        let mut backoff = RestartBackoff::new(self.policy);

        while !self.is_shutdown() {
            let outcome = self.stream_once();
            if self.is_shutdown() {
                break;
            }

            let delay = backoff.next_delay(outcome);
            match outcome {
                StreamOutcome::SpawnFailed => {
                    warn!("event-stream start failed, retrying in {:?}", delay)
                }
                StreamOutcome::Ended { uptime } => {
                    info!(
                        "event-stream process exited after {:?}, restarting in {:?}",
                        uptime, delay
                    )
                }
            }
            self.sleep_interruptibly(delay);
        }

        info!("event-stream supervisor stopped");
    }

    /// One attempt: spawn, stream lines into the tracker until EOF or a read
    /// error, then reap the child.
    fn stream_once(&self) -> StreamOutcome {
        let started = Instant::now();

        let mut child = match Command::new(&self.spec.program)
            .args(&self.spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                warn!("error starting {}: {}", self.spec.program, e);
                return StreamOutcome::SpawnFailed;
            }
        };

        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                warn!("{} spawned without a stdout pipe", self.spec.program);
                return StreamOutcome::SpawnFailed;
            }
        };

        info!("event-stream process started");
        *self.child.lock().expect("child slot poisoned") = Some(child);
        // A shutdown that raced the spawn has not seen this child yet.
        if self.is_shutdown() {
            if let Some(child) = self.child.lock().expect("child slot poisoned").as_mut() {
                let _ = child.kill();
            }
        }

        for line in BufReader::new(stdout).lines() {
            match line {
                Ok(line) => self.tracker.record_event(&line),
                Err(e) => {
                    warn!("error reading from event stream: {}", e);
                    break;
                }
            }
        }

        self.reap_child();

        StreamOutcome::Ended {
            uptime: started.elapsed(),
        }
    }

    /// Wait for the child to exit without pinning the slot lock, so a
    /// concurrent `shutdown()` can still reach the child to kill it. A
    /// blocking `wait()` here would hold the lock for as long as a child
    /// that closed its stdout keeps running.
    fn reap_child(&self) {
        loop {
            let mut slot = self.child.lock().expect("child slot poisoned");
            match slot.as_mut().map(|child| child.try_wait()) {
                None => break,
                Some(Ok(Some(_))) => {
                    slot.take();
                    break;
                }
                Some(Ok(None)) => {}
                Some(Err(e)) => {
                    warn!("error waiting for event-stream process: {}", e);
                    slot.take();
                    break;
                }
            }
            drop(slot);
            std::thread::sleep(SLEEP_SLICE);
        }
    }

    fn sleep_interruptibly(&self, delay: Duration) {
        let deadline = Instant::now() + delay;
        while !self.is_shutdown() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            std::thread::sleep(remaining.min(SLEEP_SLICE));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(floor_ms: u64, ceiling_ms: u64, cooldown_ms: u64) -> RestartPolicy {
        RestartPolicy {
            backoff_floor: Duration::from_millis(floor_ms),
            backoff_ceiling: Duration::from_millis(ceiling_ms),
            cooldown: Duration::from_millis(cooldown_ms),
        }
    }

    #[test]
    fn fast_failures_give_non_decreasing_delays_up_to_the_cap() {
        let mut backoff = RestartBackoff::new(policy(1000, 64_000, 300_000));
        let fast = StreamOutcome::Ended {
            uptime: Duration::from_millis(10),
        };

        let mut previous = Duration::ZERO;
        for _ in 0..10 {
            let delay = backoff.next_delay(fast);
            assert!(delay >= previous);
            assert!(delay <= Duration::from_millis(64_000));
            previous = delay;
        }
        assert_eq!(previous, Duration::from_millis(64_000));
    }

    #[test]
    fn spawn_failure_sleeps_current_delay_before_doubling() {
        let mut backoff = RestartBackoff::new(policy(1000, 64_000, 300_000));
        assert_eq!(
            backoff.next_delay(StreamOutcome::SpawnFailed),
            Duration::from_millis(1000)
        );
        assert_eq!(
            backoff.next_delay(StreamOutcome::SpawnFailed),
            Duration::from_millis(2000)
        );
    }

    #[test]
    fn uptime_past_cooldown_resets_to_the_floor() {
        let mut backoff = RestartBackoff::new(policy(1000, 64_000, 300_000));
        let fast = StreamOutcome::Ended {
            uptime: Duration::from_millis(10),
        };
        for _ in 0..5 {
            backoff.next_delay(fast);
        }

        let healthy = StreamOutcome::Ended {
            uptime: Duration::from_millis(300_000),
        };
        assert_eq!(backoff.next_delay(healthy), Duration::from_millis(1000));
        // The reset also re-bases the doubling sequence.
        assert_eq!(backoff.next_delay(fast), Duration::from_millis(2000));
    }

    #[test]
    fn uptime_just_under_cooldown_still_counts_as_a_fast_failure() {
        let mut backoff = RestartBackoff::new(policy(1000, 64_000, 300_000));
        let outcome = StreamOutcome::Ended {
            uptime: Duration::from_millis(299_999),
        };
        assert_eq!(backoff.next_delay(outcome), Duration::from_millis(2000));
    }
}
