use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Sliding-window admission control: at most `capacity` accepted requests in
/// any trailing `window`, independent of wall-clock alignment.
///
/// The ring buffer holds one timestamp per accepted request; the cursor points
/// at the slot written most recently, so the slot after it is always the
/// oldest. A rejected call leaves the buffer untouched.
pub struct RateLimiter {
    state: Mutex<RingState>,
    window: Duration,
}

struct RingState {
    timestamps: Vec<Option<Instant>>,
    cursor: usize,
}

impl RateLimiter {
    pub fn new(capacity: usize, window: Duration) -> Self {
        assert!(capacity > 0, "rate limiter capacity must be non-zero");
        Self {
            state: Mutex::new(RingState {
                timestamps: vec![None; capacity],
                cursor: 0,
            }),
            window,
        }
    }

    /// Admit or reject one request, recording it if admitted.
    pub fn allow(&self) -> bool {
        self.allow_at(Instant::now())
    }

    fn allow_at(&self, now: Instant) -> bool {
        let mut state = self.state.lock().expect("rate limiter lock poisoned");

        let next = (state.cursor + 1) % state.timestamps.len();
        if let Some(oldest) = state.timestamps[next] {
            if now.duration_since(oldest) < self.window {
                return false;
            }
        }

        state.timestamps[next] = Some(now);
        state.cursor = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_up_to_capacity_then_rejects() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let now = Instant::now();
        for _ in 0..3 {
            assert!(limiter.allow_at(now));
        }
        assert!(!limiter.allow_at(now));
    }

    #[test]
    fn rejection_does_not_consume_a_slot() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let now = Instant::now();
        assert!(limiter.allow_at(now));
        assert!(limiter.allow_at(now));
        assert!(!limiter.allow_at(now));
        // Once the oldest timestamp ages out, exactly one slot frees up.
        let later = now + Duration::from_secs(61);
        assert!(limiter.allow_at(later));
    }

    #[test]
    fn window_slides_rather_than_resetting_in_buckets() {
        let limiter = RateLimiter::new(2, Duration::from_secs(10));
        let start = Instant::now();
        assert!(limiter.allow_at(start));
        assert!(limiter.allow_at(start + Duration::from_secs(6)));
        // Still within 10s of the first accept.
        assert!(!limiter.allow_at(start + Duration::from_secs(9)));
        // First accept has aged out; the one at +6s has not.
        assert!(limiter.allow_at(start + Duration::from_secs(11)));
        assert!(!limiter.allow_at(start + Duration::from_secs(12)));
    }

    #[test]
    fn sixty_first_rapid_request_is_shed() {
        let limiter = RateLimiter::new(60, Duration::from_secs(60));
        let now = Instant::now();
        let admitted = (0..61).filter(|_| limiter.allow_at(now)).count();
        assert_eq!(admitted, 60);
    }
}
