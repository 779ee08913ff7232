//! Redraw coalescing.
//!
//! Parameter changes can arrive many times per display refresh. Each one
//! calls [`RedrawScheduler::request`]; the host's frame callback calls
//! [`RedrawScheduler::take`] once per refresh and draws if it returns true.
//! Intermediate requests collapse into one draw that reads the latest
//! parameters, so the final frame is never skipped.

/// Single pending-redraw flag with counters.
#[derive(Debug, Clone, Default)]
pub struct RedrawScheduler {
    pending: bool,
    requested: u64,
    coalesced: u64,
}

impl RedrawScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a redraw as needed. Returns false if one was already pending.
    pub fn request(&mut self) -> bool {
        self.requested += 1;
        if self.pending {
            self.coalesced += 1;
            false
        } else {
            self.pending = true;
            true
        }
    }

    /// Consumes the pending flag; true means draw now.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }

    /// Drops any pending redraw (a draw just happened).
    pub fn cancel(&mut self) {
        self.pending = false;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Total requests seen.
    pub fn requested(&self) -> u64 {
        self.requested
    }

    /// Requests absorbed by an already pending redraw.
    pub fn coalesced(&self) -> u64 {
        self.coalesced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_collapses_to_one() {
        let mut s = RedrawScheduler::new();
        assert!(s.request());
        assert!(!s.request());
        assert!(!s.request());
        assert!(s.is_pending());
        assert!(s.take());
        assert!(!s.take());
        assert_eq!((s.requested(), s.coalesced()), (3, 2));
    }

    #[test]
    fn request_after_take_schedules_again() {
        let mut s = RedrawScheduler::new();
        s.request();
        s.take();
        assert!(s.request());
        s.cancel();
        assert!(!s.take());
    }
}
