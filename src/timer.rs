/// Handle for a scheduled action. Tokens are never reused within a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(u64);

#[derive(Debug, Clone)]
struct PendingTimer<A> {
    token: TimerToken,
    deadline_ms: u64,
    action: A,
}

/// Cancellable delayed actions, driven by whoever owns the clock.
///
/// Nothing fires on its own: the owner calls [`TimerChain::due`] with the
/// current time and receives the actions whose deadline has passed, in
/// deadline order.
#[derive(Debug, Clone)]
pub struct TimerChain<A> {
    pending: Vec<PendingTimer<A>>,
    next_token: u64,
}

impl<A> Default for TimerChain<A> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
            next_token: 0,
        }
    }
}

impl<A: Copy> TimerChain<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, now_ms: u64, duration_ms: u64, action: A) -> TimerToken {
        let token = TimerToken(self.next_token);
        self.next_token += 1;
        self.pending.push(PendingTimer {
            token,
            deadline_ms: now_ms.saturating_add(duration_ms),
            action,
        });
        token
    }

    /// Returns false if the token already fired or was cancelled.
    pub fn cancel(&mut self, token: TimerToken) -> bool {
        let before = self.pending.len();
        self.pending.retain(|t| t.token != token);
        self.pending.len() != before
    }

    /// Drops every pending timer and returns how many were live.
    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.pending.len();
        self.pending.clear();
        cancelled
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.pending.iter().map(|t| t.deadline_ms).min()
    }

    /// Removes and returns every timer whose deadline is at or before `now_ms`.
    pub fn due(&mut self, now_ms: u64) -> Vec<(TimerToken, A)> {
        let mut fired: Vec<PendingTimer<A>> = Vec::new();
        self.pending.retain(|t| {
            if t.deadline_ms <= now_ms {
                fired.push(t.clone());
                false
            } else {
                true
            }
        });
        fired.sort_by_key(|t| (t.deadline_ms, t.token));
        fired.into_iter().map(|t| (t.token, t.action)).collect()
    }
}
