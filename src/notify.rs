//! Success/error notices with auto-dismiss.
//!
//! Each channel holds at most one message. Setting a message arms a timer
//! task; the task's handle aborts it when dropped, so replacing the message
//! or dropping the [`Notifier`] cancels the pending dismissal. Firings come
//! back over an mpsc channel and carry the generation they were armed for;
//! a firing for an older generation is ignored.
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Success,
    Error,
}

#[derive(Debug, Clone, Copy)]
struct Expired {
    channel: Channel,
    generation: u64,
}

#[derive(Debug)]
struct TimerHandle(JoinHandle<()>);

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[derive(Debug, Default)]
struct Slot {
    message: Option<String>,
    generation: u64,
    timer: Option<TimerHandle>,
}

#[derive(Debug)]
pub struct Notifier {
    ttl: Duration,
    success: Slot,
    error: Slot,
    tx: mpsc::UnboundedSender<Expired>,
    rx: mpsc::UnboundedReceiver<Expired>,
}

impl Notifier {
    pub fn new(ttl: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            ttl,
            success: Slot::default(),
            error: Slot::default(),
            tx,
            rx,
        }
    }

    fn slot(&self, channel: Channel) -> &Slot {
        match channel {
            Channel::Success => &self.success,
            Channel::Error => &self.error,
        }
    }

    fn slot_mut(&mut self, channel: Channel) -> &mut Slot {
        match channel {
            Channel::Success => &mut self.success,
            Channel::Error => &mut self.error,
        }
    }

    pub fn get(&self, channel: Channel) -> Option<&str> {
        self.slot(channel).message.as_deref()
    }

    /// Show `message` on `channel` and (re)start its dismissal timer. The
    /// deadline counts from this call, not from when the timer task first runs.
    /// Must be called inside a tokio runtime.
    pub fn set(&mut self, channel: Channel, message: impl Into<String>) {
        let deadline = Instant::now() + self.ttl;
        let tx = self.tx.clone();
        let slot = self.slot_mut(channel);
        slot.generation += 1;
        let generation = slot.generation;
        slot.message = Some(message.into());
        let task = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let _ = tx.send(Expired {
                channel,
                generation,
            });
        });
        // Dropping the previous handle aborts its timer.
        slot.timer = Some(TimerHandle(task));
    }

    pub fn clear(&mut self, channel: Channel) {
        let slot = self.slot_mut(channel);
        slot.generation += 1;
        slot.message = None;
        slot.timer = None;
    }

    pub fn clear_all(&mut self) {
        self.clear(Channel::Success);
        self.clear(Channel::Error);
    }

    #[cfg(test)]
    fn is_pending(&self, channel: Channel) -> bool {
        self.slot(channel)
            .timer
            .as_ref()
            .is_some_and(|t| !t.0.is_finished())
    }

    fn apply(&mut self, expired: Expired) -> bool {
        let slot = self.slot_mut(expired.channel);
        if slot.generation != expired.generation {
            return false;
        }
        slot.message = None;
        slot.timer = None;
        debug!(channel = ?expired.channel, "notice dismissed");
        true
    }

    /// Apply every firing that has already arrived without waiting.
    /// Returns the channels that were cleared.
    pub fn drain(&mut self) -> Vec<Channel> {
        let mut cleared = Vec::new();
        while let Ok(expired) = self.rx.try_recv() {
            if self.apply(expired) {
                cleared.push(expired.channel);
            }
        }
        cleared
    }

    /// Wait for the next dismissal that actually clears a message.
    /// Never resolves while no timer is armed.
    pub async fn next_dismissal(&mut self) -> Channel {
        loop {
            // `self.tx` keeps the channel open, so `recv` only yields firings.
            if let Some(expired) = self.rx.recv().await {
                if self.apply(expired) {
                    return expired.channel;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    const TTL: Duration = Duration::from_secs(5);

    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn message_clears_after_ttl() {
        let mut notifier = Notifier::new(TTL);
        let start = Instant::now();
        notifier.set(Channel::Success, "Product created successfully");
        assert_eq!(notifier.get(Channel::Success), Some("Product created successfully"));
        assert!(notifier.get(Channel::Error).is_none());

        let cleared = notifier.next_dismissal().await;
        assert_eq!(cleared, Channel::Success);
        assert!(notifier.get(Channel::Success).is_none());
        assert!(start.elapsed() >= TTL);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_counts_from_set() {
        let mut notifier = Notifier::new(TTL);
        notifier.set(Channel::Success, "ok");
        // The clock moves before the timer task has been polled once.
        advance(TTL).await;
        settle().await;
        assert_eq!(notifier.drain(), vec![Channel::Success]);
        assert!(notifier.get(Channel::Success).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn replacing_restarts_the_timer() {
        let mut notifier = Notifier::new(TTL);
        notifier.set(Channel::Error, "first");
        advance(Duration::from_secs(3)).await;
        let replaced_at = Instant::now();
        notifier.set(Channel::Error, "second");

        advance(Duration::from_secs(3)).await;
        settle().await;
        assert!(notifier.drain().is_empty());
        assert_eq!(notifier.get(Channel::Error), Some("second"));

        assert_eq!(notifier.next_dismissal().await, Channel::Error);
        assert!(replaced_at.elapsed() >= TTL);
        assert!(notifier.get(Channel::Error).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn channels_are_independent() {
        let mut notifier = Notifier::new(TTL);
        notifier.set(Channel::Success, "ok");
        advance(Duration::from_secs(2)).await;
        notifier.set(Channel::Error, "bad");

        assert_eq!(notifier.next_dismissal().await, Channel::Success);
        assert_eq!(notifier.get(Channel::Error), Some("bad"));
        assert_eq!(notifier.next_dismissal().await, Channel::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_cancels_pending_timer() {
        let mut notifier = Notifier::new(TTL);
        notifier.set(Channel::Success, "ok");
        assert!(notifier.is_pending(Channel::Success));
        notifier.clear_all();
        assert!(!notifier.is_pending(Channel::Success));

        notifier.set(Channel::Error, "later");
        advance(Duration::from_secs(6)).await;
        settle().await;
        assert_eq!(notifier.drain(), vec![Channel::Error]);
        assert!(notifier.get(Channel::Success).is_none());
    }
}
