//! Debounced delivery of rapidly changing input.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// Delivers only the latest pushed value once no new value has arrived for
/// the configured delay.
pub struct Debouncer<T> {
    input: mpsc::UnboundedSender<T>,
    output: mpsc::UnboundedReceiver<T>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Spawn the timer task. Must be called inside a tokio runtime.
    pub fn new(delay: Duration) -> Self {
        let (input, mut pending_rx) = mpsc::unbounded_channel::<T>();
        let (ready_tx, output) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut pending = None;
            loop {
                tokio::select! {
                    value = pending_rx.recv() => {
                        if let Some(value) = value {
                            pending = Some(value);
                        } else {
                            if let Some(value) = pending.take() {
                                let _ = ready_tx.send(value);
                            }
                            break;
                        }
                    }
                    () = sleep(delay), if pending.is_some() => {
                        if let Some(value) = pending.take() {
                            if ready_tx.send(value).is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        });

        Self { input, output }
    }

    /// Record a new value, restarting the quiet period.
    pub fn push(&self, value: T) {
        let _ = self.input.send(value);
    }

    /// Wait for the next settled value.
    pub async fn next(&mut self) -> Option<T> {
        self.output.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn burst_delivers_only_last_value() {
        let mut debouncer = Debouncer::new(DEFAULT_DEBOUNCE);
        let started = Instant::now();

        debouncer.push("c");
        debouncer.push("ca");
        debouncer.push("cat");

        assert_eq!(debouncer.next().await, Some("cat"));
        let elapsed = started.elapsed();
        assert!(elapsed >= DEFAULT_DEBOUNCE);
        assert!(elapsed < Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn typing_restarts_the_quiet_period() {
        let mut debouncer = Debouncer::new(DEFAULT_DEBOUNCE);
        let started = Instant::now();

        debouncer.push(1);
        sleep(Duration::from_millis(200)).await;
        debouncer.push(2);

        assert_eq!(debouncer.next().await, Some(2));
        assert!(started.elapsed() >= Duration::from_millis(450));
    }

    #[tokio::test(start_paused = true)]
    async fn separated_values_are_both_delivered() {
        let mut debouncer = Debouncer::new(DEFAULT_DEBOUNCE);

        debouncer.push("a");
        sleep(Duration::from_millis(300)).await;
        debouncer.push("b");

        assert_eq!(debouncer.next().await, Some("a"));
        assert_eq!(debouncer.next().await, Some("b"));
    }
}
