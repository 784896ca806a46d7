//! Coalesced (debounced) writes
//!
//! A `CoalescedWriter` owns at most one pending value and one timer task per
//! logical key. Scheduling a new value aborts the pending timer and starts a
//! fresh quiet window, so a burst of mutations turns into a single physical
//! write of the last state.

use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Physical write performed when the quiet window elapses
pub type WriteSink<T> = Arc<dyn Fn(&T) -> Result<()> + Send + Sync>;

struct Pending<T> {
    value: Option<T>,
    timer: Option<JoinHandle<()>>,
}

/// Debounced writer for one logical key
pub struct CoalescedWriter<T> {
    name: &'static str,
    delay: Duration,
    state: Arc<Mutex<Pending<T>>>,
    sink: WriteSink<T>,
}

impl<T> CoalescedWriter<T>
where
    T: Clone + Send + 'static,
{
    /// Create a writer that flushes through `sink` after `delay` of quiet
    pub fn new(name: &'static str, delay: Duration, sink: WriteSink<T>) -> Self {
        Self {
            name,
            delay,
            state: Arc::new(Mutex::new(Pending {
                value: None,
                timer: None,
            })),
            sink,
        }
    }

    /// Replace the pending value and restart the quiet window
    pub async fn schedule(&self, value: T) {
        let _ = self
            .schedule_with(|_| Ok::<T, std::convert::Infallible>(value))
            .await;
    }

    /// Compute the next pending value from the current one and restart the
    /// quiet window. `f` runs under the writer lock; on error nothing changes.
    pub async fn schedule_with<E>(
        &self,
        f: impl FnOnce(Option<T>) -> std::result::Result<T, E>,
    ) -> std::result::Result<(), E> {
        let mut state = self.state.lock().await;
        let next = f(state.value.clone())?;

        if let Some(timer) = state.timer.take() {
            timer.abort();
            tracing::debug!(writer = self.name, "Rescheduled pending write");
        }
        state.value = Some(next);

        let shared = self.state.clone();
        let sink = self.sink.clone();
        let delay = self.delay;
        let name = self.name;
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The write happens under the lock so that a concurrent
            // read-modify-write never interleaves with it.
            let mut state = shared.lock().await;
            state.timer = None;
            if let Some(value) = state.value.take() {
                write(name, &sink, &value);
            }
        }));
        Ok(())
    }

    /// Clone of the pending value, if a write is scheduled
    pub async fn peek(&self) -> Option<T> {
        self.state.lock().await.value.clone()
    }

    /// Whether a write is scheduled
    pub async fn is_pending(&self) -> bool {
        self.state.lock().await.value.is_some()
    }

    /// Cancel the pending write and run `f` with its value while holding the
    /// writer lock. No scheduled write can land while `f` runs.
    pub async fn cancel_with<R>(&self, f: impl FnOnce(Option<T>) -> R) -> R {
        let mut state = self.state.lock().await;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        let pending = state.value.take();
        f(pending)
    }

    /// Write the pending value immediately. Returns whether anything was written.
    pub async fn flush(&self) -> bool {
        let mut state = self.state.lock().await;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        match state.value.take() {
            Some(value) => write(self.name, &self.sink, &value),
            None => false,
        }
    }
}

fn write<T>(name: &str, sink: &WriteSink<T>, value: &T) -> bool {
    match sink(value) {
        Ok(()) => {
            tracing::debug!(writer = name, "Coalesced write persisted");
            true
        }
        Err(e) => {
            tracing::warn!(writer = name, "Dropping coalesced write: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::Mutex as StdMutex;

    fn recording_sink() -> (Arc<StdMutex<Vec<u32>>>, WriteSink<u32>) {
        let writes = Arc::new(StdMutex::new(Vec::new()));
        let captured = writes.clone();
        let sink: WriteSink<u32> = Arc::new(move |v: &u32| {
            captured.lock().unwrap().push(*v);
            Ok(())
        });
        (writes, sink)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_to_last_value() {
        let (writes, sink) = recording_sink();
        let writer = CoalescedWriter::new("test", Duration::from_millis(30), sink);

        for v in 1..=5 {
            writer.schedule(v).await;
        }
        assert!(writer.is_pending().await);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(*writes.lock().unwrap(), vec![5]);
        assert!(!writer.is_pending().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_restarts_window() {
        let (writes, sink) = recording_sink();
        let writer = CoalescedWriter::new("test", Duration::from_millis(80), sink);

        writer.schedule(1).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        writer.schedule(2).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        // 100ms after the first schedule, but only 50ms after the second
        assert!(writes.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(*writes.lock().unwrap(), vec![2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_with_sees_pending_value() {
        let (writes, sink) = recording_sink();
        let writer = CoalescedWriter::new("test", Duration::from_millis(20), sink);

        writer.schedule(10).await;
        writer
            .schedule_with(|pending| Ok::<u32, Error>(pending.unwrap_or(0) + 1))
            .await
            .unwrap();
        let failed = writer
            .schedule_with(|_| Err::<u32, Error>(Error::Storage("nope".to_string())))
            .await;
        assert!(failed.is_err());
        assert_eq!(writer.peek().await, Some(11));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(*writes.lock().unwrap(), vec![11]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_writes_now() {
        let (writes, sink) = recording_sink();
        let writer = CoalescedWriter::new("test", Duration::from_secs(60), sink);

        writer.schedule(7).await;
        assert!(writer.flush().await);
        assert_eq!(*writes.lock().unwrap(), vec![7]);
        assert!(!writer.flush().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_with_takes_pending() {
        let (writes, sink) = recording_sink();
        let writer = CoalescedWriter::new("test", Duration::from_millis(20), sink);

        writer.schedule(3).await;
        let taken = writer.cancel_with(|pending| pending).await;
        assert_eq!(taken, Some(3));

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(writes.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_write_is_dropped() {
        let sink: WriteSink<u32> = Arc::new(|_| Err(Error::Storage("disk full".to_string())));
        let writer = CoalescedWriter::new("test", Duration::from_millis(10), sink);

        writer.schedule(1).await;
        assert!(!writer.flush().await);
        assert!(!writer.is_pending().await);
    }
}
