use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};

const SETTLED_BUFFER: usize = 16;

/// Quiet periods used by the application form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceWindow {
    Validation,
    DuplicateCheck,
    DraftPersistence,
}

impl DebounceWindow {
    pub const fn duration(self) -> Duration {
        match self {
            DebounceWindow::Validation => Duration::from_millis(500),
            DebounceWindow::DuplicateCheck => Duration::from_millis(1_000),
            DebounceWindow::DraftPersistence => Duration::from_millis(2_000),
        }
    }
}

/// Trailing-edge debouncer: every burst of pushes settles into exactly one emission of the
/// latest value once the quiet period elapses without another push.
///
/// Dropping the debouncer aborts its timer task, so a pending value is never emitted.
#[derive(Debug)]
pub struct InputDebouncer<T> {
    input: mpsc::UnboundedSender<T>,
    task: JoinHandle<()>,
}

impl<T> InputDebouncer<T>
where
    T: Send + 'static,
{
    pub fn spawn(quiet: Duration) -> (Self, mpsc::Receiver<T>) {
        let (input, changes) = mpsc::unbounded_channel();
        let (settled_tx, settled_rx) = mpsc::channel(SETTLED_BUFFER);
        let task = tokio::spawn(debounce(quiet, changes, settled_tx));
        (Self { input, task }, settled_rx)
    }

    pub fn for_window(window: DebounceWindow) -> (Self, mpsc::Receiver<T>) {
        Self::spawn(window.duration())
    }

    /// Record a change. Returns `false` once the debouncer has stopped.
    pub fn push(&self, value: T) -> bool {
        self.input.send(value).is_ok()
    }

    /// Stop the timer; a pending value is never emitted.
    pub fn cancel(self) {
        self.task.abort();
    }
}

impl<T> Drop for InputDebouncer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn debounce<T>(
    quiet: Duration,
    mut changes: mpsc::UnboundedReceiver<T>,
    settled: mpsc::Sender<T>,
) {
    let timer = sleep(quiet);
    tokio::pin!(timer);
    let mut pending = None;

    loop {
        tokio::select! {
            biased;
            change = changes.recv() => match change {
                Some(value) => {
                    pending = Some(value);
                    timer.as_mut().reset(Instant::now() + quiet);
                }
                None => break,
            },
            () = &mut timer, if pending.is_some() => {
                if let Some(value) = pending.take() {
                    if settled.send(value).await.is_err() {
                        break;
                    }
                }
            }
        }
    }
}
