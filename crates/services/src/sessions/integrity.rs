use async_trait::async_trait;
use tokio::sync::mpsc;

/// Message shown when the host is about to close the session view.
pub const UNLOAD_PROMPT: &str = "Are you sure you want to leave? Your progress will be lost.";

/// Visibility transitions reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityEvent {
    Hidden,
    Visible,
    /// The host is about to leave or close the session view.
    BeforeUnload,
}

/// Host capability delivering visibility events.
///
/// Returning `None` means the host stopped reporting; no further events will arrive.
#[async_trait]
pub trait VisibilitySource: Send {
    async fn next_event(&mut self) -> Option<VisibilityEvent>;
}

#[async_trait]
impl VisibilitySource for mpsc::Receiver<VisibilityEvent> {
    async fn next_event(&mut self) -> Option<VisibilityEvent> {
        self.recv().await
    }
}

#[async_trait]
impl VisibilitySource for mpsc::UnboundedReceiver<VisibilityEvent> {
    async fn next_event(&mut self) -> Option<VisibilityEvent> {
        self.recv().await
    }
}

/// What the monitor reports to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegritySignal {
    /// The view was hidden. Whether this counts as a violation depends on the
    /// session phase, so the count lives with the attempt.
    Hidden,
    /// The host is about to unload. Advisory only: a confirmation prompt can
    /// be shown, but no host is obliged to honour it.
    UnloadAttempt,
}

/// Turns host visibility events into integrity signals.
///
/// The monitor only filters; counting violations and deciding between a
/// warning and a forced submission belong to the session.
pub struct IntegrityMonitor {
    source: Option<Box<dyn VisibilitySource>>,
}

impl IntegrityMonitor {
    #[must_use]
    pub fn new(source: impl VisibilitySource + 'static) -> Self {
        Self {
            source: Some(Box::new(source)),
        }
    }

    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.source.is_some()
    }

    /// Drop the host source. Later calls to `next_signal` never resolve.
    pub fn unsubscribe(&mut self) {
        if self.source.take().is_some() {
            tracing::debug!("integrity monitor unsubscribed");
        }
    }

    /// Wait for the next signal. Pending forever once unsubscribed or once the
    /// host source is exhausted, so it can sit in a `select!` safely.
    pub async fn next_signal(&mut self) -> IntegritySignal {
        loop {
            let Some(source) = self.source.as_mut() else {
                return std::future::pending().await;
            };

            match source.next_event().await {
                Some(VisibilityEvent::Hidden) => {
                    tracing::debug!("visibility lost");
                    return IntegritySignal::Hidden;
                }
                Some(VisibilityEvent::BeforeUnload) => return IntegritySignal::UnloadAttempt,
                Some(VisibilityEvent::Visible) => {}
                None => self.source = None,
            }
        }
    }
}
