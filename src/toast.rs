// Toast/Alert Sink - ephemeral user-visible messages, fire-and-forget

use std::sync::Mutex;
use tracing::info;

use crate::records::NotificationType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToastKind {
    Info,
    Success,
    Warning,
    Error,
}

impl ToastKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToastKind::Info => "info",
            ToastKind::Success => "success",
            ToastKind::Warning => "warning",
            ToastKind::Error => "error",
        }
    }
}

impl From<NotificationType> for ToastKind {
    fn from(kind: NotificationType) -> Self {
        match kind {
            NotificationType::Info => ToastKind::Info,
            NotificationType::Success => ToastKind::Success,
            NotificationType::Warning => ToastKind::Warning,
            NotificationType::Error => ToastKind::Error,
        }
    }
}

pub trait ToastSink: Send + Sync {
    fn notify(&self, message: &str, kind: ToastKind);
}

/// Sink that only emits a structured log event
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingToastSink;

impl ToastSink for TracingToastSink {
    fn notify(&self, message: &str, kind: ToastKind) {
        info!(toast.kind = kind.as_str(), toast.message = message, "Toast");
    }
}

/// Sink that keeps every toast; a UI can drain it on its own schedule
#[derive(Debug, Default)]
pub struct RecordingToastSink {
    toasts: Mutex<Vec<(String, ToastKind)>>,
}

impl RecordingToastSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toasts(&self) -> Vec<(String, ToastKind)> {
        self.lock().clone()
    }

    pub fn drain(&self) -> Vec<(String, ToastKind)> {
        std::mem::take(&mut *self.lock())
    }

    pub fn count(&self, kind: ToastKind) -> usize {
        self.lock().iter().filter(|(_, k)| *k == kind).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, ToastKind)>> {
        self.toasts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ToastSink for RecordingToastSink {
    fn notify(&self, message: &str, kind: ToastKind) {
        self.lock().push((message.to_string(), kind));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_drains() {
        let sink = RecordingToastSink::new();
        sink.notify("saved", ToastKind::Success);
        sink.notify("offline", ToastKind::Warning);

        assert_eq!(sink.count(ToastKind::Warning), 1);
        assert_eq!(sink.drain().len(), 2);
        assert!(sink.toasts().is_empty());
    }

    #[test]
    fn test_kind_follows_notification_type() {
        assert_eq!(ToastKind::from(NotificationType::Error), ToastKind::Error);
        assert_eq!(ToastKind::from(NotificationType::default()), ToastKind::Info);
    }
}
