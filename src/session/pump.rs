//! Lifecycle event pump
//!
//! Drains the session client's event channel into [`SessionState`].

use super::{SessionEvent, SessionState};
use crate::event_log::EventLog;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Start as a background task. Returns JoinHandle.
/// The task ends once every sender of `events` is dropped.
pub fn spawn_event_pump(
    mut events: mpsc::Receiver<SessionEvent>,
    state: SessionState,
    log: Arc<EventLog>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            tracing::debug!("WhatsApp: lifecycle event {:?}", event);
            state.apply(&event, &log).await;
        }
        tracing::debug!("WhatsApp: lifecycle channel closed");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionPhase;

    #[tokio::test]
    async fn test_pump_applies_events_in_order() {
        let (tx, rx) = mpsc::channel(8);
        let state = SessionState::new();
        let handle = spawn_event_pump(rx, state.clone(), Arc::new(EventLog::disabled()));

        tx.send(SessionEvent::QrIssued("pair-me".into())).await.unwrap();
        tx.send(SessionEvent::Ready).await.unwrap();
        tx.send(SessionEvent::Disconnected("phone offline".into()))
            .await
            .unwrap();
        drop(tx);
        handle.await.unwrap();

        let status = state.status().await;
        assert_eq!(status.phase, SessionPhase::Disconnected);
        assert!(state.qr().await.is_some());
    }
}
