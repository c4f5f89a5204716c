//! Diagnostic stream of command invocations.
//!
//! Handlers push a [`CommandEvent`] for every routed command onto a bounded
//! queue; a separate observer task drains it into the log. Nothing in the
//! command path waits on the observer: a full or closed queue drops events.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use chrono::{DateTime, Utc};
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
};
use tracing::{debug, info};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandEvent {
    pub timestamp: DateTime<Utc>,
    pub command: String,
    pub parameters: BTreeMap<String, String>,
    pub event: EventSummary,
}

/// Where the command came from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventSummary {
    pub envelope_id: String,
    pub event_type: String,
    pub channel_id: String,
    pub user_id: String,
    pub text: String,
}

#[derive(Clone, Debug, Default)]
pub struct CommandEventSink {
    sender: Option<mpsc::Sender<CommandEvent>>,
}

impl CommandEventSink {
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    pub fn emit(&self, event: CommandEvent) {
        let Some(sender) = &self.sender else {
            return;
        };

        match sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                debug!(command = %event.command, "command event queue full; dropping event");
            }
            Err(TrySendError::Closed(event)) => {
                debug!(command = %event.command, "command event observer stopped; dropping event");
            }
        }
    }
}

pub fn command_event_channel(buffer: usize) -> (CommandEventSink, mpsc::Receiver<CommandEvent>) {
    let (sender, receiver) = mpsc::channel(buffer.max(1));
    (CommandEventSink { sender: Some(sender) }, receiver)
}

#[derive(Clone, Debug, Default)]
pub struct CommandObserver {
    observed: Arc<AtomicU64>,
}

impl CommandObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observed(&self) -> u64 {
        self.observed.load(Ordering::Relaxed)
    }

    /// Drains `receiver` until every sink is dropped.
    pub fn spawn(&self, mut receiver: mpsc::Receiver<CommandEvent>) -> JoinHandle<()> {
        let observed = Arc::clone(&self.observed);
        tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                observed.fetch_add(1, Ordering::Relaxed);
                info!(
                    event_name = "command.invoked",
                    correlation_id = %event.event.envelope_id,
                    timestamp = %event.timestamp.to_rfc3339(),
                    command = %event.command,
                    parameters = ?event.parameters,
                    event_type = %event.event.event_type,
                    channel_id = %event.event.channel_id,
                    user_id = %event.event.user_id,
                    "command event"
                );
            }
            debug!("command event stream closed");
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;

    use super::{command_event_channel, CommandEvent, CommandEventSink, CommandObserver};

    fn event(command: &str) -> CommandEvent {
        CommandEvent {
            timestamp: Utc::now(),
            command: command.to_owned(),
            parameters: BTreeMap::from([("dob".to_owned(), "1990-05-15".to_owned())]),
            event: Default::default(),
        }
    }

    #[tokio::test]
    async fn observer_counts_drained_events() {
        let (sink, receiver) = command_event_channel(4);
        let observer = CommandObserver::new();
        let handle = observer.spawn(receiver);

        sink.emit(event("my dob is <dob>"));
        sink.emit(event("<dob>"));
        drop(sink);

        handle.await.expect("observer task");
        assert_eq!(observer.observed(), 2);
    }

    #[tokio::test]
    async fn full_queue_drops_without_blocking() {
        let (sink, mut receiver) = command_event_channel(1);
        sink.emit(event("first"));
        sink.emit(event("second"));
        drop(sink);

        assert_eq!(receiver.recv().await.map(|event| event.command).as_deref(), Some("first"));
        assert!(receiver.recv().await.is_none());
    }

    #[test]
    fn disabled_sink_ignores_events() {
        CommandEventSink::disabled().emit(event("ignored"));
    }
}
