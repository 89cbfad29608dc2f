//! Logging surface used by feed clients.
//!
//! A feed client reports progress through [`Logger`]. Every entry point
//! funnels into [`Logger::log`] or [`Logger::log_information_summary`], so an
//! implementation only has to provide those two. [`EventLogger`] turns each
//! call into a [`LogEvent`] for its subscribers; [`LogForwarder`] hands calls
//! to the `log` facade.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Verbose,
    Information,
    Minimal,
    Warning,
    Error,
}

impl LogLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Verbose => "verbose",
            Self::Information => "information",
            Self::Minimal => "minimal",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    fn to_log_level(self) -> log::Level {
        match self {
            Self::Debug => log::Level::Trace,
            Self::Verbose => log::Level::Debug,
            Self::Information | Self::Minimal => log::Level::Info,
            Self::Warning => log::Level::Warn,
            Self::Error => log::Level::Error,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured log entry, for callers that carry more than a level and text.
#[derive(Debug, Clone)]
pub struct LogMessage {
    pub level: LogLevel,
    pub message: String,
    pub code: Option<String>,
    pub time: DateTime<Utc>,
}

impl LogMessage {
    #[must_use]
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            code: None,
            time: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub level: LogLevel,
    pub message: String,
    pub is_summary: bool,
}

#[async_trait]
pub trait Logger: Send + Sync {
    fn log(&self, level: LogLevel, data: &str);

    fn log_information_summary(&self, data: &str);

    fn log_message(&self, message: &LogMessage) {
        self.log(message.level, &message.message);
    }

    fn log_debug(&self, data: &str) {
        self.log(LogLevel::Debug, data);
    }

    fn log_verbose(&self, data: &str) {
        self.log(LogLevel::Verbose, data);
    }

    fn log_information(&self, data: &str) {
        self.log(LogLevel::Information, data);
    }

    fn log_minimal(&self, data: &str) {
        self.log(LogLevel::Minimal, data);
    }

    fn log_warning(&self, data: &str) {
        self.log(LogLevel::Warning, data);
    }

    fn log_error(&self, data: &str) {
        self.log(LogLevel::Error, data);
    }

    async fn log_async(&self, level: LogLevel, data: &str) {
        self.log(level, data);
    }

    async fn log_message_async(&self, message: &LogMessage) {
        self.log_message(message);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _level: LogLevel, _data: &str) {}

    fn log_information_summary(&self, _data: &str) {}
}

/// Forwards feed log calls to the `log` facade.
#[derive(Debug, Clone, Copy)]
pub struct LogForwarder {
    target: &'static str,
}

impl LogForwarder {
    #[must_use]
    pub fn new(target: &'static str) -> Self {
        Self { target }
    }
}

impl Default for LogForwarder {
    fn default() -> Self {
        Self::new("nugetw::feed")
    }
}

impl Logger for LogForwarder {
    fn log(&self, level: LogLevel, data: &str) {
        log::log!(target: self.target, level.to_log_level(), "{data}");
    }

    fn log_information_summary(&self, data: &str) {
        log::info!(target: self.target, "{data}");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Box<dyn Fn(&LogEvent) + Send + Sync>;

enum Subscriber {
    Callback(Callback),
    Channel(crossbeam_channel::Sender<LogEvent>),
}

/// Logger that publishes every call as a [`LogEvent`].
///
/// Dispatch is synchronous on the logging thread. Nothing is buffered here:
/// with no subscribers the event is dropped. Callbacks must not subscribe or
/// unsubscribe from inside a dispatch.
#[derive(Default)]
pub struct EventLogger {
    next_id: AtomicU64,
    subscribers: RwLock<Vec<(SubscriptionId, Subscriber)>>,
}

impl EventLogger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&LogEvent) + Send + Sync + 'static,
    {
        self.insert(Subscriber::Callback(Box::new(callback)))
    }

    /// Subscribe through a channel. The subscription ends when the receiver
    /// is dropped.
    pub fn subscribe_channel(&self) -> crossbeam_channel::Receiver<LogEvent> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        self.insert(Subscriber::Channel(sender));
        receiver
    }

    /// Returns `true` if the subscription existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn insert(&self, subscriber: Subscriber) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, subscriber));
        id
    }

    fn dispatch(&self, level: LogLevel, data: &str, is_summary: bool) {
        let event = LogEvent {
            level,
            message: data.to_string(),
            is_summary,
        };

        let mut disconnected = Vec::new();
        {
            let subscribers = self
                .subscribers
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            for (id, subscriber) in subscribers.iter() {
                match subscriber {
                    Subscriber::Callback(callback) => callback(&event),
                    Subscriber::Channel(sender) => {
                        if sender.send(event.clone()).is_err() {
                            disconnected.push(*id);
                        }
                    }
                }
            }
        }

        for id in disconnected {
            self.unsubscribe(id);
        }
    }
}

impl std::fmt::Debug for EventLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLogger")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl Logger for EventLogger {
    fn log(&self, level: LogLevel, data: &str) {
        self.dispatch(level, data, false);
    }

    fn log_information_summary(&self, data: &str) {
        self.dispatch(LogLevel::Information, data, true);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn recording_logger() -> (EventLogger, Arc<Mutex<Vec<LogEvent>>>) {
        let logger = EventLogger::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        logger.subscribe(move |event| sink.lock().expect("events lock").push(event.clone()));
        (logger, events)
    }

    #[test]
    fn level_helpers_funnel_into_log() {
        let (logger, events) = recording_logger();

        logger.log_debug("d");
        logger.log_verbose("v");
        logger.log_information("i");
        logger.log_minimal("m");
        logger.log_warning("w");
        logger.log_error("e");

        let levels: Vec<LogLevel> = events
            .lock()
            .expect("events lock")
            .iter()
            .map(|event| event.level)
            .collect();
        assert_eq!(
            levels,
            vec![
                LogLevel::Debug,
                LogLevel::Verbose,
                LogLevel::Information,
                LogLevel::Minimal,
                LogLevel::Warning,
                LogLevel::Error,
            ]
        );
    }

    #[test]
    fn summary_is_flagged_at_information_level() {
        let (logger, events) = recording_logger();

        logger.log_information_summary("3 packages");

        let events = events.lock().expect("events lock");
        assert_eq!(
            events.as_slice(),
            &[LogEvent {
                level: LogLevel::Information,
                message: "3 packages".to_string(),
                is_summary: true,
            }]
        );
    }

    #[test]
    fn structured_message_uses_its_level() {
        let (logger, events) = recording_logger();

        logger.log_message(&LogMessage::new(LogLevel::Warning, "slow feed"));

        let events = events.lock().expect("events lock");
        assert_eq!(events[0].level, LogLevel::Warning);
        assert_eq!(events[0].message, "slow feed");
        assert!(!events[0].is_summary);
    }

    #[tokio::test]
    async fn async_variants_dispatch_immediately() {
        let (logger, events) = recording_logger();

        logger.log_async(LogLevel::Error, "boom").await;
        logger
            .log_message_async(&LogMessage::new(LogLevel::Minimal, "done"))
            .await;

        assert_eq!(events.lock().expect("events lock").len(), 2);
    }

    #[test]
    fn every_subscriber_receives_each_event() {
        let logger = EventLogger::new();
        let first = logger.subscribe_channel();
        let second = logger.subscribe_channel();

        logger.log_information("hello");

        assert_eq!(first.try_recv().expect("first event").message, "hello");
        assert_eq!(second.try_recv().expect("second event").message, "hello");
    }

    #[test]
    fn events_without_subscribers_are_dropped() {
        let logger = EventLogger::new();
        logger.log_error("nobody listening");

        let late = logger.subscribe_channel();
        assert!(late.try_recv().is_err());
    }

    #[test]
    fn unsubscribe_and_dropped_receivers_stop_delivery() {
        let (logger, events) = recording_logger();
        let receiver = logger.subscribe_channel();
        assert_eq!(logger.subscriber_count(), 2);

        drop(receiver);
        logger.log_information("prunes channel");
        assert_eq!(logger.subscriber_count(), 1);

        let id = logger.subscribe(|_| {});
        assert!(logger.unsubscribe(id));
        assert!(!logger.unsubscribe(id));
        assert_eq!(events.lock().expect("events lock").len(), 1);
    }

    #[test]
    fn null_logger_accepts_everything() {
        let logger = NullLogger;
        logger.log_warning("ignored");
        logger.log_information_summary("ignored");
    }
}
