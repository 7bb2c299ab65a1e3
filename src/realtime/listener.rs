//! Notification listener.

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::{RealtimeChannel, RealtimeConnector};
use crate::api::UpdateService;
use crate::auth::redact_url;
use crate::errors::AppError;
use crate::models::{InboundFrame, PhoenixFrame, JOIN_REF};
use crate::updater::UpdateChecker;

/// What the listener processed before the connection closed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListenSummary {
    /// Text frames received
    pub frames: u64,
    /// `new_update` notifications handled
    pub notifications: u64,
    /// Heartbeats sent
    pub heartbeats: u64,
}

/// Joins one topic and reacts to release notifications.
pub struct NotificationListener<'a, C, S> {
    connector: C,
    checker: &'a UpdateChecker<S>,
    url: String,
    topic: String,
    heartbeat: Option<Duration>,
}

impl<'a, C, S> NotificationListener<'a, C, S>
where
    C: RealtimeConnector,
    S: UpdateService,
{
    pub fn new(
        connector: C,
        checker: &'a UpdateChecker<S>,
        url: impl Into<String>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            connector,
            checker,
            url: url.into(),
            topic: topic.into(),
            heartbeat: None,
        }
    }

    /// Send a Phoenix heartbeat every `period` while listening.
    pub fn with_heartbeat(mut self, period: Option<Duration>) -> Self {
        self.heartbeat = period;
        self
    }

    /// Listen until the connection closes or fails.
    ///
    /// Frames are handled one at a time in arrival order; the update check
    /// triggered by a notification finishes before the next frame is read. Any
    /// receive, send or decode error is logged and ends listening. There is no
    /// reconnect.
    pub async fn listen_for_notifications(&self) -> Result<ListenSummary, AppError> {
        info!("Connecting to real-time channel: {}", redact_url(&self.url));

        let mut channel = match self.connector.connect(&self.url).await {
            Ok(channel) => channel,
            Err(e) => {
                error!("Error in websocket connection: {}", e);
                return Err(e);
            }
        };

        let join = PhoenixFrame::join(self.topic.as_str()).to_text()?;
        if let Err(e) = channel.send_text(join).await {
            error!("Error joining {}: {}", self.topic, e);
            return Err(e);
        }
        info!("Joined {}, waiting for notifications", self.topic);

        let result = self.receive_loop(&mut channel).await;
        match &result {
            Ok(summary) => info!(
                "Real-time connection closed after {} frames ({} notifications)",
                summary.frames, summary.notifications
            ),
            Err(e) => error!("Error in websocket connection: {}", e),
        }
        result
    }

    async fn receive_loop(&self, channel: &mut C::Channel) -> Result<ListenSummary, AppError> {
        let mut summary = ListenSummary::default();
        let mut heartbeat = self.heartbeat.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        let mut next_ref = JOIN_REF + 1;

        loop {
            let frame = tokio::select! {
                frame = channel.next_text() => frame,
                _ = tick(&mut heartbeat) => {
                    let text = PhoenixFrame::heartbeat(next_ref).to_text()?;
                    channel.send_text(text).await?;
                    debug!("Heartbeat sent (ref {})", next_ref);
                    next_ref += 1;
                    summary.heartbeats += 1;
                    continue;
                }
            };

            let text = match frame {
                Some(frame) => frame?,
                None => return Ok(summary),
            };
            summary.frames += 1;

            match InboundFrame::parse(&text)? {
                InboundFrame::NewUpdate(notification) => {
                    summary.notifications += 1;
                    info!("New update notification received!");
                    info!("Version: {}", notification.version);
                    info!("Release notes: {}", notification.release_notes);

                    // A user-facing prompt would hook in here; the outcome is already logged.
                    let _ = self.checker.check_for_updates().await;
                }
                InboundFrame::Reply { topic, status } => match status.as_deref() {
                    Some("ok") => debug!("Reply ok for {}", topic.as_deref().unwrap_or("?")),
                    other => warn!(
                        "Reply for {} with status {}",
                        topic.as_deref().unwrap_or("?"),
                        other.unwrap_or("<missing>")
                    ),
                },
                InboundFrame::Other => {}
            }
        }
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use serde_json::{json, Value};

    use super::*;
    use crate::models::VersionCheckResponse;

    /// Counts update checks; always answers "up to date".
    #[derive(Default)]
    struct CountingService {
        calls: Mutex<u32>,
    }

    impl UpdateService for CountingService {
        async fn check_update(&self, _: &str) -> Result<VersionCheckResponse, AppError> {
            *self.calls.lock().unwrap() += 1;
            Ok(VersionCheckResponse {
                update_available: false,
                latest_version: None,
                release_notes: None,
                download_url: None,
                requires_update: None,
            })
        }
    }

    enum Scripted {
        Text(String),
        Fail(&'static str),
    }

    /// Replays scripted inbound frames, then reports the connection as closed
    /// (or hangs, when `hold_open` is set).
    struct ScriptedChannel {
        inbound: VecDeque<Scripted>,
        sent: Arc<Mutex<Vec<String>>>,
        hold_open: bool,
    }

    impl RealtimeChannel for ScriptedChannel {
        async fn send_text(&mut self, text: String) -> Result<(), AppError> {
            self.sent.lock().unwrap().push(text);
            Ok(())
        }

        async fn next_text(&mut self) -> Option<Result<String, AppError>> {
            match self.inbound.pop_front() {
                Some(Scripted::Text(text)) => Some(Ok(text)),
                Some(Scripted::Fail(msg)) => Some(Err(AppError::Realtime(msg.to_string()))),
                None if self.hold_open => std::future::pending().await,
                None => None,
            }
        }
    }

    struct ScriptedConnector {
        frames: Mutex<Option<VecDeque<Scripted>>>,
        sent: Arc<Mutex<Vec<String>>>,
        urls: Mutex<Vec<String>>,
        hold_open: bool,
    }

    impl ScriptedConnector {
        fn new(frames: Vec<Scripted>) -> Self {
            Self {
                frames: Mutex::new(Some(frames.into())),
                sent: Arc::new(Mutex::new(Vec::new())),
                urls: Mutex::new(Vec::new()),
                hold_open: false,
            }
        }

        fn sent(&self) -> Vec<Value> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|text| serde_json::from_str(text).unwrap())
                .collect()
        }
    }

    impl RealtimeConnector for &ScriptedConnector {
        type Channel = ScriptedChannel;

        async fn connect(&self, url: &str) -> Result<ScriptedChannel, AppError> {
            self.urls.lock().unwrap().push(url.to_string());
            let inbound = self
                .frames
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| AppError::Realtime("connected twice".to_string()))?;
            Ok(ScriptedChannel {
                inbound,
                sent: Arc::clone(&self.sent),
                hold_open: self.hold_open,
            })
        }
    }

    fn text(value: Value) -> Scripted {
        Scripted::Text(value.to_string())
    }

    fn new_update(version: &str) -> Scripted {
        text(json!({
            "topic": "realtime:public:broadcasts",
            "event": "INSERT",
            "payload": {
                "action": "new_update",
                "message": { "version": version, "releaseNotes": "notes" }
            },
            "ref": null
        }))
    }

    const URL: &str = "ws://localhost/realtime/v1/websocket?apikey=k&vsn=1.0.0";
    const TOPIC: &str = "realtime:public:broadcasts";

    #[tokio::test]
    async fn test_sends_single_join_frame() {
        let connector = ScriptedConnector::new(vec![]);
        let checker = UpdateChecker::new(CountingService::default(), "1.0.0");
        let listener = NotificationListener::new(&connector, &checker, URL, TOPIC);

        let summary = listener.listen_for_notifications().await.unwrap();

        assert_eq!(summary, ListenSummary::default());
        assert_eq!(*connector.urls.lock().unwrap(), vec![URL]);
        assert_eq!(
            connector.sent(),
            vec![json!({
                "topic": "realtime:public:broadcasts",
                "event": "phx_join",
                "payload": {},
                "ref": 1
            })]
        );
    }

    #[tokio::test]
    async fn test_each_notification_triggers_one_check() {
        let connector = ScriptedConnector::new(vec![
            text(json!({ "event": "phx_reply", "topic": TOPIC, "payload": { "status": "ok" }, "ref": 1 })),
            new_update("1.1.0"),
            new_update("1.2.0"),
        ]);
        let checker = UpdateChecker::new(CountingService::default(), "1.0.0");
        let listener = NotificationListener::new(&connector, &checker, URL, TOPIC);

        let summary = listener.listen_for_notifications().await.unwrap();

        assert_eq!(summary.frames, 3);
        assert_eq!(summary.notifications, 2);
        assert_eq!(*checker_calls(&checker), 2);
    }

    #[tokio::test]
    async fn test_non_matching_frames_do_not_trigger_checks() {
        let connector = ScriptedConnector::new(vec![
            text(json!({ "event": "UPDATE", "payload": { "action": "new_update" } })),
            text(json!({ "event": "INSERT", "payload": { "action": "announcement" } })),
            text(json!({ "event": "presence_state", "payload": {} })),
            text(json!({ "payload": {} })),
        ]);
        let checker = UpdateChecker::new(CountingService::default(), "1.0.0");
        let listener = NotificationListener::new(&connector, &checker, URL, TOPIC);

        let summary = listener.listen_for_notifications().await.unwrap();

        assert_eq!(summary.frames, 4);
        assert_eq!(summary.notifications, 0);
        assert_eq!(*checker_calls(&checker), 0);
    }

    #[tokio::test]
    async fn test_non_string_event_keeps_listening() {
        let connector = ScriptedConnector::new(vec![
            text(json!({ "event": 5 })),
            text(json!({ "topic": 7, "event": "presence_diff", "payload": {} })),
            new_update("1.1.0"),
        ]);
        let checker = UpdateChecker::new(CountingService::default(), "1.0.0");
        let listener = NotificationListener::new(&connector, &checker, URL, TOPIC);

        let summary = listener.listen_for_notifications().await.unwrap();

        assert_eq!(summary.frames, 3);
        assert_eq!(summary.notifications, 1);
        assert_eq!(*checker_calls(&checker), 1);
    }

    #[tokio::test]
    async fn test_malformed_frame_ends_listening() {
        let connector = ScriptedConnector::new(vec![
            Scripted::Text("{not json".to_string()),
            new_update("1.1.0"),
        ]);
        let checker = UpdateChecker::new(CountingService::default(), "1.0.0");
        let listener = NotificationListener::new(&connector, &checker, URL, TOPIC);

        let err = listener.listen_for_notifications().await.unwrap_err();

        assert!(matches!(err, AppError::Decode(_)));
        assert_eq!(*checker_calls(&checker), 0);
    }

    #[tokio::test]
    async fn test_receive_error_ends_listening() {
        let connector = ScriptedConnector::new(vec![
            new_update("1.1.0"),
            Scripted::Fail("connection reset"),
            new_update("1.2.0"),
        ]);
        let checker = UpdateChecker::new(CountingService::default(), "1.0.0");
        let listener = NotificationListener::new(&connector, &checker, URL, TOPIC);

        let err = listener.listen_for_notifications().await.unwrap_err();

        assert!(matches!(err, AppError::Realtime(_)));
        assert_eq!(*checker_calls(&checker), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeats_while_idle() {
        let mut connector = ScriptedConnector::new(vec![]);
        connector.hold_open = true;
        let checker = UpdateChecker::new(CountingService::default(), "1.0.0");
        let listener = NotificationListener::new(&connector, &checker, URL, TOPIC)
            .with_heartbeat(Some(Duration::from_secs(30)));

        let listening = listener.listen_for_notifications();
        let timed_out = tokio::time::timeout(Duration::from_secs(95), listening).await;
        assert!(timed_out.is_err());

        let sent = connector.sent();
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[0]["event"], "phx_join");
        for (i, frame) in sent[1..].iter().enumerate() {
            assert_eq!(frame["topic"], "phoenix");
            assert_eq!(frame["event"], "heartbeat");
            assert_eq!(frame["ref"], 2 + i as u64);
        }
    }

    fn checker_calls(checker: &UpdateChecker<CountingService>) -> std::sync::MutexGuard<'_, u32> {
        checker.service().calls.lock().unwrap()
    }
}
