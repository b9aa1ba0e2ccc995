use crate::device::HandleId;
use crate::error::EventBusError;
use crate::playback::PlaybackTrigger;
use crate::session::SessionState;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};
use tokio::sync::broadcast;
use tracing::{debug, error, info, trace, warn};

/// Severity of a user-facing notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Error,
}

/// Fire-and-forget sink for user-facing status messages
pub trait NotificationSink: Send + Sync {
    fn notify(&self, kind: NotificationKind, message: &str);
}

/// Events emitted by the capture session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum KioskEvent {
    /// A status message meant for the visitor
    Notification {
        kind: NotificationKind,
        message: String,
        timestamp: SystemTime,
    },
    /// The capture session moved between states
    StateChanged {
        from: SessionState,
        to: SessionState,
    },
    /// A camera was granted to the session
    DeviceAcquired {
        handle_id: HandleId,
        width: u32,
        height: u32,
    },
    /// A camera was released and its tracks stopped
    DeviceReleased {
        handle_id: HandleId,
        tracks_stopped: usize,
    },
    /// The surface started playback of a bound camera
    PlaybackStarted {
        handle_id: HandleId,
        trigger: PlaybackTrigger,
    },
    /// The surface refused playback
    PlaybackRejected { handle_id: HandleId, reason: String },
    /// A still frame was captured and accepted
    FrameCaptured {
        width: u32,
        height: u32,
        byte_len: usize,
    },
    /// A capture attempt failed; the session keeps streaming
    CaptureFailed { reason: String },
}

impl KioskEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            KioskEvent::Notification { kind, message, .. } => {
                format!("[{:?}] {}", kind, message)
            }
            KioskEvent::StateChanged { from, to } => {
                format!("Session {:?} -> {:?}", from, to)
            }
            KioskEvent::DeviceAcquired {
                handle_id,
                width,
                height,
            } => format!("Camera {} acquired ({}x{})", handle_id, width, height),
            KioskEvent::DeviceReleased {
                handle_id,
                tracks_stopped,
            } => format!(
                "Camera {} released ({} tracks stopped)",
                handle_id, tracks_stopped
            ),
            KioskEvent::PlaybackStarted { handle_id, trigger } => {
                format!("Camera {} playing (via {:?})", handle_id, trigger)
            }
            KioskEvent::PlaybackRejected { handle_id, reason } => {
                format!("Camera {} playback rejected: {}", handle_id, reason)
            }
            KioskEvent::FrameCaptured {
                width,
                height,
                byte_len,
            } => format!("Photo captured ({}x{}, {} bytes)", width, height, byte_len),
            KioskEvent::CaptureFailed { reason } => format!("Capture failed: {}", reason),
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            KioskEvent::Notification { .. } => "notification",
            KioskEvent::StateChanged { .. } => "state_changed",
            KioskEvent::DeviceAcquired { .. } => "device_acquired",
            KioskEvent::DeviceReleased { .. } => "device_released",
            KioskEvent::PlaybackStarted { .. } => "playback_started",
            KioskEvent::PlaybackRejected { .. } => "playback_rejected",
            KioskEvent::FrameCaptured { .. } => "frame_captured",
            KioskEvent::CaptureFailed { .. } => "capture_failed",
        }
    }
}

/// Event bus for session observers using broadcast channels
pub struct EventBus {
    sender: broadcast::Sender<KioskEvent>,
    debug_logging: bool,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            debug_logging: false,
        }
    }

    /// Create a new event bus with debug logging enabled
    pub fn with_debug_logging(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            debug_logging: true,
        }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<KioskEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: KioskEvent) -> Result<usize, EventBusError> {
        if self.debug_logging {
            debug!("Publishing event: {}", event.description());
        }

        match &event {
            KioskEvent::Notification {
                kind: NotificationKind::Error,
                message,
                ..
            } => {
                error!("Notification: {}", message);
            }
            KioskEvent::Notification { message, .. } => {
                info!("Notification: {}", message);
            }
            KioskEvent::PlaybackRejected { reason, .. } => {
                warn!("Playback rejected: {}", reason);
            }
            _ => {
                if self.debug_logging {
                    debug!("Event: {}", event.description());
                }
            }
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Publish without caring whether anyone is listening
    pub fn emit(&self, event: KioskEvent) {
        if let Err(e) = self.publish(event) {
            trace!("Event dropped: {}", e);
        }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            debug_logging: self.debug_logging,
        }
    }
}

impl NotificationSink for EventBus {
    fn notify(&self, kind: NotificationKind, message: &str) {
        self.emit(KioskEvent::Notification {
            kind,
            message: message.to_string(),
            timestamp: SystemTime::now(),
        });
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    /// Accept all events
    All,
    /// Accept only specific event types
    EventTypes(Vec<&'static str>),
    /// Custom filter function
    Custom(fn(&KioskEvent) -> bool),
}

impl EventFilter {
    /// Check if an event passes this filter
    pub fn matches(&self, event: &KioskEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
            EventFilter::Custom(filter_fn) => filter_fn(event),
        }
    }
}

/// Event receiver with filtering
pub struct EventReceiver {
    receiver: broadcast::Receiver<KioskEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    pub fn new(receiver: broadcast::Receiver<KioskEvent>, filter: EventFilter, name: String) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    /// Receive the next filtered event
    pub async fn recv(&mut self) -> Result<KioskEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        debug!(
                            "Receiver '{}' received event: {}",
                            self.name,
                            event.description()
                        );
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    return Err(EventBusError::PublishFailed {
                        details: format!("Receiver lagged behind by {} events", n),
                    });
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<Option<KioskEvent>, EventBusError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        return Ok(Some(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => {
                    return Ok(None);
                }
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    return Err(EventBusError::PublishFailed {
                        details: format!("Receiver lagged behind by {} events", n),
                    });
                }
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }
}

/// The single notification currently on screen, hidden after its display period
#[derive(Debug, Clone)]
pub struct NotificationBanner {
    display_for: Duration,
    current: Option<(NotificationKind, String, SystemTime)>,
}

impl NotificationBanner {
    pub fn new(display_for: Duration) -> Self {
        Self {
            display_for,
            current: None,
        }
    }

    /// Show a notification event, replacing whatever was on screen
    pub fn show(&mut self, event: &KioskEvent) -> bool {
        if let KioskEvent::Notification {
            kind,
            message,
            timestamp,
        } = event
        {
            self.current = Some((*kind, message.clone(), *timestamp));
            true
        } else {
            false
        }
    }

    /// Time left before the current notification is dismissed
    pub fn remaining_at(&self, now: SystemTime) -> Option<Duration> {
        let (_, _, shown_at) = self.current.as_ref()?;
        let age = now.duration_since(*shown_at).unwrap_or_default();
        Some(self.display_for.saturating_sub(age))
    }

    /// Take the current notification off screen; returns whether one was shown
    pub fn dismiss(&mut self) -> bool {
        self.current.take().is_some()
    }

    /// The visible notification at `now`, if it has not yet been dismissed
    pub fn visible_at(&self, now: SystemTime) -> Option<(NotificationKind, &str)> {
        let (kind, message, shown_at) = self.current.as_ref()?;
        let age = now.duration_since(*shown_at).unwrap_or_default();
        if age < self.display_for {
            Some((*kind, message.as_str()))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_event_bus_basic_operations() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        event_bus.notify(NotificationKind::Info, "Camera ready");

        let received = receiver.recv().await.unwrap();
        match received {
            KioskEvent::Notification { kind, message, .. } => {
                assert_eq!(kind, NotificationKind::Info);
                assert_eq!(message, "Camera ready");
            }
            _ => panic!("Unexpected event type"),
        }
    }

    #[test]
    fn test_publish_without_subscribers() {
        let event_bus = EventBus::new(4);
        let result = event_bus.publish(KioskEvent::CaptureFailed {
            reason: "nobody home".to_string(),
        });
        assert!(result.is_err());

        // emit swallows the missing-subscriber error
        event_bus.emit(KioskEvent::CaptureFailed {
            reason: "still nobody".to_string(),
        });
        assert_eq!(event_bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_filtered_receiver() {
        let event_bus = EventBus::new(10);
        let mut filtered = EventReceiver::new(
            event_bus.subscribe(),
            EventFilter::EventTypes(vec!["frame_captured"]),
            "test".to_string(),
        );

        event_bus.emit(KioskEvent::StateChanged {
            from: SessionState::Idle,
            to: SessionState::Acquiring,
        });
        event_bus.emit(KioskEvent::FrameCaptured {
            width: 1280,
            height: 720,
            byte_len: 4096,
        });

        let received = timeout(Duration::from_millis(100), filtered.recv())
            .await
            .unwrap()
            .unwrap();
        match received {
            KioskEvent::FrameCaptured { width, height, .. } => {
                assert_eq!((width, height), (1280, 720));
            }
            _ => panic!("Unexpected event type"),
        }
        assert!(filtered.try_recv().unwrap().is_none());
    }

    #[test]
    fn test_event_properties() {
        let event = KioskEvent::FrameCaptured {
            width: 640,
            height: 480,
            byte_len: 2048,
        };

        assert_eq!(event.event_type(), "frame_captured");
        assert!(event.description().contains("640x480"));
        assert!(EventFilter::Custom(|e| e.event_type() == "frame_captured").matches(&event));
        assert!(!EventFilter::EventTypes(vec!["notification"]).matches(&event));
    }

    #[test]
    fn test_notification_banner_dismissal() {
        let mut banner = NotificationBanner::new(Duration::from_secs(5));
        let shown_at = SystemTime::now();
        let event = KioskEvent::Notification {
            kind: NotificationKind::Success,
            message: "Photo captured successfully!".to_string(),
            timestamp: shown_at,
        };

        assert!(banner.show(&event));
        assert_eq!(
            banner.visible_at(shown_at + Duration::from_secs(4)),
            Some((NotificationKind::Success, "Photo captured successfully!"))
        );
        assert_eq!(banner.visible_at(shown_at + Duration::from_secs(5)), None);

        let other = KioskEvent::CaptureFailed {
            reason: "x".to_string(),
        };
        assert!(!banner.show(&other));
    }

    #[test]
    fn test_notification_banner_countdown() {
        let mut banner = NotificationBanner::new(Duration::from_secs(5));
        let shown_at = SystemTime::now();
        assert_eq!(banner.remaining_at(shown_at), None);

        banner.show(&KioskEvent::Notification {
            kind: NotificationKind::Info,
            message: "Camera ready".to_string(),
            timestamp: shown_at,
        });
        assert_eq!(
            banner.remaining_at(shown_at + Duration::from_secs(2)),
            Some(Duration::from_secs(3))
        );
        assert_eq!(
            banner.remaining_at(shown_at + Duration::from_secs(9)),
            Some(Duration::ZERO)
        );

        assert!(banner.dismiss());
        assert!(!banner.dismiss());
        assert_eq!(banner.visible_at(shown_at), None);
        assert_eq!(banner.remaining_at(shown_at), None);
    }

    #[tokio::test]
    async fn test_debug_logging_bus_delivers() {
        let event_bus = EventBus::with_debug_logging(4);
        let mut receiver = event_bus.subscribe();

        event_bus.emit(KioskEvent::StateChanged {
            from: SessionState::Idle,
            to: SessionState::Acquiring,
        });

        assert!(matches!(
            receiver.recv().await.unwrap(),
            KioskEvent::StateChanged { .. }
        ));
        assert_eq!(event_bus.clone().subscriber_count(), 1);
    }
}
