//! Handlers for the server events the dashboard understands.

use std::sync::Arc;

use super::messages::{InboundEvent, M3U_REFRESH, M3uRefresh};
use super::router::{EventHandler, EventRouter};
use crate::error::ClientError;
use crate::service::collaborators::{Notifier, Severity, StreamsRefresher};

const REFRESH_DONE_TEXT: &str = "Playlist refresh complete";
const REFRESH_FAILED_TEXT: &str = "Playlist refresh failed";

/// Handles `m3u_refresh`: on success, re-fetches streams and tells the user.
///
/// A failed refresh is silent unless `notify_failures` is set, in which
/// case an error notification is shown and no re-fetch happens.
#[derive(Debug)]
pub struct M3uRefreshHandler {
    refresher: Arc<dyn StreamsRefresher>,
    notifier: Arc<dyn Notifier>,
    notify_failures: bool,
}

impl M3uRefreshHandler {
    /// Creates the handler.
    #[must_use]
    pub fn new(
        refresher: Arc<dyn StreamsRefresher>,
        notifier: Arc<dyn Notifier>,
        notify_failures: bool,
    ) -> Self {
        Self {
            refresher,
            notifier,
            notify_failures,
        }
    }
}

impl EventHandler for M3uRefreshHandler {
    fn event_type(&self) -> &'static str {
        M3U_REFRESH
    }

    fn handle(&self, event: &InboundEvent) -> Result<(), ClientError> {
        let payload: M3uRefresh = event.decode_message()?;

        if payload.success {
            self.refresher.refresh();
            let text = payload.message.as_deref().unwrap_or(REFRESH_DONE_TEXT);
            self.notifier.notify(text, Severity::Success);
        } else if self.notify_failures {
            let text = payload.message.as_deref().unwrap_or(REFRESH_FAILED_TEXT);
            self.notifier.notify(text, Severity::Error);
        } else {
            tracing::debug!(message = ?payload.message, "ignoring unsuccessful m3u refresh");
        }
        Ok(())
    }
}

/// Builds the router with every handler the dashboard ships with.
#[must_use]
pub fn default_router(
    refresher: Arc<dyn StreamsRefresher>,
    notifier: Arc<dyn Notifier>,
    notify_refresh_failures: bool,
) -> EventRouter {
    EventRouter::new().with_handler(Arc::new(M3uRefreshHandler::new(
        refresher,
        notifier,
        notify_refresh_failures,
    )))
}


#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::test_support::{RecordingNotifier, RecordingRefresher};
    use super::*;

    fn setup(notify_failures: bool) -> (EventRouter, Arc<RecordingRefresher>, Arc<RecordingNotifier>) {
        let refresher = Arc::new(RecordingRefresher::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let router = default_router(
            Arc::clone(&refresher) as Arc<dyn StreamsRefresher>,
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            notify_failures,
        );
        (router, refresher, notifier)
    }

    fn route(router: &EventRouter, raw: &str) -> Result<(), ClientError> {
        let Ok(event) = InboundEvent::decode(raw) else {
            panic!("test frame must decode: {raw}");
        };
        router.route(&event)
    }

    #[test]
    fn successful_refresh_triggers_one_refresh_and_one_notification() {
        let (router, refresher, notifier) = setup(false);
        let raw = r#"{"type":"m3u_refresh","message":{"success":true,"message":"Playlist updated"}}"#;

        assert!(route(&router, raw).is_ok());

        assert_eq!(refresher.calls(), 1);
        assert_eq!(
            notifier.seen(),
            vec![("Playlist updated".to_string(), Severity::Success)]
        );
    }

    #[test]
    fn each_event_triggers_its_own_refresh() {
        let (router, refresher, notifier) = setup(false);
        let raw = r#"{"type":"m3u_refresh","message":{"success":true,"message":"ok"}}"#;

        for _ in 0..3 {
            assert!(route(&router, raw).is_ok());
        }
        assert_eq!(refresher.calls(), 3);
        assert_eq!(notifier.seen().len(), 3);
    }

    #[test]
    fn failed_refresh_is_silent_by_default() {
        let (router, refresher, notifier) = setup(false);

        assert!(route(&router, r#"{"type":"m3u_refresh","message":{"success":false}}"#).is_ok());
        assert!(route(&router, r#"{"type":"m3u_refresh"}"#).is_ok());

        assert_eq!(refresher.calls(), 0);
        assert!(notifier.seen().is_empty());
    }

    #[test]
    fn failed_refresh_notifies_when_enabled() {
        let (router, refresher, notifier) = setup(true);

        assert!(route(
            &router,
            r#"{"type":"m3u_refresh","message":{"success":false,"message":"Account unreachable"}}"#
        )
        .is_ok());

        assert_eq!(refresher.calls(), 0);
        assert_eq!(
            notifier.seen(),
            vec![("Account unreachable".to_string(), Severity::Error)]
        );
    }

    #[test]
    fn success_without_text_uses_fallback() {
        let (router, _refresher, notifier) = setup(false);
        assert!(route(&router, r#"{"type":"m3u_refresh","message":{"success":true}}"#).is_ok());
        assert_eq!(
            notifier.seen(),
            vec![(REFRESH_DONE_TEXT.to_string(), Severity::Success)]
        );
    }

    #[test]
    fn malformed_payload_is_an_error_without_side_effects() {
        let (router, refresher, notifier) = setup(true);
        let result = route(&router, r#"{"type":"m3u_refresh","message":{"success":"yes"}}"#);
        assert!(matches!(result, Err(ClientError::Decode(_))));
        assert_eq!(refresher.calls(), 0);
        assert!(notifier.seen().is_empty());
    }
}
