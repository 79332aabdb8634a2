//! Integration tests for events

#[cfg(test)]
mod tests {
    use modinstall_errors::{Error, NetworkError};
    use modinstall_events::*;
    use modinstall_types::InstallPhase;

    #[tokio::test]
    async fn test_emitter_helpers() {
        let (tx, mut rx) = channel();

        tx.emit_error("test error");
        tx.emit_debug("test debug");
        tx.emit_phase(InstallPhase::Fetching);

        let event1 = rx.recv().await.unwrap();
        assert!(matches!(event1, AppEvent::General(GeneralEvent::Error { .. })));

        let event2 = rx.recv().await.unwrap();
        assert!(matches!(
            event2,
            AppEvent::General(GeneralEvent::DebugLog { .. })
        ));

        let event3 = rx.recv().await.unwrap();
        assert!(matches!(
            event3,
            AppEvent::Install(InstallEvent::PhaseChanged {
                phase: InstallPhase::Fetching
            })
        ));
    }

    #[tokio::test]
    async fn test_dropped_receiver() {
        let (tx, rx) = channel();
        drop(rx);

        // Should not panic when receiver is dropped
        tx.emit_warning("ignored");
    }

    #[test]
    fn test_no_sender_is_silent() {
        let sender: Option<EventSender> = None;
        sender.emit_error("nobody listens");
    }

    #[test]
    fn test_log_levels() {
        let failure = FailureContext::from_error(&Error::from(NetworkError::Timeout {
            url: "https://github.com/acme/widgets".into(),
        }));
        assert!(failure.retryable);
        assert_eq!(failure.code.as_deref(), Some("network.timeout"));

        let failed = AppEvent::Install(InstallEvent::Failed {
            package_id: None,
            phase: InstallPhase::Fetching,
            failure,
        });
        assert_eq!(failed.log_level(), tracing::Level::ERROR);
        assert_eq!(failed.log_target(), "modinstall::events::install");

        let rolled_back = AppEvent::Install(InstallEvent::RolledBack {
            package_id: "widgets".into(),
            restored_backup: true,
        });
        assert_eq!(rolled_back.log_level(), tracing::Level::WARN);

        let done = AppEvent::Migration(MigrationEvent::Completed {
            target: r"humhub\modules\widgets\migrations".into(),
            applied: 2,
        });
        assert_eq!(done.log_level(), tracing::Level::INFO);
    }

    #[test]
    fn test_event_serialization() {
        let event = AppEvent::Migration(MigrationEvent::Started {
            target: "widgets".into(),
            count: 1,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["domain"], "migration");
        assert_eq!(json["event"]["type"], "started");
        assert_eq!(json["event"]["count"], 1);
    }
}
