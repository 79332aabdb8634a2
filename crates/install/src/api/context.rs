use modinstall_events::EventSender;

/// Installation context
#[derive(Clone, Debug, Default)]
pub struct InstallContext {
    /// Repository URL the package comes from
    pub source_url: String,
    /// Branch to install; the configured default when absent
    pub reference: Option<String>,
    /// Event sender for progress reporting
    pub event_sender: Option<EventSender>,
}

impl InstallContext {
    #[must_use]
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Set the event sender for progress reporting
    #[must_use]
    pub fn with_event_sender(mut self, sender: EventSender) -> Self {
        self.event_sender = Some(sender);
        self
    }
}
