use std::sync::Arc;
use tokio::time::{sleep, Duration};

use carelink::config::CoordinatorConfig;
use carelink::coordinator::ConnectionCoordinator;
use carelink::event::EventTag;
use carelink::identity::Role;
use carelink::transport::TransportEvent;

use super::mocks::{CollectingHandler, MockConnectionApi, MockPushTransport, RecordingSink};

// ============================================================================
// Test Setup
// ============================================================================

pub struct TestSetup {
    pub coordinator: ConnectionCoordinator,
    pub api: Arc<MockConnectionApi>,
    pub transport: Arc<MockPushTransport>,
    pub sink: Arc<RecordingSink>,
}

impl TestSetup {
    /// Subscribe a collecting handler and hand it back for assertions.
    pub fn collect(&self, tag: EventTag) -> Arc<CollectingHandler> {
        let handler = CollectingHandler::new();
        self.coordinator.subscribe(tag, handler.clone());
        handler
    }

    /// Inject a transport event and wait for the pump to process it.
    pub async fn push(&self, event: TransportEvent) {
        self.transport.emit(event);
        sleep(Duration::from_millis(10)).await;
    }
}

pub struct TestSetupBuilder {
    config: CoordinatorConfig,
    api: Arc<MockConnectionApi>,
    initialize: bool,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            config: CoordinatorConfig {
                student_id: None,
                therapist_id: None,
                role: None,
                ..Default::default()
            },
            api: Arc::new(MockConnectionApi::new()),
            initialize: true,
        }
    }

    pub fn with_identity(mut self, student_id: i64, therapist_id: i64) -> Self {
        self.config.student_id = Some(student_id);
        self.config.therapist_id = Some(therapist_id);
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.config.role = Some(role);
        self
    }

    pub fn without_initialize(mut self) -> Self {
        self.initialize = false;
        self
    }

    /// Script the API mock before the coordinator is built.
    pub fn api(&self) -> Arc<MockConnectionApi> {
        self.api.clone()
    }

    pub async fn build(self) -> TestSetup {
        let transport = Arc::new(MockPushTransport::new());
        let sink = Arc::new(RecordingSink::default());

        let coordinator = ConnectionCoordinator::new(
            self.config,
            self.api.clone(),
            transport.clone(),
            sink.clone(),
        );

        if self.initialize {
            coordinator.initialize().await;
        }

        TestSetup {
            coordinator,
            api: self.api,
            transport,
            sink,
        }
    }
}

impl Default for TestSetupBuilder {
    fn default() -> Self {
        Self::new()
    }
}
