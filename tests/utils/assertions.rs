//! Test assertion helpers - fluent API for verifying test expectations
#![allow(dead_code)] // Test utilities may not all be used in every test

use carelink::event::{ChannelEvent, EventTag, MessageDirection};

use super::mocks::CollectingHandler;

// ============================================================================
// Assertion Helpers
// ============================================================================

pub struct EventAssertion<'a> {
    handler: &'a CollectingHandler,
}

impl<'a> EventAssertion<'a> {
    pub fn on(handler: &'a CollectingHandler) -> Self {
        Self { handler }
    }

    pub fn saw_nothing(self) -> Self {
        assert_eq!(
            self.handler.count(),
            0,
            "expected no events, got {:?}",
            self.handler.tags()
        );
        self
    }

    pub fn saw_exactly(self, count: usize) -> Self {
        assert_eq!(
            self.handler.count(),
            count,
            "expected {} events, got {:?}",
            count,
            self.handler.tags()
        );
        self
    }

    pub fn saw_tag(self, tag: EventTag) -> Self {
        assert!(
            self.handler.tags().contains(&tag),
            "expected a {} event, got {:?}",
            tag,
            self.handler.tags()
        );
        self
    }

    /// Every collected message event has the given direction.
    pub fn messages_have_direction(self, direction: MessageDirection) -> Self {
        for event in self.handler.events() {
            if let ChannelEvent::Message(message) = event {
                assert_eq!(message.direction, direction);
            }
        }
        self
    }
}
