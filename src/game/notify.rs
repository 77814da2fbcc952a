//! Outbound notifications for the network collaborator
//!
//! The authoritative side queues fire-and-forget events as entities come
//! and go; a transport layer drains them at its own pace. The queue is a
//! plain buffer: nothing here blocks, and nothing is ever re-sent.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::core::types::{CreatureId, MissileId, Turn};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ServerNotification {
    CreatureAdded { id: CreatureId, name: String },
    CreatureRemoved { id: CreatureId },
    MissileAdded { id: MissileId },
    MissileRemoved { id: MissileId },
    TurnEnded { turn: Turn },
}

/// Buffer of events awaiting the transport layer
#[derive(Debug, Default)]
pub struct OutboundQueue {
    enabled: bool,
    events: VecDeque<ServerNotification>,
}

impl OutboundQueue {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            events: VecDeque::new(),
        }
    }

    pub fn push(&mut self, event: ServerNotification) {
        if !self.enabled {
            return;
        }
        trace!(?event, "queueing server notification");
        self.events.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn drain(&mut self) -> Vec<ServerNotification> {
        self.events.drain(..).collect()
    }
}
