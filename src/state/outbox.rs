//! Ordered outbound event queue.
//!
//! Every event gets the next per-session sequence number at the moment the
//! engine emits it, so all recipients see card movements in the order they
//! were applied. Delivery is the gateway's job.

use std::collections::VecDeque;

use serde::Serialize;

use super::directory::ParticipantId;
use super::event::Event;

/// Delivered envelopes kept for replay to a reconnecting client.
pub const REPLAY_CAPACITY: usize = 256;

/// Who should receive an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "participant")]
pub enum Recipient {
    All,
    Only(ParticipantId),
}

impl Recipient {
    /// Check if `pid` should see this envelope.
    pub fn includes(&self, pid: ParticipantId) -> bool {
        match self {
            Self::All => true,
            Self::Only(only) => *only == pid,
        }
    }
}

/// A sequenced event addressed to one or all participants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub seq: u64,
    pub recipient: Recipient,
    pub event: Event,
    pub emitted_at: chrono::DateTime<chrono::Utc>,
}

impl Envelope {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "seq": self.seq,
            "event": self.event
        })
    }
}

/// Transport side of a session. Implemented by the host's network layer.
///
/// Called with the session lock held, in sequence order. Implementations
/// should hand the envelope off and return rather than block.
pub trait BroadcastGateway: Send + Sync {
    fn deliver(&self, session_id: &str, envelope: &Envelope);
}

/// Per-session outbound queue.
#[derive(Debug, Default)]
pub struct Outbox {
    send_seq: u64,
    pending: Vec<Envelope>,
    delivered: VecDeque<Envelope>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event for everyone.
    pub fn broadcast(&mut self, event: Event) -> u64 {
        self.push(Recipient::All, event)
    }

    /// Queue an event for one participant.
    pub fn send_to(&mut self, pid: ParticipantId, event: Event) -> u64 {
        self.push(Recipient::Only(pid), event)
    }

    fn push(&mut self, recipient: Recipient, event: Event) -> u64 {
        self.send_seq += 1;
        self.pending.push(Envelope {
            seq: self.send_seq,
            recipient,
            event,
            emitted_at: chrono::Utc::now(),
        });
        self.send_seq
    }

    /// Take everything queued so far, oldest first. The envelopes stay
    /// available to [`messages_since`](Self::messages_since) until they age
    /// out of the replay window.
    pub fn drain(&mut self) -> Vec<Envelope> {
        let drained = std::mem::take(&mut self.pending);
        self.delivered.extend(drained.iter().cloned());
        while self.delivered.len() > REPLAY_CAPACITY {
            self.delivered.pop_front();
        }
        drained
    }

    /// Envelopes newer than `seq`, delivered or not, oldest first.
    pub fn messages_since(&self, seq: u64) -> Vec<&Envelope> {
        self.delivered
            .iter()
            .chain(self.pending.iter())
            .filter(|e| e.seq > seq)
            .collect()
    }

    pub fn pending(&self) -> &[Envelope] {
        &self.pending
    }

    /// Sequence number of the last queued envelope.
    pub fn last_seq(&self) -> u64 {
        self.send_seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sequence_numbers() {
        let mut outbox = Outbox::new();

        let s1 = outbox.broadcast(Event::TurnChanged { participant: None });
        let s2 = outbox.send_to(
            ParticipantId(1),
            Event::InvalidAction {
                kind: "invalid-turn".into(),
                message: "It's not your turn".into(),
            },
        );
        assert_eq!((s1, s2), (1, 2));
        assert_eq!(outbox.messages_since(1).len(), 1);

        let drained = outbox.drain();
        assert_eq!(drained.len(), 2);
        assert!(outbox.pending().is_empty());

        // Numbering continues across drains.
        let s3 = outbox.broadcast(Event::TurnChanged { participant: None });
        assert_eq!(s3, 3);
        assert_eq!(outbox.last_seq(), 3);

        // Drained envelopes can still be replayed.
        let replay: Vec<u64> = outbox.messages_since(1).iter().map(|e| e.seq).collect();
        assert_eq!(replay, vec![2, 3]);
    }

    #[test]
    fn test_replay_window_is_bounded() {
        let mut outbox = Outbox::new();
        for _ in 0..REPLAY_CAPACITY + 10 {
            outbox.broadcast(Event::TurnChanged { participant: None });
            outbox.drain();
        }

        let replay = outbox.messages_since(0);
        assert_eq!(replay.len(), REPLAY_CAPACITY);
        assert_eq!(replay[0].seq, 11);
    }

    #[test]
    fn test_recipient_includes() {
        assert!(Recipient::All.includes(ParticipantId(5)));
        assert!(Recipient::Only(ParticipantId(5)).includes(ParticipantId(5)));
        assert!(!Recipient::Only(ParticipantId(5)).includes(ParticipantId(6)));
    }
}
