//! Gateway session state.
//!
//! Distinct from `domain::entities::Session` (the DB-backed JWT refresh
//! session): this is purely the live-connection bookkeeping a single
//! WebSocket holds in memory for the duration of (and briefly after) one
//! handshake.

use std::time::Instant;

use crate::presentation::websocket::messages::GatewaySend;
use crate::shared::ring_buffer::RingBuffer;

/// One entry in the replay buffer: the sequence number it was sent under,
/// and the exact frame, so `RESUME` can replay verbatim.
#[derive(Debug, Clone)]
pub struct ReplayEntry {
    pub seq: u64,
    pub frame: GatewaySend,
}

/// Per-connection state: sequence counter and bounded replay buffer.
/// Guild scopes live only in the [`super::registry::Registry`] — keeping a
/// second copy here invites the two from drifting apart.
pub struct GatewaySession {
    pub session_id: String,
    pub user_id: i64,
    pub identified: bool,
    seq: u64,
    replay_buf: RingBuffer<ReplayEntry>,
    last_heartbeat: Instant,
    /// Set when the owning socket disconnects; cleared on a successful
    /// `RESUME`. Entries sitting disconnected past the retention window
    /// are reaped by [`super::gateway::GatewayServer::purge_stale_sessions`] —
    /// the replay buffer survives a dropped connection but not forever.
    pub disconnected_at: Option<Instant>,
}

impl GatewaySession {
    pub fn new(session_id: String, replay_capacity: usize) -> Self {
        Self {
            session_id,
            user_id: 0,
            identified: false,
            seq: 0,
            replay_buf: RingBuffer::new(replay_capacity),
            last_heartbeat: Instant::now(),
            disconnected_at: None,
        }
    }

    /// Stamp a frame with the next sequence number and retain it for resume.
    pub fn next_dispatch(&mut self, event_type: &str, data: serde_json::Value) -> GatewaySend {
        self.seq += 1;
        let frame = GatewaySend::dispatch(self.seq, event_type, data);
        self.replay_buf.push(ReplayEntry {
            seq: self.seq,
            frame: frame.clone(),
        });
        frame
    }

    pub fn current_seq(&self) -> u64 {
        self.seq
    }

    /// Frames with `seq > since`, oldest first. `None` only when `since`
    /// claims to be ahead of everything this session has ever sent — a
    /// forged or corrupt cursor, not a legitimate gap.
    ///
    /// A `since` that fell out of the retained window entirely is *not*
    /// an error: the buffer silently returns whatever it still has, which
    /// is a strict subset of what was actually missed. Gaps beyond the
    /// 100-message window are not detected; the client receives a partial
    /// replay. This is a documented limitation, not a bug.
    pub fn replay_since(&self, since: u64) -> Option<Vec<GatewaySend>> {
        if since > self.seq {
            return None;
        }

        Some(
            self.replay_buf
                .iter()
                .filter(|e| e.seq > since)
                .map(|e| e.frame.clone())
                .collect(),
        )
    }

    pub fn mark_disconnected(&mut self) {
        self.disconnected_at = Some(Instant::now());
    }

    pub fn mark_resumed(&mut self) {
        self.disconnected_at = None;
    }

    pub fn disconnected_longer_than(&self, retention_ms: u64) -> bool {
        self.disconnected_at
            .is_some_and(|at| at.elapsed().as_millis() > retention_ms as u128)
    }

    pub fn heartbeat(&mut self) {
        self.last_heartbeat = Instant::now();
    }

    pub fn is_alive(&self, timeout_ms: u64) -> bool {
        self.last_heartbeat.elapsed().as_millis() < timeout_ms as u128
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replay_since_returns_only_newer_frames() {
        let mut session = GatewaySession::new("sess-1".into(), 10);
        for i in 0..5 {
            session.next_dispatch("MESSAGE_CREATE", serde_json::json!({ "i": i }));
        }

        let replayed = session.replay_since(2).unwrap();
        assert_eq!(replayed.len(), 3);
        assert_eq!(replayed[0].s, Some(3));
        assert_eq!(replayed.last().unwrap().s, Some(5));
    }

    #[test]
    fn replay_since_current_seq_is_empty_not_none() {
        let mut session = GatewaySession::new("sess-1".into(), 10);
        session.next_dispatch("MESSAGE_CREATE", serde_json::json!({}));

        let replayed = session.replay_since(1).unwrap();
        assert!(replayed.is_empty());
    }

    #[test]
    fn replay_since_stale_cursor_returns_partial_not_none() {
        // Scenario 4: 250 seqs sent, capacity 100 retains 151..250. A
        // resume at seq 40 is long out of the window but still gets the
        // best-effort replay rather than being rejected outright.
        let mut session = GatewaySession::new("sess-1".into(), 100);
        for i in 0..250 {
            session.next_dispatch("MESSAGE_CREATE", serde_json::json!({ "i": i }));
        }

        let replayed = session.replay_since(40).unwrap();
        assert_eq!(replayed.len(), 100);
        assert_eq!(replayed[0].s, Some(151));
        assert_eq!(replayed.last().unwrap().s, Some(250));
    }

    #[test]
    fn replay_since_cursor_ahead_of_everything_sent_is_none() {
        let mut session = GatewaySession::new("sess-1".into(), 10);
        session.next_dispatch("MESSAGE_CREATE", serde_json::json!({}));

        assert!(session.replay_since(999).is_none());
    }

    #[test]
    fn heartbeat_resets_liveness() {
        let mut session = GatewaySession::new("sess-1".into(), 10);
        assert!(session.is_alive(10_000));
        session.heartbeat();
        assert!(session.is_alive(10_000));
    }

    #[test]
    fn disconnect_retention_window() {
        let mut session = GatewaySession::new("sess-1".into(), 10);
        assert!(!session.disconnected_longer_than(0));
        session.mark_disconnected();
        assert!(session.disconnected_longer_than(0));
        session.mark_resumed();
        assert!(!session.disconnected_longer_than(0));
    }
}
