//! `{sessionId -> Session}` plus a reverse `{playerId -> sessionId}` index.
//! Timeout scanning is driven by the caller's clock, never a background
//! timer owned by this module, so tests can advance time deterministically.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::SessionTimeouts;

pub type SessionId = String;
pub type PlayerId = String;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Connected,
    Disconnected,
    Reconnecting,
    Expired,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub session_id: SessionId,
    pub player_id: PlayerId,
    pub display_name: String,
    pub status: SessionStatus,
    pub current_room: Option<String>,
    pub current_table: Option<String>,
    pub seat_index: Option<u8>,
    pub connected_at: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
    pub latency_ms: i64,
    pub missed_heartbeats: u32,
    pub disconnected_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("player already has a connected session")]
    AlreadyConnected,
    #[error("unknown session")]
    UnknownSession,
    #[error("session expired")]
    Expired,
}

pub struct HeartbeatAck {
    pub server_time_ms: i64,
    pub latency_ms: i64,
}

#[derive(Default)]
pub struct SessionManager {
    sessions: HashMap<SessionId, Session>,
    by_player: HashMap<PlayerId, SessionId>,
    timeouts: SessionTimeouts,
    on_disconnect: Vec<Box<dyn Fn(&Session) + Send + Sync>>,
    on_reconnect: Vec<Box<dyn Fn(&Session) + Send + Sync>>,
    on_expire: Vec<Box<dyn Fn(&Session) + Send + Sync>>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("sessions", &self.sessions)
            .field("by_player", &self.by_player)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

impl SessionManager {
    pub fn new(timeouts: SessionTimeouts) -> Self {
        Self { timeouts, ..Default::default() }
    }

    pub fn on_disconnect(&mut self, callback: impl Fn(&Session) + Send + Sync + 'static) {
        self.on_disconnect.push(Box::new(callback));
    }

    pub fn on_reconnect(&mut self, callback: impl Fn(&Session) + Send + Sync + 'static) {
        self.on_reconnect.push(Box::new(callback));
    }

    pub fn on_expire(&mut self, callback: impl Fn(&Session) + Send + Sync + 'static) {
        self.on_expire.push(Box::new(callback));
    }

    pub fn create_session(&mut self, player_id: &str, display_name: &str, clock: &dyn Clock) -> Result<Session, SessionError> {
        if let Some(existing_id) = self.by_player.get(player_id) {
            if let Some(existing) = self.sessions.get(existing_id) {
                if existing.status == SessionStatus::Connected {
                    return Err(SessionError::AlreadyConnected);
                }
            }
        }
        let now = clock.now();
        let session = Session {
            session_id: Uuid::new_v4().to_string(),
            player_id: player_id.to_string(),
            display_name: display_name.to_string(),
            status: SessionStatus::Connected,
            current_room: None,
            current_table: None,
            seat_index: None,
            connected_at: now,
            last_heartbeat: now,
            latency_ms: 0,
            missed_heartbeats: 0,
            disconnected_at: None,
        };
        self.by_player.insert(player_id.to_string(), session.session_id.clone());
        self.sessions.insert(session.session_id.clone(), session.clone());
        Ok(session)
    }

    pub fn validate_session(&self, session_id: &str) -> Result<&Session, SessionError> {
        let session = self.sessions.get(session_id).ok_or(SessionError::UnknownSession)?;
        if session.status == SessionStatus::Expired {
            return Err(SessionError::Expired);
        }
        Ok(session)
    }

    pub fn process_heartbeat(&mut self, session_id: &str, client_time_ms: i64, clock: &dyn Clock) -> Result<HeartbeatAck, SessionError> {
        let session = self.sessions.get_mut(session_id).ok_or(SessionError::UnknownSession)?;
        let server_time_ms = clock.now().timestamp_millis();
        let latency_ms = (server_time_ms - client_time_ms).max(0);
        session.last_heartbeat = clock.now();
        session.latency_ms = latency_ms;
        session.missed_heartbeats = 0;
        Ok(HeartbeatAck { server_time_ms, latency_ms })
    }

    pub fn disconnect_session(&mut self, session_id: &str, clock: &dyn Clock) -> Result<(), SessionError> {
        let session = self.sessions.get_mut(session_id).ok_or(SessionError::UnknownSession)?;
        session.status = SessionStatus::Disconnected;
        session.disconnected_at = Some(clock.now());
        let snapshot = session.clone();
        for callback in &self.on_disconnect {
            callback(&snapshot);
        }
        Ok(())
    }

    /// Resumes a disconnected session within the grace window, preserving
    /// room/table/seat. Otherwise creates a fresh session.
    pub fn reconnect_player(&mut self, player_id: &str, display_name: &str, clock: &dyn Clock) -> Result<Session, SessionError> {
        if let Some(session_id) = self.by_player.get(player_id).cloned() {
            if let Some(session) = self.sessions.get_mut(&session_id) {
                let within_grace = session
                    .disconnected_at
                    .map(|at| (clock.now() - at).num_milliseconds() as u64 <= self.timeouts.disconnect_grace_ms)
                    .unwrap_or(false);
                if session.status == SessionStatus::Disconnected && within_grace {
                    session.status = SessionStatus::Connected;
                    session.last_heartbeat = clock.now();
                    session.missed_heartbeats = 0;
                    session.disconnected_at = None;
                    let snapshot = session.clone();
                    for callback in &self.on_reconnect {
                        callback(&snapshot);
                    }
                    return Ok(snapshot);
                }
            }
        }
        self.create_session(player_id, display_name, clock)
    }

    pub fn session_mut(&mut self, session_id: &str) -> Option<&mut Session> {
        self.sessions.get_mut(session_id)
    }

    /// Sweeps every session for heartbeat, disconnect-grace, and
    /// absolute-session timeouts, firing callbacks synchronously.
    pub fn check_timeouts(&mut self, clock: &dyn Clock) {
        let now = clock.now();
        let mut to_disconnect = Vec::new();
        let mut to_expire = Vec::new();

        for session in self.sessions.values_mut() {
            if session.status == SessionStatus::Connected {
                let since_heartbeat = (now - session.last_heartbeat).num_milliseconds().max(0) as u64;
                if since_heartbeat > self.timeouts.heartbeat_timeout_ms {
                    let missed = since_heartbeat / self.timeouts.heartbeat_timeout_ms.max(1);
                    session.missed_heartbeats = missed as u32;
                    if session.missed_heartbeats >= self.timeouts.max_missed_heartbeats {
                        to_disconnect.push(session.session_id.clone());
                        continue;
                    }
                }
            }
            if session.status == SessionStatus::Disconnected {
                if let Some(at) = session.disconnected_at {
                    let since = (now - at).num_milliseconds().max(0) as u64;
                    if since > self.timeouts.disconnect_grace_ms {
                        to_expire.push(session.session_id.clone());
                        continue;
                    }
                }
            }
            let since_connect = (now - session.connected_at).num_milliseconds().max(0) as u64;
            if since_connect > self.timeouts.session_timeout_ms {
                to_expire.push(session.session_id.clone());
            }
        }

        for id in to_disconnect {
            let _ = self.disconnect_session(&id, clock);
        }
        for id in to_expire {
            if let Some(session) = self.sessions.get_mut(&id) {
                session.status = SessionStatus::Expired;
                let snapshot = session.clone();
                for callback in &self.on_expire {
                    callback(&snapshot);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::Duration;

    fn clock_at(now: DateTime<Utc>) -> FixedClock {
        FixedClock::new(now)
    }

    #[test]
    fn creating_a_second_session_for_a_connected_player_is_rejected() {
        let clock = clock_at(Utc::now());
        let mut mgr = SessionManager::new(SessionTimeouts::default());
        mgr.create_session("p1", "Alice", &clock).unwrap();
        let err = mgr.create_session("p1", "Alice", &clock).unwrap_err();
        assert_eq!(err, SessionError::AlreadyConnected);
    }

    #[test]
    fn heartbeat_resets_missed_counter_and_computes_latency() {
        let clock = clock_at(Utc::now());
        let mut mgr = SessionManager::new(SessionTimeouts::default());
        let session = mgr.create_session("p1", "Alice", &clock).unwrap();
        let client_time = clock.now().timestamp_millis() - 50;
        let ack = mgr.process_heartbeat(&session.session_id, client_time, &clock).unwrap();
        assert_eq!(ack.latency_ms, 50);
    }

    #[test]
    fn disconnect_then_reconnect_within_grace_resumes_the_session() {
        let start = Utc::now();
        let clock = clock_at(start);
        let mut mgr = SessionManager::new(SessionTimeouts::default());
        let session = mgr.create_session("p1", "Alice", &clock).unwrap();
        mgr.session_mut(&session.session_id).unwrap().current_table = Some("t1".to_string());
        mgr.disconnect_session(&session.session_id, &clock).unwrap();
        clock.advance(Duration::milliseconds(1000));
        let resumed = mgr.reconnect_player("p1", "Alice", &clock).unwrap();
        assert_eq!(resumed.session_id, session.session_id);
        assert_eq!(resumed.current_table.as_deref(), Some("t1"));
    }

    #[test]
    fn reconnecting_after_grace_expires_creates_a_fresh_session() {
        let start = Utc::now();
        let clock = clock_at(start);
        let timeouts = SessionTimeouts { disconnect_grace_ms: 1000, ..SessionTimeouts::default() };
        let mut mgr = SessionManager::new(timeouts);
        let session = mgr.create_session("p1", "Alice", &clock).unwrap();
        mgr.disconnect_session(&session.session_id, &clock).unwrap();
        clock.advance(Duration::milliseconds(5000));
        let resumed = mgr.reconnect_player("p1", "Alice", &clock).unwrap();
        assert_ne!(resumed.session_id, session.session_id);
    }

    #[test]
    fn check_timeouts_expires_a_long_disconnected_session() {
        let start = Utc::now();
        let clock = clock_at(start);
        let timeouts = SessionTimeouts { disconnect_grace_ms: 1000, ..SessionTimeouts::default() };
        let mut mgr = SessionManager::new(timeouts);
        let session = mgr.create_session("p1", "Alice", &clock).unwrap();
        mgr.disconnect_session(&session.session_id, &clock).unwrap();
        clock.advance(Duration::milliseconds(5000));
        mgr.check_timeouts(&clock);
        let reloaded = mgr.validate_session(&session.session_id).unwrap_err();
        assert_eq!(reloaded, SessionError::Expired);
    }
}
