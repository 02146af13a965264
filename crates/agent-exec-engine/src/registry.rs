use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use agent_exec_common::{rwlock_read_or_recover, rwlock_write_or_recover};
use agent_exec_core::SessionId;
use agent_exec_process::{ProcessSession, SessionInfo};
use tracing::debug;
use uuid::Uuid;

use crate::error::ExecError;

pub const DEFAULT_MAX_SESSIONS: usize = 16;

/// Generate a new unique session ID.
pub fn generate_session_id() -> SessionId {
    SessionId::new(Uuid::new_v4().to_string()[..8].to_string())
}

/// Session id to live [`ProcessSession`].
///
/// Only creation takes the write lock. A session that has reached a
/// terminal state but has not been evicted yet is replaced rather than
/// reused, so an id always leads to a session that can still run.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Arc<ProcessSession>>>,
    max_sessions: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::with_max_sessions(DEFAULT_MAX_SESSIONS)
    }

    pub fn with_max_sessions(max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
        }
    }

    /// Concurrent callers with the same unused id all receive the one
    /// instance created by whoever took the write lock first.
    pub fn get_or_create(&self, id: &SessionId) -> Result<Arc<ProcessSession>, ExecError> {
        {
            let sessions = rwlock_read_or_recover(&self.sessions);
            if let Some(session) = sessions.get(id) {
                if !session.state().is_terminal() {
                    return Ok(Arc::clone(session));
                }
            }
        }

        let mut sessions = rwlock_write_or_recover(&self.sessions);
        let replacing = match sessions.get(id) {
            Some(session) if !session.state().is_terminal() => return Ok(Arc::clone(session)),
            Some(_) => true,
            None => false,
        };

        if !replacing && sessions.len() >= self.max_sessions {
            return Err(ExecError::LimitReached(self.max_sessions));
        }

        let session = Arc::new(ProcessSession::new(id.clone()));
        sessions.insert(id.clone(), Arc::clone(&session));
        debug!(session_id = %id, replacing, "session created");
        Ok(session)
    }

    pub fn get(&self, session_id: &str) -> Option<Arc<ProcessSession>> {
        let id = SessionId::new(session_id);
        rwlock_read_or_recover(&self.sessions).get(&id).cloned()
    }

    pub fn remove(&self, session_id: &str) -> Option<Arc<ProcessSession>> {
        let id = SessionId::new(session_id);
        rwlock_write_or_recover(&self.sessions).remove(&id)
    }

    /// Remove `session` only if it is still the instance registered under
    /// its id.
    pub fn remove_if_same(&self, session: &Arc<ProcessSession>) -> bool {
        let mut sessions = rwlock_write_or_recover(&self.sessions);
        match sessions.get(session.id()) {
            Some(current) if Arc::ptr_eq(current, session) => {
                sessions.remove(session.id());
                true
            }
            _ => false,
        }
    }

    pub fn list(&self) -> Vec<SessionInfo> {
        let sessions: Vec<Arc<ProcessSession>> = rwlock_read_or_recover(&self.sessions)
            .values()
            .cloned()
            .collect();
        let mut infos: Vec<SessionInfo> = sessions.iter().map(|s| s.info()).collect();
        infos.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        infos
    }

    /// Empty the registry, handing every session to the caller.
    pub fn drain(&self) -> Vec<Arc<ProcessSession>> {
        rwlock_write_or_recover(&self.sessions)
            .drain()
            .map(|(_, session)| session)
            .collect()
    }

    pub fn len(&self) -> usize {
        rwlock_read_or_recover(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }
}
