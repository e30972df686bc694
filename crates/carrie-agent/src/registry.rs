//! In-process table of deployed agents.

use crate::error::AgentError;
use carrie_types::{AgentInstance, AgentStatus, Notifier, ObserverId};
use carrie_voice::{VoiceError, VoiceService};
use chrono::Utc;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::info;

const ID_SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Mints the join credential an agent uses to enter its room.
pub trait TokenIssuer: Send + Sync {
    fn issue_agent_token(&self, room_name: &str, identity: &str) -> Result<String, VoiceError>;
}

impl TokenIssuer for VoiceService {
    fn issue_agent_token(&self, room_name: &str, identity: &str) -> Result<String, VoiceError> {
        self.generate_agent_token(room_name, identity)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegistryEvent {
    Deployed(AgentInstance),
    StatusChanged(AgentInstance),
    /// Carries the final snapshot, with status `disconnected`.
    Removed(AgentInstance),
}

pub struct AgentRegistry {
    issuer: Arc<dyn TokenIssuer>,
    // Insertion order is the listing order.
    agents: RwLock<Vec<AgentInstance>>,
    sequence: AtomicU64,
    events: Notifier<RegistryEvent>,
}

impl AgentRegistry {
    pub fn new(issuer: Arc<dyn TokenIssuer>) -> Self {
        Self {
            issuer,
            agents: RwLock::new(Vec::new()),
            sequence: AtomicU64::new(0),
            events: Notifier::new(),
        }
    }

    pub fn subscribe<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&RegistryEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        self.events.unsubscribe(id)
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<AgentInstance>> {
        self.agents
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<AgentInstance>> {
        self.agents
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next_id(&self) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let mut rng = rand::thread_rng();
        let suffix: String = (0..ID_SUFFIX_LEN)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect();
        format!("agent-{}-{}-{}", Utc::now().timestamp_millis(), seq, suffix)
    }

    /// Issues a join token and records a new `pending` agent for `room_name`.
    pub fn deploy(&self, room_name: &str, identity: &str) -> Result<AgentInstance, AgentError> {
        info!(room = room_name, identity, "deploying agent");
        let token = self.issuer.issue_agent_token(room_name, identity)?;

        let agent = AgentInstance {
            id: self.next_id(),
            room_name: room_name.to_string(),
            identity: identity.to_string(),
            token,
            created_at: Utc::now(),
            status: AgentStatus::Pending,
        };
        self.write().push(agent.clone());

        info!(agent_id = %agent.id, room = room_name, "agent deployed");
        self.events.emit(&RegistryEvent::Deployed(agent.clone()));
        Ok(agent)
    }

    pub fn get(&self, id: &str) -> Option<AgentInstance> {
        self.read().iter().find(|a| a.id == id).cloned()
    }

    /// Agents bound to exactly `room_name`, oldest first.
    pub fn list_by_room(&self, room_name: &str) -> Vec<AgentInstance> {
        self.read()
            .iter()
            .filter(|a| a.room_name == room_name)
            .cloned()
            .collect()
    }

    pub fn list_all(&self) -> Vec<AgentInstance> {
        self.read().clone()
    }

    pub fn set_status(&self, id: &str, status: AgentStatus) -> Option<AgentInstance> {
        let updated = {
            let mut agents = self.write();
            let agent = agents.iter_mut().find(|a| a.id == id)?;
            agent.status = status;
            agent.clone()
        };

        info!(agent_id = id, status = %status, "agent status changed");
        self.events.emit(&RegistryEvent::StatusChanged(updated.clone()));
        Some(updated)
    }

    /// Removes an agent. Unknown ids are ignored.
    pub fn remove(&self, id: &str) -> Option<AgentInstance> {
        let removed = {
            let mut agents = self.write();
            let index = agents.iter().position(|a| a.id == id)?;
            let mut agent = agents.remove(index);
            agent.status = AgentStatus::Disconnected;
            agent
        };

        info!(agent_id = id, room = %removed.room_name, "agent removed");
        self.events.emit(&RegistryEvent::Removed(removed.clone()));
        Some(removed)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
