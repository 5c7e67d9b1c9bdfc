//! Per-avatar conversation state.

use kindred_types::{PersonaTraits, Role, Turn, UserProfile, MAX_HISTORY};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Conversation state for one avatar identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationContext {
    pub avatar_id: String,
    /// Oldest turn first, newest last. Never longer than [`MAX_HISTORY`].
    pub history: VecDeque<Turn>,
    pub user_profile: UserProfile,
    pub persona: PersonaTraits,
}

impl ConversationContext {
    fn new(avatar_id: &str) -> Self {
        Self {
            avatar_id: avatar_id.to_string(),
            history: VecDeque::with_capacity(MAX_HISTORY),
            user_profile: UserProfile::for_avatar(avatar_id),
            persona: PersonaTraits::default(),
        }
    }

    fn record(&mut self, turn: Turn) {
        while self.history.len() >= MAX_HISTORY {
            self.history.pop_front();
        }
        self.history.push_back(turn);
    }

    /// The most recent turn, if any.
    pub fn last_turn(&self) -> Option<&Turn> {
        self.history.back()
    }
}

#[derive(Debug)]
struct AvatarSession {
    avatar_id: String,
    exchange: Arc<Mutex<()>>,
    /// Held only for short, non-async sections; never across `.await`.
    context: RwLock<ConversationContext>,
}

impl AvatarSession {
    fn read(&self) -> RwLockReadGuard<'_, ConversationContext> {
        self.context.read().unwrap_or_else(|poisoned| {
            tracing::error!(avatar_id = %self.avatar_id, "conversation lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, ConversationContext> {
        self.context.write().unwrap_or_else(|poisoned| {
            tracing::error!(avatar_id = %self.avatar_id, "conversation lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

/// Shared handle to one avatar's conversation.
///
/// Every handle for the same avatar id refers to the same underlying state.
#[derive(Debug, Clone)]
pub struct ConversationHandle {
    session: Arc<AvatarSession>,
}

impl ConversationHandle {
    pub fn avatar_id(&self) -> &str {
        &self.session.avatar_id
    }

    /// Cloned view of the current state.
    pub fn snapshot(&self) -> ConversationContext {
        self.session.read().clone()
    }

    /// Number of turns currently held.
    pub fn history_len(&self) -> usize {
        self.session.read().history.len()
    }

    /// True when both handles point at the same conversation.
    pub fn same_conversation(&self, other: &ConversationHandle) -> bool {
        Arc::ptr_eq(&self.session, &other.session)
    }

    fn append(&self, role: Role, content: String) -> Turn {
        let mut context = self.session.write();
        let turn = Turn::new(role, content, context.user_profile.language.clone());
        context.record(turn.clone());
        turn
    }
}

/// Exclusive right to run one exchange (user turn, generation, reply turn)
/// against an avatar's history.
///
/// Guards for the same avatar are granted in the order they were requested.
/// Dropping the guard releases the avatar for the next queued exchange.
#[derive(Debug)]
pub struct ExchangeGuard {
    handle: ConversationHandle,
    _permit: OwnedMutexGuard<()>,
}

impl ExchangeGuard {
    pub fn avatar_id(&self) -> &str {
        self.handle.avatar_id()
    }

    pub fn handle(&self) -> &ConversationHandle {
        &self.handle
    }
}

/// Keyed table of conversation contexts, one per avatar identity.
///
/// Construct once per process and pass clones by reference; clones share the
/// same table. Contexts are created lazily and live for the lifetime of the
/// store.
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    /// Uses `std::sync::RwLock`: every acquisition is a brief map lookup or
    /// insert that never spans an `.await` point.
    sessions: Arc<RwLock<HashMap<String, Arc<AvatarSession>>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the conversation for `avatar_id`, creating an empty one on
    /// first reference.
    pub fn get(&self, avatar_id: &str) -> ConversationHandle {
        {
            let sessions = self.sessions.read().unwrap_or_else(|poisoned| {
                tracing::error!("conversation table lock poisoned, recovering");
                poisoned.into_inner()
            });
            if let Some(session) = sessions.get(avatar_id) {
                return ConversationHandle {
                    session: session.clone(),
                };
            }
        }

        let mut sessions = self.sessions.write().unwrap_or_else(|poisoned| {
            tracing::error!("conversation table lock poisoned, recovering");
            poisoned.into_inner()
        });
        // Another caller may have inserted between the read and write locks.
        let session = sessions
            .entry(avatar_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(avatar_id, "creating conversation context");
                Arc::new(AvatarSession {
                    avatar_id: avatar_id.to_string(),
                    exchange: Arc::new(Mutex::new(())),
                    context: RwLock::new(ConversationContext::new(avatar_id)),
                })
            })
            .clone();

        ConversationHandle { session }
    }

    /// Returns the conversation for `avatar_id` only if it already exists.
    pub fn peek(&self, avatar_id: &str) -> Option<ConversationHandle> {
        let sessions = self.sessions.read().unwrap_or_else(|poisoned| {
            tracing::error!("conversation table lock poisoned, recovering");
            poisoned.into_inner()
        });
        sessions.get(avatar_id).map(|session| ConversationHandle {
            session: session.clone(),
        })
    }

    /// Appends a turn to the avatar's history, evicting the oldest turns
    /// when the history is full. Returns the recorded turn.
    pub fn append_turn(&self, avatar_id: &str, role: Role, content: impl Into<String>) -> Turn {
        self.get(avatar_id).append(role, content.into())
    }

    /// Cloned view of the avatar's current state.
    pub fn snapshot(&self, avatar_id: &str) -> ConversationContext {
        self.get(avatar_id).snapshot()
    }

    /// Replaces the user profile for an avatar.
    pub fn update_profile(&self, avatar_id: &str, profile: UserProfile) {
        self.get(avatar_id).session.write().user_profile = profile;
    }

    /// Replaces the persona for an avatar.
    ///
    /// Waits for any in-flight exchange to finish so a reply is never
    /// generated against a persona that changes underneath it.
    pub async fn set_persona(&self, avatar_id: &str, persona: PersonaTraits) {
        let guard = self.exchange(avatar_id).await;
        guard.handle.session.write().persona = persona;
    }

    /// Waits for exclusive use of the avatar's history.
    pub async fn exchange(&self, avatar_id: &str) -> ExchangeGuard {
        let handle = self.get(avatar_id);
        let permit = handle.session.exchange.clone().lock_owned().await;
        ExchangeGuard {
            handle,
            _permit: permit,
        }
    }

    /// Whether `avatar_id` has been referenced yet. Does not create a context.
    pub fn contains(&self, avatar_id: &str) -> bool {
        self.sessions
            .read()
            .map(|s| s.contains_key(avatar_id))
            .unwrap_or_else(|p| p.into_inner().contains_key(avatar_id))
    }

    /// Number of avatars with a context.
    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or_else(|p| p.into_inner().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
