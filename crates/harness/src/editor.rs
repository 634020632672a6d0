use std::time::{Duration, Instant};

use rakeline_core::{EditorRole, UnitKey};
use rakeline_engine::{EditSession, EngineConfig, EngineError};
use rakeline_storage::MemoryDraftCache;

use crate::FakeBackend;

pub type Session = EditSession<FakeBackend, MemoryDraftCache>;

/// One editor at one browser: a role, a local draft cache that outlives
/// sessions, and a manual clock.
pub struct TestEditor {
    pub server: FakeBackend,
    pub role: EditorRole,
    pub config: EngineConfig,
    cache: Option<MemoryDraftCache>,
    now: Instant,
}

impl TestEditor {
    pub fn new(server: FakeBackend, role: EditorRole) -> Self {
        Self {
            server,
            role,
            config: EngineConfig::default(),
            cache: Some(MemoryDraftCache::new()),
            now: Instant::now(),
        }
    }

    pub fn now(&self) -> Instant {
        self.now
    }

    /// Move the clock forward and return the new time.
    pub fn advance(&mut self, ms: u64) -> Instant {
        self.now += Duration::from_millis(ms);
        self.now
    }

    /// Enter the editor for `key`. The local cache moves into the session
    /// until [`leave`](Self::leave) hands it back.
    pub fn enter(&mut self, key: UnitKey) -> Result<Session, EngineError> {
        let cache = self.cache.take().unwrap_or_default();
        match EditSession::open(self.server.clone(), cache, key, self.role, self.config.clone(), self.now) {
            Ok(session) => Ok(session),
            Err(failure) => {
                let (error, _, cache) = failure.into_parts();
                self.cache = Some(cache);
                Err(error)
            }
        }
    }

    /// Close the session and keep its cache for the next entry.
    pub fn leave(&mut self, mut session: Session) {
        session.close();
        let (_, cache) = session.into_parts();
        self.cache = Some(cache);
    }

    /// Simulate a page reload: the session is dropped without closing, so
    /// only what already reached the cache survives.
    pub fn reload(&mut self, session: Session, key: UnitKey) -> Result<Session, EngineError> {
        let (_, cache) = session.into_parts();
        self.cache = Some(cache);
        self.enter(key)
    }

    pub fn cache(&self) -> Option<&MemoryDraftCache> {
        self.cache.as_ref()
    }
}
