use crate::session::error::SessionResult;
use crate::session::types::SessionStats;
use crate::store::{MockStore, NewSession, SessionPatch, SessionStatus, UploadSession};
use chrono::Utc;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct SessionService {
    store: Arc<MockStore>,
    current: Arc<RwLock<Option<UploadSession>>>,
    /// Serializes read-modify-write sequences on session counters
    counters: Arc<tokio::sync::Mutex<()>>,
}

impl SessionService {
    pub fn new(store: Arc<MockStore>) -> Self {
        Self {
            store,
            current: Arc::new(RwLock::new(None)),
            counters: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub async fn get_all(&self) -> Vec<UploadSession> {
        self.store.sessions().get_all().await
    }

    pub async fn get_by_id(&self, id: &str) -> Option<UploadSession> {
        self.store.sessions().get_by_id(id).await
    }

    /// The session new files are added to, if any.
    pub fn current_session(&self) -> Option<UploadSession> {
        self.current.read().clone()
    }

    /// Open a new session and make it current.
    pub async fn create_session(&self, seed: NewSession) -> UploadSession {
        let session = self.store.sessions().create(seed).await;
        *self.current.write() = Some(session.clone());
        info!(
            session_id = %session.id,
            total_files = session.total_files,
            total_size = session.total_size,
            "Session created"
        );
        session
    }

    pub async fn update_session(&self, id: &str, patch: SessionPatch) -> SessionResult<UploadSession> {
        let session = self.store.sessions().update(id, patch).await?;
        self.refresh_current(&session);
        Ok(session)
    }

    pub async fn complete_session(&self, id: &str) -> SessionResult<UploadSession> {
        self.close(id, SessionStatus::Completed).await
    }

    pub async fn cancel_session(&self, id: &str) -> SessionResult<UploadSession> {
        self.close(id, SessionStatus::Cancelled).await
    }

    pub async fn get_session_stats(&self, id: &str) -> Option<SessionStats> {
        let session = self.get_by_id(id).await?;
        Some(SessionStats::compute(session, Utc::now()))
    }

    /// Grow the current session by a batch of files, opening one if needed.
    pub async fn add_files(&self, count: u32, bytes: u64) -> SessionResult<UploadSession> {
        let _guard = self.counters.lock().await;

        let current = self.current_session();
        match current {
            Some(session) if session.status.is_active() => {
                let patch = SessionPatch::totals(
                    session.total_files.saturating_add(count),
                    session.total_size.saturating_add(bytes),
                );
                self.update_session(&session.id, patch).await
            }
            _ => Ok(self
                .create_session(NewSession {
                    total_files: count,
                    total_size: bytes,
                })
                .await),
        }
    }

    /// Count one more completed file in session `id`.
    pub async fn record_completed(&self, id: &str) -> SessionResult<UploadSession> {
        let _guard = self.counters.lock().await;

        let completed = match self.store.sessions().find(id) {
            Some(session) => session.completed_files.saturating_add(1),
            None => 1,
        };
        self.update_session(id, SessionPatch::completed_files(completed))
            .await
    }

    async fn close(&self, id: &str, status: SessionStatus) -> SessionResult<UploadSession> {
        let session = self
            .store
            .sessions()
            .update(id, SessionPatch::closed(status, Utc::now()))
            .await?;

        let mut current = self.current.write();
        if current.as_ref().is_some_and(|c| c.id == id) {
            *current = None;
        }
        info!(session_id = id, status = ?status, "Session closed");
        Ok(session)
    }

    fn refresh_current(&self, session: &UploadSession) {
        let mut current = self.current.write();
        if let Some(c) = current.as_mut() {
            if c.id == session.id {
                *c = session.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> SessionService {
        SessionService::new(Arc::new(MockStore::in_memory()))
    }

    #[tokio::test]
    async fn test_create_marks_current() {
        let sessions = service();
        assert!(sessions.current_session().is_none());

        let session = sessions
            .create_session(NewSession {
                total_files: 2,
                total_size: 3_000_000,
            })
            .await;
        assert_eq!(sessions.current_session().unwrap().id, session.id);
        assert_eq!(session.completed_files, 0);
        assert_eq!(sessions.get_all().await.len(), 1);
    }

    #[tokio::test]
    async fn test_update_refreshes_current() {
        let sessions = service();
        let session = sessions.create_session(NewSession::default()).await;

        sessions
            .update_session(&session.id, SessionPatch::totals(3, 30))
            .await
            .unwrap();
        let current = sessions.current_session().unwrap();
        assert_eq!(current.total_files, 3);
        assert_eq!(current.total_size, 30);
    }

    #[tokio::test]
    async fn test_update_missing_session() {
        let err = service()
            .update_session("missing", SessionPatch::completed_files(1))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_complete_clears_current() {
        let sessions = service();
        let session = sessions.create_session(NewSession::default()).await;

        let closed = sessions.complete_session(&session.id).await.unwrap();
        assert_eq!(closed.status, SessionStatus::Completed);
        assert!(closed.end_time.is_some());
        assert!(sessions.current_session().is_none());
    }

    #[tokio::test]
    async fn test_cancel_other_session_keeps_current() {
        let sessions = service();
        let old = sessions.create_session(NewSession::default()).await;
        let new = sessions.create_session(NewSession::default()).await;

        let closed = sessions.cancel_session(&old.id).await.unwrap();
        assert_eq!(closed.status, SessionStatus::Cancelled);
        assert_eq!(sessions.current_session().unwrap().id, new.id);
    }

    #[tokio::test]
    async fn test_add_files_grows_current() {
        let sessions = service();
        let first = sessions.add_files(1, 1_000_000).await.unwrap();
        let second = sessions.add_files(1, 2_000_000).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.total_files, 2);
        assert_eq!(second.total_size, 3_000_000);

        sessions.complete_session(&first.id).await.unwrap();
        let third = sessions.add_files(1, 5).await.unwrap();
        assert_ne!(third.id, first.id);
    }

    #[tokio::test]
    async fn test_record_completed_counts_concurrently() {
        let sessions = service();
        let session = sessions.add_files(3, 300).await.unwrap();

        let mut tasks = Vec::new();
        for _ in 0..3 {
            let sessions = sessions.clone();
            let id = session.id.clone();
            tasks.push(tokio::spawn(async move { sessions.record_completed(&id).await }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let stats = sessions.get_session_stats(&session.id).await.unwrap();
        assert_eq!(stats.session.completed_files, 3);
        assert_eq!(stats.completion_rate, 100.0);
    }

    #[tokio::test]
    async fn test_stats_for_unknown_session() {
        assert!(service().get_session_stats("missing").await.is_none());
    }
}
