//! Client-side state reconciliation.
//!
//! [`SyncState`] mirrors the server's task list in memory. Every
//! successful mutation replaces local data with the row the server
//! returned, and the optimistic completed-toggle is an explicit
//! tentative-apply / confirm-or-rollback transition.

use tracing::{debug, warn};

use super::{ApiClient, ClientError, ClientResult};
use crate::types::{Task, TaskPatch};

/// Connection status surfaced to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStatus {
    /// Health check in flight.
    Checking,
    /// A successful `/health` round trip confirmed the backend; never set
    /// optimistically. The database may still be down, which surfaces
    /// through the view, not here.
    Connected,
    /// The backend never answered.
    Disconnected,
}

/// What the list view should render. The failure and empty flavors are
/// deliberately distinct and never conflated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListView {
    /// Initial fetch still in flight.
    Loading,
    /// The backend never answered.
    Unreachable,
    /// Connected, and the server has no tasks.
    Empty,
    /// Connected, with tasks to show.
    Ready,
    /// A request failed after the backend was reached.
    Error(String),
}

/// Rollback token for an optimistic toggle.
///
/// Returned by the tentative apply; must be resolved with either a commit
/// or a rollback.
#[must_use]
#[derive(Debug)]
struct PendingToggle {
    id: i64,
    previous: bool,
}

/// In-memory mirror of the server's task collection.
pub struct SyncState {
    client: ApiClient,
    tasks: Vec<Task>,
    status: BackendStatus,
    view: ListView,
}

impl SyncState {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            tasks: Vec::new(),
            status: BackendStatus::Checking,
            view: ListView::Loading,
        }
    }

    /// Tasks in presentation order (server ordering, newest first).
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn status(&self) -> BackendStatus {
        self.status
    }

    pub fn view(&self) -> &ListView {
        &self.view
    }

    /// Initial load: health check first, then the full list.
    ///
    /// A failed health check leaves the collection empty and skips the
    /// list fetch entirely; a second round trip against a dead backend
    /// would only fail again. An unhealthy answer is not the same as no
    /// answer: the backend was reached, so the status stays connected
    /// and the view carries the error instead.
    pub async fn load(&mut self) -> ClientResult<()> {
        self.status = BackendStatus::Checking;
        self.view = ListView::Loading;

        match self.client.health().await {
            Ok(health) if health.database_connected() => {
                self.status = BackendStatus::Connected;
            }
            Ok(health) => {
                warn!(database = %health.database, "backend unhealthy");
                self.status = BackendStatus::Connected;
                self.tasks.clear();
                self.view = ListView::Error("Base de datos desconectada".to_string());
                return Err(ClientError::Api {
                    status: 500,
                    message: "Base de datos desconectada".to_string(),
                });
            }
            Err(err) => {
                self.status = BackendStatus::Disconnected;
                self.tasks.clear();
                self.view = ListView::Unreachable;
                return Err(err);
            }
        }

        self.refresh().await
    }

    /// Re-fetch the full list, replacing the entire local collection.
    ///
    /// The only operation that fully resynchronizes with the server; used
    /// to recover from any detected drift.
    pub async fn refresh(&mut self) -> ClientResult<()> {
        match self.client.list_tasks().await {
            Ok(tasks) => {
                debug!("refreshed {} tasks", tasks.len());
                self.view = if tasks.is_empty() {
                    ListView::Empty
                } else {
                    ListView::Ready
                };
                self.tasks = tasks;
                Ok(())
            }
            Err(err) => {
                match err {
                    ClientError::Unreachable(_) => {
                        self.status = BackendStatus::Disconnected;
                        self.view = ListView::Unreachable;
                    }
                    ref other => self.view = ListView::Error(other.to_string()),
                }
                Err(err)
            }
        }
    }

    /// Create a task and prepend the server-returned row.
    ///
    /// The local collection never synthesizes ids or timestamps; those
    /// are server-assigned. On failure the collection is unchanged.
    pub async fn create(&mut self, title: &str) -> ClientResult<&Task> {
        let task = self.client.create_task(title).await?;
        debug!(id = task.id, "task created");
        self.tasks.insert(0, task);
        self.view = ListView::Ready;
        Ok(&self.tasks[0])
    }

    /// Apply a partial update pessimistically: local state changes only
    /// after the server confirms, using the row the server returned.
    pub async fn update(&mut self, id: i64, patch: TaskPatch) -> ClientResult<()> {
        let task = self.client.update_task(id, &patch).await?;
        self.replace(task);
        Ok(())
    }

    /// Flip `completed` optimistically.
    ///
    /// The flip is applied locally before the request goes out and is
    /// rolled back if the request fails, so the UI never keeps a state
    /// the server rejected.
    pub async fn toggle_completed(&mut self, id: i64) -> ClientResult<()> {
        let pending = self.begin_toggle(id)?;
        let patch = TaskPatch::completed(!pending.previous);

        match self.client.update_task(id, &patch).await {
            Ok(task) => {
                self.commit_toggle(pending, task);
                Ok(())
            }
            Err(err) => {
                self.rollback_toggle(pending);
                Err(err)
            }
        }
    }

    /// Delete a task; the local entry is removed only on success.
    pub async fn delete(&mut self, id: i64) -> ClientResult<Task> {
        let deleted = self.client.delete_task(id).await?;
        self.tasks.retain(|t| t.id != id);
        if self.tasks.is_empty() && self.view == ListView::Ready {
            self.view = ListView::Empty;
        }
        Ok(deleted)
    }

    /// Tentatively flip the flag, returning the rollback token.
    fn begin_toggle(&mut self, id: i64) -> ClientResult<PendingToggle> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(ClientError::Api {
                status: 404,
                message: "Tarea no encontrada".to_string(),
            })?;
        let previous = task.completed;
        task.completed = !previous;
        Ok(PendingToggle { id, previous })
    }

    /// Confirm the toggle with the server-returned row.
    fn commit_toggle(&mut self, pending: PendingToggle, task: Task) {
        debug_assert_eq!(pending.id, task.id);
        self.replace(task);
    }

    /// Restore the flag the server rejected.
    fn rollback_toggle(&mut self, pending: PendingToggle) {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == pending.id) {
            task.completed = pending.previous;
        }
    }

    /// Replace the matching local entry by id with the server's row.
    fn replace(&mut self, task: Task) {
        if let Some(slot) = self.tasks.iter_mut().find(|t| t.id == task.id) {
            *slot = task;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use chrono::Utc;

    fn task(id: i64, title: &str, completed: bool) -> Task {
        let ts = Utc::now();
        Task {
            id,
            title: title.to_string(),
            completed,
            created_at: ts,
            updated_at: ts,
        }
    }

    fn state_with(tasks: Vec<Task>) -> SyncState {
        let client = ApiClient::new(&ClientConfig::default()).unwrap();
        let mut state = SyncState::new(client);
        state.view = if tasks.is_empty() {
            ListView::Empty
        } else {
            ListView::Ready
        };
        state.tasks = tasks;
        state
    }

    #[test]
    fn begin_toggle_flips_locally() {
        let mut state = state_with(vec![task(1, "Comprar leche", false)]);

        let pending = state.begin_toggle(1).unwrap();

        assert!(state.tasks()[0].completed);
        assert!(!pending.previous);
    }

    #[test]
    fn rollback_restores_previous_flag() {
        let mut state = state_with(vec![task(1, "Comprar leche", false)]);

        let pending = state.begin_toggle(1).unwrap();
        state.rollback_toggle(pending);

        assert!(!state.tasks()[0].completed);
    }

    #[test]
    fn commit_replaces_with_server_row() {
        let mut state = state_with(vec![task(1, "Comprar leche", false)]);

        let pending = state.begin_toggle(1).unwrap();
        let mut confirmed = task(1, "Comprar leche", true);
        confirmed.updated_at = Utc::now();
        state.commit_toggle(pending, confirmed.clone());

        assert_eq!(state.tasks()[0], confirmed);
    }

    #[test]
    fn begin_toggle_unknown_id_is_an_api_error() {
        let mut state = state_with(vec![]);

        let err = state.begin_toggle(42).unwrap_err();

        assert!(matches!(err, ClientError::Api { status: 404, .. }));
    }

    #[test]
    fn replace_ignores_unknown_ids() {
        let mut state = state_with(vec![task(1, "Comprar leche", false)]);

        state.replace(task(99, "fantasma", true));

        assert_eq!(state.tasks().len(), 1);
        assert_eq!(state.tasks()[0].id, 1);
    }
}
