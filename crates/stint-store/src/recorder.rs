//! Persistence gateway for one live session.
//!
//! A `SessionRecorder` is created when a timer starts and owns the durable
//! identity of that session: its row, its task, and the task aggregate as it
//! stood before the session began. Autosave flushes write the absolute
//! elapsed value to the session row and move the aggregate by the delta;
//! the terminal flush recomputes the aggregate from the baseline instead,
//! so a missed or failed autosave never leaves permanent drift.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use stint_core::types::{SessionId, TaskId};

use crate::store::{SqliteStore, StoreError};

#[derive(Debug)]
pub struct SessionRecorder {
    store: Arc<SqliteStore>,
    session_id: SessionId,
    task_id: TaskId,
    prior_accumulated: i64,
}

impl SessionRecorder {
    /// Inserts the zero-duration session row and captures the task aggregate
    /// baseline. The task must exist.
    pub fn begin(
        store: Arc<SqliteStore>,
        task_id: TaskId,
        started_at: DateTime<Utc>,
    ) -> Result<Self, StoreError> {
        let task = store
            .load_task(task_id)?
            .ok_or(StoreError::TaskNotFound { id: task_id })?;
        let session_id = store.insert_session(task_id, started_at)?;
        Ok(Self {
            store,
            session_id,
            task_id,
            prior_accumulated: task.accumulated_seconds,
        })
    }

    /// Intermediate flush. Safe to repeat with the same value.
    pub fn flush(&self, elapsed_seconds: i64) -> Result<(), StoreError> {
        self.store.flush_session(self.session_id, elapsed_seconds)
    }

    /// Terminal flush for Stop. The aggregate becomes
    /// `prior_accumulated + final_seconds` regardless of what intermediate
    /// flushes landed.
    pub fn finalize(&self, final_seconds: i64) -> Result<(), StoreError> {
        self.store.finalize_session(
            self.session_id,
            self.task_id,
            self.prior_accumulated,
            final_seconds,
        )
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Task aggregate as captured at `begin`.
    pub fn prior_accumulated(&self) -> i64 {
        self.prior_accumulated
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use stint_core::timer::SessionTimer;
    use stint_core::types::{Task, TaskId};

    use super::SessionRecorder;
    use crate::store::{SqliteStore, StoreError};

    fn mk_store() -> Arc<SqliteStore> {
        let store = SqliteStore::open_in_memory().expect("in-memory store");
        store.migrate().expect("migrate");
        Arc::new(store)
    }

    fn mk_task(store: &SqliteStore, name: &str) -> Task {
        store.create_task(name, None).expect("create task")
    }

    fn task_total(store: &SqliteStore, id: TaskId) -> i64 {
        store
            .load_task(id)
            .expect("load task")
            .expect("task exists")
            .accumulated_seconds
    }

    #[test]
    fn begin_inserts_zero_duration_row_and_captures_baseline() {
        let store = mk_store();
        let task = mk_task(&store, "Baseline");

        let recorder =
            SessionRecorder::begin(Arc::clone(&store), task.id, Utc::now()).expect("begin");
        assert_eq!(recorder.task_id(), task.id);
        assert_eq!(recorder.prior_accumulated(), 0);

        let session = store
            .load_session(recorder.session_id())
            .expect("load session")
            .expect("session exists");
        assert_eq!(session.duration_seconds, 0);
        assert_eq!(session.task_id, task.id);
    }

    #[test]
    fn begin_fails_for_unknown_task() {
        let store = mk_store();
        let err = SessionRecorder::begin(store, TaskId(77), Utc::now())
            .expect_err("missing task should fail");
        assert!(matches!(err, StoreError::TaskNotFound { id: TaskId(77) }));
    }

    #[test]
    fn flush_overwrites_row_and_moves_aggregate_by_delta() {
        let store = mk_store();
        let task = mk_task(&store, "Deltas");
        let recorder =
            SessionRecorder::begin(Arc::clone(&store), task.id, Utc::now()).expect("begin");

        recorder.flush(5).expect("flush 5");
        assert_eq!(task_total(&store, task.id), 5);

        recorder.flush(9).expect("flush 9");
        assert_eq!(task_total(&store, task.id), 9);

        let session = store
            .load_session(recorder.session_id())
            .expect("load session")
            .expect("session exists");
        assert_eq!(session.duration_seconds, 9);
    }

    #[test]
    fn flush_is_idempotent_for_a_repeated_value() {
        let store = mk_store();
        let task = mk_task(&store, "Idempotent");
        let recorder =
            SessionRecorder::begin(Arc::clone(&store), task.id, Utc::now()).expect("begin");

        recorder.flush(12).expect("first flush");
        recorder.flush(12).expect("repeat flush");
        recorder.flush(12).expect("third flush");

        assert_eq!(task_total(&store, task.id), 12);
        let session = store
            .load_session(recorder.session_id())
            .expect("load session")
            .expect("session exists");
        assert_eq!(session.duration_seconds, 12);
    }

    #[test]
    fn cancel_keeps_only_previously_flushed_time() {
        let store = mk_store();
        let task = mk_task(&store, "Abandoned");
        let recorder =
            SessionRecorder::begin(Arc::clone(&store), task.id, Utc::now()).expect("begin");

        recorder.flush(3).expect("autosave flush");
        // cancellation makes no gateway call; the recorder is simply dropped
        drop(recorder);

        assert_eq!(task_total(&store, task.id), 3);
        let sessions = store
            .list_sessions_for_task(task.id)
            .expect("list sessions");
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].duration_seconds, 3);
    }

    #[test]
    fn finalize_recomputes_aggregate_from_baseline() {
        let store = mk_store();
        let task = mk_task(&store, "Healed");
        let recorder =
            SessionRecorder::begin(Arc::clone(&store), task.id, Utc::now()).expect("begin");

        recorder.flush(4).expect("autosave flush");

        // wreck the aggregate behind the recorder's back
        {
            let conn = store.conn_for_tests();
            conn.execute(
                "UPDATE tasks SET accumulated_seconds = 9000 WHERE id = ?1",
                rusqlite::params![task.id.0],
            )
            .expect("corrupt aggregate");
        }

        recorder.finalize(10).expect("finalize");
        assert_eq!(task_total(&store, task.id), 10);

        let session = store
            .load_session(recorder.session_id())
            .expect("load session")
            .expect("session exists");
        assert_eq!(session.duration_seconds, 10);
    }

    #[test]
    fn back_to_back_sessions_accumulate_on_the_same_task() {
        let store = mk_store();
        let task = mk_task(&store, "Two stints");

        let first =
            SessionRecorder::begin(Arc::clone(&store), task.id, Utc::now()).expect("begin first");
        first.flush(2).expect("flush first");
        first.finalize(5).expect("finalize first");
        assert_eq!(task_total(&store, task.id), 5);

        let second =
            SessionRecorder::begin(Arc::clone(&store), task.id, Utc::now()).expect("begin second");
        assert_eq!(second.prior_accumulated(), 5);
        second.finalize(7).expect("finalize second");
        assert_eq!(task_total(&store, task.id), 12);

        let sessions = store
            .list_sessions_for_task(task.id)
            .expect("list sessions");
        let durations: Vec<i64> = sessions.iter().map(|s| s.duration_seconds).collect();
        assert_eq!(durations, vec![5, 7]);
    }

    #[test]
    fn timed_scenario_records_running_time_only() {
        // 3s running, 2s paused, 2s running: 5 seconds on the record
        let store = mk_store();
        let task = mk_task(&store, "Scenario");
        let recorder =
            SessionRecorder::begin(Arc::clone(&store), task.id, Utc::now()).expect("begin");

        let t0 = Instant::now();
        let mut timer = SessionTimer::new();
        timer.start_at(t0).expect("start");
        timer.pause_at(t0 + Duration::from_secs(3)).expect("pause");
        timer
            .resume_at(t0 + Duration::from_secs(5))
            .expect("resume");
        let total = timer.stop_at(t0 + Duration::from_secs(7)).expect("stop");

        recorder
            .finalize(total.as_secs() as i64)
            .expect("finalize");

        assert_eq!(task_total(&store, task.id), 5);
        let session = store
            .load_session(recorder.session_id())
            .expect("load session")
            .expect("session exists");
        assert_eq!(session.duration_seconds, 5);
    }

    #[test]
    fn finalize_fails_when_session_row_is_gone() {
        let store = mk_store();
        let task = mk_task(&store, "Vanishing");
        let recorder =
            SessionRecorder::begin(Arc::clone(&store), task.id, Utc::now()).expect("begin");

        {
            let conn = store.conn_for_tests();
            conn.execute(
                "DELETE FROM sessions WHERE id = ?1",
                rusqlite::params![recorder.session_id().0],
            )
            .expect("drop session row");
        }

        let err = recorder.finalize(6).expect_err("finalize should fail");
        assert!(matches!(err, StoreError::SessionNotFound { .. }));
        // the aggregate is untouched when the terminal flush fails
        assert_eq!(task_total(&store, task.id), 0);
    }
}
