//! # Refresh Registry
//!
//! Owns the background tasks that keep resources fresh. Each task is identified by a
//! name (the cache key for polling tasks) and a [`TaskType`]; at most one task exists
//! per pair. Stopping a task aborts it, which also drops any fetch it was awaiting.

use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};

/// Kinds of background tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskType {
    /// Periodic gated fetch of one resource
    Polling,
    /// Forwarding of push notifications into forced refreshes
    PushForward,
}

/// One running task and the instance that armed it, if any
struct TaskSlot {
    handle: JoinHandle<()>,
    owner: Option<u64>,
}

type TaskMap = HashMap<(String, TaskType), TaskSlot>;

/// Registry of running background tasks
#[derive(Clone, Default)]
pub struct RefreshRegistry {
    tasks: Arc<Mutex<TaskMap>>,
}

impl RefreshRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TaskMap> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts a task running `tick` every `period`, first after one full period.
    ///
    /// Ticks run to completion one at a time; ticks missed while one is running are
    /// skipped, not queued. Returns false if a live task already exists for the pair.
    pub fn start_periodic_task<F, Fut>(
        &self,
        name: &str,
        task_type: TaskType,
        period: Duration,
        tick: F,
    ) -> bool
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.spawn_periodic(name, task_type, None, period, tick)
    }

    /// Like [`start_periodic_task`](Self::start_periodic_task), tagged with the id of the
    /// instance that owns it so that only that instance can stop it.
    pub(crate) fn start_owned_periodic_task<F, Fut>(
        &self,
        name: &str,
        task_type: TaskType,
        owner: u64,
        period: Duration,
        tick: F,
    ) -> bool
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.spawn_periodic(name, task_type, Some(owner), period, tick)
    }

    fn spawn_periodic<F, Fut>(
        &self,
        name: &str,
        task_type: TaskType,
        owner: Option<u64>,
        period: Duration,
        tick: F,
    ) -> bool
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.lock();
        let slot = (name.to_string(), task_type);
        if tasks.get(&slot).is_some_and(|task| !task.handle.is_finished()) {
            return false;
        }

        let _name = name.to_string();
        // The first deadline counts from registration, not from the task's first poll.
        let start = Instant::now() + period;
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                crate::log_poll!("Tick for {} ({:?})", _name, task_type);
                tick().await;
            }
        });
        tasks.insert(slot, TaskSlot { handle, owner });
        crate::debug_log!(
            "⏱️ [REFRESH] Started {:?} task for {} every {:?}",
            task_type,
            name,
            period
        );
        true
    }

    /// Starts a one-off background task, e.g. draining a notification stream
    pub fn start_task<Fut>(&self, name: &str, task_type: TaskType, task: Fut) -> bool
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.lock();
        let slot = (name.to_string(), task_type);
        if tasks.get(&slot).is_some_and(|task| !task.handle.is_finished()) {
            return false;
        }
        let handle = tokio::spawn(task);
        tasks.insert(slot, TaskSlot { handle, owner: None });
        true
    }

    pub fn stop_task(&self, name: &str, task_type: TaskType) -> bool {
        let removed = self.lock().remove(&(name.to_string(), task_type));
        Self::abort(removed, name, task_type)
    }

    /// Stops the task only if it was armed by `owner`
    pub(crate) fn stop_owned_task(&self, name: &str, task_type: TaskType, owner: u64) -> bool {
        let removed = {
            let mut tasks = self.lock();
            let slot = (name.to_string(), task_type);
            match tasks.get(&slot) {
                Some(task) if task.owner == Some(owner) => tasks.remove(&slot),
                _ => None,
            }
        };
        Self::abort(removed, name, task_type)
    }

    fn abort(removed: Option<TaskSlot>, _name: &str, _task_type: TaskType) -> bool {
        match removed {
            Some(task) => {
                task.handle.abort();
                crate::debug_log!("🛑 [REFRESH] Stopped {:?} task for {}", _task_type, _name);
                true
            }
            None => false,
        }
    }

    pub fn has_task(&self, name: &str, task_type: TaskType) -> bool {
        self.lock()
            .get(&(name.to_string(), task_type))
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Number of live tasks
    pub fn task_count(&self) -> usize {
        self.lock()
            .values()
            .filter(|task| !task.handle.is_finished())
            .count()
    }

    /// Aborts every task
    pub fn stop_all(&self) {
        for (_, task) in self.lock().drain() {
            task.handle.abort();
        }
    }
}
