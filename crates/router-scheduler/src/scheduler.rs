//! In-process task scheduler
//!
//! Each scheduled task owns a background loop that waits for its next tick
//! (interval, cron, or manual trigger) and dispatches one execution. An
//! execution holds the task's in-flight guard for its whole lifetime, so a
//! tick that finds the guard taken is skipped.

use crate::definition::{Frequency, ScheduleDefinition};
use crate::error::{SchedulerError, SchedulerResult};
use crate::runner::{ScheduledTaskRunner, TaskFn};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, sleep_until, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Bookkeeping for one scheduled task
struct ScheduledTask {
    /// Wakes the loop for an out-of-band run
    trigger: Arc<Notify>,

    /// Held by the running execution
    in_flight: Arc<Mutex<()>>,

    /// Scheduling loop
    handle: JoinHandle<()>,
}

/// Scheduler for named, non-overlapping tasks
#[derive(Default)]
pub struct TaskScheduler {
    tasks: DashMap<String, ScheduledTask>,
}

impl TaskScheduler {
    /// Create a new scheduler
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Runner that schedules every task it is given on `definition`
    pub fn create_scheduled_task_runner(
        self: &Arc<Self>,
        definition: ScheduleDefinition,
    ) -> ScheduledTaskRunner {
        ScheduledTaskRunner::new(self.clone(), definition)
    }

    /// Schedule `func` under `id`
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule_task(
        &self,
        id: impl Into<String>,
        definition: ScheduleDefinition,
        func: TaskFn,
    ) -> SchedulerResult<()> {
        let id = id.into();

        match self.tasks.entry(id.clone()) {
            Entry::Occupied(_) => Err(SchedulerError::DuplicateTask(id)),
            Entry::Vacant(slot) => {
                let trigger = Arc::new(Notify::new());
                let in_flight = Arc::new(Mutex::new(()));

                info!(
                    task_id = %id,
                    frequency = ?definition.frequency,
                    timeout_ms = definition.timeout.as_millis() as u64,
                    initial_delay_ms = definition.initial_delay.as_millis() as u64,
                    "Scheduled task"
                );

                let handle = tokio::spawn(run_loop(
                    id,
                    definition,
                    func,
                    trigger.clone(),
                    in_flight.clone(),
                ));

                slot.insert(ScheduledTask {
                    trigger,
                    in_flight,
                    handle,
                });
                Ok(())
            }
        }
    }

    /// Request an immediate run of `id`
    ///
    /// Coalesced with any run already in flight.
    pub fn trigger(&self, id: &str) -> SchedulerResult<()> {
        let task = self
            .tasks
            .get(id)
            .ok_or_else(|| SchedulerError::TaskNotFound(id.to_string()))?;
        task.trigger.notify_one();
        Ok(())
    }

    /// Whether an execution of `id` is currently in flight
    pub fn is_running(&self, id: &str) -> bool {
        self.tasks
            .get(id)
            .map(|task| task.in_flight.try_lock().is_err())
            .unwrap_or(false)
    }

    /// Ids of all scheduled tasks
    pub fn task_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.tasks.iter().map(|t| t.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Stop all scheduling loops
    pub fn shutdown(&self) {
        for task in self.tasks.iter() {
            task.handle.abort();
        }
        self.tasks.clear();
        info!("Task scheduler stopped");
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        for task in self.tasks.iter() {
            task.handle.abort();
        }
    }
}

/// Source of ticks for one task
enum Clock {
    Interval(Interval),
    Cron(CronClock),
    Manual,
}

/// Cron fire times mapped onto the tokio clock from an anchor taken at start
struct CronClock {
    schedule: cron::Schedule,
    anchor_wall: DateTime<Utc>,
    anchor: Instant,
    last: DateTime<Utc>,
}

impl CronClock {
    fn new(schedule: cron::Schedule) -> Self {
        let now = Utc::now();
        Self {
            schedule,
            anchor_wall: now,
            anchor: Instant::now(),
            last: now,
        }
    }

    async fn tick(&mut self) {
        let offset = |at: DateTime<Utc>| (at - self.anchor_wall).to_std().unwrap_or_default();
        let next = self
            .schedule
            .after(&self.last)
            .next()
            .and_then(|at| Some((at, self.anchor.checked_add(offset(at))?)));
        let Some((at, deadline)) = next else {
            return std::future::pending::<()>().await;
        };
        sleep_until(deadline).await;
        self.last = at;
    }
}

impl Clock {
    fn new(frequency: &Frequency) -> Self {
        match frequency {
            Frequency::Every(every) => {
                let mut ticker = interval(*every);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                Clock::Interval(ticker)
            }
            // Validated when the frequency was built
            Frequency::Cron(expr) => match cron::Schedule::from_str(expr) {
                Ok(schedule) => Clock::Cron(CronClock::new(schedule)),
                Err(e) => {
                    warn!(cron = %expr, error = %e, "Invalid cron expression, task will only run on trigger");
                    Clock::Manual
                }
            },
            Frequency::Manual => Clock::Manual,
        }
    }

    async fn tick(&mut self) {
        match self {
            Clock::Interval(ticker) => {
                ticker.tick().await;
            }
            Clock::Cron(cron) => cron.tick().await,
            Clock::Manual => std::future::pending::<()>().await,
        }
    }
}

async fn run_loop(
    id: String,
    definition: ScheduleDefinition,
    func: TaskFn,
    trigger: Arc<Notify>,
    in_flight: Arc<Mutex<()>>,
) {
    if !definition.initial_delay.is_zero() {
        sleep(definition.initial_delay).await;
    }

    let mut clock = Clock::new(&definition.frequency);

    loop {
        tokio::select! {
            _ = clock.tick() => {}
            _ = trigger.notified() => {
                debug!(task_id = %id, "Task triggered manually");
            }
        }

        dispatch(&id, &definition, &func, &in_flight);
    }
}

/// Start one execution unless the previous one is still in flight
fn dispatch(id: &str, definition: &ScheduleDefinition, func: &TaskFn, in_flight: &Arc<Mutex<()>>) {
    let Ok(guard) = in_flight.clone().try_lock_owned() else {
        debug!(task_id = %id, "Task still running, skipping tick");
        return;
    };

    let id = id.to_string();
    let timeout = definition.timeout;
    let execution = func();

    tokio::spawn(async move {
        let _guard = guard;
        if tokio::time::timeout(timeout, execution).await.is_err() {
            warn!(
                task_id = %id,
                timeout_ms = timeout.as_millis() as u64,
                "Task exceeded its timeout and was cancelled"
            );
        }
    });
}
