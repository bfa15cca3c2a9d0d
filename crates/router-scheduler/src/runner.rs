//! Task runner abstraction

use crate::definition::ScheduleDefinition;
use crate::error::SchedulerResult;
use crate::scheduler::TaskScheduler;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;

/// Body of a scheduled task; called once per execution
pub type TaskFn = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// A named function handed to a [`TaskRunner`]
#[derive(Clone)]
pub struct TaskInvocation {
    pub id: String,
    pub func: TaskFn,
}

impl TaskInvocation {
    pub fn new<F, Fut>(id: impl Into<String>, func: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            id: id.into(),
            func: Arc::new(move || func().boxed()),
        }
    }
}

impl std::fmt::Debug for TaskInvocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskInvocation")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Runs named functions on a schedule owned by the runner
///
/// Implementations must never run two executions of the same task id
/// concurrently.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    /// Register `task` to run on this runner's schedule
    async fn run(&self, task: TaskInvocation) -> SchedulerResult<()>;
}

/// [`TaskRunner`] bound to one schedule on an in-process [`TaskScheduler`]
#[derive(Clone)]
pub struct ScheduledTaskRunner {
    scheduler: Arc<TaskScheduler>,
    definition: ScheduleDefinition,
}

impl ScheduledTaskRunner {
    pub fn new(scheduler: Arc<TaskScheduler>, definition: ScheduleDefinition) -> Self {
        Self {
            scheduler,
            definition,
        }
    }
}

#[async_trait]
impl TaskRunner for ScheduledTaskRunner {
    async fn run(&self, task: TaskInvocation) -> SchedulerResult<()> {
        self.scheduler
            .schedule_task(task.id, self.definition.clone(), task.func)
    }
}
