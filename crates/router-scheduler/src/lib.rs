//! Router Scheduler - named, non-overlapping scheduled tasks
//!
//! Tasks are registered under a unique id together with a
//! [`ScheduleDefinition`]. The scheduler guarantees that at most one execution
//! per task id is in flight at any time: a tick that arrives while the
//! previous run is still going is dropped, not queued.
//!
//! Consumers that only need to hand a function to "something that runs it on
//! a schedule" depend on the [`TaskRunner`] trait; [`ScheduledTaskRunner`] is
//! the in-process implementation bound to one schedule.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod definition;
pub mod error;
pub mod runner;
pub mod scheduler;

pub use definition::{
    DurationConfig, Frequency, FrequencyConfig, HumanDuration, ScheduleDefinition,
    ScheduleDefinitionConfig,
};
pub use error::{SchedulerError, SchedulerResult};
pub use runner::{ScheduledTaskRunner, TaskFn, TaskInvocation, TaskRunner};
pub use scheduler::TaskScheduler;
