mod child;
mod executor;
mod fork_executor;
mod job;
mod pipes;
mod redirect;
pub mod wait;

pub use child::CHILD_DEFAULT_SIGNALS;
pub use executor::{Executor, LaunchError, LaunchOptions};
pub use fork_executor::ForkExecutor;
pub use job::{Job, Process, ProcessStatus};
pub use pipes::PipeSet;
pub use redirect::OpenedRedirect;
pub use wait::{JobTable, WaitError, WaitPolicy};

#[cfg(test)]
pub(crate) use executor::tests;
