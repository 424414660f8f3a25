//! Session-scoped scheduled tasks.
//!
//! Every periodic or delayed action a session starts lives in its
//! [`TimerSet`]. Ending the session cancels them all in one synchronous call,
//! so nothing keeps firing against a connection that is gone. A task that
//! returns an error or panics is stopped and reported to the controller as a
//! fault instead of taking the process down.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::controller::{SessionId, Signal};

pub struct TimerSet {
    session: SessionId,
    faults: mpsc::UnboundedSender<Signal>,
    tasks: Vec<JoinHandle<()>>,
}

impl TimerSet {
    pub fn new(session: SessionId, faults: mpsc::UnboundedSender<Signal>) -> Self {
        Self {
            session,
            faults,
            tasks: Vec::new(),
        }
    }

    /// Run `tick` every `period`, first after one full period.
    pub fn every<F, Fut>(&mut self, name: &'static str, period: Duration, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let reporter = self.reporter(name);
        self.tasks.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(error) = guarded(tick()).await {
                    reporter.report(error);
                    break;
                }
            }
        }));
    }

    /// Run `task` once after `delay`.
    pub fn after<Fut>(&mut self, name: &'static str, delay: Duration, task: Fut)
    where
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let reporter = self.reporter(name);
        self.tasks.push(tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if let Err(error) = guarded(task).await {
                reporter.report(error);
            }
        }));
    }

    /// Tasks that have not yet finished.
    pub fn active(&self) -> usize {
        self.tasks.iter().filter(|t| !t.is_finished()).count()
    }

    /// Abort every task. Returns how many were still running.
    pub fn cancel_all(&mut self) -> usize {
        let mut cancelled = 0;
        for task in self.tasks.drain(..) {
            if !task.is_finished() {
                cancelled += 1;
            }
            task.abort();
        }
        cancelled
    }

    fn reporter(&self, name: &'static str) -> FaultReporter {
        FaultReporter {
            session: self.session,
            name,
            faults: self.faults.clone(),
        }
    }
}

impl Drop for TimerSet {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

struct FaultReporter {
    session: SessionId,
    name: &'static str,
    faults: mpsc::UnboundedSender<Signal>,
}

impl FaultReporter {
    fn report(&self, error: String) {
        tracing::debug!(session = self.session, timer = self.name, %error, "Timer task failed");
        let _ = self.faults.send(Signal::Fault {
            session: self.session,
            error: format!("{}: {error}", self.name),
        });
    }
}

/// Await `fut`, turning both errors and panics into a message.
async fn guarded<Fut>(fut: Fut) -> Result<(), String>
where
    Fut: Future<Output = anyhow::Result<()>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(format!("{e:#}")),
        Err(panic) => Err(format!("panicked: {}", panic_message(&*panic))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
