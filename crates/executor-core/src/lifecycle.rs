// SPDX-License-Identifier: Apache-2.0

//! Construction and the three-thread lifecycle `spec.md` §3 ("Lifecycle")
//! and §5 ("Concurrency & Resource Model") describe: `execute` opens user
//! logic through Tasks, registers backpressure callbacks, and starts the
//! transfer-drain loop, the inbound event loop, and the tick jobs on their
//! own dedicated OS threads; `shutdown` cancels timers first, then the
//! event handler, then the transfer drain, and joins all three.

use executor_model::AddressedTuple;
use executor_queue::{QueueProducer, WatermarkHandle};
use executor_transfer::TransferDrainLoop;

use crate::backpressure::BackpressureCoordinator;
use crate::bolt::BoltExecutor;
use crate::error::Error;
use crate::spout::SpoutExecutor;
use crate::thread_host::{self, ThreadHandle};
use crate::tick::TickScheduler;

/// Either specialization an [`Executor`] drives, matching the one
/// component type every task id in an executor's range shares (`spec.md`
/// §3).
pub enum ExecutorKind {
    Bolt(BoltExecutor),
    Spout(SpoutExecutor),
}

impl ExecutorKind {
    async fn drive_one_batch(&mut self) -> Result<(), Error> {
        match self {
            ExecutorKind::Bolt(bolt) => bolt.drive_one_batch().await,
            ExecutorKind::Spout(spout) => spout.drive_one_batch().await,
        }
    }
}

/// The tick jobs scheduled at startup (`spec.md` §4.5).
pub struct TickPlan {
    pub system_tick_freq_secs: u64,
    pub system_tick_suppressed: bool,
    pub metrics_tick_intervals_secs: Vec<u64>,
}

type KindBuilder = Box<dyn FnOnce() -> Result<ExecutorKind, Error> + Send>;

/// A constructed, not-yet-running executor.
///
/// `build_kind` defers constructing [`ExecutorKind`] (and the `Task`s,
/// and thus the spout/bolt user logic it owns) until it runs on the
/// event-handler thread itself: user logic is not required to be `Send`
/// (`logic::Bolt`/`logic::Spout` are `async_trait(?Send)`), so it can
/// never cross the thread boundary that spawning requires — only the
/// `Send` closure that builds it can.
pub struct Executor {
    build_kind: Option<KindBuilder>,
    transfer_drain: Option<TransferDrainLoop>,
    tick_queue: QueueProducer<AddressedTuple>,
    tick_plan: TickPlan,
    backpressure: Option<(WatermarkHandle, BackpressureCoordinator)>,
}

impl Executor {
    #[must_use]
    pub fn new(
        build_kind: impl FnOnce() -> Result<ExecutorKind, Error> + Send + 'static,
        transfer_drain: TransferDrainLoop,
        tick_queue: QueueProducer<AddressedTuple>,
        tick_plan: TickPlan,
    ) -> Self {
        Executor {
            build_kind: Some(Box::new(build_kind)),
            transfer_drain: Some(transfer_drain),
            tick_queue,
            tick_plan,
            backpressure: None,
        }
    }

    /// Registers a [`BackpressureCoordinator`] against `receive_queue`'s
    /// watermark handle, wiring it before the event-handler thread starts
    /// consuming (`spec.md` §4.6). Skip this call entirely when
    /// `topology.backpressure.enable` is false.
    #[must_use]
    pub fn with_backpressure(mut self, watermarks: WatermarkHandle, coordinator: BackpressureCoordinator) -> Self {
        self.backpressure = Some((watermarks, coordinator));
        self
    }

    /// Starts the executor: registers backpressure, then spawns the
    /// event-handler, transfer-drain, and tick threads, in that order.
    /// Task construction (and thus the `"startup"` system-stream notice,
    /// `spec.md` §4.4) happens inside the event-handler thread's factory,
    /// before its loop begins consuming `receive_queue`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ThreadSpawn`] if any of the threads could not be
    /// created.
    pub fn execute(mut self) -> Result<RunningExecutor, Error> {
        if let Some((watermarks, coordinator)) = self.backpressure.take() {
            watermarks.set_observer(coordinator);
        }

        let build_kind = self.build_kind.take().expect("Executor::execute called twice");
        let event_handler = thread_host::spawn("executor-event-handler", move |cancel| async move {
            let mut kind = build_kind()?;
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Ok(()),
                    result = kind.drive_one_batch() => match result {
                        Ok(()) => {}
                        Err(Error::Queue(executor_queue::QueueError::Closed)) => return Ok(()),
                        Err(err) => return Err(err),
                    },
                }
            }
        })?;

        let transfer_drain_loop = self.transfer_drain.take().expect("Executor::execute called twice");
        let transfer_drain = thread_host::spawn("executor-transfer-drain", move |cancel| async move {
            transfer_drain_loop.run(cancel).await;
            Ok(())
        })?;

        let system_tick = if self.tick_plan.system_tick_suppressed || self.tick_plan.system_tick_freq_secs == 0 {
            None
        } else {
            let queue = self.tick_queue.clone();
            let freq = self.tick_plan.system_tick_freq_secs;
            Some(thread_host::spawn("executor-system-tick", move |cancel| async move {
                TickScheduler::new(queue).run_system_tick(freq, false, cancel).await;
                Ok(())
            })?)
        };

        let mut metrics_ticks = Vec::new();
        for interval in &self.tick_plan.metrics_tick_intervals_secs {
            let interval = *interval;
            let queue = self.tick_queue.clone();
            metrics_ticks.push(thread_host::spawn(
                format!("executor-metrics-tick-{interval}"),
                move |cancel| async move {
                    TickScheduler::new(queue).run_metrics_tick(interval, cancel).await;
                    Ok(())
                },
            )?);
        }

        Ok(RunningExecutor {
            event_handler,
            transfer_drain,
            system_tick,
            metrics_ticks,
        })
    }
}

/// Thread handles for a started [`Executor`]. Dropping this without
/// calling [`RunningExecutor::shutdown`] leaves every thread running
/// detached.
pub struct RunningExecutor {
    event_handler: ThreadHandle<()>,
    transfer_drain: ThreadHandle<()>,
    system_tick: Option<ThreadHandle<()>>,
    metrics_ticks: Vec<ThreadHandle<()>>,
}

impl RunningExecutor {
    /// Cancels timer jobs first, then the event handler (which finishes
    /// its current batch before exiting), then the transfer drain (which
    /// flushes whatever remains staged), joining each in turn — the
    /// ordering `spec.md` §5 describes.
    ///
    /// # Errors
    ///
    /// Returns the first error any joined thread's loop itself returned
    /// (a propagated [`Error`] or a thread panic).
    pub fn shutdown(self) -> Result<(), Error> {
        if let Some(system_tick) = self.system_tick {
            system_tick.shutdown_and_join()?;
        }
        for job in self.metrics_ticks {
            job.shutdown_and_join()?;
        }
        self.event_handler.shutdown_and_join()?;
        self.transfer_drain.shutdown_and_join()?;
        Ok(())
    }
}
