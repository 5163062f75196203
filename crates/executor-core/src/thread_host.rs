// SPDX-License-Identifier: Apache-2.0

//! Runs a loop on a dedicated OS thread with its own single-threaded Tokio
//! runtime plus a `CancellationToken`-driven shutdown signal, one per
//! executor thread (`spec.md` §5: event-handler, transfer-drain, timer).

use std::future::Future;
use std::thread;

use tokio::runtime::Builder as RtBuilder;
use tokio::task::LocalSet;
use tokio_util::sync::CancellationToken;

use crate::error::Error;

/// Handle to a loop running on a dedicated thread.
pub struct ThreadHandle<T> {
    cancel_token: CancellationToken,
    join_handle: Option<thread::JoinHandle<Result<T, Error>>>,
    name: String,
}

impl<T> ThreadHandle<T> {
    /// Requests shutdown by cancelling the token. Idempotent, best-effort;
    /// does not wait for the thread to exit.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }

    /// Requests shutdown and blocks until the thread has joined.
    ///
    /// # Errors
    ///
    /// Returns the loop's own error, or [`Error::ThreadJoinPanic`] if the
    /// thread panicked.
    pub fn shutdown_and_join(mut self) -> Result<T, Error> {
        self.shutdown();
        match self.join_handle.take().expect("join handle missing").join() {
            Ok(result) => result,
            Err(panic) => Err(Error::ThreadJoinPanic {
                thread_name: self.name.clone(),
                panic_message: format!("{panic:?}"),
            }),
        }
    }
}

/// Spawns `task_factory(cancel_token)` on a dedicated OS thread running a
/// single-threaded Tokio runtime with a `LocalSet`, so `!Send` futures
/// (e.g. user bolt/spout logic that is not required to be `Send`) can run
/// on it. The factory receives the cancellation token so its loop can
/// observe shutdown.
///
/// # Errors
///
/// Returns [`Error::ThreadSpawn`] if the OS thread could not be created.
pub fn spawn<T, Fut, F>(thread_name: impl Into<String>, task_factory: F) -> Result<ThreadHandle<T>, Error>
where
    T: Send + 'static,
    Fut: 'static + Future<Output = Result<T, Error>>,
    F: 'static + Send + FnOnce(CancellationToken) -> Fut,
{
    let name = thread_name.into();
    let name_for_thread = name.clone();
    let token = CancellationToken::new();
    let token_for_task = token.clone();

    let join_handle = thread::Builder::new()
        .name(name_for_thread)
        .spawn(move || {
            let rt = RtBuilder::new_current_thread()
                .enable_all()
                .build()
                .expect("failed to build executor thread runtime");
            let local = LocalSet::new();
            let fut = task_factory(token_for_task);
            rt.block_on(local.run_until(fut))
        })
        .map_err(|source| Error::ThreadSpawn {
            thread_name: name.clone(),
            source,
        })?;

    Ok(ThreadHandle {
        cancel_token: token,
        join_handle: Some(join_handle),
        name,
    })
}
