// SPDX-License-Identifier: Apache-2.0

//! `ExecutorTransfer`: the multi-producer staging buffer an executor's
//! tasks enqueue outbound tuples into, and the dedicated drain loop that
//! batches them by destination worker before handing them to the bounded
//! `transfer_queue`.

mod transfer;

pub use transfer::{
    ExecutorTransfer, TransferDrainLoop, TransferError, WorkerAddress, WorkerAddressResolver, new,
};
