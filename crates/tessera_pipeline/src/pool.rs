//! Bounded worker pool fed by a job channel.
//!
//! ```text
//!   start() ──┐                       ┌──> worker 0 ──┐
//!             ├──> [crossbeam channel] ┼──> worker 1 ──┼──> ready dependants
//!   worker ───┘      (entry indices)   └──> worker N ──┘        │
//!      ^──────────────────────────────────────────────────────────┘
//! ```
//!
//! Workers push newly ready dependants back onto the same channel.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};

use crate::pipeline::Shared;

/// Message to a worker.
pub(crate) enum Job {
    /// Run the entry with this index.
    Run(usize),
    /// Exit the worker loop.
    Shutdown,
}

/// Fixed set of worker threads bound to one pipeline run.
pub(crate) struct WorkerPool {
    sender: Sender<Job>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `count` workers.
    pub fn spawn(count: usize, shared: &Arc<Shared>) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let workers = (0..count)
            .map(|_| {
                let shared = Arc::clone(shared);
                let sender = sender.clone();
                let receiver = receiver.clone();
                thread::spawn(move || Self::worker_loop(&shared, &receiver, &sender))
            })
            .collect();
        Self { sender, workers }
    }

    fn worker_loop(shared: &Shared, receiver: &Receiver<Job>, sender: &Sender<Job>) {
        while let Ok(job) = receiver.recv() {
            match job {
                Job::Run(index) => shared.run(index, sender),
                Job::Shutdown => break,
            }
        }
    }

    /// Queues an entry.
    pub fn submit(&self, index: usize) {
        // Workers hold receivers until shutdown, so the channel is open
        let _ = self.sender.send(Job::Run(index));
    }

    /// Number of worker threads.
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Stops every worker once the jobs ahead of the shutdown are drained.
    pub fn shutdown(mut self) {
        for _ in 0..self.workers.len() {
            let _ = self.sender.send(Job::Shutdown);
        }
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::warn!("pipeline worker exited by panic");
            }
        }
    }
}
