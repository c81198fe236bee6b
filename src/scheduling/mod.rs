//! # Task Scheduling
//!
//! Everything that decides *when* pipeline work runs.
//!
//! ## Architecture Overview
//! - [`LoadQueue`]: de-duplicating priority queue of pending [`LoadRequest`]s
//! - [`Task`]: one pipeline stage for one chunk
//! - [`TaskManager`]: worker pool that runs tasks off the control thread
//! - `TaskChannel`: the channel pair connecting the control thread to one worker
//!
//! ## Task Lifecycle
//! 1. Tasks are published via `TaskManager::publish_task()`
//! 2. The manager hands them to worker channels round-robin, queuing them when every
//!    worker already has `max_in_flight` tasks
//! 3. Workers process tasks and send back outcomes
//! 4. The control thread collects outcomes in `process_completed_tasks()` without blocking
//! 5. `process_queued_tasks()` moves queued tasks to workers as slots free up
//!
//! With zero workers, tasks run inline inside `publish_task()` and their outcomes wait in a
//! local queue until the next `process_completed_tasks()`.

pub mod queue;
pub mod task;

use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use log::{debug, error, info};

pub use queue::{LoadQueue, LoadRequest};
pub use task::{run_isolated, LoadTicket, Task};

use crate::pipeline::TaskOutcome;
use crate::streaming::StreamingError;

/// A communication channel between the control thread and one worker thread.
///
/// Dropping `task_sender` makes the worker's receive loop end, after which `worker` can be
/// joined.
struct TaskChannel {
    task_sender: Option<Sender<Box<dyn Task>>>,
    result_receiver: Receiver<TaskOutcome>,
    num_tasks_in_flight: usize,
    worker: Option<JoinHandle<()>>,
}

/// Manages a pool of worker threads and coordinates task execution.
pub struct TaskManager {
    channels: Vec<TaskChannel>,
    queued_tasks: VecDeque<Box<dyn Task>>,
    inline_outcomes: VecDeque<TaskOutcome>,
    current_channel: usize,
    max_in_flight: usize,
}

impl TaskManager {
    /// Creates a new `TaskManager` with the specified number of worker threads.
    ///
    /// # Arguments
    /// * `num_workers` - Worker threads to spawn; 0 runs every task inline
    /// * `max_in_flight` - Tasks a single worker may hold at once
    ///
    /// # Errors
    /// Returns [`StreamingError::WorkerSpawn`] if a thread cannot be created. Workers
    /// spawned before the failure are shut down.
    pub fn new(num_workers: usize, max_in_flight: usize) -> Result<Self, StreamingError> {
        let mut manager = TaskManager {
            channels: Vec::with_capacity(num_workers),
            queued_tasks: VecDeque::new(),
            inline_outcomes: VecDeque::new(),
            current_channel: 0,
            max_in_flight: max_in_flight.max(1),
        };

        if num_workers > 0 {
            info!(
                "Spawning {} chunk workers (available parallelism: {:?})",
                num_workers,
                thread::available_parallelism()
            );
        }

        for index in 0..num_workers {
            let (task_tx, task_rx) = channel::<Box<dyn Task>>();
            let (result_tx, result_rx) = channel::<TaskOutcome>();

            let task_closure = move || {
                while let Ok(task) = task_rx.recv() {
                    let outcome = run_isolated(task);
                    if result_tx.send(outcome).is_err() {
                        break;
                    }
                }
            };

            let worker = thread::Builder::new()
                .name(format!("chunk-worker-{}", index))
                .spawn(task_closure)
                .map_err(|source| StreamingError::WorkerSpawn { index, source })?;

            manager.channels.push(TaskChannel {
                task_sender: Some(task_tx),
                result_receiver: result_rx,
                num_tasks_in_flight: 0,
                worker: Some(worker),
            });
        }

        Ok(manager)
    }

    /// Number of worker threads; 0 means inline execution.
    pub fn worker_count(&self) -> usize {
        self.channels.len()
    }

    /// Attempts to send a task to a specific worker channel, giving it back on failure.
    fn try_send_task(&mut self, task: Box<dyn Task>, channel_idx: usize) -> Result<(), Box<dyn Task>> {
        let channel = &mut self.channels[channel_idx];
        let Some(sender) = channel.task_sender.as_ref() else {
            return Err(task);
        };
        match sender.send(task) {
            Ok(()) => {
                channel.num_tasks_in_flight += 1;
                Ok(())
            }
            Err(error) => Err(error.0),
        }
    }

    /// Finds a worker channel below its in-flight limit, round-robin from the last one used.
    fn find_available_channel(&self) -> Option<usize> {
        let count = self.channels.len();
        (0..count)
            .map(|offset| (self.current_channel + offset) % count)
            .find(|&index| {
                let channel = &self.channels[index];
                channel.task_sender.is_some() && channel.num_tasks_in_flight < self.max_in_flight
            })
    }

    /// Publishes a task for execution.
    ///
    /// # Returns
    /// - `true` if the task was handed to a worker or ran inline
    /// - `false` if it was queued because every worker is busy
    pub fn publish_task(&mut self, task: Box<dyn Task>) -> bool {
        if self.channels.is_empty() {
            let outcome = run_isolated(task);
            self.inline_outcomes.push_back(outcome);
            return true;
        }

        let Some(channel_idx) = self.find_available_channel() else {
            self.queued_tasks.push_back(task);
            return false;
        };

        match self.try_send_task(task, channel_idx) {
            Ok(()) => {
                self.current_channel = (channel_idx + 1) % self.channels.len();
                true
            }
            Err(task) => {
                self.queued_tasks.push_back(task);
                false
            }
        }
    }

    /// Hands queued tasks to workers until the queue is empty or every worker is busy.
    pub fn process_queued_tasks(&mut self) {
        while let Some(channel_idx) = self.find_available_channel() {
            let Some(task) = self.queued_tasks.pop_front() else {
                return;
            };
            if let Err(task) = self.try_send_task(task, channel_idx) {
                // Worker disconnected; keep the task and stop for this tick.
                self.queued_tasks.push_front(task);
                return;
            }
            self.current_channel = (channel_idx + 1) % self.channels.len();
        }
    }

    /// Collects every outcome available right now without blocking.
    pub fn process_completed_tasks(&mut self) -> Vec<TaskOutcome> {
        let mut outcomes: Vec<TaskOutcome> = self.inline_outcomes.drain(..).collect();

        for (index, channel) in self.channels.iter_mut().enumerate() {
            loop {
                match channel.result_receiver.try_recv() {
                    Ok(outcome) => {
                        channel.num_tasks_in_flight = channel.num_tasks_in_flight.saturating_sub(1);
                        outcomes.push(outcome);
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        if channel.num_tasks_in_flight > 0 {
                            error!(
                                "Chunk worker {} disconnected with {} tasks in flight",
                                index, channel.num_tasks_in_flight
                            );
                        }
                        channel.num_tasks_in_flight = 0;
                        channel.task_sender = None;
                        break;
                    }
                }
            }
        }

        outcomes
    }

    /// Tasks currently held by workers.
    pub fn in_flight_count(&self) -> usize {
        self.channels.iter().map(|channel| channel.num_tasks_in_flight).sum()
    }

    /// Tasks waiting for a free worker.
    pub fn queued_count(&self) -> usize {
        self.queued_tasks.len()
    }

    /// Whether nothing is running, queued, or waiting to be collected.
    pub fn is_idle(&self) -> bool {
        self.in_flight_count() == 0 && self.queued_tasks.is_empty() && self.inline_outcomes.is_empty()
    }

    /// Drops every queued task and every uncollected inline outcome.
    ///
    /// Tasks already on workers keep running; their outcomes still arrive through
    /// `process_completed_tasks()`.
    pub fn discard_pending(&mut self) -> usize {
        let discarded = self.queued_tasks.len() + self.inline_outcomes.len();
        self.queued_tasks.clear();
        self.inline_outcomes.clear();
        discarded
    }

    /// Stops all workers, waiting for the task each one is running.
    ///
    /// Queued tasks and uncollected outcomes are dropped. Calling it twice is harmless.
    pub fn shutdown(&mut self) {
        self.discard_pending();
        for channel in &mut self.channels {
            channel.task_sender = None;
        }
        for (index, channel) in self.channels.iter_mut().enumerate() {
            if let Some(worker) = channel.worker.take() {
                if worker.join().is_err() {
                    error!("Chunk worker {} terminated abnormally", index);
                }
            }
            channel.num_tasks_in_flight = 0;
        }
        if !self.channels.is_empty() {
            debug!("Joined {} chunk workers", self.channels.len());
        }
        self.channels.clear();
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
