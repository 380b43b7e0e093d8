//! Scheduler bridge between crawl steps and the executor
//!
//! This module handles:
//! - The `SchedulerBridge` trait, the only way a step produces more work
//! - A channel-backed bridge feeding the in-process executor
//! - A collecting bridge for tests and dry runs

use crate::crawler::task::CrawlTask;
use crate::{FanoutError, Result};
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc;

/// Hands a task to the executor for a later, independent invocation
///
/// Fire-and-forget: `Ok(())` means the executor accepted the task, not that it ran.
/// Implementations give no ordering or timing guarantee.
#[async_trait]
pub trait SchedulerBridge: Send + Sync {
    async fn schedule(&self, task: CrawlTask) -> Result<()>;
}

/// Bridge that pushes tasks onto an unbounded tokio channel
#[derive(Debug, Clone)]
pub struct ChannelScheduler {
    sender: mpsc::UnboundedSender<CrawlTask>,
}

impl ChannelScheduler {
    /// Creates a bridge and the receiving end the executor drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<CrawlTask>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl SchedulerBridge for ChannelScheduler {
    async fn schedule(&self, task: CrawlTask) -> Result<()> {
        let url = task.url.clone();
        self.sender.send(task).map_err(|_| FanoutError::Schedule {
            url,
            message: "executor queue is closed".to_string(),
        })
    }
}

/// Bridge that records every scheduled task
#[derive(Debug, Default)]
pub struct CollectingScheduler {
    tasks: Mutex<Vec<CrawlTask>>,
}

impl CollectingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<CrawlTask>>> {
        self.tasks.lock().map_err(|_| FanoutError::Schedule {
            url: String::new(),
            message: "collector lock poisoned".to_string(),
        })
    }

    /// Tasks scheduled so far, in scheduling order
    pub fn tasks(&self) -> Vec<CrawlTask> {
        self.lock().map(|tasks| tasks.clone()).unwrap_or_default()
    }

    /// Removes and returns everything scheduled so far
    pub fn take(&self) -> Vec<CrawlTask> {
        self.lock()
            .map(|mut tasks| std::mem::take(&mut *tasks))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|tasks| tasks.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SchedulerBridge for CollectingScheduler {
    async fn schedule(&self, task: CrawlTask) -> Result<()> {
        self.lock()?.push(task);
        Ok(())
    }
}
