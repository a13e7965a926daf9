#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::{watch, Notify};
use linux_service_manager::errors::CommandError;
use linux_service_manager::process::{ActivityDetector, CommandRunner};

/// Records every command it is asked to run. Commands listed as failing exit
/// with status 1, everything else succeeds.
#[derive(Default)]
pub struct RecordingRunner {
    failing: Vec<String>,
    calls: Mutex<Vec<String>>,
}

impl RecordingRunner {
    pub fn failing(commands: &[&str]) -> Self {
        Self {
            failing: commands.iter().map(|c| c.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, command: &str) -> usize {
        self.calls().iter().filter(|c| *c == command).count()
    }

    pub fn counts(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for call in self.calls() {
            *counts.entry(call).or_insert(0) += 1;
        }
        counts
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, command: &str) -> Result<(), CommandError> {
        self.calls.lock().unwrap().push(command.to_string());
        if self.failing.iter().any(|c| c == command) {
            Err(CommandError::Exit {
                command: command.to_string(),
                code: 1,
            })
        } else {
            Ok(())
        }
    }
}

pub struct FixedActivity(pub bool);

#[async_trait]
impl ActivityDetector for FixedActivity {
    async fn is_user_active(&self) -> bool {
        self.0
    }
}

/// Holds every command until [`release`](Self::release) is called, then
/// behaves like [`RecordingRunner`].
pub struct GatedRunner {
    inner: RecordingRunner,
    open: watch::Sender<bool>,
    started: Notify,
}

impl GatedRunner {
    pub fn new() -> Self {
        Self {
            inner: RecordingRunner::default(),
            open: watch::Sender::new(false),
            started: Notify::new(),
        }
    }

    /// Resolves once a command has been handed to the runner.
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    pub fn release(&self) {
        self.open.send_replace(true);
    }

    pub fn calls(&self) -> Vec<String> {
        self.inner.calls()
    }

    pub fn count(&self, command: &str) -> usize {
        self.inner.count(command)
    }
}

#[async_trait]
impl CommandRunner for GatedRunner {
    async fn run(&self, command: &str) -> Result<(), CommandError> {
        self.started.notify_one();
        let mut open = self.open.subscribe();
        let _ = open.wait_for(|open| *open).await;
        self.inner.run(command).await
    }
}
