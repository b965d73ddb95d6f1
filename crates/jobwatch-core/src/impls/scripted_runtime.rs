//! ScriptedRuntime - テスト用の ContainerRuntime
//!
//! 事前に登録した state / stats / logs をそのまま返します。
//! 実行途中で差し替えることで、RUNNING → SUCCESS のような遷移を再現できます。

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::ports::{ContainerRuntime, ContainerState, ContainerStats, RuntimeError};

#[derive(Debug, Clone)]
struct ScriptedContainer {
    state: ContainerState,
    stats: ContainerStats,
    logs: String,
}

#[derive(Default)]
pub struct ScriptedRuntime {
    containers: Mutex<HashMap<String, ScriptedContainer>>,
}

impl ScriptedRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a container in the given state with no stats and no logs.
    pub fn with_container(self, id: &str, state: ContainerState) -> Self {
        self.set_state(id, state);
        self
    }

    pub fn set_state(&self, id: &str, state: ContainerState) {
        self.update(id, |c| c.state = state);
    }

    pub fn set_stats(&self, id: &str, stats: ContainerStats) {
        self.update(id, |c| c.stats = stats);
    }

    pub fn set_logs(&self, id: &str, logs: impl Into<String>) {
        let logs = logs.into();
        self.update(id, |c| c.logs = logs);
    }

    fn update(&self, id: &str, f: impl FnOnce(&mut ScriptedContainer)) {
        if let Ok(mut containers) = self.containers.lock() {
            let entry = containers
                .entry(id.to_string())
                .or_insert_with(|| ScriptedContainer {
                    state: ContainerState::created(),
                    stats: ContainerStats::default(),
                    logs: String::new(),
                });
            f(entry);
        }
    }

    fn get(&self, id: &str) -> Result<ScriptedContainer, RuntimeError> {
        let containers = self
            .containers
            .lock()
            .map_err(|e| RuntimeError::Failure(format!("runtime lock poisoned: {e}")))?;
        containers
            .get(id)
            .cloned()
            .ok_or_else(|| RuntimeError::NoSuchContainer(id.to_string()))
    }
}

#[async_trait]
impl ContainerRuntime for ScriptedRuntime {
    async fn inspect(&self, container: &str) -> Result<ContainerState, RuntimeError> {
        Ok(self.get(container)?.state)
    }

    async fn stats(&self, container: &str) -> Result<ContainerStats, RuntimeError> {
        Ok(self.get(container)?.stats)
    }

    async fn logs(&self, container: &str) -> Result<String, RuntimeError> {
        Ok(self.get(container)?.logs)
    }
}
