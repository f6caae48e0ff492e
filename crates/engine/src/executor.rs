//! Step executor seam
//!
//! The orchestrator knows nothing about assistants, review queues, or
//! notification channels. Callers register one [`StepExecutor`] per
//! [`StepType`] in use; the run loop dispatches each step to the executor
//! for its type and records the returned value as the step output.

use async_trait::async_trait;
use careflow_types::{StepExecution, StepType, WorkflowContext};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Executes one kind of workflow step
///
/// Returning `Err` counts as a failed attempt and is retried under the
/// step's attempt budget.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    async fn execute(
        &self,
        step: &StepExecution,
        context: &WorkflowContext,
    ) -> anyhow::Result<Value>;
}

type ExecutorFn = dyn Fn(StepExecution, WorkflowContext) -> Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send>>
    + Send
    + Sync;

/// Adapter wrapping a closure as a [`StepExecutor`]
pub struct FnStepExecutor {
    inner: Box<ExecutorFn>,
}

impl FnStepExecutor {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(StepExecution, WorkflowContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Self {
            inner: Box::new(move |step, context| Box::pin(f(step, context))),
        }
    }
}

#[async_trait]
impl StepExecutor for FnStepExecutor {
    async fn execute(
        &self,
        step: &StepExecution,
        context: &WorkflowContext,
    ) -> anyhow::Result<Value> {
        (self.inner)(step.clone(), context.clone()).await
    }
}

/// Executor table keyed by step type
#[derive(Clone, Default)]
pub struct ExecutorRegistry {
    executors: HashMap<StepType, Arc<dyn StepExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, step_type: StepType, executor: Arc<dyn StepExecutor>) {
        self.executors.insert(step_type, executor);
    }

    pub fn get(&self, step_type: StepType) -> Option<Arc<dyn StepExecutor>> {
        self.executors.get(&step_type).cloned()
    }

    pub fn has(&self, step_type: StepType) -> bool {
        self.executors.contains_key(&step_type)
    }
}
