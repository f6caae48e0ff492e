//! Workflow lifecycle event fan-out
//!
//! Handlers subscribe to the status an execution has just entered. They
//! run inline on the orchestrator's path, so they should be quick; a
//! handler error is logged and swallowed, never surfaced to the workflow.

use async_trait::async_trait;
use careflow_types::{WorkflowExecution, WorkflowStatus};
use std::collections::HashMap;
use std::sync::Arc;

/// Observer for workflow status changes
#[async_trait]
pub trait WorkflowEventHandler: Send + Sync {
    async fn on_status(&self, execution: &WorkflowExecution) -> anyhow::Result<()>;
}

/// Handler table keyed by the status just entered
#[derive(Clone, Default)]
pub struct EventDispatcher {
    handlers: HashMap<WorkflowStatus, Vec<Arc<dyn WorkflowEventHandler>>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, status: WorkflowStatus, handler: Arc<dyn WorkflowEventHandler>) {
        self.handlers.entry(status).or_default().push(handler);
    }

    pub fn handler_count(&self, status: WorkflowStatus) -> usize {
        self.handlers.get(&status).map(Vec::len).unwrap_or(0)
    }

    /// Notify every handler subscribed to the execution's current status
    pub async fn dispatch(&self, execution: &WorkflowExecution) {
        let Some(handlers) = self.handlers.get(&execution.status) else {
            return;
        };
        for handler in handlers {
            if let Err(err) = handler.on_status(execution).await {
                tracing::warn!(
                    execution_id = %execution.id,
                    status = %execution.status,
                    error = %err,
                    "workflow event handler failed"
                );
            }
        }
    }
}
