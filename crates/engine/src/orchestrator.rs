//! Workflow orchestrator
//!
//! Owns the live execution table and drives each execution through its
//! steps on a spawned task. Steps run under a wall-clock budget and an
//! attempt budget; a step that requires human approval parks the whole
//! execution in `AwaitingApproval` until an explicit approve or reject
//! call arrives.
//!
//! Audit writes sit on the control path. When audit logging is enabled, a
//! failed write fails the operation that attempted it rather than being
//! dropped.

use crate::events::{EventDispatcher, WorkflowEventHandler};
use crate::executor::{ExecutorRegistry, StepExecutor};
use crate::registry::DefinitionRegistry;
use careflow_audit::AuditLogger;
use careflow_types::{
    ApprovalStatus, ExecutionId, StepStatus, StepType, WorkflowConfig, WorkflowContext,
    WorkflowDefinitionId, WorkflowError, WorkflowExecution, WorkflowResult, WorkflowStatus,
    WorkflowTriggerType,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Aggregate view over the execution table
#[derive(Clone, Debug, Default)]
pub struct OrchestratorStatistics {
    pub total_executions: usize,
    pub active_executions: usize,
    pub by_status: HashMap<String, usize>,
}

struct Inner {
    registry: Arc<DefinitionRegistry>,
    executors: ExecutorRegistry,
    events: EventDispatcher,
    audit: Option<Arc<AuditLogger>>,
    config: WorkflowConfig,
    executions: RwLock<HashMap<ExecutionId, WorkflowExecution>>,
}

/// Builder for a configured orchestrator
pub struct OrchestratorBuilder {
    registry: Arc<DefinitionRegistry>,
    executors: ExecutorRegistry,
    events: EventDispatcher,
    audit: Option<Arc<AuditLogger>>,
    config: WorkflowConfig,
}

impl OrchestratorBuilder {
    pub fn new(registry: Arc<DefinitionRegistry>) -> Self {
        Self {
            registry,
            executors: ExecutorRegistry::new(),
            events: EventDispatcher::new(),
            audit: None,
            config: WorkflowConfig::default(),
        }
    }

    pub fn with_config(mut self, config: WorkflowConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_audit_logger(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn register_executor(
        mut self,
        step_type: StepType,
        executor: Arc<dyn StepExecutor>,
    ) -> Self {
        self.executors.register(step_type, executor);
        self
    }

    pub fn subscribe(
        mut self,
        status: WorkflowStatus,
        handler: Arc<dyn WorkflowEventHandler>,
    ) -> Self {
        self.events.subscribe(status, handler);
        self
    }

    /// Finish the orchestrator; the clinical template catalog is registered
    /// into the definition registry as part of construction
    pub fn build(self) -> WorkflowResult<WorkflowOrchestrator> {
        crate::templates::register_clinical_templates(&self.registry)?;
        Ok(WorkflowOrchestrator {
            inner: Arc::new(Inner {
                registry: self.registry,
                executors: self.executors,
                events: self.events,
                audit: if self.config.enable_audit_logging {
                    self.audit
                } else {
                    None
                },
                config: self.config,
                executions: RwLock::new(HashMap::new()),
            }),
        })
    }
}

/// Drives workflow executions; cheap to clone
#[derive(Clone)]
pub struct WorkflowOrchestrator {
    inner: Arc<Inner>,
}

impl WorkflowOrchestrator {
    pub fn builder(registry: Arc<DefinitionRegistry>) -> OrchestratorBuilder {
        OrchestratorBuilder::new(registry)
    }

    pub fn registry(&self) -> &DefinitionRegistry {
        &self.inner.registry
    }

    /// Start one execution of a registered definition
    ///
    /// Returns the pending snapshot; the run loop proceeds on a spawned
    /// task.
    pub async fn start_workflow(
        &self,
        definition_id: &WorkflowDefinitionId,
        context: WorkflowContext,
    ) -> WorkflowResult<WorkflowExecution> {
        let definition = self
            .inner
            .registry
            .get(definition_id)
            .ok_or_else(|| WorkflowError::DefinitionNotFound(definition_id.clone()))?;
        if !definition.enabled {
            return Err(WorkflowError::DefinitionDisabled(definition_id.clone()));
        }
        for step in &definition.steps {
            if !self.inner.executors.has(step.step_type) {
                return Err(WorkflowError::ExecutorNotFound(step.step_type));
            }
        }

        let execution = {
            let mut executions = self.inner.executions.write().await;
            let active = executions
                .values()
                .filter(|e| e.status.is_active())
                .count();
            if active >= self.inner.config.max_concurrent_workflows {
                return Err(WorkflowError::MaxWorkflowsExceeded {
                    limit: self.inner.config.max_concurrent_workflows,
                });
            }
            let execution = WorkflowExecution::new(&definition, context);
            executions.insert(execution.id.clone(), execution.clone());
            execution
        };

        // The execution trail opens with a request entry carrying the
        // execution id. A failed write aborts the start before any step
        // runs.
        if let Some(audit) = &self.inner.audit {
            if let Err(err) = audit
                .log_workflow_request(
                    &execution.context.organization_id,
                    &execution.context.tenant_id,
                    &execution.context.user_id,
                    execution.context.patient_id.as_deref(),
                    execution.id.as_str(),
                    definition_id.as_str(),
                )
                .await
            {
                self.inner.executions.write().await.remove(&execution.id);
                return Err(WorkflowError::Audit(err.to_string()));
            }
        }

        tracing::info!(
            execution_id = %execution.id,
            definition_id = %definition_id,
            steps = execution.steps.len(),
            "workflow execution started"
        );
        self.inner.events.dispatch(&execution).await;

        let inner = self.inner.clone();
        let id = execution.id.clone();
        tokio::spawn(async move {
            Inner::run(inner, id).await;
        });

        Ok(execution)
    }

    /// Start every enabled definition listening for a trigger
    ///
    /// Best-effort fan-out: one definition failing to start does not stop
    /// the others. Results arrive in definition-id order.
    pub async fn trigger_workflows(
        &self,
        trigger: WorkflowTriggerType,
        context: WorkflowContext,
    ) -> Vec<(WorkflowDefinitionId, WorkflowResult<WorkflowExecution>)> {
        let mut results = Vec::new();
        for definition in self.inner.registry.by_trigger(trigger) {
            let result = self.start_workflow(&definition.id, context.clone()).await;
            if let Err(err) = &result {
                tracing::warn!(
                    definition_id = %definition.id,
                    trigger = %trigger,
                    error = %err,
                    "triggered workflow failed to start"
                );
            }
            results.push((definition.id.clone(), result));
        }
        results
    }

    /// Approve the step an execution is parked on
    ///
    /// `modifications`, when given as a JSON object, is merged key-by-key
    /// over the step output; any other value replaces the output wholesale.
    /// The audit write precedes the state transition, so a failed write
    /// leaves the execution parked and the approval can be retried.
    pub async fn approve_step(
        &self,
        execution_id: &ExecutionId,
        step_id: &str,
        approver_id: &str,
        modifications: Option<Value>,
    ) -> WorkflowResult<WorkflowExecution> {
        let (organization_id, tenant_id) = {
            let executions = self.inner.executions.read().await;
            let execution = executions
                .get(execution_id)
                .ok_or_else(|| WorkflowError::ExecutionNotFound(execution_id.clone()))?;
            let step = execution
                .steps
                .iter()
                .find(|s| s.id == step_id)
                .ok_or_else(|| WorkflowError::StepNotFound {
                    execution_id: execution_id.clone(),
                    step_id: step_id.to_string(),
                })?;
            if step.status != StepStatus::AwaitingHuman {
                return Err(WorkflowError::InvalidStepStatus {
                    step_id: step_id.to_string(),
                    status: step.status,
                });
            }
            (
                execution.context.organization_id.clone(),
                execution.context.tenant_id.clone(),
            )
        };

        if let Some(audit) = &self.inner.audit {
            audit
                .log_approval(
                    &organization_id,
                    &tenant_id,
                    approver_id,
                    execution_id.as_str(),
                    None,
                )
                .await
                .map_err(|e| WorkflowError::Audit(e.to_string()))?;
        }

        let snapshot = {
            let mut executions = self.inner.executions.write().await;
            let execution = executions
                .get_mut(execution_id)
                .ok_or_else(|| WorkflowError::ExecutionNotFound(execution_id.clone()))?;

            let index = execution
                .steps
                .iter()
                .position(|s| s.id == step_id)
                .ok_or_else(|| WorkflowError::StepNotFound {
                    execution_id: execution_id.clone(),
                    step_id: step_id.to_string(),
                })?;
            if execution.steps[index].status != StepStatus::AwaitingHuman {
                return Err(WorkflowError::InvalidStepStatus {
                    step_id: step_id.to_string(),
                    status: execution.steps[index].status,
                });
            }

            execution.approve()?;

            let step = &mut execution.steps[index];
            let output = match (step.output.take(), modifications) {
                (Some(Value::Object(mut base)), Some(Value::Object(changes))) => {
                    for (key, value) in changes {
                        base.insert(key, value);
                    }
                    Value::Object(base)
                }
                (_, Some(replacement)) => replacement,
                (original, None) => original.unwrap_or(Value::Null),
            };
            step.complete(output);
            step.completed_by = Some(approver_id.to_string());
            execution.current_step_index = index + 1;
            execution.clone()
        };

        self.inner.events.dispatch(&snapshot).await;

        let resumed = {
            let mut executions = self.inner.executions.write().await;
            let execution = executions
                .get_mut(execution_id)
                .ok_or_else(|| WorkflowError::ExecutionNotFound(execution_id.clone()))?;
            execution.resume()?;
            execution.clone()
        };

        let inner = self.inner.clone();
        let id = execution_id.clone();
        tokio::spawn(async move {
            Inner::run(inner, id).await;
        });

        Ok(resumed)
    }

    /// Reject the step an execution is parked on; terminal for the
    /// execution
    pub async fn reject_step(
        &self,
        execution_id: &ExecutionId,
        step_id: &str,
        reviewer_id: &str,
        reason: &str,
    ) -> WorkflowResult<WorkflowExecution> {
        let snapshot = {
            let mut executions = self.inner.executions.write().await;
            let execution = executions
                .get_mut(execution_id)
                .ok_or_else(|| WorkflowError::ExecutionNotFound(execution_id.clone()))?;

            let index = execution
                .steps
                .iter()
                .position(|s| s.id == step_id)
                .ok_or_else(|| WorkflowError::StepNotFound {
                    execution_id: execution_id.clone(),
                    step_id: step_id.to_string(),
                })?;
            if execution.steps[index].status != StepStatus::AwaitingHuman {
                return Err(WorkflowError::InvalidStepStatus {
                    step_id: step_id.to_string(),
                    status: execution.steps[index].status,
                });
            }

            execution.reject(reason)?;
            let step = &mut execution.steps[index];
            step.fail(reason);
            step.completed_by = Some(reviewer_id.to_string());
            execution.clone()
        };

        tracing::info!(
            execution_id = %execution_id,
            step_id,
            "workflow step rejected"
        );
        self.inner.events.dispatch(&snapshot).await;
        if let Some(audit) = &self.inner.audit {
            audit
                .log_rejection(
                    &snapshot.context.organization_id,
                    &snapshot.context.tenant_id,
                    reviewer_id,
                    snapshot.id.as_str(),
                    reason,
                )
                .await
                .map_err(|e| WorkflowError::Audit(e.to_string()))?;
        }
        Ok(snapshot)
    }

    /// Cancel a non-terminal execution
    pub async fn cancel_workflow(
        &self,
        execution_id: &ExecutionId,
    ) -> WorkflowResult<WorkflowExecution> {
        let snapshot = {
            let mut executions = self.inner.executions.write().await;
            let execution = executions
                .get_mut(execution_id)
                .ok_or_else(|| WorkflowError::ExecutionNotFound(execution_id.clone()))?;
            execution.cancel()?;
            if let Some(step) = execution.current_step_mut() {
                if step.status != StepStatus::Completed {
                    step.status = StepStatus::Skipped;
                }
            }
            execution.clone()
        };

        tracing::info!(execution_id = %execution_id, "workflow execution cancelled");
        self.inner.events.dispatch(&snapshot).await;
        if let Some(audit) = &self.inner.audit {
            audit
                .log_human_review(
                    &snapshot.context.organization_id,
                    &snapshot.context.tenant_id,
                    &snapshot.context.user_id,
                    snapshot.id.as_str(),
                    ApprovalStatus::Rejected,
                    Some("execution cancelled"),
                )
                .await
                .map_err(|e| WorkflowError::Audit(e.to_string()))?;
        }
        Ok(snapshot)
    }

    pub async fn get_execution(
        &self,
        execution_id: &ExecutionId,
    ) -> WorkflowResult<WorkflowExecution> {
        self.inner
            .executions
            .read()
            .await
            .get(execution_id)
            .cloned()
            .ok_or_else(|| WorkflowError::ExecutionNotFound(execution_id.clone()))
    }

    pub async fn executions_for_organization(
        &self,
        organization_id: &str,
    ) -> Vec<WorkflowExecution> {
        self.inner
            .executions
            .read()
            .await
            .values()
            .filter(|e| e.context.organization_id == organization_id)
            .cloned()
            .collect()
    }

    pub async fn executions_by_status(&self, status: WorkflowStatus) -> Vec<WorkflowExecution> {
        self.inner
            .executions
            .read()
            .await
            .values()
            .filter(|e| e.status == status)
            .cloned()
            .collect()
    }

    pub async fn statistics(&self) -> OrchestratorStatistics {
        let executions = self.inner.executions.read().await;
        let mut stats = OrchestratorStatistics {
            total_executions: executions.len(),
            ..Default::default()
        };
        for execution in executions.values() {
            if execution.status.is_active() {
                stats.active_executions += 1;
            }
            *stats
                .by_status
                .entry(execution.status.to_string())
                .or_insert(0) += 1;
        }
        stats
    }

    /// Drop terminal executions that finished more than `retention_days`
    /// ago; returns how many were removed
    pub async fn cleanup_completed_executions(&self, retention_days: i64) -> usize {
        let cutoff = chrono::Utc::now() - chrono::Duration::days(retention_days);
        let mut executions = self.inner.executions.write().await;
        let before = executions.len();
        executions.retain(|_, e| {
            !(e.is_terminal() && e.completed_at.map(|t| t < cutoff).unwrap_or(false))
        });
        let removed = before - executions.len();
        if removed > 0 {
            tracing::info!(removed, retention_days, "expired executions cleaned up");
        }
        removed
    }
}

impl Inner {
    /// Drive an execution until it completes, fails, or parks for approval
    async fn run(inner: Arc<Inner>, execution_id: ExecutionId) {
        {
            let mut executions = inner.executions.write().await;
            let Some(execution) = executions.get_mut(&execution_id) else {
                return;
            };
            match execution.status {
                WorkflowStatus::Pending => {
                    if execution.begin().is_err() {
                        return;
                    }
                }
                WorkflowStatus::InProgress => {}
                _ => return,
            }
        }
        if let Some(snapshot) = inner.snapshot(&execution_id).await {
            inner.events.dispatch(&snapshot).await;
        }

        loop {
            // Snapshot the current step without holding the lock over the
            // executor call
            let (step, context) = {
                let mut executions = inner.executions.write().await;
                let Some(execution) = executions.get_mut(&execution_id) else {
                    return;
                };
                if execution.status != WorkflowStatus::InProgress {
                    return;
                }
                match execution.current_step_mut() {
                    Some(step) => {
                        step.start_attempt();
                        (step.clone(), execution.context.clone())
                    }
                    None => {
                        if execution.complete().is_ok() {
                            tracing::info!(
                                execution_id = %execution_id,
                                "workflow execution completed"
                            );
                            let snapshot = execution.clone();
                            drop(executions);
                            inner.events.dispatch(&snapshot).await;
                        }
                        return;
                    }
                }
            };

            let Some(executor) = inner.executors.get(step.step_type) else {
                inner
                    .fail_execution(
                        &execution_id,
                        WorkflowError::ExecutorNotFound(step.step_type).to_string(),
                    )
                    .await;
                return;
            };

            let outcome =
                tokio::time::timeout(inner.config.step_timeout, executor.execute(&step, &context))
                    .await;
            let result = match outcome {
                Ok(result) => result,
                Err(_) => Err(anyhow::Error::from(WorkflowError::StepTimeout {
                    step_id: step.id.clone(),
                    timeout_secs: inner.config.step_timeout.as_secs(),
                })),
            };

            match result {
                Ok(output) => {
                    let parked = {
                        let mut executions = inner.executions.write().await;
                        let Some(execution) = executions.get_mut(&execution_id) else {
                            return;
                        };
                        // The execution may have been cancelled while the
                        // step ran; its record must not change after that
                        if execution.status != WorkflowStatus::InProgress {
                            return;
                        }
                        let Some(current) = execution.current_step_mut() else {
                            return;
                        };
                        if step.requires_human_approval {
                            current.output = Some(output);
                            current.status = StepStatus::AwaitingHuman;
                            if execution.await_approval().is_err() {
                                return;
                            }
                            Some(execution.clone())
                        } else {
                            current.complete(output);
                            execution.current_step_index += 1;
                            None
                        }
                    };

                    if let Some(snapshot) = parked {
                        tracing::info!(
                            execution_id = %execution_id,
                            step_id = %step.id,
                            "workflow parked for human approval"
                        );
                        inner.events.dispatch(&snapshot).await;
                        if let Some(audit) = &inner.audit {
                            if let Err(err) = audit
                                .log_human_review(
                                    &snapshot.context.organization_id,
                                    &snapshot.context.tenant_id,
                                    &snapshot.context.user_id,
                                    snapshot.id.as_str(),
                                    ApprovalStatus::Pending,
                                    Some(&format!("awaiting review of step '{}'", step.id)),
                                )
                                .await
                            {
                                inner
                                    .fail_execution(
                                        &execution_id,
                                        WorkflowError::Audit(err.to_string()).to_string(),
                                    )
                                    .await;
                            }
                        }
                        return;
                    }
                }
                Err(err) => {
                    let retry_delay = {
                        let mut executions = inner.executions.write().await;
                        let Some(execution) = executions.get_mut(&execution_id) else {
                            return;
                        };
                        if execution.status != WorkflowStatus::InProgress {
                            return;
                        }
                        let Some(current) = execution.current_step_mut() else {
                            return;
                        };
                        current.fail(err.to_string());
                        if current.retries_exhausted() {
                            None
                        } else {
                            let attempt = current.retry_count;
                            current.reset_for_retry();
                            Some(inner.config.default_retry.delay_for(attempt))
                        }
                    };

                    match retry_delay {
                        Some(delay) => {
                            tracing::warn!(
                                execution_id = %execution_id,
                                step_id = %step.id,
                                attempt = step.retry_count,
                                delay_ms = delay.as_millis() as u64,
                                error = %err,
                                "step attempt failed; retrying"
                            );
                            tokio::time::sleep(delay).await;
                        }
                        None => {
                            tracing::error!(
                                execution_id = %execution_id,
                                step_id = %step.id,
                                error = %err,
                                "step attempt budget exhausted"
                            );
                            inner
                                .fail_execution(
                                    &execution_id,
                                    format!("step '{}' failed: {err}", step.id),
                                )
                                .await;
                            return;
                        }
                    }
                }
            }
        }
    }

    async fn snapshot(&self, execution_id: &ExecutionId) -> Option<WorkflowExecution> {
        self.executions.read().await.get(execution_id).cloned()
    }

    async fn fail_execution(&self, execution_id: &ExecutionId, error: String) {
        let snapshot = {
            let mut executions = self.executions.write().await;
            let Some(execution) = executions.get_mut(execution_id) else {
                return;
            };
            if execution.fail(error).is_err() {
                return;
            }
            execution.clone()
        };
        self.events.dispatch(&snapshot).await;
    }
}
