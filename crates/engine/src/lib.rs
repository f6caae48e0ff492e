//! Workflow orchestration engine
//!
//! The engine is deliberately domain-blind: it drives step sequences,
//! retries, timeouts, and human-approval pauses, while everything
//! clinical lives behind the [`StepExecutor`] seam. A deployment wires
//! assistants, guardrails, and consent checks into executors, registers
//! definitions (the built-in [`templates`] or its own), and drives
//! everything through one [`WorkflowOrchestrator`].

#![deny(unsafe_code)]

pub mod events;
pub mod executor;
pub mod orchestrator;
pub mod registry;
pub mod templates;

pub use events::{EventDispatcher, WorkflowEventHandler};
pub use executor::{ExecutorRegistry, FnStepExecutor, StepExecutor};
pub use orchestrator::{OrchestratorBuilder, OrchestratorStatistics, WorkflowOrchestrator};
pub use registry::DefinitionRegistry;
pub use templates::register_clinical_templates;
