//! Engine configuration

use std::time::Duration;

/// Retry policy with exponential backoff
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total attempt budget per step
    pub max_retries: u32,
    /// Base delay before the first retry
    pub backoff: Duration,
    /// Multiplier applied per additional retry
    pub multiplier: f64,
}

impl RetryPolicy {
    /// Delay before the attempt following `retry_count` completed attempts:
    /// `backoff * multiplier^(retry_count - 1)`
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        let exponent = retry_count.saturating_sub(1);
        self.backoff.mul_f64(self.multiplier.powi(exponent as i32))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Duration::from_millis(1000),
            multiplier: 2.0,
        }
    }
}

/// Orchestrator configuration
#[derive(Clone, Debug)]
pub struct WorkflowConfig {
    /// Ceiling on simultaneously pending or in-progress executions
    pub max_concurrent_workflows: usize,
    /// Per-step wall-clock budget; a step that exceeds it fails
    pub step_timeout: Duration,
    pub default_retry: RetryPolicy,
    pub enable_audit_logging: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_concurrent_workflows: 100,
            step_timeout: Duration::from_secs(300),
            default_retry: RetryPolicy::default(),
            enable_audit_logging: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(4000));
    }

    #[test]
    fn test_backoff_first_attempt_uses_base() {
        // retry_count of 0 never happens in practice, but it must not panic
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(1000));
    }

    #[test]
    fn test_defaults() {
        let config = WorkflowConfig::default();
        assert_eq!(config.max_concurrent_workflows, 100);
        assert_eq!(config.step_timeout, Duration::from_secs(300));
        assert!(config.enable_audit_logging);
        assert_eq!(config.default_retry.max_retries, 3);
    }
}
