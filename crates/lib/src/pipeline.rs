//! Execution pipeline: validate → render → guard → execute → audit.
//!
//! Each stage short-circuits on failure. Validation failures (and disabled
//! commands) are surfaced directly and not audited; every attempt that reaches
//! the rendering stage writes exactly one execution record, success or
//! failure. No stage retries; one invocation, one outcome.

use crate::audit::{Auditor, ExecutionAttempt, ExecutionRecord, ExecutionStatus};
use crate::catalog::Command;
use crate::exec::{self, ExecError};
use crate::guard;
use crate::params::ParamMap;
use crate::template::{self, TemplateError};
use crate::validate::{self, ValidationError};
use std::time::Instant;

#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    /// Disabled commands must never be executed.
    #[error("command is disabled")]
    Disabled,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// A misconfigured template is an operator error, not a caller error.
    #[error("invalid command template: {0}")]
    Template(#[from] TemplateError),
    /// Deliberately generic: the offending line is not echoed back.
    #[error("potential command injection detected")]
    Unsafe,
    #[error(transparent)]
    Execution(#[from] ExecError),
    /// The command may already have run; an unrecorded attempt is an
    /// operational incident, not something to swallow.
    #[error("recording execution failed: {0}")]
    AuditWrite(String),
}

/// Who is executing and from where; feeds the audit trail.
#[derive(Debug, Clone)]
pub struct RequestOrigin {
    pub operator_id: u64,
    pub ip_address: String,
    pub user_agent: String,
}

/// Run one command through the full pipeline. The command snapshot was read by
/// the caller before validation began; concurrent catalog edits do not affect
/// an in-flight execution.
pub async fn execute(
    command: &Command,
    inputs: &ParamMap,
    origin: &RequestOrigin,
    auditor: &Auditor,
) -> Result<ExecutionRecord, ExecuteError> {
    if !command.enabled {
        return Err(ExecuteError::Disabled);
    }

    validate::validate_parameters(&command.parameters, inputs)?;

    let serialized = serde_json::to_string(inputs).unwrap_or_else(|_| "{}".to_string());
    let started = Instant::now();
    let outcome = run_stages(command, inputs);
    let duration_ms = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(output) => {
            let record = auditor
                .log_execution(ExecutionAttempt {
                    command_id: command.id,
                    operator_id: origin.operator_id,
                    parameters: serialized,
                    status: ExecutionStatus::Success,
                    result: output,
                    error_message: String::new(),
                    duration_ms,
                    ip_address: origin.ip_address.clone(),
                })
                .await
                .map_err(|e| ExecuteError::AuditWrite(e.to_string()))?;
            auditor
                .record_activity(
                    origin.operator_id,
                    "command_execute",
                    &format!("Command executed: {}", command.name),
                    &origin.ip_address,
                    &origin.user_agent,
                )
                .await;
            log::info!(
                "command {} executed by operator {} in {}ms",
                command.name,
                origin.operator_id,
                duration_ms
            );
            Ok(record)
        }
        Err(err) => {
            let attempt = ExecutionAttempt {
                command_id: command.id,
                operator_id: origin.operator_id,
                parameters: serialized,
                status: ExecutionStatus::Failure,
                result: String::new(),
                error_message: err.to_string(),
                duration_ms,
                ip_address: origin.ip_address.clone(),
            };
            // The pipeline error wins; a failed audit write is still reported.
            if let Err(store_err) = auditor.log_execution(attempt).await {
                log::warn!("recording failed execution attempt: {}", store_err);
            }
            log::info!(
                "command {} failed for operator {}: {}",
                command.name,
                origin.operator_id,
                err
            );
            Err(err)
        }
    }
}

/// Render, guard, execute. Split out so the caller can time the attempt and
/// audit either outcome uniformly.
fn run_stages(command: &Command, inputs: &ParamMap) -> Result<String, ExecuteError> {
    let line = template::render(&command.command, inputs)?;
    if !guard::is_command_safe(&line) {
        return Err(ExecuteError::Unsafe);
    }
    Ok(exec::run_command_line(&line)?)
}
