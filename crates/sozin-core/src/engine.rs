//! Interface operation engine.
//!
//! Turns an [`OperationIntent`] into its ordered [`PrimitiveStep`]s, runs them
//! one at a time through a [`CommandRunner`], and when a step fails puts the
//! interface into a well-defined state before reporting. The rule that drives
//! recovery: an interface is never left UP in a mode the operator did not ask
//! for. DOWN is the safe terminal state.

use std::sync::Arc;

use sozin_logging::T_NET;
use tracing::{debug, error, info, warn};

use crate::config::{EngineConfig, RecoveryPolicy};
use crate::error::{EngineError, ExecutionError, RollbackError, ValidationError};
use crate::intent::{OperationIntent, PrimitiveStep};
use crate::model::{AdminState, Interface};
use crate::ops::{CommandRunner, DeviceLister};
use crate::result::{Failure, FinalState, OperationResult, RecoveryOutcome, StateSource};
use crate::validation::validate_interface_name;

pub struct InterfaceEngine {
    lister: Arc<dyn DeviceLister>,
    runner: Arc<dyn CommandRunner>,
    config: EngineConfig,
}

impl InterfaceEngine {
    pub fn new(
        lister: Arc<dyn DeviceLister>,
        runner: Arc<dyn CommandRunner>,
        config: EngineConfig,
    ) -> Self {
        Self {
            lister,
            runner,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn lister(&self) -> &dyn DeviceLister {
        self.lister.as_ref()
    }

    /// Run one intent to completion.
    ///
    /// `Err` means the intent was rejected before any step ran. A step
    /// failure is an `Ok(OperationResult::Failed(..))` carrying the recovery
    /// classification and the final known state.
    pub fn execute(&self, intent: &OperationIntent) -> Result<OperationResult, EngineError> {
        let steps = intent.steps(&self.config.service_unit);

        let before = match self.validate(intent) {
            Ok(Some(before)) => before,
            Ok(None) => return Ok(self.run_service(intent, &steps)),
            Err(err) => {
                warn!(intent = intent.label(), error = %err, "Operation rejected");
                return Err(err);
            }
        };

        info!(
            intent = intent.label(),
            interface = %before.name,
            steps = steps.len(),
            "Starting interface operation"
        );

        let mut model = before.clone();
        for (index, step) in steps.iter().enumerate() {
            debug!(target: T_NET, index, step = %step, "Running step");
            match self.run_step(step, &mut model) {
                Ok(()) => info!(target: T_NET, index, step = %step, "Step succeeded"),
                Err(reason) => {
                    warn!(target: T_NET, index, step = %step, error = %reason, "Step failed");
                    let failure = self.recover(&steps, index, reason, &before, model);
                    return Ok(OperationResult::Failed(failure));
                }
            }
        }

        let final_state = self.observe(&model, &steps);
        info!(
            intent = intent.label(),
            interface = %final_state.interface.name,
            state = %final_state.interface.admin_state,
            "Interface operation completed"
        );
        Ok(OperationResult::Success {
            final_state: Some(final_state),
        })
    }

    /// Preconditions. Returns the pre-operation snapshot for per-interface
    /// intents and `None` for the service restart.
    fn validate(&self, intent: &OperationIntent) -> Result<Option<Interface>, EngineError> {
        let Some(target) = intent.target() else {
            return Ok(None);
        };

        validate_interface_name("interface name", target)?;
        if let OperationIntent::Rename { new_name, .. } = intent {
            validate_interface_name("new interface name", new_name)?;
        }

        let names = self.lister.list()?;
        if !names.iter().any(|n| n == target) {
            return Err(ValidationError::NotFound {
                name: target.to_string(),
            }
            .into());
        }
        if let OperationIntent::Rename { new_name, .. } = intent {
            if names.iter().any(|n| n == new_name) {
                return Err(ValidationError::NameInUse {
                    name: new_name.clone(),
                }
                .into());
            }
        }

        let before = self.lister.snapshot(target)?;
        let needs_wireless = matches!(
            intent,
            OperationIntent::EnableMonitor { .. } | OperationIntent::DisableMonitor { .. }
        );
        if needs_wireless && !before.wireless {
            return Err(ValidationError::NotWireless {
                name: target.to_string(),
            }
            .into());
        }

        Ok(Some(before))
    }

    fn run_step(&self, step: &PrimitiveStep, model: &mut Interface) -> Result<(), ExecutionError> {
        self.runner.run(step)?;
        let expected = applied(model, step);
        if self.config.verify_postconditions {
            self.verify(step, &expected)?;
        }
        *model = expected;
        Ok(())
    }

    fn verify(&self, step: &PrimitiveStep, expected: &Interface) -> Result<(), ExecutionError> {
        let post_condition = |detail: String| ExecutionError::PostCondition {
            step: step.to_string(),
            detail,
        };
        let observed = self
            .lister
            .snapshot(&expected.name)
            .map_err(|e| post_condition(format!("interface could not be read back: {}", e)))?;

        match step {
            PrimitiveStep::SetState { state, .. } if observed.admin_state != *state => Err(
                post_condition(format!("interface is still {}", observed.admin_state)),
            ),
            PrimitiveStep::SetLinkType { link_type, .. } if observed.link_type != *link_type => {
                Err(post_condition(format!(
                    "interface is still in {} mode",
                    observed.link_type
                )))
            }
            _ => Ok(()),
        }
    }

    fn recover(
        &self,
        steps: &[PrimitiveStep],
        index: usize,
        reason: ExecutionError,
        before: &Interface,
        mut model: Interface,
    ) -> Failure {
        let failed = &steps[index];
        let plan = if index == 0 {
            Vec::new()
        } else {
            rollback_plan(&steps[..index], failed, before, &model, self.config.recovery)
        };

        let mut rollback_errors = Vec::new();
        for step in &plan {
            info!(target: T_NET, step = %step, "Rolling back");
            match self.runner.run(step) {
                Ok(()) => model = applied(&model, step),
                Err(source) => {
                    error!(target: T_NET, step = %step, error = %source, "Rollback step failed");
                    rollback_errors.push(RollbackError {
                        step: step.clone(),
                        source,
                    });
                    // Later compensations assume this one took effect.
                    break;
                }
            }
        }

        let final_state = self.observe(&model, steps);
        let recovery = if !rollback_errors.is_empty() {
            RecoveryOutcome::Unknown
        } else if reason.is_timeout()
            && (failed.is_mutation() || final_state.source == StateSource::Tracked)
        {
            // A timed out rename or type change can still land after the
            // read-back, so what was observed proves nothing.
            RecoveryOutcome::Unknown
        } else {
            RecoveryOutcome::classify(before, &final_state.interface)
        };

        warn!(
            interface = %final_state.interface.name,
            state = %final_state.interface.admin_state,
            step_index = index,
            recovery = ?recovery,
            "Interface operation failed"
        );

        Failure {
            step_index: index,
            step: failed.clone(),
            reason,
            recovery: Some(recovery),
            rollback_errors,
            final_state: Some(final_state),
        }
    }

    /// Read the interface back. A rename that timed out may have gone
    /// through, so every name the steps mention is tried.
    fn observe(&self, model: &Interface, steps: &[PrimitiveStep]) -> FinalState {
        let mut candidates = vec![model.name.as_str()];
        for step in steps {
            if let PrimitiveStep::SetName {
                interface,
                new_name,
            } = step
            {
                candidates.push(interface);
                candidates.push(new_name);
            }
        }

        for name in candidates {
            if let Ok(interface) = self.lister.snapshot(name) {
                return FinalState {
                    interface,
                    source: StateSource::Observed,
                };
            }
        }

        debug!(interface = %model.name, "Falling back to tracked interface state");
        FinalState {
            interface: model.clone(),
            source: StateSource::Tracked,
        }
    }

    fn run_service(&self, intent: &OperationIntent, steps: &[PrimitiveStep]) -> OperationResult {
        info!(intent = intent.label(), "Starting service operation");
        for (index, step) in steps.iter().enumerate() {
            if let Err(reason) = self.runner.run(step) {
                warn!(step = %step, error = %reason, "Service operation failed");
                return OperationResult::Failed(Failure {
                    step_index: index,
                    step: step.clone(),
                    reason,
                    recovery: None,
                    rollback_errors: Vec::new(),
                    final_state: None,
                });
            }
        }
        info!(intent = intent.label(), "Service operation completed");
        OperationResult::Success { final_state: None }
    }
}

/// The interface as it should look after `step` succeeded.
fn applied(model: &Interface, step: &PrimitiveStep) -> Interface {
    let mut next = model.clone();
    match step {
        PrimitiveStep::SetState { state, .. } => next.admin_state = *state,
        PrimitiveStep::SetLinkType { link_type, .. } => next.link_type = *link_type,
        PrimitiveStep::SetName { new_name, .. } => next.name = new_name.clone(),
        PrimitiveStep::RestartService { .. } => {}
    }
    next
}

/// Compensating steps after `failed` broke a sequence whose `applied` prefix
/// succeeded. Nothing here ever brings an interface UP.
fn rollback_plan(
    applied_steps: &[PrimitiveStep],
    failed: &PrimitiveStep,
    before: &Interface,
    model: &Interface,
    policy: RecoveryPolicy,
) -> Vec<PrimitiveStep> {
    let mut plan = Vec::new();

    // A failed or timed out UP may still have reached the kernel.
    if matches!(
        failed,
        PrimitiveStep::SetState {
            state: AdminState::Up,
            ..
        }
    ) {
        plan.push(PrimitiveStep::set_state(&model.name, AdminState::Down));
    }

    if policy == RecoveryPolicy::Revert {
        let mut current = model.name.clone();
        for step in applied_steps.iter().rev() {
            match step {
                PrimitiveStep::SetName {
                    interface,
                    new_name,
                } => {
                    plan.push(PrimitiveStep::SetName {
                        interface: new_name.clone(),
                        new_name: interface.clone(),
                    });
                    current = interface.clone();
                }
                PrimitiveStep::SetLinkType { link_type, .. } if *link_type != before.link_type => {
                    plan.push(PrimitiveStep::SetLinkType {
                        interface: current.clone(),
                        link_type: before.link_type,
                    });
                }
                _ => {}
            }
        }
    }

    plan
}
