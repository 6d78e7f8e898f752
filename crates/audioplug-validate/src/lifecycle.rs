//! Host-side lifecycle driver.
//!
//! Every call is checked against the state table before it reaches the
//! component. Illegal calls become exactly one finding and never reach the
//! component; legal calls are forwarded and the tracked state only advances
//! when the component accepts them.

use audioplug_sdk::{
    AudioProcessor, BusLayout, ComponentState, Lifecycle, PluginError, ProcessData, ProcessSetup,
    Transition, TransitionError, TransitionOutcome,
};
use thiserror::Error;

use crate::contract::{CallTracker, ContractChecker};
use crate::finding::{Category, FindingLog};

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("component refused {transition}: {source}")]
    Component {
        transition: Transition,
        #[source]
        source: PluginError,
    },
    #[error("invalid process setup: {0}")]
    InvalidSetup(String),
    #[error("process buffers do not hold the block, call not forwarded")]
    MalformedBuffers,
}

pub struct LifecycleController {
    processor: Box<dyn AudioProcessor>,
    lifecycle: Lifecycle,
    checker: ContractChecker,
    log: FindingLog,
}

impl LifecycleController {
    pub fn new(processor: Box<dyn AudioProcessor>, log: FindingLog) -> Self {
        let calls = CallTracker::new(log.clone());
        Self::with_tracker(processor, log, calls)
    }

    /// Shares `calls` with other observers of the same component, such as
    /// the host notifier.
    pub fn with_tracker(processor: Box<dyn AudioProcessor>, log: FindingLog, calls: CallTracker) -> Self {
        let layout = BusLayout::query(processor.as_ref());
        let checker = ContractChecker::with_tracker(log.clone(), layout, calls);
        Self {
            processor,
            lifecycle: Lifecycle::new(),
            checker,
            log,
        }
    }

    pub fn state(&self) -> ComponentState {
        self.lifecycle.state()
    }

    pub fn log(&self) -> &FindingLog {
        &self.log
    }

    pub fn checker(&self) -> &ContractChecker {
        &self.checker
    }

    pub fn checker_mut(&mut self) -> &mut ContractChecker {
        &mut self.checker
    }

    pub fn processor(&self) -> &dyn AudioProcessor {
        self.processor.as_ref()
    }

    /// Direct access that bypasses the gate, for probing how the component
    /// itself reacts to illegal calls. Tracked state is not updated.
    pub fn raw(&mut self) -> &mut dyn AudioProcessor {
        self.processor.as_mut()
    }

    pub fn initialize(&mut self) -> Result<(), DriverError> {
        self.drive(Transition::Initialize, |processor| processor.initialize())
            .map(drop)
    }

    pub fn terminate(&mut self) -> Result<(), DriverError> {
        self.drive(Transition::Terminate, |processor| processor.terminate())
            .map(drop)
    }

    pub fn set_active(&mut self, active: bool) -> Result<TransitionOutcome, DriverError> {
        self.drive(Transition::SetActive(active), |processor| {
            processor.set_active(active)
        })
    }

    pub fn set_processing(&mut self, processing: bool) -> Result<TransitionOutcome, DriverError> {
        self.drive(Transition::SetProcessing(processing), |processor| {
            processor.set_processing(processing)
        })
    }

    pub fn setup_processing(&mut self, setup: &ProcessSetup) -> Result<(), DriverError> {
        self.gate(Transition::SetupProcessing)?;
        if let Err(reason) = self.validate_setup(setup) {
            self.log.record(Category::InvalidSetup, reason.clone());
            return Err(DriverError::InvalidSetup(reason));
        }
        self.forward(Transition::SetupProcessing, TransitionOutcome::Unchanged, |processor| {
            processor.setup_processing(setup)
        })?;
        self.checker.configure(*setup);
        Ok(())
    }

    /// Checks the payload, forwards it and checks what came back. Contract
    /// findings do not stop the call unless the channels are too short or
    /// of the wrong sample size for the component to touch safely.
    pub fn process(&mut self, data: &mut ProcessData<'_>) -> Result<(), DriverError> {
        self.gate(Transition::Process)?;
        self.checker.check_input(data);
        if !ContractChecker::buffers_fit(data) {
            tracing::warn!(frames = data.num_samples, "malformed process buffers withheld");
            return Err(DriverError::MalformedBuffers);
        }
        self.forward(Transition::Process, TransitionOutcome::Unchanged, |processor| {
            processor.process(data)
        })?;
        self.checker.check_output(data);
        Ok(())
    }

    /// Runs the legal path from `Created` to `Processing`.
    pub fn start(&mut self, setup: &ProcessSetup) -> Result<(), DriverError> {
        self.initialize()?;
        self.setup_processing(setup)?;
        self.set_active(true)?;
        self.set_processing(true)?;
        Ok(())
    }

    /// Walks the legal path back to `Terminated` from wherever the
    /// component is. Stops at the first refusal.
    pub fn shutdown(&mut self) -> Result<(), DriverError> {
        loop {
            match self.state() {
                ComponentState::Processing => {
                    self.set_processing(false)?;
                }
                ComponentState::Active => {
                    self.set_active(false)?;
                }
                ComponentState::Initialized | ComponentState::Inactive => self.terminate()?,
                ComponentState::Created | ComponentState::Terminated => return Ok(()),
            }
        }
    }

    fn validate_setup(&self, setup: &ProcessSetup) -> Result<(), String> {
        if !setup.sample_rate.is_finite() || setup.sample_rate <= 0.0 {
            return Err(format!("sample rate {} is not positive", setup.sample_rate));
        }
        if setup.max_samples_per_block == 0 {
            return Err("maximum block size is zero".to_owned());
        }
        if !self.processor.can_process_sample_size(setup.sample_size) {
            return Err(format!(
                "component does not support {}-bit samples",
                setup.sample_size.bits()
            ));
        }
        Ok(())
    }

    fn gate(&mut self, transition: Transition) -> Result<TransitionOutcome, DriverError> {
        match self.lifecycle.permits(transition) {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                let category = match (err, transition) {
                    (TransitionError::MissingSetup, _) => Category::MissingSetup,
                    (_, Transition::Process) => Category::ProcessNotPermitted,
                    _ => Category::InvalidTransition,
                };
                self.log.record(category, err.to_string());
                Err(err.into())
            }
        }
    }

    fn drive(
        &mut self,
        transition: Transition,
        call: impl FnOnce(&mut dyn AudioProcessor) -> Result<(), PluginError>,
    ) -> Result<TransitionOutcome, DriverError> {
        let outcome = self.gate(transition)?;
        self.forward(transition, outcome, call)?;
        Ok(outcome)
    }

    fn forward(
        &mut self,
        transition: Transition,
        outcome: TransitionOutcome,
        call: impl FnOnce(&mut dyn AudioProcessor) -> Result<(), PluginError>,
    ) -> Result<(), DriverError> {
        tracing::debug!(%transition, state = %self.lifecycle.state(), "forwarding call");
        let result = {
            let _call = self.checker.calls().enter(transition);
            call(self.processor.as_mut())
        };

        if outcome == TransitionOutcome::Repeated {
            self.log.advisory(
                Category::RepeatedActivation,
                format!("{transition} repeated while already active"),
            );
            if let Err(err) = result {
                tracing::debug!(%transition, error = %err, "component refused repeated call");
            }
            return Ok(());
        }

        match result {
            Ok(()) => {
                self.lifecycle.apply(transition)?;
                Ok(())
            }
            Err(source) => {
                self.log.record(
                    Category::CallFailed,
                    format!("component refused legal {transition}: {source}"),
                );
                Err(DriverError::Component { transition, source })
            }
        }
    }
}
