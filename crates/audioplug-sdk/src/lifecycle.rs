//! Component lifecycle state machine.
//!
//! ```text
//! Created --initialize--> Initialized --setActive(true)--> Active
//!     Active --setProcessing(true)--> Processing --setProcessing(false)--> Active
//!     Active --setActive(false)--> Inactive --terminate--> Terminated
//! ```
//!
//! Hosts and components each keep their own [`Lifecycle`]. The host uses it to
//! decide whether a call may be issued at all, the component uses it to reject
//! calls that arrive out of order.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentState {
    Created,
    Initialized,
    Active,
    Processing,
    Inactive,
    Terminated,
}

impl fmt::Display for ComponentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComponentState::Created => "created",
            ComponentState::Initialized => "initialized",
            ComponentState::Active => "active",
            ComponentState::Processing => "processing",
            ComponentState::Inactive => "inactive",
            ComponentState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// A lifecycle call issued by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Transition {
    Initialize,
    Terminate,
    SetActive(bool),
    SetupProcessing,
    SetProcessing(bool),
    Process,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Initialize => f.write_str("initialize"),
            Transition::Terminate => f.write_str("terminate"),
            Transition::SetActive(state) => write!(f, "setActive({state})"),
            Transition::SetupProcessing => f.write_str("setupProcessing"),
            Transition::SetProcessing(state) => write!(f, "setProcessing({state})"),
            Transition::Process => f.write_str("process"),
        }
    }
}

/// Result of a permitted transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The component moves into a new state.
    Entered(ComponentState),
    /// A legal call that keeps the current state (`setupProcessing`, `process`).
    Unchanged,
    /// A redundant "off" call: `setActive(false)` while not active or
    /// `setProcessing(false)` while not processing.
    NoOp,
    /// `setActive(true)` on an already active component.
    Repeated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("{transition} is not permitted while the component is {state}")]
    NotPermitted {
        state: ComponentState,
        transition: Transition,
    },
    #[error("setActive(true) requires a prior setupProcessing call")]
    MissingSetup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifecycle {
    state: ComponentState,
    configured: bool,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub const fn new() -> Self {
        Self {
            state: ComponentState::Created,
            configured: false,
        }
    }

    pub fn state(&self) -> ComponentState {
        self.state
    }

    /// True once `setupProcessing` has succeeded at least once.
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    pub fn is_processing(&self) -> bool {
        self.state == ComponentState::Processing
    }

    /// Decides whether `transition` is legal without changing state.
    pub fn permits(&self, transition: Transition) -> Result<TransitionOutcome, TransitionError> {
        use ComponentState::*;
        use Transition::*;

        let outcome = match (self.state, transition) {
            (Created, Initialize) => TransitionOutcome::Entered(Initialized),
            (Initialized | Inactive, Terminate) => TransitionOutcome::Entered(Terminated),
            (Initialized | Inactive, SetupProcessing) => TransitionOutcome::Unchanged,
            (Initialized | Inactive, SetActive(true)) => {
                if !self.configured {
                    return Err(TransitionError::MissingSetup);
                }
                TransitionOutcome::Entered(Active)
            }
            (Active, SetActive(true)) => TransitionOutcome::Repeated,
            (Initialized | Inactive, SetActive(false)) => TransitionOutcome::NoOp,
            (Active, SetActive(false)) => TransitionOutcome::Entered(Inactive),
            (Active, SetProcessing(true)) => TransitionOutcome::Entered(Processing),
            (Active, SetProcessing(false)) => TransitionOutcome::NoOp,
            (Processing, SetProcessing(false)) => TransitionOutcome::Entered(Active),
            (Processing, Process) => TransitionOutcome::Unchanged,
            (state, transition) => {
                return Err(TransitionError::NotPermitted { state, transition });
            }
        };
        Ok(outcome)
    }

    /// Applies `transition`. A rejected transition leaves the state untouched.
    pub fn apply(&mut self, transition: Transition) -> Result<TransitionOutcome, TransitionError> {
        let outcome = self.permits(transition)?;
        if let TransitionOutcome::Entered(state) = outcome {
            self.state = state;
        }
        if transition == Transition::SetupProcessing {
            self.configured = true;
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;

    const HAPPY_PATH: [Transition; 8] = [
        Transition::Initialize,
        Transition::SetupProcessing,
        Transition::SetActive(true),
        Transition::SetProcessing(true),
        Transition::Process,
        Transition::SetProcessing(false),
        Transition::SetActive(false),
        Transition::Terminate,
    ];

    #[test]
    fn happy_path_is_accepted() {
        let mut lifecycle = Lifecycle::new();
        for transition in HAPPY_PATH {
            lifecycle.apply(transition).unwrap();
        }
        assert_eq!(lifecycle.state(), ComponentState::Terminated);
    }

    #[test]
    fn process_requires_processing_state() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.apply(Transition::Initialize).unwrap();
        lifecycle.apply(Transition::SetupProcessing).unwrap();
        lifecycle.apply(Transition::SetActive(true)).unwrap();
        assert_eq!(
            lifecycle.apply(Transition::Process),
            Err(TransitionError::NotPermitted {
                state: ComponentState::Active,
                transition: Transition::Process,
            })
        );
        assert_eq!(lifecycle.state(), ComponentState::Active);
    }

    #[test]
    fn activation_requires_setup() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.apply(Transition::Initialize).unwrap();
        assert_eq!(
            lifecycle.apply(Transition::SetActive(true)),
            Err(TransitionError::MissingSetup)
        );
    }

    #[test]
    fn redundant_deactivation_is_a_no_op() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.apply(Transition::Initialize).unwrap();
        lifecycle.apply(Transition::SetupProcessing).unwrap();
        lifecycle.apply(Transition::SetActive(true)).unwrap();
        lifecycle.apply(Transition::SetActive(false)).unwrap();
        assert_eq!(
            lifecycle.apply(Transition::SetActive(false)),
            Ok(TransitionOutcome::NoOp)
        );
        assert_eq!(lifecycle.state(), ComponentState::Inactive);
    }

    #[test]
    fn repeated_activation_is_reported_as_such() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.apply(Transition::Initialize).unwrap();
        lifecycle.apply(Transition::SetupProcessing).unwrap();
        lifecycle.apply(Transition::SetActive(true)).unwrap();
        assert_eq!(
            lifecycle.apply(Transition::SetActive(true)),
            Ok(TransitionOutcome::Repeated)
        );
    }

    #[test]
    fn setup_is_rejected_while_active() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.apply(Transition::Initialize).unwrap();
        lifecycle.apply(Transition::SetupProcessing).unwrap();
        lifecycle.apply(Transition::SetActive(true)).unwrap();
        assert!(lifecycle.apply(Transition::SetupProcessing).is_err());
    }

    fn transition_strategy() -> impl Strategy<Value = Transition> {
        prop_oneof![
            Just(Transition::Initialize),
            Just(Transition::Terminate),
            any::<bool>().prop_map(Transition::SetActive),
            Just(Transition::SetupProcessing),
            any::<bool>().prop_map(Transition::SetProcessing),
            Just(Transition::Process),
        ]
    }

    proptest! {
        #[test]
        fn rejected_transitions_never_change_state(
            transitions in prop::collection::vec(transition_strategy(), 1..48)
        ) {
            let mut lifecycle = Lifecycle::new();
            for transition in transitions {
                let before = lifecycle;
                match lifecycle.apply(transition) {
                    Ok(_) => {}
                    Err(_) => prop_assert_eq!(before, lifecycle),
                }
                if lifecycle.state() == ComponentState::Processing {
                    prop_assert!(lifecycle.is_configured());
                }
            }
        }
    }
}
