mod common;

use audioplug_sdk::{
    ComponentState, Lifecycle, SampleSize, Transition, TransitionOutcome,
};
use audioplug_validate::{Category, DriverError, LifecycleController, ProcessBuffers};
use common::{setup, strict_driver, BLOCK};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn buffers(driver: &LifecycleController) -> ProcessBuffers {
    ProcessBuffers::new(driver.checker().layout(), SampleSize::Sample32, BLOCK)
}

fn call(
    driver: &mut LifecycleController,
    buffers: &mut ProcessBuffers,
    transition: Transition,
) -> Result<(), DriverError> {
    match transition {
        Transition::Initialize => driver.initialize(),
        Transition::Terminate => driver.terminate(),
        Transition::SetActive(active) => driver.set_active(active).map(drop),
        Transition::SetupProcessing => driver.setup_processing(&setup()),
        Transition::SetProcessing(processing) => driver.set_processing(processing).map(drop),
        Transition::Process => driver.process(&mut buffers.data(BLOCK)),
    }
}

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
fn the_legal_path_is_accepted_without_findings() {
    let (log, mut driver) = strict_driver();
    let mut buffers = buffers(&driver);
    for transition in HAPPY_PATH {
        call(&mut driver, &mut buffers, transition).unwrap();
    }
    assert_eq!(driver.state(), ComponentState::Terminated);
    assert!(log.is_empty(), "{:?}", log.findings());
}

#[test]
fn every_single_deviation_is_one_violation() {
    use Transition::*;

    let cases: [(&[Transition], Transition, Category); 8] = [
        (&[], Process, Category::ProcessNotPermitted),
        (&[], SetActive(true), Category::InvalidTransition),
        (&[Initialize], Initialize, Category::InvalidTransition),
        (&[Initialize], SetActive(true), Category::MissingSetup),
        (&[Initialize], SetProcessing(true), Category::InvalidTransition),
        (&[Initialize, SetupProcessing, SetActive(true)], Process, Category::ProcessNotPermitted),
        (&[Initialize, SetupProcessing, SetActive(true)], Terminate, Category::InvalidTransition),
        (
            &[Initialize, SetupProcessing, SetActive(true), SetProcessing(true)],
            SetupProcessing,
            Category::InvalidTransition,
        ),
    ];

    for (prefix, deviation, category) in cases {
        let (log, mut driver) = strict_driver();
        let mut buffers = buffers(&driver);
        for transition in prefix {
            call(&mut driver, &mut buffers, *transition).unwrap();
        }
        let state = driver.state();
        assert!(call(&mut driver, &mut buffers, deviation).is_err());
        assert_eq!(log.violation_count(), 1, "{deviation} from {state}");
        assert_eq!(log.count(category), 1, "{deviation} from {state}");
        assert_eq!(driver.state(), state);
    }
}

#[test]
fn redundant_deactivation_is_a_quiet_no_op() {
    let (log, mut driver) = strict_driver();
    driver.start(&setup()).unwrap();
    driver.set_processing(false).unwrap();
    driver.set_active(false).unwrap();
    assert_eq!(driver.set_active(false).unwrap(), TransitionOutcome::NoOp);
    assert_eq!(driver.state(), ComponentState::Inactive);
    assert!(log.is_empty());
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
    fn findings_track_the_state_table(
        transitions in prop::collection::vec(transition_strategy(), 1..40)
    ) {
        let (log, mut driver) = strict_driver();
        let mut buffers = buffers(&driver);
        let mut reference = Lifecycle::new();
        for transition in transitions {
            let before = log.violation_count();
            let expected = reference.apply(transition);
            let result = call(&mut driver, &mut buffers, transition);
            let recorded = log.violation_count() - before;
            prop_assert_eq!(expected.is_err(), result.is_err());
            prop_assert_eq!(recorded, usize::from(expected.is_err()));
            prop_assert_eq!(driver.state(), reference.state());
        }
    }
}
