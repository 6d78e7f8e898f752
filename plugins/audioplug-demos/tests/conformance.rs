use std::sync::Arc;

use audioplug_demos::{
    DemoController, DemoFactory, DELAY_CID, FILTER_CID, GAIN_CID, GAIN_CONTROLLER_CID, METER_CID,
    METER_CONTROLLER_CID, SYNTH_CID,
};
use audioplug_host::PluginModule;
use audioplug_sdk::{EditController, ParamId, PluginFactory};
use audioplug_validate::{
    CallTracker, Edit, FindingLog, RecordingHandler, RunReport, TestStatus, Validator,
    ValidatorConfig,
};
use pretty_assertions::assert_eq;

fn quick_config() -> ValidatorConfig {
    ValidatorConfig {
        sample_rates: vec![44_100.0, 48_000.0],
        blocks: 4,
        ..ValidatorConfig::default()
    }
}

fn assert_clean(report: &RunReport) {
    assert!(report.passed(), "{}", report.render_text(true));
    let findings: usize = report
        .classes
        .iter()
        .flat_map(|class| &class.results)
        .map(|result| result.violations().count())
        .sum();
    assert_eq!(findings, 0, "{}", report.render_text(true));
}

fn status(report: &RunReport, class: usize, test: &str) -> TestStatus {
    report.classes[class]
        .result(test)
        .map(|result| result.status)
        .unwrap_or_else(|| panic!("no result for {test}"))
}

#[test]
fn every_class_passes_in_process() {
    let report = Validator::new(quick_config())
        .run(&DemoFactory, None)
        .expect("validation runs");
    assert_eq!(report.classes.len(), 5);
    assert_clean(&report);

    let synth = report
        .classes
        .iter()
        .position(|class| class.cid == SYNTH_CID.to_string())
        .expect("synth is validated");
    assert_eq!(status(&report, synth, "bypass-passthrough"), TestStatus::Skipped);
    assert_eq!(status(&report, synth, "note-expressions"), TestStatus::Passed);
    assert_eq!(status(&report, synth, "events"), TestStatus::Passed);
}

#[test]
fn every_class_passes_through_the_binary_interface() {
    let module = PluginModule::from_entry(&audioplug_demos::audioplug_entry).expect("module opens");
    assert_eq!(module.factory_info().vendor, "audioplug");
    let report = Validator::new(quick_config())
        .run(&module, None)
        .expect("validation runs");
    assert_eq!(report.classes.len(), 5);
    assert_clean(&report);
}

#[test]
fn a_single_class_can_be_selected() {
    for cid in [GAIN_CID, DELAY_CID, FILTER_CID, METER_CID] {
        let report = Validator::new(quick_config())
            .run(&DemoFactory, Some(&cid))
            .expect("validation runs");
        assert_eq!(report.classes.len(), 1);
        assert_eq!(report.classes[0].cid, cid.to_string());
        assert_eq!(status(&report, 0, "bypass-passthrough"), TestStatus::Passed);
        assert_clean(&report);
    }
}

#[test]
fn controller_edits_follow_the_begin_perform_end_protocol() {
    let log = FindingLog::new();
    let handler = Arc::new(RecordingHandler::new(log.clone(), CallTracker::new(log.clone())));
    assert!(DemoFactory.class_info(&GAIN_CONTROLLER_CID).is_some());

    let mut controller = DemoController::new::<audioplug_demos::gain::GainDsp>(handler.clone());
    controller.initialize().expect("controller initializes");
    controller.edit(audioplug_demos::gain::GAIN, 0.5).expect("edit succeeds");
    assert!(controller.edit(ParamId(99), 0.5).is_err());
    handler.finish();

    assert_eq!(controller.param_normalized(audioplug_demos::gain::GAIN), 0.5);
    assert_eq!(
        handler.edits(),
        vec![
            Edit::Begin(ParamId(0)),
            Edit::Perform(ParamId(0), 0.5),
            Edit::End(ParamId(0)),
            Edit::Begin(ParamId(99)),
            Edit::End(ParamId(99)),
        ]
    );
    assert!(log.is_empty(), "{:?}", log.findings());
}

#[test]
fn read_only_meter_parameters_refuse_writes() {
    let mut controller = DemoFactory
        .create_controller(&METER_CONTROLLER_CID, audioplug_sdk::null_host())
        .expect("controller is created");
    assert!(controller
        .set_param_normalized(audioplug_demos::meter::PEAK_LEFT, 0.5)
        .is_err());
    assert!(controller
        .set_param_normalized(audioplug_demos::meter::BYPASS, 1.0)
        .is_ok());
}
