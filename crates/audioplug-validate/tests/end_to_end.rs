mod common;

use audioplug_sdk::{Event, ProcessSetup, SampleSize, MAX_EVENTS};
use audioplug_validate::{Category, ContractChecker, FindingLog, ProcessBuffers};
use common::{strict_driver, synth_layout};
use pretty_assertions::assert_eq;

#[test]
fn a_full_session_at_44k1_is_clean() {
    let (log, mut driver) = strict_driver();
    let setup = ProcessSetup::new(44_100.0, 512);
    driver.start(&setup).unwrap();

    let mut buffers = ProcessBuffers::new(driver.checker().layout(), SampleSize::Sample32, 512);
    for block in 0..8u64 {
        buffers.fill_noise(block);
        driver.process(&mut buffers.data(512)).unwrap();
        for channel in 0..2 {
            let input = buffers.input(0, channel, 512).unwrap();
            let output = buffers.output(0, channel, 512).unwrap();
            assert_eq!(output.len(), input.len());
            assert_eq!(output, input);
        }
    }
    // A short final block is legal.
    driver.process(&mut buffers.data(17)).unwrap();

    driver.shutdown().unwrap();
    assert!(log.is_empty(), "{:?}", log.findings());
}

#[test]
fn a_silent_block_stays_silent() {
    let (log, mut driver) = strict_driver();
    driver.start(&ProcessSetup::new(44_100.0, 512)).unwrap();

    let mut buffers = ProcessBuffers::new(driver.checker().layout(), SampleSize::Sample32, 512);
    buffers.fill_noise(3);
    driver.process(&mut buffers.data(512)).unwrap();
    buffers.fill_silence();
    driver.process(&mut buffers.data(512)).unwrap();
    for channel in 0..2 {
        let output = buffers.output(0, channel, 512).unwrap();
        assert_eq!(output, vec![0.0; 512]);
    }

    driver.shutdown().unwrap();
    assert!(log.is_empty(), "{:?}", log.findings());
}

#[test]
fn overflowing_the_event_limit_is_reported_once() {
    let log = FindingLog::new();
    let mut checker = ContractChecker::new(log.clone(), synth_layout()).with_max_events(MAX_EVENTS);
    checker.configure(ProcessSetup::new(44_100.0, 4096));

    let mut events: Vec<Event> = (0..=MAX_EVENTS as i32)
        .map(|offset| Event::note_on(offset, 0, 60, 0.5))
        .collect();
    assert_eq!(events.len(), 2049);
    checker.check_events(&events, 4096);
    assert_eq!(log.len(), 1);
    assert_eq!(log.count(Category::EventCountExceeded), 1);

    // Events past the limit are still range-checked.
    let log = FindingLog::new();
    let mut checker = ContractChecker::new(log.clone(), synth_layout()).with_max_events(MAX_EVENTS);
    checker.configure(ProcessSetup::new(44_100.0, 4096));
    events[MAX_EVENTS] = Event::note_on(MAX_EVENTS as i32, 0, 200, 0.5);
    checker.check_events(&events, 4096);
    assert_eq!(log.count(Category::EventCountExceeded), 1);
    assert_eq!(log.count(Category::EventPitchRange), 1);
    assert_eq!(log.len(), 2);
}

#[test]
fn exactly_the_limit_is_accepted() {
    let log = FindingLog::new();
    let mut checker = ContractChecker::new(log.clone(), synth_layout());
    let events: Vec<Event> = (0..MAX_EVENTS as i32)
        .map(|offset| Event::note_on(offset, 1, 64, 0.5))
        .collect();
    checker.check_events(&events, 4096);
    assert!(log.is_empty());
}
