use audioplug_sdk::{BusDirection, BusInfo, BusLayout, Event, ProcessSetup, MAX_EVENTS};
use audioplug_validate::{ContractChecker, FindingLog};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_check_events(c: &mut Criterion) {
    let layout = BusLayout::from_buses([
        BusInfo::events(BusDirection::Input, "Notes", 16),
        BusInfo::audio(BusDirection::Output, "Out", 2),
    ]);
    let log = FindingLog::new();
    let mut checker = ContractChecker::new(log.clone(), layout);
    checker.configure(ProcessSetup::new(48_000.0, 4096));

    let events: Vec<Event> = (0..MAX_EVENTS)
        .map(|index| {
            let channel = (index % 16) as i16;
            let pitch = (index % 128) as i16;
            if index % 2 == 0 {
                Event::note_on(index as i32, channel, pitch, 0.75)
            } else {
                Event::note_off(index as i32, channel, pitch)
            }
        })
        .collect();

    c.bench_function("check_events_2048", |b| {
        b.iter(|| checker.check_events(black_box(&events), black_box(4096)))
    });
    assert!(log.is_empty());
}

criterion_group!(benches, bench_check_events);
criterion_main!(benches);
