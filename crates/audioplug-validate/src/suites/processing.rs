use audioplug_sdk::events::NoteOn;
use audioplug_sdk::process::ContextState;
use audioplug_sdk::{
    Event, EventKind, ParamId, ParameterFlags, ParameterQueue, ProcessContext, SampleSize,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::probe_values;
use crate::buffers::ProcessBuffers;
use crate::config::Suite;
use crate::finding::Category;
use crate::harness::{ConformanceTest, TestContext, TestOutcome};
use crate::provider::Block;

fn output_is_silent(buffers: &ProcessBuffers, frames: usize) -> bool {
    (0..buffers.output_buses()).all(|bus| {
        (0..buffers.output_channels(bus)).all(|channel| {
            buffers
                .output(bus, channel, frames)
                .map_or(true, |samples| samples.iter().all(|sample| *sample == 0.0))
        })
    })
}

fn note_on(offset: usize, channel: i16, pitch: i16, note_id: i32) -> Event {
    Event::new(
        offset as i32,
        EventKind::NoteOn(NoteOn {
            channel,
            pitch,
            tuning: 0.0,
            velocity: 0.8,
            length: 0,
            note_id,
        }),
    )
}

pub struct SilentInput;

impl ConformanceTest for SilentInput {
    fn name(&self) -> &'static str {
        "silence"
    }

    fn suite(&self) -> Suite {
        Suite::Processing
    }

    fn description(&self) -> &'static str {
        "silent input renders cleanly and effects stay silent"
    }

    fn run(&self, cx: &mut TestContext<'_>) -> anyhow::Result<TestOutcome> {
        let block_size = cx.config.block_size;
        let instrument = cx.provider.class().is_instrument();
        let mut plugin = cx.started(&cx.setup(cx.config.primary_sample_rate()))?;
        let mut buffers = plugin.buffers(block_size);
        for block in 0..cx.config.blocks {
            buffers.fill_silence();
            plugin.process_block(&mut buffers, Block::new(block_size))?;
            if !instrument && !output_is_silent(&buffers, block_size) {
                return Ok(TestOutcome::Failed(format!(
                    "silent input produced sound in block {block}"
                )));
            }
        }
        Ok(TestOutcome::Passed)
    }
}

pub struct ZeroLengthBlocks;

impl ConformanceTest for ZeroLengthBlocks {
    fn name(&self) -> &'static str {
        "zero-length"
    }

    fn suite(&self) -> Suite {
        Suite::Processing
    }

    fn description(&self) -> &'static str {
        "blocks of zero samples are accepted, with and without events"
    }

    fn run(&self, cx: &mut TestContext<'_>) -> anyhow::Result<TestOutcome> {
        let block_size = cx.config.block_size;
        let mut plugin = cx.started(&cx.setup(cx.config.primary_sample_rate()))?;
        let has_events = !plugin.driver.checker().layout().event_inputs.is_empty();
        let mut buffers = plugin.buffers(block_size);
        buffers.fill_noise(3);

        plugin.process_block(&mut buffers, Block::new(0))?;
        if has_events {
            let events = [Event::note_on(0, 0, 60, 0.5), Event::note_off(0, 0, 60)];
            plugin.process_block(&mut buffers, Block::new(0).with_events(&events))?;
        }
        plugin.process_block(&mut buffers, Block::new(block_size))?;
        plugin.process_block(&mut buffers, Block::new(0))?;
        Ok(TestOutcome::Passed)
    }
}

pub struct VariableBlockSize;

impl ConformanceTest for VariableBlockSize {
    fn name(&self) -> &'static str {
        "variable-block-size"
    }

    fn suite(&self) -> Suite {
        Suite::Processing
    }

    fn description(&self) -> &'static str {
        "any block size up to the negotiated maximum is processed"
    }

    fn run(&self, cx: &mut TestContext<'_>) -> anyhow::Result<TestOutcome> {
        let block_size = cx.config.block_size;
        let mut plugin = cx.started(&cx.setup(cx.config.primary_sample_rate()))?;
        let mut buffers = plugin.buffers(block_size);

        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut sizes = vec![1, block_size, block_size - 1, block_size / 2];
        sizes.extend((0..cx.config.blocks).map(|_| rng.gen_range(0..=block_size)));
        for (seed, size) in sizes.into_iter().enumerate() {
            buffers.fill_noise(seed as u64);
            plugin.process_block(&mut buffers, Block::new(size))?;
        }
        Ok(TestOutcome::Passed)
    }
}

pub struct BypassPassthrough;

impl ConformanceTest for BypassPassthrough {
    fn name(&self) -> &'static str {
        "bypass-passthrough"
    }

    fn suite(&self) -> Suite {
        Suite::Processing
    }

    fn description(&self) -> &'static str {
        "with bypass engaged the main output equals the main input"
    }

    fn run(&self, cx: &mut TestContext<'_>) -> anyhow::Result<TestOutcome> {
        let block_size = cx.config.block_size;
        let mut plugin = cx.started(&cx.setup(cx.config.primary_sample_rate()))?;
        let checker = plugin.driver.checker();
        let Some(bypass) = checker
            .declarations()
            .and_then(|declarations| declarations.bypass())
            .map(|info| info.id)
        else {
            return Ok(TestOutcome::Skipped("no bypass parameter".into()));
        };
        let layout = checker.layout();
        let channels = match (layout.audio_inputs.first(), layout.audio_outputs.first()) {
            (Some(input), Some(output)) if input.channel_count == output.channel_count => {
                input.channel_count
            }
            _ => return Ok(TestOutcome::Skipped("no matching main input/output pair".into())),
        };

        let engage = [ParameterQueue::new(bypass).with_point(0, 1.0)];
        let mut buffers = plugin.buffers(block_size);
        for block in 0..cx.config.blocks.max(2) {
            buffers.fill_noise(block as u64);
            let payload = if block == 0 {
                Block::new(block_size).with_params(&engage)
            } else {
                Block::new(block_size)
            };
            plugin.process_block(&mut buffers, payload)?;
            // The engaging block may crossfade.
            if block == 0 {
                continue;
            }
            for channel in 0..channels {
                let input = buffers.input(0, channel, block_size);
                let output = buffers.output(0, channel, block_size);
                if input != output {
                    cx.log.record(
                        Category::OutputPassthrough,
                        format!("bypassed output differs from input on channel {channel} in block {block}"),
                    );
                    return Ok(TestOutcome::Passed);
                }
            }
        }
        Ok(TestOutcome::Passed)
    }
}

pub struct ParameterChanges;

impl ConformanceTest for ParameterChanges {
    fn name(&self) -> &'static str {
        "parameter-changes"
    }

    fn suite(&self) -> Suite {
        Suite::Processing
    }

    fn description(&self) -> &'static str {
        "sample-accurate automation of every automatable parameter is accepted"
    }

    fn run(&self, cx: &mut TestContext<'_>) -> anyhow::Result<TestOutcome> {
        let block_size = cx.config.block_size;
        let mut plugin = cx.started(&cx.setup(cx.config.primary_sample_rate()))?;
        let Some(declarations) = plugin.driver.checker().declarations() else {
            return Ok(TestOutcome::Skipped("no controller".into()));
        };
        let automatable: Vec<(ParamId, Vec<f64>)> = declarations
            .parameters
            .iter()
            .filter(|info| !info.is_read_only() && info.flags.contains(ParameterFlags::CAN_AUTOMATE))
            .map(|info| (info.id, probe_values(info)))
            .collect();
        if automatable.is_empty() {
            return Ok(TestOutcome::Skipped("no automatable parameters".into()));
        }

        let offsets = [0, block_size / 2, block_size.saturating_sub(1)];
        let mut buffers = plugin.buffers(block_size);
        for block in 0..cx.config.blocks {
            let queues: Vec<_> = automatable
                .iter()
                .map(|(id, values)| {
                    offsets
                        .iter()
                        .enumerate()
                        .fold(ParameterQueue::new(*id), |queue, (index, offset)| {
                            let value = values[(block + index) % values.len()];
                            queue.with_point(*offset as i32, value)
                        })
                })
                .collect();
            buffers.fill_noise(block as u64);
            plugin.process_block(&mut buffers, Block::new(block_size).with_params(&queues))?;
        }
        Ok(TestOutcome::Passed)
    }
}

pub struct EventDelivery;

impl ConformanceTest for EventDelivery {
    fn name(&self) -> &'static str {
        "events"
    }

    fn suite(&self) -> Suite {
        Suite::Processing
    }

    fn description(&self) -> &'static str {
        "note events across the declared channels are handled and instruments sound"
    }

    fn run(&self, cx: &mut TestContext<'_>) -> anyhow::Result<TestOutcome> {
        let block_size = cx.config.block_size;
        let instrument = cx.provider.class().is_instrument();
        let mut plugin = cx.started(&cx.setup(cx.config.primary_sample_rate()))?;
        let Some(bus) = plugin.driver.checker().layout().event_inputs.first() else {
            return Ok(TestOutcome::Skipped("no event input bus".into()));
        };
        let channels = bus.channel_count.clamp(1, 16);

        let step = (block_size / 8).max(1);
        let last = block_size.saturating_sub(1) as i32;
        let mut buffers = plugin.buffers(block_size);
        let mut heard = false;
        for block in 0..cx.config.blocks {
            let mut events: Vec<_> = (0..block_size)
                .step_by(step)
                .take(8)
                .enumerate()
                .map(|(index, offset)| {
                    let channel = ((block + index) % channels) as i16;
                    let pitch = 36 + ((block * 7 + index * 5) % 60) as i16;
                    Event::note_on(offset as i32, channel, pitch, 0.8)
                })
                .collect();
            let releases: Vec<_> = events
                .iter()
                .filter_map(|event| match event.kind {
                    EventKind::NoteOn(note) => Some(Event::note_off(last, note.channel, note.pitch)),
                    _ => None,
                })
                .collect();
            events.extend(releases);

            buffers.fill_silence();
            plugin.process_block(&mut buffers, Block::new(block_size).with_events(&events))?;
            heard |= !output_is_silent(&buffers, block_size);
        }
        if instrument && !heard {
            return Ok(TestOutcome::Failed(
                "instrument stayed silent while receiving notes".into(),
            ));
        }
        Ok(TestOutcome::Passed)
    }
}

pub struct NoteExpressions;

impl ConformanceTest for NoteExpressions {
    fn name(&self) -> &'static str {
        "note-expressions"
    }

    fn suite(&self) -> Suite {
        Suite::Processing
    }

    fn description(&self) -> &'static str {
        "declared note expressions are accepted at their range limits"
    }

    fn run(&self, cx: &mut TestContext<'_>) -> anyhow::Result<TestOutcome> {
        let block_size = cx.config.block_size;
        let mut plugin = cx.started(&cx.setup(cx.config.primary_sample_rate()))?;
        let mut targets: Vec<_> = plugin
            .driver
            .checker()
            .declarations()
            .map(|declarations| {
                declarations
                    .note_expressions
                    .iter()
                    .map(|(key, types)| (*key, types.clone()))
                    .collect()
            })
            .unwrap_or_default();
        if targets.is_empty() {
            return Ok(TestOutcome::Skipped("no note expressions declared".into()));
        }
        targets.sort_by_key(|(key, _)| *key);

        let last = block_size.saturating_sub(1);
        let mut buffers = plugin.buffers(block_size);
        for (index, ((bus, channel), types)) in targets.into_iter().enumerate() {
            let note_id = index as i32 + 1;
            let mut events = vec![note_on(0, channel, 60, note_id).on_bus(bus)];
            let offset = 1.min(last) as i32;
            for info in &types {
                for value in [info.minimum, info.default_value, info.maximum] {
                    events.push(Event::note_expression(offset, info.type_id, note_id, value).on_bus(bus));
                }
            }
            let mut release = Event::note_off(last as i32, channel, 60).on_bus(bus);
            if let EventKind::NoteOff(note) = &mut release.kind {
                note.note_id = note_id;
            }
            events.push(release);

            buffers.fill_silence();
            plugin.process_block(&mut buffers, Block::new(block_size).with_events(&events))?;
        }
        Ok(TestOutcome::Passed)
    }
}

pub struct ProcessContextFeed;

impl ConformanceTest for ProcessContextFeed {
    fn name(&self) -> &'static str {
        "process-context"
    }

    fn suite(&self) -> Suite {
        Suite::Processing
    }

    fn description(&self) -> &'static str {
        "a running transport context is accepted block after block"
    }

    fn run(&self, cx: &mut TestContext<'_>) -> anyhow::Result<TestOutcome> {
        let block_size = cx.config.block_size;
        let rate = cx.config.primary_sample_rate();
        let mut plugin = cx.started(&cx.setup(rate))?;
        let mut buffers = plugin.buffers(block_size);

        let state = [
            ContextState::PLAYING,
            ContextState::SYSTEM_TIME_VALID,
            ContextState::TEMPO_VALID,
            ContextState::TIME_SIG_VALID,
            ContextState::PROJECT_TIME_MUSIC_VALID,
            ContextState::CONT_TIME_VALID,
        ]
        .into_iter()
        .fold(ContextState::default(), |mut state, flag| {
            state.insert(flag);
            state
        });
        let mut context = ProcessContext {
            state,
            sample_rate: rate,
            system_time: 1_000_000,
            tempo: 120.0,
            time_sig_numerator: 4,
            time_sig_denominator: 4,
            ..ProcessContext::default()
        };
        let block_seconds = block_size as f64 / rate;
        let block_nanos = ((block_seconds * 1e9) as i64).max(1);

        for block in 0..cx.config.blocks {
            buffers.fill_noise(block as u64);
            plugin.process_block(&mut buffers, Block::new(block_size).with_context(&context))?;
            context.project_time_samples += block_size as i64;
            context.continuous_time_samples += block_size as i64;
            context.system_time += block_nanos;
            context.project_time_music += block_seconds * context.tempo / 60.0;
        }
        Ok(TestOutcome::Passed)
    }
}

pub struct Sample64;

impl ConformanceTest for Sample64 {
    fn name(&self) -> &'static str {
        "sample-64"
    }

    fn suite(&self) -> Suite {
        Suite::Processing
    }

    fn description(&self) -> &'static str {
        "64-bit processing works when advertised"
    }

    fn run(&self, cx: &mut TestContext<'_>) -> anyhow::Result<TestOutcome> {
        if !cx.config.double_precision {
            return Ok(TestOutcome::Skipped("double precision disabled".into()));
        }
        let block_size = cx.config.block_size;
        let mut plugin = cx.create()?;
        if !plugin
            .driver
            .processor()
            .can_process_sample_size(SampleSize::Sample64)
        {
            return Ok(TestOutcome::Skipped("component is 32-bit only".into()));
        }
        let setup = cx.setup_with(cx.config.primary_sample_rate(), SampleSize::Sample64);
        plugin.driver.start(&setup)?;

        let mut buffers = plugin.buffers(block_size);
        for block in 0..cx.config.blocks {
            buffers.fill_noise(block as u64);
            plugin.process_block(&mut buffers, Block::new(block_size))?;
        }
        Ok(TestOutcome::Passed)
    }
}
