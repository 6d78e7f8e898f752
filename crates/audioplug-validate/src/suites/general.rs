use std::collections::HashSet;

use audioplug_sdk::{BusDirection, ClassCategory, MediaType, SampleSize};

use super::probe_values;
use crate::config::Suite;
use crate::finding::Category;
use crate::harness::{ConformanceTest, TestContext, TestOutcome};
use crate::provider::Block;

const ROUND_TRIP_TOLERANCE: f64 = 1e-6;

pub struct BusScan;

impl ConformanceTest for BusScan {
    fn name(&self) -> &'static str {
        "bus-scan"
    }

    fn suite(&self) -> Suite {
        Suite::General
    }

    fn description(&self) -> &'static str {
        "bus counts and bus info agree and describe usable buses"
    }

    fn run(&self, cx: &mut TestContext<'_>) -> anyhow::Result<TestOutcome> {
        let plugin = cx.create()?;
        let processor = plugin.driver.processor();
        let mut total = 0;
        for media in [MediaType::Audio, MediaType::Event] {
            for direction in [BusDirection::Input, BusDirection::Output] {
                let count = processor.bus_count(media, direction);
                total += count;
                for index in 0..count {
                    let Some(info) = processor.bus_info(media, direction, index) else {
                        cx.log.record(
                            Category::BusDeclaration,
                            format!("{media:?} {direction:?} bus {index} is counted but has no info"),
                        );
                        continue;
                    };
                    if info.media != media || info.direction != direction {
                        cx.log.record(
                            Category::BusDeclaration,
                            format!(
                                "{media:?} {direction:?} bus {index} describes itself as {:?} {:?}",
                                info.media, info.direction
                            ),
                        );
                    }
                    if info.channel_count == 0 {
                        cx.log.record(
                            Category::BusDeclaration,
                            format!("{media:?} {direction:?} bus {index} has no channels"),
                        );
                    }
                    if media == MediaType::Audio && info.channel_count > 64 {
                        cx.log.record(
                            Category::BusDeclaration,
                            format!(
                                "audio bus {index} has {} channels, silence flags cover 64",
                                info.channel_count
                            ),
                        );
                    }
                    if info.name.trim().is_empty() {
                        cx.log.record(
                            Category::BusDeclaration,
                            format!("{media:?} {direction:?} bus {index} has no name"),
                        );
                    }
                }
                if processor.bus_info(media, direction, count).is_some() {
                    cx.log.record(
                        Category::BusDeclaration,
                        format!("{media:?} {direction:?} reports info past its bus count {count}"),
                    );
                }
            }
        }
        if total == 0 {
            cx.log
                .record(Category::BusDeclaration, "component declares no buses at all");
        }
        Ok(TestOutcome::Passed)
    }
}

pub struct ParameterScan;

impl ConformanceTest for ParameterScan {
    fn name(&self) -> &'static str {
        "parameter-scan"
    }

    fn suite(&self) -> Suite {
        Suite::General
    }

    fn description(&self) -> &'static str {
        "parameter declarations are unique, in range and convert consistently"
    }

    fn run(&self, cx: &mut TestContext<'_>) -> anyhow::Result<TestOutcome> {
        let mut plugin = cx.create()?;
        let Some(controller) = plugin.controller.as_deref_mut() else {
            return Ok(TestOutcome::Skipped("no controller".into()));
        };
        let log = &cx.log;
        let count = controller.parameter_count();
        let mut infos = Vec::with_capacity(count);
        let mut ids = HashSet::new();
        let mut bypasses = 0;

        for index in 0..count {
            let Some(info) = controller.parameter_info(index) else {
                log.record(
                    Category::ParameterDeclaration,
                    format!("parameter {index} is counted but has no info"),
                );
                continue;
            };
            if !ids.insert(info.id) {
                log.record(
                    Category::ParameterDeclaration,
                    format!("parameter id {} is declared twice", info.id),
                );
            }
            if info.title.trim().is_empty() {
                log.record(
                    Category::ParameterDeclaration,
                    format!("parameter {} has no title", info.id),
                );
            }
            if info.step_count < 0 {
                log.record(
                    Category::ParameterDeclaration,
                    format!("parameter {} has step count {}", info.id, info.step_count),
                );
            }
            let default = info.default_normalized;
            if !default.is_finite() || !(0.0..=1.0).contains(&default) {
                log.record(
                    Category::ParameterDeclaration,
                    format!("parameter {} default {default} is outside [0, 1]", info.id),
                );
            }
            let current = controller.param_normalized(info.id);
            if !current.is_finite() || !(0.0..=1.0).contains(&current) {
                log.record(
                    Category::ParameterDeclaration,
                    format!("parameter {} reports value {current} outside [0, 1]", info.id),
                );
            }
            if info.is_bypass() {
                bypasses += 1;
                if info.step_count != 1 {
                    log.record(
                        Category::ParameterDeclaration,
                        format!("bypass parameter {} is not a toggle", info.id),
                    );
                }
            }
            for value in probe_values(&info) {
                let plain = controller.normalized_to_plain(info.id, value);
                let back = controller.plain_to_normalized(info.id, plain);
                if !plain.is_finite() || (back - value).abs() > ROUND_TRIP_TOLERANCE {
                    log.record(
                        Category::ParameterDeclaration,
                        format!(
                            "parameter {} maps {value} to {plain} and back to {back}",
                            info.id
                        ),
                    );
                    break;
                }
            }
            infos.push(info);
        }

        if bypasses > 1 {
            log.record(
                Category::ParameterDeclaration,
                format!("{bypasses} parameters are flagged as bypass"),
            );
        }
        if controller.parameter_info(count).is_some() {
            log.record(
                Category::ParameterDeclaration,
                format!("parameter info is reported past the count {count}"),
            );
        }

        for info in infos.iter().filter(|info| !info.is_read_only()) {
            if let Err(err) = controller.set_param_normalized(info.id, info.default_normalized) {
                log.record(
                    Category::ParameterDeclaration,
                    format!("parameter {} refused its own default: {err}", info.id),
                );
            }
        }
        Ok(TestOutcome::Passed)
    }
}

pub struct ControllerLink;

impl ConformanceTest for ControllerLink {
    fn name(&self) -> &'static str {
        "controller-link"
    }

    fn suite(&self) -> Suite {
        Suite::General
    }

    fn description(&self) -> &'static str {
        "the controller class a component names is exported and can be created"
    }

    fn run(&self, cx: &mut TestContext<'_>) -> anyhow::Result<TestOutcome> {
        let plugin = cx.create()?;
        let Some(cid) = plugin.driver.processor().controller_class_id() else {
            return Ok(TestOutcome::Skipped("component names no controller".into()));
        };
        match cx.provider.factory().class_info(&cid) {
            None => cx.log.record(
                Category::ControllerLink,
                format!("controller class {cid} is not exported by the factory"),
            ),
            Some(class) if class.category != ClassCategory::Controller => cx.log.record(
                Category::ControllerLink,
                format!("class {cid} named as controller is a {:?}", class.category),
            ),
            Some(_) if plugin.controller.is_none() => cx.log.record(
                Category::ControllerLink,
                format!("controller {cid} could not be created or initialized"),
            ),
            Some(_) => {}
        }
        Ok(TestOutcome::Passed)
    }
}

pub struct SampleSizeSupport;

impl ConformanceTest for SampleSizeSupport {
    fn name(&self) -> &'static str {
        "sample-size"
    }

    fn suite(&self) -> Suite {
        Suite::General
    }

    fn description(&self) -> &'static str {
        "32-bit processing is supported and every advertised sample size can be set up"
    }

    fn run(&self, cx: &mut TestContext<'_>) -> anyhow::Result<TestOutcome> {
        let supported: Vec<_> = {
            let plugin = cx.create()?;
            [SampleSize::Sample32, SampleSize::Sample64]
                .into_iter()
                .filter(|size| plugin.driver.processor().can_process_sample_size(*size))
                .collect()
        };
        if !supported.contains(&SampleSize::Sample32) {
            cx.log
                .record(Category::InvalidSetup, "component does not support 32-bit samples");
        }

        let block_size = cx.config.block_size;
        for sample_size in supported {
            let setup = cx.setup_with(cx.config.primary_sample_rate(), sample_size);
            let mut plugin = cx.started(&setup)?;
            let mut buffers = plugin.buffers(block_size);
            buffers.fill_noise(sample_size.bits().into());
            plugin.process_block(&mut buffers, Block::new(block_size))?;
        }
        Ok(TestOutcome::Passed)
    }
}
