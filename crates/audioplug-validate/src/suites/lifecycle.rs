use audioplug_sdk::{ComponentState, PluginError, SampleSize, TransitionOutcome};

use crate::buffers::ProcessBuffers;
use crate::config::Suite;
use crate::finding::{Category, FindingLog};
use crate::harness::{ConformanceTest, TestContext, TestOutcome};
use crate::provider::Block;

pub struct ValidTransitions;

impl ConformanceTest for ValidTransitions {
    fn name(&self) -> &'static str {
        "valid-transitions"
    }

    fn suite(&self) -> Suite {
        Suite::Lifecycle
    }

    fn description(&self) -> &'static str {
        "the full legal lifecycle succeeds at every configured sample rate"
    }

    fn run(&self, cx: &mut TestContext<'_>) -> anyhow::Result<TestOutcome> {
        let block_size = cx.config.block_size;
        for &rate in &cx.config.sample_rates {
            let mut plugin = cx.started(&cx.setup(rate))?;
            let mut buffers = plugin.buffers(block_size);
            buffers.fill_silence();
            plugin.process_block(&mut buffers, Block::new(block_size))?;
            plugin.driver.set_processing(false)?;
            plugin.driver.set_active(false)?;
            plugin.driver.terminate()?;
            if plugin.driver.state() != ComponentState::Terminated {
                return Ok(TestOutcome::Failed(format!(
                    "ended in {} at {rate} Hz",
                    plugin.driver.state()
                )));
            }
        }
        Ok(TestOutcome::Passed)
    }
}

pub struct InvalidTransitionProbe;

fn expect_refusal(log: &FindingLog, what: &str, result: Result<(), PluginError>) {
    if result.is_ok() {
        log.record(
            Category::AcceptedIllegalCall,
            format!("component accepted {what}"),
        );
    }
}

impl ConformanceTest for InvalidTransitionProbe {
    fn name(&self) -> &'static str {
        "invalid-transition-probe"
    }

    fn suite(&self) -> Suite {
        Suite::Lifecycle
    }

    fn description(&self) -> &'static str {
        "the component itself refuses calls its current state does not permit"
    }

    fn run(&self, cx: &mut TestContext<'_>) -> anyhow::Result<TestOutcome> {
        let block_size = cx.config.block_size;
        let mut plugin = cx.create()?;
        let mut buffers = ProcessBuffers::new(
            plugin.driver.checker().layout(),
            SampleSize::Sample32,
            block_size,
        );
        let log = &cx.log;

        let raw = plugin.driver.raw();
        expect_refusal(log, "setActive(true) before initialize", raw.set_active(true));
        expect_refusal(log, "setProcessing(true) before initialize", raw.set_processing(true));
        expect_refusal(log, "process before initialize", raw.process(&mut buffers.data(block_size)));

        plugin.driver.initialize()?;
        let raw = plugin.driver.raw();
        expect_refusal(log, "setActive(true) without setupProcessing", raw.set_active(true));
        expect_refusal(log, "setProcessing(true) while inactive", raw.set_processing(true));
        expect_refusal(log, "process while inactive", raw.process(&mut buffers.data(block_size)));

        plugin
            .driver
            .setup_processing(&cx.setup(cx.config.primary_sample_rate()))?;
        plugin.driver.set_active(true)?;
        let raw = plugin.driver.raw();
        expect_refusal(log, "process before setProcessing(true)", raw.process(&mut buffers.data(block_size)));
        expect_refusal(log, "terminate while active", raw.terminate());
        Ok(TestOutcome::Passed)
    }
}

pub struct RepeatedTransitions;

impl ConformanceTest for RepeatedTransitions {
    fn name(&self) -> &'static str {
        "repeated-transitions"
    }

    fn suite(&self) -> Suite {
        Suite::Lifecycle
    }

    fn description(&self) -> &'static str {
        "redundant off calls are no-ops and a repeated setActive(true) is tolerated"
    }

    fn run(&self, cx: &mut TestContext<'_>) -> anyhow::Result<TestOutcome> {
        let mut plugin = cx.create()?;
        let driver = &mut plugin.driver;
        driver.initialize()?;
        if driver.set_active(false)? != TransitionOutcome::NoOp {
            return Ok(TestOutcome::Failed("setActive(false) while initialized changed state".into()));
        }
        driver.setup_processing(&cx.setup(cx.config.primary_sample_rate()))?;
        driver.set_active(true)?;
        if driver.set_active(true)? != TransitionOutcome::Repeated {
            return Ok(TestOutcome::Failed("second setActive(true) was not a repeat".into()));
        }
        if driver.set_processing(false)? != TransitionOutcome::NoOp {
            return Ok(TestOutcome::Failed("setProcessing(false) while active changed state".into()));
        }
        driver.set_processing(true)?;
        driver.set_processing(false)?;
        driver.set_active(false)?;
        if driver.set_active(false)? != TransitionOutcome::NoOp {
            return Ok(TestOutcome::Failed("setActive(false) while inactive changed state".into()));
        }
        driver.terminate()?;
        Ok(TestOutcome::Passed)
    }
}

pub struct SuspendResume;

impl ConformanceTest for SuspendResume {
    fn name(&self) -> &'static str {
        "suspend-resume"
    }

    fn suite(&self) -> Suite {
        Suite::Lifecycle
    }

    fn description(&self) -> &'static str {
        "processing resumes after deactivation and a new setup"
    }

    fn run(&self, cx: &mut TestContext<'_>) -> anyhow::Result<TestOutcome> {
        let block_size = cx.config.block_size;
        let first = cx.config.primary_sample_rate();
        let second = cx.config.sample_rates.get(1).copied().unwrap_or(first);

        let mut plugin = cx.started(&cx.setup(first))?;
        let mut buffers = plugin.buffers(block_size);
        for seed in 0..2 {
            buffers.fill_noise(seed);
            plugin.process_block(&mut buffers, Block::new(block_size))?;
        }

        plugin.driver.set_processing(false)?;
        plugin.driver.set_active(false)?;
        plugin.driver.setup_processing(&cx.setup(second))?;
        plugin.driver.set_active(true)?;
        plugin.driver.set_processing(true)?;

        for seed in 2..4 {
            buffers.fill_noise(seed);
            plugin.process_block(&mut buffers, Block::new(block_size))?;
        }
        Ok(TestOutcome::Passed)
    }
}
