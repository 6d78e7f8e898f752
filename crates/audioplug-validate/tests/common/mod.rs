#![allow(dead_code)]

use audioplug_sdk::{
    AudioProcessor, BusDirection, BusInfo, BusLayout, Component, Lifecycle, MediaType,
    PluginError, ProcessData, ProcessSetup, Transition,
};
use audioplug_validate::{FindingLog, LifecycleController};

pub const BLOCK: usize = 64;

pub fn setup() -> ProcessSetup {
    ProcessSetup::new(48_000.0, BLOCK)
}

pub fn stereo_buses() -> Vec<BusInfo> {
    vec![
        BusInfo::audio(BusDirection::Input, "In", 2),
        BusInfo::audio(BusDirection::Output, "Out", 2),
    ]
}

pub fn synth_layout() -> BusLayout {
    BusLayout::from_buses([
        BusInfo::events(BusDirection::Input, "Notes", 16),
        BusInfo::audio(BusDirection::Output, "Out", 2),
    ])
}

/// Stereo passthrough that guards every call with its own state machine.
#[derive(Default)]
pub struct Strict {
    lifecycle: Lifecycle,
}

impl Component for Strict {
    fn initialize(&mut self) -> Result<(), PluginError> {
        self.lifecycle.apply(Transition::Initialize)?;
        Ok(())
    }

    fn terminate(&mut self) -> Result<(), PluginError> {
        self.lifecycle.apply(Transition::Terminate)?;
        Ok(())
    }

    fn bus_count(&self, media: MediaType, _direction: BusDirection) -> usize {
        usize::from(media == MediaType::Audio)
    }

    fn bus_info(&self, media: MediaType, direction: BusDirection, index: usize) -> Option<BusInfo> {
        stereo_buses()
            .into_iter()
            .filter(|bus| bus.media == media && bus.direction == direction)
            .nth(index)
    }

    fn set_active(&mut self, active: bool) -> Result<(), PluginError> {
        self.lifecycle.apply(Transition::SetActive(active))?;
        Ok(())
    }
}

impl AudioProcessor for Strict {
    fn setup_processing(&mut self, _setup: &ProcessSetup) -> Result<(), PluginError> {
        self.lifecycle.apply(Transition::SetupProcessing)?;
        Ok(())
    }

    fn set_processing(&mut self, processing: bool) -> Result<(), PluginError> {
        self.lifecycle.apply(Transition::SetProcessing(processing))?;
        Ok(())
    }

    fn process(&mut self, data: &mut ProcessData<'_>) -> Result<(), PluginError> {
        self.lifecycle.apply(Transition::Process)?;
        data.passthrough()?;
        data.set_output_silence(false);
        Ok(())
    }
}

pub fn strict_driver() -> (FindingLog, LifecycleController) {
    let log = FindingLog::new();
    let driver = LifecycleController::new(Box::<Strict>::default(), log.clone());
    (log, driver)
}
