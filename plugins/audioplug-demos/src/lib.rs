//! Example processors exported as one audioplug module.
//!
//! Every class pairs a [`DemoProcessor`] with a [`DemoController`] and passes
//! the default conformance suites.

pub mod common;
pub mod delay;
pub mod filter;
pub mod gain;
pub mod meter;
pub mod smoothing;
pub mod synth;

use audioplug_sdk::prelude::*;
use audioplug_sdk::audioplug_export;

pub use common::{DemoController, DemoProcessor, Dsp};

const VENDOR: &str = "audioplug";

pub const GAIN_CID: Uid = Uid::from_u32s(0x6170_6b64, 0x6761_696e, 0, 1);
pub const GAIN_CONTROLLER_CID: Uid = Uid::from_u32s(0x6170_6b64, 0x6761_696e, 0, 2);
pub const DELAY_CID: Uid = Uid::from_u32s(0x6170_6b64, 0x6465_6c79, 0, 1);
pub const DELAY_CONTROLLER_CID: Uid = Uid::from_u32s(0x6170_6b64, 0x6465_6c79, 0, 2);
pub const FILTER_CID: Uid = Uid::from_u32s(0x6170_6b64, 0x6669_6c74, 0, 1);
pub const FILTER_CONTROLLER_CID: Uid = Uid::from_u32s(0x6170_6b64, 0x6669_6c74, 0, 2);
pub const SYNTH_CID: Uid = Uid::from_u32s(0x6170_6b64, 0x7379_6e74, 0, 1);
pub const SYNTH_CONTROLLER_CID: Uid = Uid::from_u32s(0x6170_6b64, 0x7379_6e74, 0, 2);
pub const METER_CID: Uid = Uid::from_u32s(0x6170_6b64, 0x6d65_7472, 0, 1);
pub const METER_CONTROLLER_CID: Uid = Uid::from_u32s(0x6170_6b64, 0x6d65_7472, 0, 2);

struct DemoClass {
    processor: Uid,
    controller: Uid,
    name: &'static str,
    sub_categories: &'static str,
    create_processor: fn(Uid) -> Box<dyn AudioProcessor>,
    create_controller: fn(HostContext) -> Box<dyn EditController>,
}

fn processor<D: Dsp>(controller: Uid) -> Box<dyn AudioProcessor> {
    Box::new(DemoProcessor::<D>::new(controller))
}

fn controller<D: Dsp>(host: HostContext) -> Box<dyn EditController> {
    Box::new(DemoController::new::<D>(host))
}

static CLASSES: [DemoClass; 5] = [
    DemoClass {
        processor: GAIN_CID,
        controller: GAIN_CONTROLLER_CID,
        name: "Demo Gain",
        sub_categories: "Fx|Dynamics",
        create_processor: processor::<gain::GainDsp>,
        create_controller: controller::<gain::GainDsp>,
    },
    DemoClass {
        processor: DELAY_CID,
        controller: DELAY_CONTROLLER_CID,
        name: "Demo Delay",
        sub_categories: "Fx|Delay",
        create_processor: processor::<delay::DelayDsp>,
        create_controller: controller::<delay::DelayDsp>,
    },
    DemoClass {
        processor: FILTER_CID,
        controller: FILTER_CONTROLLER_CID,
        name: "Demo Filter",
        sub_categories: "Fx|Filter",
        create_processor: processor::<filter::FilterDsp>,
        create_controller: controller::<filter::FilterDsp>,
    },
    DemoClass {
        processor: SYNTH_CID,
        controller: SYNTH_CONTROLLER_CID,
        name: "Demo Synth",
        sub_categories: "Instrument|Synth",
        create_processor: processor::<synth::SynthDsp>,
        create_controller: controller::<synth::SynthDsp>,
    },
    DemoClass {
        processor: METER_CID,
        controller: METER_CONTROLLER_CID,
        name: "Demo Meter",
        sub_categories: "Fx|Analyzer",
        create_processor: processor::<meter::MeterDsp>,
        create_controller: controller::<meter::MeterDsp>,
    },
];

/// Factory exporting every demo class.
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoFactory;

impl PluginFactory for DemoFactory {
    fn factory_info(&self) -> FactoryInfo {
        FactoryInfo {
            vendor: VENDOR.into(),
            url: String::new(),
            email: String::new(),
        }
    }

    fn classes(&self) -> Vec<ClassInfo> {
        CLASSES
            .iter()
            .flat_map(|class| {
                [
                    ClassInfo::processor(class.processor, class.name)
                        .with_vendor(VENDOR)
                        .with_version(env!("CARGO_PKG_VERSION"))
                        .with_sub_categories(class.sub_categories),
                    ClassInfo::controller(class.controller, format!("{} Controller", class.name))
                        .with_vendor(VENDOR)
                        .with_version(env!("CARGO_PKG_VERSION")),
                ]
            })
            .collect()
    }

    fn create_processor(
        &self,
        cid: &Uid,
        _host: HostContext,
    ) -> Result<Box<dyn AudioProcessor>, PluginError> {
        match CLASSES.iter().find(|class| class.processor == *cid) {
            Some(class) => Ok((class.create_processor)(class.controller)),
            None => {
                log::warn!("no demo processor with class id {cid}");
                Err(PluginError::invalid_argument(format!("unknown processor class {cid}")))
            }
        }
    }

    fn create_controller(
        &self,
        cid: &Uid,
        host: HostContext,
    ) -> Result<Box<dyn EditController>, PluginError> {
        match CLASSES.iter().find(|class| class.controller == *cid) {
            Some(class) => Ok((class.create_controller)(host)),
            None => {
                log::warn!("no demo controller with class id {cid}");
                Err(PluginError::invalid_argument(format!("unknown controller class {cid}")))
            }
        }
    }
}

audioplug_export!(DemoFactory);
