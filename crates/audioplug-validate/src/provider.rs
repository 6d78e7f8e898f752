//! Creates one processor/controller pair from a factory and wires it to the
//! validator's notifier and call tracker.

use std::sync::Arc;

use audioplug_sdk::{
    ClassCategory, ClassInfo, EditController, Event, OutputParameterChanges, ParameterQueue,
    PluginError, PluginFactory, ProcessContext, Uid,
};
use thiserror::Error;

use crate::buffers::ProcessBuffers;
use crate::contract::{CallTracker, ControllerDeclarations};
use crate::finding::FindingLog;
use crate::handler::RecordingHandler;
use crate::lifecycle::{DriverError, LifecycleController};

/// Capacity of the output parameter sink handed to every process call.
pub const OUTPUT_CHANGE_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("class {0} is not exported by the factory")]
    UnknownClass(Uid),
    #[error("class {0} is not a processor")]
    NotAProcessor(Uid),
    #[error("failed to create {cid}: {source}")]
    Create {
        cid: Uid,
        #[source]
        source: PluginError,
    },
    #[error("controller {cid} failed to initialize: {source}")]
    ControllerInit {
        cid: Uid,
        #[source]
        source: PluginError,
    },
}

pub struct PluginProvider<'f> {
    factory: &'f dyn PluginFactory,
    class: ClassInfo,
}

impl<'f> PluginProvider<'f> {
    pub fn new(factory: &'f dyn PluginFactory, cid: &Uid) -> Result<Self, ProviderError> {
        let class = factory
            .class_info(cid)
            .ok_or(ProviderError::UnknownClass(*cid))?;
        if class.category != ClassCategory::Processor {
            return Err(ProviderError::NotAProcessor(*cid));
        }
        Ok(Self { factory, class })
    }

    pub fn class(&self) -> &ClassInfo {
        &self.class
    }

    pub fn factory(&self) -> &'f dyn PluginFactory {
        self.factory
    }

    /// Creates a fresh processor and, when it names one, its controller.
    /// The processor stays in `Created`; the controller is initialized.
    pub fn create(&self, log: &FindingLog) -> Result<ProvidedPlugin, ProviderError> {
        let cid = self.class.cid;
        let calls = CallTracker::new(log.clone());
        let handler = Arc::new(RecordingHandler::new(log.clone(), calls.clone()));

        let processor = self
            .factory
            .create_processor(&cid, handler.clone())
            .map_err(|source| ProviderError::Create { cid, source })?;

        let controller = match processor.controller_class_id() {
            Some(controller_cid) => {
                match self.factory.create_controller(&controller_cid, handler.clone()) {
                    Ok(mut controller) => {
                        controller
                            .initialize()
                            .map_err(|source| ProviderError::ControllerInit {
                                cid: controller_cid,
                                source,
                            })?;
                        Some(controller)
                    }
                    Err(err) => {
                        tracing::warn!(%cid, %controller_cid, error = %err, "controller unavailable");
                        None
                    }
                }
            }
            None => None,
        };

        let mut driver = LifecycleController::with_tracker(processor, log.clone(), calls);
        if let Some(controller) = controller.as_deref() {
            let declarations = ControllerDeclarations::query(controller, driver.checker().layout());
            driver.checker_mut().set_declarations(declarations);
        }

        Ok(ProvidedPlugin {
            driver,
            controller,
            handler,
            output_changes: OutputParameterChanges::with_capacity(OUTPUT_CHANGE_CAPACITY),
        })
    }
}

/// Everything that travels with one process call besides the audio.
#[derive(Debug, Clone, Copy, Default)]
pub struct Block<'a> {
    pub num_samples: usize,
    pub events: &'a [Event],
    pub params: &'a [ParameterQueue],
    pub context: Option<&'a ProcessContext>,
}

impl<'a> Block<'a> {
    pub fn new(num_samples: usize) -> Self {
        Self {
            num_samples,
            ..Self::default()
        }
    }

    pub fn with_events(mut self, events: &'a [Event]) -> Self {
        self.events = events;
        self
    }

    pub fn with_params(mut self, params: &'a [ParameterQueue]) -> Self {
        self.params = params;
        self
    }

    pub fn with_context(mut self, context: &'a ProcessContext) -> Self {
        self.context = Some(context);
        self
    }
}

pub struct ProvidedPlugin {
    pub driver: LifecycleController,
    pub controller: Option<Box<dyn EditController>>,
    pub handler: Arc<RecordingHandler>,
    output_changes: OutputParameterChanges,
}

impl ProvidedPlugin {
    pub fn buffers(&self, max_frames: usize) -> ProcessBuffers {
        let sample_size = self
            .driver
            .checker()
            .setup()
            .map(|setup| setup.sample_size)
            .unwrap_or_default();
        ProcessBuffers::new(self.driver.checker().layout(), sample_size, max_frames)
    }

    pub fn process_block(
        &mut self,
        buffers: &mut ProcessBuffers,
        block: Block<'_>,
    ) -> Result<(), DriverError> {
        self.output_changes.reset(OUTPUT_CHANGE_CAPACITY);
        let mut data = buffers.data(block.num_samples);
        data.input_events = block.events;
        data.input_parameter_changes = block.params;
        data.context = block.context;
        data.output_parameter_changes = Some(&mut self.output_changes);
        self.driver.process(&mut data)
    }

    /// Output parameter changes reported by the last process call.
    pub fn output_changes(&self) -> &OutputParameterChanges {
        &self.output_changes
    }
}

impl Drop for ProvidedPlugin {
    fn drop(&mut self) {
        if let Err(err) = self.driver.shutdown() {
            tracing::debug!(error = %err, "shutdown stopped early");
        }
        if let Some(controller) = self.controller.as_mut() {
            if let Err(err) = controller.terminate() {
                tracing::debug!(error = %err, "controller refused terminate");
            }
        }
        self.handler.finish();
    }
}
