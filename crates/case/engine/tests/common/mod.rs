//! Shared wiring for integration tests.
#![allow(dead_code)]

use case_engine::mocks::RecordingEventListener;
use case_engine::{CaseEngine, EngineConfiguration, EngineSettings};
use case_store::{InMemoryDefinitionStore, InMemoryInstanceStore};
use case_types::Definition;
use std::sync::Arc;

pub struct Harness {
    pub engine: CaseEngine,
    pub definitions: Arc<InMemoryDefinitionStore>,
    pub instances: Arc<InMemoryInstanceStore>,
    pub listener: Arc<RecordingEventListener>,
}

pub fn settings() -> EngineSettings {
    EngineSettings::default().with_retry(3, 0)
}

pub fn harness(definitions: Vec<Definition>) -> Harness {
    harness_with(definitions, |config| config)
}

pub fn harness_with(
    definitions: Vec<Definition>,
    configure: impl FnOnce(EngineConfiguration) -> EngineConfiguration,
) -> Harness {
    let definitions = Arc::new(
        InMemoryDefinitionStore::with_definitions(definitions).expect("definitions are unique"),
    );
    let instances = Arc::new(InMemoryInstanceStore::new());
    let listener = Arc::new(RecordingEventListener::new());

    let config = EngineConfiguration::new(definitions.clone(), instances.clone())
        .with_settings(settings())
        .with_listener(listener.clone());

    Harness {
        engine: CaseEngine::new(configure(config)),
        definitions,
        instances,
        listener,
    }
}
