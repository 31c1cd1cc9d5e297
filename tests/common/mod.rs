#![allow(dead_code)]

use std::sync::Arc;

use backstage::analysis::AnalysisEngine;
use backstage::backend::EventBus;
use backstage::fs::{FileSystem, MockFileSystem};
use backstage::import::ImportController;
use backstage::types::ProjectItems;
use backstage_test_utils::fakes::{FakeAnalysisBackend, FakeImportGateway, FakeIndex};

pub use backstage_test_utils::{init_tracing, with_timeout};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub const PROJECT: &str = "/projects/demo.kspd";
pub const SCRIPT: &str = "/scripts/demo.fountain";

pub struct ImportFixture {
    pub controller: ImportController<FakeImportGateway>,
    pub gateway: FakeImportGateway,
    pub bus: EventBus,
}

pub fn import_fixture() -> ImportFixture {
    let bus = EventBus::new();
    let gateway = FakeImportGateway::new(bus.clone());
    let controller = ImportController::new(gateway.clone(), bus.clone());
    ImportFixture {
        controller,
        gateway,
        bus,
    }
}

/// Open the wizard and walk it to the confirm step.
pub async fn import_at_confirm(title: &str) -> ImportFixture {
    let mut fx = import_fixture();
    fx.controller.open().await;
    fx.controller
        .submit_file(SCRIPT)
        .await
        .expect("file accepted");
    fx.controller
        .submit_title(title)
        .await
        .expect("title accepted");
    fx
}

pub struct EngineFixture {
    pub engine: AnalysisEngine<FakeAnalysisBackend, FakeIndex>,
    pub backend: FakeAnalysisBackend,
    pub index: FakeIndex,
    pub bus: EventBus,
}

/// Engine over fakes. The backend writes successful results into the index.
pub fn engine_fixture(items: ProjectItems) -> EngineFixture {
    let bus = EventBus::new();
    let backend = FakeAnalysisBackend::new(items);
    let index = FakeIndex::new();
    backend.writes_to(index.clone());

    let mock = MockFileSystem::new();
    mock.add_dir(PROJECT);
    let fs: Arc<dyn FileSystem> = Arc::new(mock);

    let engine = AnalysisEngine::new(backend.clone(), index.clone(), bus.clone(), fs);
    EngineFixture {
        engine,
        backend,
        index,
        bus,
    }
}
