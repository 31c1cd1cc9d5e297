use std::error::Error;
use std::sync::Arc;

use backstage::backend::index::kind_for_id;
use backstage::backend::{FsIndexClient, IndexClient};
use backstage::fs::{MockFileSystem, RealFileSystem};
use backstage::types::{AnalysisIndex, ItemKind};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn ids_are_classified_by_prefix() {
    assert_eq!(kind_for_id("scn_001"), Some(ItemKind::Scene));
    assert_eq!(kind_for_id("chr_anna"), Some(ItemKind::Character));
    assert_eq!(kind_for_id("loc_kitchen"), Some(ItemKind::Location));
    assert_eq!(kind_for_id("summary"), None);
}

#[tokio::test]
async fn scan_reads_json_stems_from_mock_project() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("/p/demo.kspd/metadata/analysis/scn_001.json");
    fs.add_file("/p/demo.kspd/metadata/analysis/chr_anna.json");
    fs.add_file("/p/demo.kspd/metadata/analysis/loc_kitchen.json");
    fs.add_file("/p/demo.kspd/metadata/analysis/summary.json");
    fs.add_file("/p/demo.kspd/metadata/analysis/scn_002.tmp");
    fs.add_file("/p/demo.kspd/metadata/analysis/nested/scn_003.json");

    let client = FsIndexClient::new(Arc::new(fs), "metadata/analysis");
    let index = client.scan("/p/demo.kspd".to_string()).await?;

    assert_eq!(index.scenes.iter().collect::<Vec<_>>(), ["scn_001"]);
    assert_eq!(index.characters.iter().collect::<Vec<_>>(), ["chr_anna"]);
    assert_eq!(index.locations.iter().collect::<Vec<_>>(), ["loc_kitchen"]);
    Ok(())
}

#[tokio::test]
async fn missing_index_directory_is_empty() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_dir("/p/fresh.kspd");

    let client = FsIndexClient::new(Arc::new(fs), "metadata/analysis");
    let index = client.scan("/p/fresh.kspd".to_string()).await?;

    assert_eq!(index, AnalysisIndex::default());
    Ok(())
}

#[tokio::test]
async fn scan_real_project_directory() -> TestResult {
    let project = tempfile::tempdir()?;
    let analysis = project.path().join("metadata").join("analysis");
    std::fs::create_dir_all(&analysis)?;
    std::fs::write(analysis.join("scn_010.json"), "{}")?;
    std::fs::write(analysis.join("loc_roof.json"), "{}")?;

    let client = FsIndexClient::new(Arc::new(RealFileSystem), "metadata/analysis");
    let index = client.scan(project.path().to_string_lossy().into_owned()).await?;

    assert!(index.contains(ItemKind::Scene, "scn_010"));
    assert!(index.contains(ItemKind::Location, "loc_roof"));
    assert!(index.characters.is_empty());
    Ok(())
}
