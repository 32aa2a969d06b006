use std::fs;
use std::sync::Arc;

use docspace_rs::model::core_config::Config;
use docspace_rs::service::logging::LOG_FILE;
use docspace_rs::DocSpace;
use test_utils::*;

#[tokio::test]
async fn sessions_log_to_their_writeable_path() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        writeable_path: dir.path().to_str().unwrap().to_string(),
        logs: true,
        ..test_config()
    };
    let remote = InMemoryRemote::default();
    remote.add_space("engineering", &[]);

    let ds = DocSpace::init(config, Arc::new(remote.clone())).await.unwrap();
    ds.refresh_spaces().await.unwrap();

    let log = fs::read_to_string(dir.path().join(LOG_FILE)).unwrap();
    assert!(log.contains("spaces fetched"));
}
