//! The designer proxy launching the real worker binary

use puppet_core::config::PuppetConfig;
use puppet_core::protocol::{Command, CreateSceneCommand, InstanceContainer};
use puppet_core::proxy::{ConnectionExit, HandlerRegistry, NodeInstanceProxy};
use puppet_core::server::PuppetMode;
use std::path::PathBuf;
use tokio::sync::mpsc;

#[tokio::test]
async fn test_launch_serves_and_shuts_down() {
    let mut config = PuppetConfig::default();
    config.supervisor.worker_path = Some(PathBuf::from(env!("CARGO_BIN_EXE_qmlpuppet")));

    let (tx, mut responses) = mpsc::unbounded_channel();
    let (proxy, _events) =
        NodeInstanceProxy::launch(PuppetMode::Editor, HandlerRegistry::forward_all(tx), &config)
            .await
            .unwrap();
    assert!(proxy.supervisor().and_then(|s| s.pid()).is_some());

    proxy
        .send_command(CreateSceneCommand::new(vec![InstanceContainer::new(
            0,
            "QtQuick.Item",
            None,
        )]))
        .unwrap();
    proxy.handshake().await.unwrap();
    let mut created = false;
    while let Ok(command) = responses.try_recv() {
        created |= command == Command::SceneCreated;
    }
    assert!(created);

    assert_eq!(proxy.shutdown().await.unwrap(), ConnectionExit::Shutdown);
}
