//! Designer and worker over a real loopback socket
//!
//! The worker side runs the server loop against an in-memory scene, the
//! designer side is a proxy attached to the accepted connection.

use puppet_core::config::PuppetConfig;
use puppet_core::protocol::{
    ChangeValuesCommand, Command, CreateSceneCommand, InstanceContainer, PropertyValue,
    PropertyValueContainer, RemoveInstancesCommand,
};
use puppet_core::proxy::{ConnectionExit, HandlerRegistry, NodeInstanceProxy, ProxyEvent};
use puppet_core::server::{NodeInstanceServer, PuppetMode, ServerExit, run_server};
use puppet_core::spy::MemoryScene;
use puppet_core::transport;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn spawn_worker(address: String, mode: PuppetMode) -> JoinHandle<ServerExit> {
    tokio::spawn(async move {
        let stream = transport::connect(&address).await.unwrap();
        let config = PuppetConfig::default();
        let backend = Arc::new(MemoryScene::new(config.render));
        let (mut server, mut outbound) = NodeInstanceServer::new(backend, mode, config.spy);
        run_server(stream, &mut server, &mut outbound, &config, CancellationToken::new())
            .await
            .unwrap()
    })
}

async fn session(
    mode: PuppetMode,
) -> (
    NodeInstanceProxy,
    UnboundedReceiver<ProxyEvent>,
    UnboundedReceiver<Command>,
    JoinHandle<ServerExit>,
) {
    init_logging();
    let listener = transport::bind_loopback().await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let worker = spawn_worker(address, mode);
    let stream = transport::accept_worker(&listener, Duration::from_secs(5))
        .await
        .unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    let (proxy, events) =
        NodeInstanceProxy::attach(stream, HandlerRegistry::forward_all(tx), &PuppetConfig::default())
            .await
            .unwrap();
    (proxy, events, rx, worker)
}

fn drain(rx: &mut UnboundedReceiver<Command>) -> Vec<Command> {
    let mut out = Vec::new();
    while let Ok(command) = rx.try_recv() {
        if command != Command::PuppetAlive {
            out.push(command);
        }
    }
    out
}

fn scene() -> CreateSceneCommand {
    CreateSceneCommand::new(vec![
        InstanceContainer::new(0, "QtQuick.Item", None),
        InstanceContainer::new(1, "QtQuick.Rectangle", Some(0)),
        InstanceContainer::new(2, "QtQuick.Text", Some(1)),
    ])
}

#[tokio::test]
async fn test_scene_round_trip_over_loopback() {
    let (proxy, mut events, mut responses, worker) = session(PuppetMode::Editor).await;

    proxy.send_command(scene()).unwrap();
    proxy.handshake().await.unwrap();
    let received = drain(&mut responses);
    assert_eq!(received.last(), Some(&Command::SceneCreated));

    proxy
        .send_command(ChangeValuesCommand::new(vec![PropertyValueContainer::new(
            2,
            "font.pixelSize",
            PropertyValue::Int(18),
        )]))
        .unwrap();
    proxy.handshake().await.unwrap();
    let changed: Vec<_> = drain(&mut responses)
        .into_iter()
        .filter_map(|command| match command {
            Command::ValuesChanged(cmd) => Some(cmd),
            _ => None,
        })
        .collect();
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].values()[0].name(), "font.pixelSize");
    assert_eq!(changed[0].values()[0].value(), &PropertyValue::Int(18));

    proxy.send_command(RemoveInstancesCommand::new(vec![2, 42])).unwrap();
    proxy.handshake().await.unwrap();

    let exit = proxy.shutdown().await.unwrap();
    assert_eq!(exit, ConnectionExit::Shutdown);
    assert_eq!(worker.await.unwrap(), ServerExit::EndPuppet);

    assert_eq!(events.recv().await, Some(ProxyEvent::Connected));
    assert_eq!(
        events.recv().await,
        Some(ProxyEvent::Disconnected(ConnectionExit::Shutdown))
    );
}

#[tokio::test]
async fn test_render_mode_streams_previews() {
    let (proxy, _events, mut responses, worker) = session(PuppetMode::Render).await;

    proxy.send_command(scene()).unwrap();
    proxy.handshake().await.unwrap();
    let previews: Vec<_> = drain(&mut responses)
        .into_iter()
        .filter_map(|command| match command {
            Command::StatePreviewImageChanged(cmd) => Some(cmd),
            _ => None,
        })
        .collect();
    assert!(!previews.is_empty());

    proxy.shutdown().await.unwrap();
    assert_eq!(worker.await.unwrap(), ServerExit::EndPuppet);
}

#[tokio::test]
async fn test_large_frames_flow_both_ways() {
    init_logging();
    let (designer_end, worker_end) = tokio::io::duplex(64 * 1024);
    let worker = tokio::spawn(async move {
        let config = PuppetConfig::default();
        let backend = Arc::new(MemoryScene::new(config.render));
        let (mut server, mut outbound) =
            NodeInstanceServer::new(backend, PuppetMode::Editor, config.spy);
        run_server(worker_end, &mut server, &mut outbound, &config, CancellationToken::new())
            .await
            .unwrap()
    });
    let (tx, mut responses) = mpsc::unbounded_channel();
    let (proxy, _events) = NodeInstanceProxy::attach(
        designer_end,
        HandlerRegistry::forward_all(tx),
        &PuppetConfig::default(),
    )
    .await
    .unwrap();

    // Each value is far larger than the pipe, so both ends must keep
    // reading while their own writes are pending.
    let sizes = [200_000, 2 * 1024 * 1024, 200_000];
    proxy.send_command(scene()).unwrap();
    for size in sizes {
        proxy
            .send_command(ChangeValuesCommand::new(vec![PropertyValueContainer::new(
                2,
                "text",
                PropertyValue::from("x".repeat(size)),
            )]))
            .unwrap();
    }

    let mut echoed = Vec::new();
    while echoed.len() < sizes.len() {
        let command = tokio::time::timeout(Duration::from_secs(30), responses.recv())
            .await
            .expect("large values were not echoed")
            .unwrap();
        if let Command::ValuesChanged(changed) = command {
            let value = changed.values()[0].value();
            echoed.push(value.as_str().map_or(0, str::len));
        }
    }
    assert_eq!(echoed, sizes);

    assert_eq!(proxy.shutdown().await.unwrap(), ConnectionExit::Shutdown);
    assert_eq!(worker.await.unwrap(), ServerExit::EndPuppet);
}
