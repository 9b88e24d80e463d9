//! Worker side of the node-instance channel
//!
//! [`NodeInstanceServer`] owns the instance table and applies designer
//! commands to a [`crate::spy::SceneBackend`]. [`run_server`] connects it to
//! a byte stream, and [`replay_captured_commands`] drives it from a capture
//! file instead.

mod mode;
mod node_instance_server;
mod replay;
mod run;

pub use mode::PuppetMode;
pub use node_instance_server::{NodeInstanceServer, ServerFlow};
pub use replay::{ReplayReport, replay_captured_commands};
pub use run::{ServerExit, run_server};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureWriter;
    use crate::config::{PuppetConfig, SpyConfig};
    use crate::protocol::*;
    use crate::error::PuppetError;
    use crate::spy::{
        ChangeCallback, MemoryScene, ObjectId, ObjectModel, PropertyInfo, SceneBackend, SceneError,
        SubscriptionId,
    };
    use futures::{SinkExt, StreamExt};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio_util::codec::Framed;
    use tokio_util::sync::CancellationToken;

    fn server(mode: PuppetMode) -> (NodeInstanceServer<MemoryScene>, UnboundedReceiver<Command>) {
        NodeInstanceServer::new(Arc::new(MemoryScene::default()), mode, SpyConfig::default())
    }

    fn drain(rx: &mut UnboundedReceiver<Command>) -> Vec<Command> {
        let mut out = Vec::new();
        while let Ok(command) = rx.try_recv() {
            out.push(command);
        }
        out
    }

    fn scene() -> Command {
        CreateSceneCommand::new(vec![
            InstanceContainer::new(0, "QtQuick.Item", None),
            InstanceContainer::new(2, "QtQuick.Text", Some(0)),
            InstanceContainer::new(1, "QtQuick.Rectangle", Some(0)),
        ])
        .into()
    }

    #[test]
    fn test_create_scene_response_sequence() {
        let (mut server, mut rx) = server(PuppetMode::Editor);
        assert_eq!(server.handle(scene()).unwrap(), ServerFlow::Continue);

        let kinds: Vec<_> = drain(&mut rx).iter().map(Command::kind).collect();
        assert_eq!(
            kinds,
            vec![
                CommandKind::InformationChanged,
                CommandKind::ChildrenChanged,
                CommandKind::ComponentCompleted,
                CommandKind::SceneCreated,
            ]
        );
        assert_eq!(server.instances().ids(), vec![0, 1, 2]);
        assert_eq!(server.instances().children_of(0), vec![1, 2]);
    }

    #[test]
    fn test_children_changed_lists_sorted_children() {
        let (mut server, mut rx) = server(PuppetMode::Editor);
        server.handle(scene()).unwrap();
        let children = drain(&mut rx)
            .into_iter()
            .find_map(|c| match c {
                Command::ChildrenChanged(c) => Some(c),
                _ => None,
            })
            .unwrap();
        assert_eq!(children.parent_instance_id(), 0);
        assert_eq!(children.children(), &[1, 2]);
    }

    #[test]
    fn test_render_mode_sends_previews() {
        let (mut server, mut rx) = server(PuppetMode::Render);
        server.handle(scene()).unwrap();
        let last = drain(&mut rx).pop().unwrap();
        let Command::StatePreviewImageChanged(images) = last else {
            panic!("expected previews, got {}", last);
        };
        let ids: Vec<_> = images.images().iter().map(|i| i.instance_id()).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_change_values_reports_through_spy() {
        let (mut server, mut rx) = server(PuppetMode::Editor);
        server.handle(scene()).unwrap();
        drain(&mut rx);

        server
            .handle(
                ChangeValuesCommand::new(vec![
                    PropertyValueContainer::new(2, "text", PropertyValue::from("hello")),
                    PropertyValueContainer::new(2, "font.pixelSize", PropertyValue::Int(20)),
                    PropertyValueContainer::new(42, "x", PropertyValue::Double(1.0)),
                ])
                .into(),
            )
            .unwrap();

        let changed: Vec<_> = drain(&mut rx)
            .into_iter()
            .map(|c| match c {
                Command::ValuesChanged(v) => v.values()[0].clone(),
                other => panic!("unexpected {}", other),
            })
            .collect();
        assert_eq!(
            changed,
            vec![
                PropertyValueContainer::new(2, "text", PropertyValue::from("hello")),
                PropertyValueContainer::new(2, "font.pixelSize", PropertyValue::Int(20)),
            ]
        );
    }

    #[test]
    fn test_refused_write_becomes_warning() {
        let (mut server, mut rx) = server(PuppetMode::Editor);
        server.handle(scene()).unwrap();
        drain(&mut rx);
        server
            .handle(
                ChangeValuesCommand::new(vec![PropertyValueContainer::new(
                    2,
                    "font",
                    PropertyValue::Int(1),
                )])
                .into(),
            )
            .unwrap();
        let out = drain(&mut rx);
        let Command::DebugOutput(output) = &out[0] else {
            panic!("expected debug output");
        };
        assert_eq!(output.output_type(), DebugOutputType::Warning);
        assert_eq!(output.instance_ids(), &[2]);
    }

    #[test]
    fn test_removed_instances_are_tolerated() {
        let (mut server, mut rx) = server(PuppetMode::Editor);
        server.handle(scene()).unwrap();
        server
            .handle(SelectionCommand::new(vec![2, 1, 77]).into())
            .unwrap();
        assert_eq!(server.selection(), &[1, 2]);

        server
            .handle(RemoveInstancesCommand::new(vec![2, 2, 99]).into())
            .unwrap();
        assert!(!server.instances().contains(2));
        assert_eq!(server.selection(), &[1]);
        drain(&mut rx);

        server
            .handle(
                ChangeValuesCommand::new(vec![PropertyValueContainer::new(
                    2,
                    "text",
                    PropertyValue::from("late"),
                )])
                .into(),
            )
            .unwrap();
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_remove_properties_resets_value() {
        let (mut server, mut rx) = server(PuppetMode::Editor);
        server.handle(scene()).unwrap();
        server
            .handle(
                ChangeValuesCommand::new(vec![PropertyValueContainer::new(
                    1,
                    "radius",
                    PropertyValue::Double(4.0),
                )])
                .into(),
            )
            .unwrap();
        drain(&mut rx);
        server
            .handle(
                RemovePropertiesCommand::new(vec![PropertyAbstractContainer::new(1, "radius", "")])
                    .into(),
            )
            .unwrap();
        let Command::ValuesChanged(changed) = drain(&mut rx).remove(0) else {
            panic!("expected values changed");
        };
        assert_eq!(changed.values()[0].value(), &PropertyValue::Double(0.0));
    }

    #[test]
    fn test_token_is_echoed_sorted() {
        let (mut server, mut rx) = server(PuppetMode::Editor);
        server
            .handle(TokenCommand::new("build", 7, vec![9, 3, 5]).into())
            .unwrap();
        assert_eq!(
            drain(&mut rx),
            vec![Command::from(TokenCommand::new("build", 7, vec![3, 5, 9]))]
        );
    }

    #[test]
    fn test_capture_all_and_subset() {
        let (mut server, mut rx) = server(PuppetMode::Editor);
        server.handle(scene()).unwrap();
        drain(&mut rx);

        server.handle(CaptureCommand::new(1, vec![]).into()).unwrap();
        let Command::StatePreviewImageChanged(all) = drain(&mut rx).remove(0) else {
            panic!("expected previews");
        };
        assert_eq!(all.images().len(), 3);

        server
            .handle(CaptureCommand::new(2, vec![2, 1, 50]).into())
            .unwrap();
        let Command::StatePreviewImageChanged(subset) = drain(&mut rx).remove(0) else {
            panic!("expected previews");
        };
        let ids: Vec<_> = subset.images().iter().map(|i| i.instance_id()).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_input_reaches_backend() {
        let (mut server, _rx) = server(PuppetMode::Editor);
        let event = InputEventCommand::key(InputEventType::KeyPress, 0x41, 0);
        server.handle(event.into()).unwrap();
        server
            .handle(
                View3DActionCommand::new(View3DActionType::ShowGrid, PropertyValue::Bool(false))
                    .into(),
            )
            .unwrap();
        assert_eq!(server.backend().received_input(), vec![event]);
        assert_eq!(server.backend().received_view_actions().len(), 1);
    }

    #[test]
    fn test_unexpected_and_end_commands() {
        let (mut server, mut rx) = server(PuppetMode::Editor);
        server.handle(Command::PuppetAlive).unwrap();
        server.report_unknown(4242);
        let out = drain(&mut rx);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|c| c.kind() == CommandKind::DebugOutput));
        assert_eq!(server.handle(Command::EndPuppet).unwrap(), ServerFlow::Stop);
    }

    #[test]
    fn test_duplicate_instance_id_is_reported() {
        let (mut server, mut rx) = server(PuppetMode::Editor);
        server.handle(scene()).unwrap();
        drain(&mut rx);
        server
            .handle(CreateSceneCommand::new(vec![InstanceContainer::new(1, "QtQuick.Item", None)]).into())
            .unwrap();
        let out = drain(&mut rx);
        assert_eq!(out[0].kind(), CommandKind::DebugOutput);
        assert_eq!(out[1], Command::SceneCreated);
    }

    /// Refuses every subscription on text items
    #[derive(Default)]
    struct TextRefusingScene(MemoryScene);

    impl ObjectModel for TextRefusingScene {
        fn properties(&self, object: ObjectId) -> Vec<PropertyInfo> {
            self.0.properties(object)
        }

        fn subscribe(
            &self,
            object: ObjectId,
            property: &str,
            callback: ChangeCallback,
        ) -> Option<SubscriptionId> {
            if self.0.type_name(object).as_deref() == Some("QtQuick.Text") {
                return None;
            }
            self.0.subscribe(object, property, callback)
        }

        fn unsubscribe(&self, subscription: SubscriptionId) {
            self.0.unsubscribe(subscription)
        }
    }

    impl SceneBackend for TextRefusingScene {
        fn create_object(&self, type_name: &str) -> ObjectId {
            self.0.create_object(type_name)
        }

        fn destroy_object(&self, object: ObjectId) {
            self.0.destroy_object(object)
        }

        fn type_name(&self, object: ObjectId) -> Option<String> {
            self.0.type_name(object)
        }

        fn set_parent(&self, object: ObjectId, parent: Option<ObjectId>) -> Result<(), SceneError> {
            self.0.set_parent(object, parent)
        }

        fn write_property(
            &self,
            object: ObjectId,
            path: &str,
            value: PropertyValue,
        ) -> Result<(), SceneError> {
            self.0.write_property(object, path, value)
        }

        fn reset_property(&self, object: ObjectId, path: &str) -> Result<(), SceneError> {
            self.0.reset_property(object, path)
        }

        fn render_preview(&self, object: ObjectId) -> Option<bytes::Bytes> {
            self.0.render_preview(object)
        }

        fn handle_input(&self, event: &InputEventCommand) {
            self.0.handle_input(event)
        }

        fn handle_view_action(&self, action: &View3DActionCommand) {
            self.0.handle_view_action(action)
        }
    }

    #[test]
    fn test_failed_attach_destroys_unattached_objects() {
        let (mut server, _rx) = NodeInstanceServer::new(
            Arc::new(TextRefusingScene::default()),
            PuppetMode::Editor,
            SpyConfig::default(),
        );
        let err = server.handle(scene()).unwrap_err();
        assert!(matches!(err, PuppetError::Spy(_)), "{}", err);

        // Only the item attached before the text survives.
        assert_eq!(server.instances().ids(), vec![0]);
        let reference = MemoryScene::default();
        reference.create_object("QtQuick.Item");
        assert_eq!(server.backend().0.object_count(), reference.object_count());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_server_over_duplex() {
        let (client, worker) = tokio::io::duplex(64 * 1024);
        let config = PuppetConfig::default();
        let (mut server, mut outbound) = server(PuppetMode::Editor);
        let handle = tokio::spawn(async move {
            run_server(
                worker,
                &mut server,
                &mut outbound,
                &config,
                CancellationToken::new(),
            )
            .await
        });

        let mut designer = Framed::new(client, FrameCodec);
        let first = designer.next().await.unwrap().unwrap();
        assert_eq!(first.decode().unwrap(), Some(Command::PuppetAlive));

        designer
            .send(&Command::from(SynchronizeCommand::new(5)))
            .await
            .unwrap();
        let echo = designer.next().await.unwrap().unwrap();
        assert_eq!(
            echo.decode().unwrap(),
            Some(SynchronizeCommand::new(5).into())
        );

        tokio::time::advance(Duration::from_secs(2)).await;
        let beat = designer.next().await.unwrap().unwrap();
        assert_eq!(beat.known_kind(), Some(CommandKind::PuppetAlive));

        designer.send(&Command::EndPuppet).await.unwrap();
        assert_eq!(handle.await.unwrap().unwrap(), ServerExit::EndPuppet);
    }

    #[tokio::test]
    async fn test_run_server_ends_on_disconnect() {
        let (client, worker) = tokio::io::duplex(1024);
        let config = PuppetConfig::default();
        let (mut server, mut outbound) = server(PuppetMode::Editor);
        drop(client);
        let exit = run_server(
            worker,
            &mut server,
            &mut outbound,
            &config,
            CancellationToken::new(),
        )
        .await;
        assert_eq!(exit.unwrap(), ServerExit::Disconnected);
    }

    #[tokio::test]
    async fn test_replay_against_control() {
        let dir = TempDir::new().unwrap();
        let commands = dir.path().join("commands.bin");
        let mut writer = CaptureWriter::create(&commands).await.unwrap();
        for command in [
            scene(),
            ChangeValuesCommand::new(vec![PropertyValueContainer::new(
                0,
                "width",
                PropertyValue::Double(640.0),
            )])
            .into(),
            TokenCommand::new("t", 1, vec![2, 0]).into(),
            Command::EndPuppet,
            SelectionCommand::new(vec![0]).into(),
        ] {
            writer.append(&RawFrame::from_command(&command)).await.unwrap();
        }
        writer.close().await.unwrap();

        let config = PuppetConfig::default();
        let first = replay_captured_commands(
            Arc::new(MemoryScene::default()),
            &commands,
            None,
            &config,
        )
        .await
        .unwrap();
        assert_eq!(first.commands, 4);
        assert!(first.matches_control());

        let control = dir.path().join("control.bin");
        let mut writer = CaptureWriter::create(&control).await.unwrap();
        writer
            .append(&RawFrame::from_command(&Command::PuppetAlive))
            .await
            .unwrap();
        for frame in &first.responses {
            writer.append(frame).await.unwrap();
        }
        writer.close().await.unwrap();

        let second = replay_captured_commands(
            Arc::new(MemoryScene::default()),
            &commands,
            Some(control.as_path()),
            &config,
        )
        .await
        .unwrap();
        assert!(second.matches_control(), "{:?}", second.divergence);

        let short = dir.path().join("short.bin");
        let mut writer = CaptureWriter::create(&short).await.unwrap();
        writer.append(&first.responses[0]).await.unwrap();
        writer.close().await.unwrap();
        let third = replay_captured_commands(
            Arc::new(MemoryScene::default()),
            &commands,
            Some(short.as_path()),
            &config,
        )
        .await
        .unwrap();
        let divergence = third.divergence.unwrap();
        assert_eq!(divergence.index, 1);
        assert_eq!(divergence.expected, None);
    }
}
