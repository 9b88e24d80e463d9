//! Dispatch a parsed invocation to its mode

use crate::args::{Invocation, RunMode};
use crate::{logging, self_test};
use anyhow::{Context, Result, bail};
use puppet_core::config::{LoggingConfig, PuppetConfig, load_config};
use puppet_core::server::{NodeInstanceServer, PuppetMode, replay_captured_commands, run_server};
use puppet_core::spy::MemoryScene;
use puppet_core::transport;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Run the requested mode to completion
pub async fn route(invocation: Invocation) -> Result<()> {
    let config = match load_config(invocation.config_file.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            logging::init(&LoggingConfig::default());
            return Err(e).context("failed to load configuration");
        }
    };
    logging::init(&config.logging);

    match invocation.mode {
        RunMode::SelfTest => {
            let report = self_test::run(&config).await?;
            for check in &report.passed {
                println!("ok: {}", check);
            }
            Ok(())
        }
        RunMode::ReadCaptured { stream, control } => {
            read_captured(&config, &stream, control.as_deref()).await
        }
        RunMode::Serve { address, mode } => serve(&config, &address, mode).await,
    }
}

async fn read_captured(config: &PuppetConfig, stream: &Path, control: Option<&Path>) -> Result<()> {
    for path in std::iter::once(stream).chain(control) {
        if !path.is_file() {
            bail!("captured stream {} does not exist", path.display());
        }
    }

    let backend = Arc::new(MemoryScene::new(config.render));
    let report = replay_captured_commands(backend, stream, control, config).await?;
    println!(
        "read {} commands, produced {} responses",
        report.commands,
        report.responses.len()
    );
    match &report.divergence {
        Some(divergence) => println!("diverged from control stream: {}", divergence),
        None if control.is_some() => println!("responses match the control stream"),
        None => {}
    }
    Ok(())
}

async fn serve(config: &PuppetConfig, address: &str, mode: PuppetMode) -> Result<()> {
    let stream = transport::connect(address)
        .await
        .with_context(|| format!("cannot reach designer at {}", address))?;

    let backend = Arc::new(MemoryScene::new(config.render));
    let (mut server, mut outbound) = NodeInstanceServer::new(backend, mode, config.spy);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping worker loop");
            on_interrupt.cancel();
        }
    });

    let exit = run_server(stream, &mut server, &mut outbound, config, cancel).await?;
    info!("Worker finished: {:?}", exit);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use puppet_core::capture::CaptureWriter;
    use puppet_core::protocol::{Command, RawFrame, TokenCommand};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_read_captured_requires_existing_files() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.bin");
        let err = read_captured(&PuppetConfig::default(), &missing, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn test_read_captured_replays_commands() {
        let dir = TempDir::new().unwrap();
        let commands = dir.path().join("commands.bin");
        let mut writer = CaptureWriter::create(&commands).await.unwrap();
        let token: Command = TokenCommand::new("t", 1, vec![2, 1]).into();
        writer.append(&RawFrame::from_command(&token)).await.unwrap();
        writer
            .append(&RawFrame::from_command(&Command::EndPuppet))
            .await
            .unwrap();
        writer.close().await.unwrap();

        read_captured(&PuppetConfig::default(), &commands, None)
            .await
            .unwrap();
    }
}
