//! Drives `ProcessTransport` against a tiny shell-script engine.
#![cfg(unix)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use stockfish_adapter::{
    ControllerConfig, ControllerState, EngineHost, GameController, Platform, ProcessTransport,
    Variant,
};
use tempfile::TempDir;
use tokio::sync::mpsc;

const FAKE_ENGINE: &str = r#"
while read -r line; do
  case "$line" in
    uci) echo "id name FakeFish 1.0"; echo "option name Hash type spin default 16 min 1 max 33554432"; echo "uciok" ;;
    isready) echo "readyok" ;;
    go*) echo "info depth 1 score cp 13 pv g1f3"; echo "bestmove g1f3 ponder d7d5" ;;
    quit) exit 0 ;;
  esac
done
"#;

struct ChannelHost(mpsc::UnboundedSender<String>);

impl EngineHost for ChannelHost {
    fn on_engine_move(&self, mv: &str) {
        let _ = self.0.send(mv.to_string());
    }

    fn on_engine_drop(&self, drop: &str) {
        let _ = self.0.send(drop.to_string());
    }
}

fn write_fake_engine(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("fake-engine.sh");
    std::fs::write(&path, FAKE_ENGINE).expect("failed to write fake engine");
    path
}

#[tokio::test]
async fn plays_a_move_through_a_real_process() {
    let dir = TempDir::new().unwrap();
    let script = write_fake_engine(&dir);
    // Run through `sh` so the script never needs the executable bit.
    let transport = ProcessTransport::new("sh").with_args([script]);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let config = ControllerConfig::new(Variant::Standard, Platform::Desktop)
        .with_handshake_timeout(Duration::from_secs(5));
    let mut ctrl = GameController::new(transport, config, Arc::new(ChannelHost(tx)));

    ctrl.init().await.unwrap();
    assert_eq!(ctrl.engine_name(), Some("FakeFish 1.0"));
    assert_eq!(ctrl.state(), ControllerState::Ready);

    ctrl.search("8/8/8/8/8/8/8/K6k w - - 0 1", Vec::<String>::new())
        .await
        .unwrap();

    let mv = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("engine never answered")
        .expect("host channel closed");
    assert_eq!(mv, "g1f3");
    assert_eq!(ctrl.state(), ControllerState::Ready);

    ctrl.exit().await.unwrap();
    assert_eq!(ctrl.state(), ControllerState::Exited);
}

#[tokio::test]
async fn engine_that_dies_fails_the_handshake() {
    let transport = ProcessTransport::new("sh").with_args(["-c", "exit 0"]);
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut ctrl = GameController::new(
        transport,
        ControllerConfig::default(),
        Arc::new(ChannelHost(tx)),
    );

    let result = tokio::time::timeout(Duration::from_secs(5), ctrl.init())
        .await
        .expect("init should fail once the engine's output ends");

    assert!(result.is_err());
    assert_eq!(ctrl.state(), ControllerState::Uninitialized);
}
