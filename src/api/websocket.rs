use crate::api::types::*;
use crate::coordinator::UploadCoordinator;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::debug;

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(coordinator): State<Arc<UploadCoordinator>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_websocket(socket, coordinator))
}

async fn handle_websocket(mut socket: WebSocket, coordinator: Arc<UploadCoordinator>) {
    let mut tick = interval(Duration::from_millis(500));
    debug!("WebSocket client connected");

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let progress = WebSocketMessage::Progress(coordinator.progress_snapshot());
                let stats = WebSocketMessage::Stats(coordinator.stats().await);

                for msg in [progress, stats] {
                    if let Ok(json) = serde_json::to_string(&msg) {
                        if socket.send(Message::Text(json)).await.is_err() {
                            return;
                        }
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if text == "ping"
                            && socket.send(Message::Text("pong".to_string())).await.is_err() {
                                return;
                            }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    _ => {}
                }
            }
        }
    }
    debug!("WebSocket client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::{FileProgress, QueueStats};
    use crate::store::FileStatus;

    #[test]
    fn test_progress_message_serialization() {
        let msg = WebSocketMessage::Progress(vec![FileProgress {
            id: "file-123".to_string(),
            name: "video.mp4".to_string(),
            status: FileStatus::Uploading,
            progress: 40,
            bytes_uploaded: 400,
            size: 1000,
        }]);

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "Progress");
        assert_eq!(json["data"][0]["id"], "file-123");
        assert_eq!(json["data"][0]["bytesUploaded"], 400);
    }

    #[test]
    fn test_stats_message_serialization() {
        let msg = WebSocketMessage::Stats(QueueStats {
            total_files: 2,
            ..Default::default()
        });

        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"Stats\""));
        assert!(json.contains("\"totalFiles\":2"));
    }
}
