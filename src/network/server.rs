//! WebSocket Badge Server
//!
//! Async WebSocket server for game clients.
//! Routes submissions, lookups and credential requests to the service.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, Notify, RwLock};
use tokio::time::interval;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};

use crate::config::ServerConfig;
use crate::core::address::AccountAddress;
use crate::network::protocol::{
    ClientMessage, ErrorCode, PlayerInfo, ServerError, ServerMessage, SignatureRequest,
    SignatureResponse,
};
use crate::service::AchievementService;

/// Server errors.
#[derive(Debug, thiserror::Error)]
pub enum BadgeServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Connected client state.
struct ConnectedClient {
    /// Connection time.
    connected_at: Instant,
    /// Last activity.
    last_activity: Instant,
    /// Signalled to drop the connection.
    kick: Arc<Notify>,
}

type ClientMap = Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>;

/// The badge server.
pub struct BadgeServer {
    /// Server configuration.
    config: ServerConfig,
    /// Achievement service.
    service: Arc<AchievementService>,
    /// Connected clients.
    clients: ClientMap,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl BadgeServer {
    /// Create a new server.
    pub fn new(config: ServerConfig, service: Arc<AchievementService>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            service,
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            shutdown_tx,
        }
    }

    /// Bind the configured address and run until shutdown.
    pub async fn run(&self) -> Result<(), BadgeServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Run the accept loop on an already bound listener.
    #[instrument(skip_all)]
    pub async fn serve(&self, listener: TcpListener) -> Result<(), BadgeServerError> {
        info!("Badge server listening on {}", listener.local_addr()?);

        let cleanup_clients = self.clients.clone();
        let idle_timeout = self.config.idle_timeout;
        let cleanup_handle = tokio::spawn(async move {
            Self::run_cleanup_loop(cleanup_clients, idle_timeout).await;
        });

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let clients_count = self.clients.read().await.len();
                            if clients_count >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                Self::reject_overloaded(stream, addr);
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        cleanup_handle.abort();

        Ok(())
    }

    /// Complete the handshake only to report overload, then close.
    fn reject_overloaded(stream: TcpStream, addr: SocketAddr) {
        tokio::spawn(async move {
            let Ok(mut ws) = accept_async(stream).await else {
                return;
            };
            let msg = ServerMessage::Error(ServerError::new(
                ErrorCode::ServerOverloaded,
                "Server at capacity",
            ));
            if let Ok(text) = msg.to_json() {
                let _ = ws.send(Message::Text(text)).await;
            }
            let _ = ws.close(None).await;
            debug!("Rejected {}", addr);
        });
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let clients = self.clients.clone();
        let service = self.service.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(64);
            let kick = Arc::new(Notify::new());

            // Register client
            {
                let mut clients = clients.write().await;
                clients.insert(
                    addr,
                    ConnectedClient {
                        connected_at: Instant::now(),
                        last_activity: Instant::now(),
                        kick: kick.clone(),
                    },
                );
            }

            // Spawn message sender task
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                let _ = ws_sender.close().await;
            });

            // Handle incoming messages
            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let client_msg = match ClientMessage::from_json(&text) {
                                    Ok(m) => m,
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", addr, e);
                                        let _ = msg_tx.send(ServerMessage::Error(ServerError::new(
                                            ErrorCode::InvalidInput,
                                            "Invalid message format",
                                        ))).await;
                                        continue;
                                    }
                                };

                                // Update activity
                                {
                                    let mut clients = clients.write().await;
                                    if let Some(client) = clients.get_mut(&addr) {
                                        client.last_activity = Instant::now();
                                    }
                                }

                                let reply = Self::handle_client_message(&service, client_msg).await;
                                if msg_tx.send(reply).await.is_err() {
                                    break;
                                }
                            }
                            Some(Ok(Message::Binary(_))) => {
                                let _ = msg_tx.send(ServerMessage::Error(ServerError::new(
                                    ErrorCode::InvalidInput,
                                    "Binary frames are not supported",
                                ))).await;
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = kick.notified() => {
                        debug!("Dropping idle client {}", addr);
                        break;
                    }
                    _ = shutdown_rx.recv() => {
                        let _ = msg_tx.send(ServerMessage::Shutdown {
                            reason: "Server shutting down".to_string(),
                        }).await;
                        break;
                    }
                }
            }

            // Let queued replies flush, then close.
            drop(msg_tx);
            let _ = tokio::time::timeout(Duration::from_secs(1), sender_task).await;

            // Remove client
            if let Some(client) = clients.write().await.remove(&addr) {
                debug!(
                    "Client {} was connected for {:?}",
                    addr,
                    client.connected_at.elapsed()
                );
            }

            info!("Client {} cleaned up", addr);
        });
    }

    /// Handle a client message and produce the reply.
    pub async fn handle_client_message(
        service: &AchievementService,
        msg: ClientMessage,
    ) -> ServerMessage {
        match msg {
            ClientMessage::SubmitGame(submission) => {
                let game = match submission.into_result() {
                    Ok(game) => game,
                    Err(e) => return ServerMessage::Error(ServerError::from(&e)),
                };
                match service.submit_game(game).await {
                    Ok(outcome) => ServerMessage::GameRecorded {
                        game_id: outcome.game.id.to_string(),
                        achievements: outcome.newly_earned,
                    },
                    Err(e) => {
                        error!("Failed to record game: {}", e);
                        ServerMessage::Error(ServerError::from(&e))
                    }
                }
            }
            ClientMessage::GetPlayer { address } => Self::handle_get_player(service, &address).await,
            ClientMessage::RequestSignature(request) => {
                Self::handle_signature_request(service, request).await
            }
            ClientMessage::Leaderboard { limit } => ServerMessage::Leaderboard {
                leaderboard: service.leaderboard(limit).await,
            },
            ClientMessage::TournamentLeaderboard {
                tournament_id,
                limit,
            } => ServerMessage::Leaderboard {
                leaderboard: service.tournament_leaderboard(tournament_id, limit).await,
            },
            ClientMessage::Ping { timestamp } => ServerMessage::Pong {
                timestamp,
                server_time: std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_millis() as u64,
            },
        }
    }

    /// Handle a player lookup.
    async fn handle_get_player(service: &AchievementService, address: &str) -> ServerMessage {
        let address = match AccountAddress::parse(address) {
            Ok(a) => a,
            Err(e) => {
                return ServerMessage::Error(ServerError::new(ErrorCode::InvalidInput, e.to_string()))
            }
        };

        let summary = service.player(&address).await;
        ServerMessage::Player(PlayerInfo {
            exists: summary.stats.is_some(),
            player: summary.stats,
            achievements: summary.achievements,
        })
    }

    /// Handle a credential request.
    async fn handle_signature_request(
        service: &AchievementService,
        request: SignatureRequest,
    ) -> ServerMessage {
        let player = match AccountAddress::parse(&request.player_address) {
            Ok(p) => p,
            Err(e) => {
                return ServerMessage::Error(ServerError::new(ErrorCode::InvalidInput, e.to_string()))
            }
        };

        match service.issue_credential(player, request.achievement_id).await {
            Ok(credential) => ServerMessage::Signature(SignatureResponse {
                achievement_id: credential.achievement,
                signature: credential.signature,
            }),
            Err(e) => {
                if e.is_authorization() {
                    debug!("Refused credential for {}: {}", player.short(), e);
                } else {
                    warn!("Credential request for {} failed: {}", player.short(), e);
                }
                ServerMessage::Error(ServerError::from(&e))
            }
        }
    }

    /// Run cleanup loop.
    async fn run_cleanup_loop(clients: ClientMap, idle_timeout: Duration) {
        let mut interval = interval(Duration::from_secs(60));

        loop {
            interval.tick().await;

            let now = Instant::now();
            let idle: Vec<_> = {
                let clients = clients.read().await;
                clients
                    .iter()
                    .filter(|(_, c)| now.duration_since(c.last_activity) > idle_timeout)
                    .map(|(addr, c)| (*addr, c.kick.clone()))
                    .collect()
            };

            for (addr, kick) in idle {
                kick.notify_one();
                info!("Removed idle client {}", addr);
            }
        }
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attest::signer::AttestationSigner;
    use crate::game::achievement::AchievementId;
    use crate::network::protocol::GameSubmission;
    use tokio_tungstenite::connect_async;

    const PLAYER: &str = "0x00000000000000000000000000000000000000aa";

    fn service() -> Arc<AchievementService> {
        let signer = AttestationSigner::from_secret_bytes([0x07; 32]).unwrap();
        Arc::new(AchievementService::new(signer, 50))
    }

    fn submission(score: u32, lines: u32) -> ClientMessage {
        ClientMessage::SubmitGame(GameSubmission {
            player_address: PLAYER.into(),
            score,
            lines_cleared: lines,
            duration: Some(90),
            is_tournament: false,
            tournament_id: None,
        })
    }

    // =========================================================================
    // DISPATCH
    // =========================================================================

    #[tokio::test]
    async fn test_submit_then_lookup() {
        let service = service();

        let reply = BadgeServer::handle_client_message(&service, submission(150, 2)).await;
        let ServerMessage::GameRecorded { achievements, .. } = reply else {
            panic!("Wrong message type");
        };
        assert_eq!(
            achievements,
            vec![AchievementId::FirstGame, AchievementId::Century]
        );

        let reply = BadgeServer::handle_client_message(
            &service,
            ClientMessage::GetPlayer {
                address: PLAYER.to_uppercase(),
            },
        )
        .await;
        let ServerMessage::Player(info) = reply else {
            panic!("Wrong message type");
        };
        assert!(info.exists);
        assert_eq!(info.player.unwrap().total_games, 1);
        assert_eq!(info.achievements.len(), 2);
    }

    #[tokio::test]
    async fn test_signature_forbidden_until_earned() {
        let service = service();
        let request = || {
            ClientMessage::RequestSignature(SignatureRequest {
                player_address: PLAYER.into(),
                achievement_id: 2,
            })
        };

        let reply = BadgeServer::handle_client_message(&service, request()).await;
        let ServerMessage::Error(error) = reply else {
            panic!("Wrong message type");
        };
        assert_eq!(error.code, ErrorCode::Forbidden);

        BadgeServer::handle_client_message(&service, submission(5, 11)).await;

        let reply = BadgeServer::handle_client_message(&service, request()).await;
        let ServerMessage::Signature(response) = reply else {
            panic!("Wrong message type");
        };
        assert_eq!(response.achievement_id, AchievementId::HotStreak);
    }

    #[tokio::test]
    async fn test_bad_address_is_invalid_input() {
        let service = service();
        let reply = BadgeServer::handle_client_message(
            &service,
            ClientMessage::GetPlayer {
                address: "not-an-address".into(),
            },
        )
        .await;
        assert!(matches!(
            reply,
            ServerMessage::Error(ServerError {
                code: ErrorCode::InvalidInput,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_unpersisted_game_reports_internal_error() {
        use crate::storage::SnapshotStore;

        let dir = std::env::temp_dir().join(format!("puzzle-badges-{}", uuid::Uuid::new_v4()));
        let signer = AttestationSigner::from_secret_bytes([0x07; 32]).unwrap();
        let service = AchievementService::open(signer, SnapshotStore::new(dir.join("s.json")), 50)
            .await
            .unwrap();
        std::fs::write(&dir, b"not a directory").unwrap();

        let reply = BadgeServer::handle_client_message(&service, submission(150, 0)).await;
        let ServerMessage::Error(error) = reply else {
            panic!("Wrong message type");
        };
        assert_eq!(error.code, ErrorCode::InternalError);
        assert_eq!(error.code.http_status(), 500);

        let _ = std::fs::remove_file(&dir);
    }

    #[tokio::test]
    async fn test_tournament_leaderboard_dispatch() {
        let service = service();
        let mut ranked = GameSubmission {
            player_address: PLAYER.into(),
            score: 70,
            lines_cleared: 0,
            duration: None,
            is_tournament: true,
            tournament_id: Some(5),
        };
        BadgeServer::handle_client_message(&service, ClientMessage::SubmitGame(ranked.clone()))
            .await;
        ranked.tournament_id = Some(6);
        ranked.score = 900;
        BadgeServer::handle_client_message(&service, ClientMessage::SubmitGame(ranked)).await;

        let reply = BadgeServer::handle_client_message(
            &service,
            ClientMessage::TournamentLeaderboard {
                tournament_id: 5,
                limit: None,
            },
        )
        .await;
        let ServerMessage::Leaderboard { leaderboard } = reply else {
            panic!("Wrong message type");
        };
        assert_eq!(leaderboard.len(), 1);
        assert_eq!(leaderboard[0].best_score, 70);
    }

    #[tokio::test]
    async fn test_ping() {
        let reply =
            BadgeServer::handle_client_message(&service(), ClientMessage::Ping { timestamp: 42 })
                .await;
        assert!(matches!(reply, ServerMessage::Pong { timestamp: 42, .. }));
    }

    // =========================================================================
    // SERVER LIFECYCLE
    // =========================================================================

    #[tokio::test]
    async fn test_server_creation() {
        let server = BadgeServer::new(ServerConfig::default(), service());
        assert_eq!(server.connection_count().await, 0);
        server.shutdown();
    }

    #[tokio::test]
    async fn test_websocket_roundtrip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Arc::new(BadgeServer::new(ServerConfig::default(), service()));

        let running = server.clone();
        let handle = tokio::spawn(async move { running.serve(listener).await });

        let (mut ws, _) = connect_async(format!("ws://{}", addr)).await.unwrap();
        ws.send(Message::Text(
            ClientMessage::Ping { timestamp: 7 }.to_json().unwrap(),
        ))
        .await
        .unwrap();

        let reply = loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => break ServerMessage::from_json(&text).unwrap(),
                Some(Ok(_)) => continue,
                other => panic!("unexpected frame: {:?}", other),
            }
        };
        assert!(matches!(reply, ServerMessage::Pong { timestamp: 7, .. }));

        ws.send(Message::Text("{\"type\":\"nonsense\"}".into()))
            .await
            .unwrap();
        let reply = loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => break ServerMessage::from_json(&text).unwrap(),
                Some(Ok(_)) => continue,
                other => panic!("unexpected frame: {:?}", other),
            }
        };
        assert!(matches!(
            reply,
            ServerMessage::Error(ServerError {
                code: ErrorCode::InvalidInput,
                ..
            })
        ));

        server.shutdown();
        handle.await.unwrap().unwrap();
    }
}
