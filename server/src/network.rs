//! TCP front end: one task per connection, one request line at a time

use crate::registry::{ExitOutcome, Registry, RegistryError};
use log::{debug, error, info, warn};
use shared::{PlayerId, Request, Response, View};
use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Semaphore};

/// Accepts connections and serves them against a shared [`Registry`]
pub struct Server {
    listener: TcpListener,
    registry: Arc<Registry>,
    slots: Arc<Semaphore>,
}

impl Server {
    /// Binds the listening socket; at most `max_clients` connections are
    /// served at once and the rest are refused
    pub async fn bind(addr: &str, registry: Arc<Registry>, max_clients: usize) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            registry,
            slots: Arc::new(Semaphore::new(max_clients)),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept loop; runs until the task is dropped
    pub async fn run(&self) {
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    continue;
                }
            };

            let permit = match Arc::clone(&self.slots).try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => {
                    warn!("Refusing {}: server full", peer);
                    refuse(stream).await;
                    continue;
                }
            };

            let registry = Arc::clone(&self.registry);
            tokio::spawn(async move {
                Connection::new(registry, peer).serve(stream).await;
                drop(permit);
            });
        }
    }
}

async fn refuse(mut stream: TcpStream) {
    let response = Response::Rejected {
        reason: "server full".into(),
    };
    if let Err(e) = stream.write_all(response.encode().as_bytes()).await {
        debug!("Could not tell client the server is full: {}", e);
    }
}

/// Per-connection state: the players this connection has started
struct Connection {
    registry: Arc<Registry>,
    peer: SocketAddr,
    players: Vec<PlayerId>,
}

impl Connection {
    fn new(registry: Arc<Registry>, peer: SocketAddr) -> Self {
        Connection {
            registry,
            peer,
            players: Vec::new(),
        }
    }

    async fn serve(mut self, stream: TcpStream) {
        info!("Client connected from {}", self.peer);
        let (reader, mut writer) = stream.into_split();
        let (line_tx, mut lines) = mpsc::unbounded_channel();
        let reader_task = tokio::spawn(read_lines(reader, line_tx));
        let mut backlog = VecDeque::new();

        loop {
            let line = match backlog.pop_front() {
                Some(line) => line,
                None => match lines.recv().await {
                    Some(line) => line,
                    None => break,
                },
            };

            let response = match Request::parse(&line) {
                Err(e) => {
                    debug!("Malformed request from {}: {}", self.peer, e);
                    Response::TryAgain {
                        reason: e.to_string(),
                    }
                }
                Ok(request) if request.is_blocking() => {
                    match wait_for(&self.registry, request, &mut lines, &mut backlog).await {
                        Some(response) => response,
                        None => break,
                    }
                }
                Ok(request) => self.respond(request).await,
            };

            if let Err(e) = writer.write_all(response.encode().as_bytes()).await {
                warn!("Failed to write to {}: {}", self.peer, e);
                break;
            }
        }

        reader_task.abort();
        for player in self.players.drain(..) {
            self.registry.disconnect(&player).await;
        }
        info!("Client {} disconnected", self.peer);
    }

    /// Answers a request and tracks which players this connection owns
    async fn respond(&mut self, request: Request) -> Response {
        debug!("{} -> {}", self.peer, request);
        let response = answer(&self.registry, request.clone()).await;

        match (&request, &response) {
            (Request::Start { player }, Response::Lobby(_)) => self.players.push(player.clone()),
            (Request::Exit { player }, Response::Bye) => self.players.retain(|p| p != player),
            _ => {}
        }
        response
    }
}

async fn read_lines(reader: OwnedReadHalf, lines: mpsc::UnboundedSender<String>) {
    let mut reader = BufReader::new(reader).lines();
    loop {
        match reader.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                if lines.send(line).is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                debug!("Read error: {}", e);
                break;
            }
        }
    }
}

/// Runs a blocking request while still noticing the client hanging up
///
/// Lines that arrive in the meantime are queued. Returns None if the
/// connection closed first.
async fn wait_for(
    registry: &Registry,
    request: Request,
    lines: &mut mpsc::UnboundedReceiver<String>,
    backlog: &mut VecDeque<String>,
) -> Option<Response> {
    let work = answer(registry, request);
    tokio::pin!(work);

    loop {
        tokio::select! {
            response = &mut work => return Some(response),
            line = lines.recv() => match line {
                Some(line) => backlog.push_back(line),
                None => return None,
            },
        }
    }
}

/// Maps one request onto the registry
pub async fn answer(registry: &Registry, request: Request) -> Response {
    let result = match request {
        Request::Start { player } => registry.register_player(&player).await.map(Response::Lobby),
        Request::Lobby => Ok(Response::Lobby(registry.lobby().await)),
        Request::New {
            player,
            match_id,
            puzzle,
            description,
        } => registry
            .register_waiting_match(&match_id, &puzzle, &description, &player)
            .await
            .map(|()| Response::Waiting { match_id }),
        Request::Play { player, match_id } => registry
            .promote_to_active(&match_id, &player)
            .await
            .map(Response::Board),
        Request::Wait { player, match_id } => registry
            .await_opponent(&player, &match_id)
            .await
            .map(Response::Board),
        Request::Try {
            player,
            match_id,
            word,
            guess,
        } => registry
            .try_guess(&player, &match_id, word, &guess)
            .await
            .map(|(outcome, view)| Response::Guess { outcome, view }),
        Request::Challenge {
            player,
            match_id,
            word,
            guess,
        } => registry
            .challenge(&player, &match_id, word, &guess)
            .await
            .map(|(outcome, view)| Response::Challenge { outcome, view }),
        Request::Watch { match_id, .. } => {
            registry.watch_board(&match_id).await.map(|view| match view {
                View::Board(board) => Response::Board(board),
                View::Score(score) => Response::Score(score),
            })
        }
        Request::WatchLobby => Ok(Response::Lobby(registry.watch_lobby().await)),
        Request::Exit { player } => registry.exit(&player).await.map(|outcome| match outcome {
            ExitOutcome::Lobby(listing) => Response::Lobby(listing),
            ExitOutcome::Score(score) => Response::Score(score),
            ExitOutcome::Bye => Response::Bye,
        }),
    };

    result.unwrap_or_else(error_response)
}

/// A match that has ended answers with its score; input mistakes can be
/// retried; everything else is rejected
fn error_response(error: RegistryError) -> Response {
    match error {
        RegistryError::MatchEnded { score, .. } => Response::Score(score),
        e if e.is_retryable() => Response::TryAgain {
            reason: e.to_string(),
        },
        e => Response::Rejected {
            reason: e.to_string(),
        },
    }
}
