use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use dashmap::DashMap;
use futures_util::{stream::StreamExt, SinkExt};
use parking_lot::{Mutex as P_Mutex, RwLock as P_RwLock};
use tokio::sync::{mpsc, RwLock};
use tracing::info;
use uuid::Uuid;

use thirteen_core::{
    add_player, handle_pass, handle_play, ready_up, remove_player, return_to_lobby, start_game,
    ClientMessage, GamePhase, GameState, LobbyId, LobbySummary, PlayerId, ServerMessage,
};

// 服务器全局状态，房间表和连接表可被任意连接任务访问
struct AppState {
    lobbies: DashMap<LobbyId, Arc<Lobby>>,
    // 所有活跃连接（含未入房的），房间列表变化时向它们广播
    clients: DashMap<Uuid, mpsc::Sender<ServerMessage>>,
}

// 单个房间的状态
// 重要‼️：严格规定使用锁的顺序，避免死锁：
// players -> host_id -> game
struct Lobby {
    game: P_Mutex<GameState>,
    host_id: P_RwLock<PlayerId>,
    // 将 PlayerId 映射到具体的网络连接
    players: RwLock<HashMap<PlayerId, PlayerConnection>>,
}

// 玩家的网络连接信息
struct PlayerConnection {
    // 用于向该玩家的 WebSocket 任务发送消息的通道
    sender: mpsc::Sender<ServerMessage>,
}

// 单个连接的上下文，贯穿其整个生命周期
struct ConnContext {
    conn_id: Uuid,
    name: String,
    lobby: Option<(LobbyId, PlayerId)>,
}

/// 一条待发消息的去向
enum Target {
    Caller,
    Player(PlayerId),
    Room,
}

type SharedState = Arc<AppState>;
type Plan = Vec<(Target, ServerMessage)>;

const DEFAULT_PORT: u16 = 25913;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let state = SharedState::new(AppState {
        lobbies: DashMap::new(),
        clients: DashMap::new(),
    });

    let app = Router::new()
        .route("/ws", get(websocket_handler))
        .with_state(state);

    // 端口可用 PORT 环境变量覆盖
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("服务器正在监听 {}", addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await.unwrap(), app)
        .await
        .unwrap();
}

/// 处理 WebSocket 连接请求
async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// 处理单个 WebSocket 连接的生命周期
async fn handle_socket(socket: WebSocket, state: SharedState) {
    let (mut sender, mut receiver) = socket.split();

    // 创建一个 MPSC 通道，用于从其他任务接收要发送的消息
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(32);

    // 启动一个新任务，专门负责将 MPSC 通道中的消息发送到 WebSocket
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let payload = serde_json::to_string(&msg).unwrap();
            if sender.send(Message::Text(payload.into())).await.is_err() {
                // 发送失败，说明客户端已断开，退出任务
                break;
            }
        }
    });

    let mut ctx = ConnContext {
        conn_id: Uuid::new_v4(),
        name: "新玩家".to_string(),
        lobby: None,
    };
    state.clients.insert(ctx.conn_id, tx.clone());

    // 主循环，处理从客户端接收到的消息
    while let Some(Ok(msg)) = receiver.next().await {
        if let Message::Text(text) = msg {
            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => {
                    handle_client_message(client_msg, state.clone(), &tx, &mut ctx).await;
                }
                Err(e) => {
                    tracing::warn!("解析消息失败: {}", e);
                }
            }
        }
    }

    // 客户端断开连接，执行清理工作；断线等同于离开房间
    state.clients.remove(&ctx.conn_id);
    if let Some((lobby_id, player_id)) = ctx.lobby {
        info!("玩家 {} 从房间 {} 断开连接", player_id, lobby_id);
        leave_lobby(&state, lobby_id, player_id).await;
    }
    info!("客户端连接关闭");
}

/// 核心消息处理逻辑
async fn handle_client_message(
    msg: ClientMessage,
    state: SharedState,
    tx: &mpsc::Sender<ServerMessage>,
    ctx: &mut ConnContext,
) {
    match msg {
        ClientMessage::SetName(name) => {
            let name = name.trim().to_string();
            if name.is_empty() {
                return;
            }
            ctx.name = name.clone();
            // 已在房间里的话同步改掉游戏内的昵称
            if let Some((lobby_id, player_id)) = ctx.lobby {
                if let Some(lobby) = state.lobbies.get(&lobby_id).map(|e| e.value().clone()) {
                    let mut game = lobby.game.lock();
                    if let Some(p) = game.players.get_mut(&player_id) {
                        p.nickname = name.clone();
                    }
                }
            }
            let _ = tx.send(ServerMessage::NameSet { name }).await;
        }
        ClientMessage::ListLobbies => {
            let _ = tx.send(ServerMessage::LobbyList(lobby_list(&state))).await;
        }
        ClientMessage::CreateLobby => {
            if ctx.lobby.is_some() {
                tracing::debug!("已在房间内的连接请求创建房间，忽略");
                return;
            }
            let lobby_id = Uuid::new_v4();
            let player_id = Uuid::new_v4();

            // 大厅模式：开局始终由房主显式触发
            let mut game = GameState::new(false);
            add_player(&mut game, player_id, ctx.name.clone(), false);

            let mut lobby = Lobby {
                game: P_Mutex::new(game),
                host_id: P_RwLock::new(player_id),
                players: RwLock::new(HashMap::new()),
            };
            lobby
                .players
                .get_mut()
                .insert(player_id, PlayerConnection { sender: tx.clone() });

            let info = lobby_info(&lobby, lobby_id);
            state.lobbies.insert(lobby_id, Arc::new(lobby));

            info!("玩家 {} 创建了新房间 {}", player_id, lobby_id);
            ctx.lobby = Some((lobby_id, player_id));
            let _ = tx
                .send(ServerMessage::Joined { name: ctx.name.clone(), spectator: false })
                .await;
            let _ = tx.send(info).await;
            broadcast_lobby_list(&state).await;
        }
        ClientMessage::JoinLobby { lobby_id } => {
            if ctx.lobby.is_some() {
                tracing::debug!("已在房间内的连接请求加入房间，忽略");
                return;
            }
            // 不存在的房间按无操作处理
            let Some(lobby) = state.lobbies.get(&lobby_id).map(|e| e.value().clone()) else {
                tracing::debug!("请求加入不存在的房间 {}", lobby_id);
                return;
            };

            let player_id = Uuid::new_v4();
            let mut joined = false;
            let mut spectator = false;
            let mut table = None;
            {
                // players 写锁
                let mut players = lobby.players.write().await;
                {
                    // game 锁
                    let mut game = lobby.game.lock();
                    // 未开局且有空位就入座；对局进行中以观战者身份加入；
                    // 未开局但席位已满则静默拒绝
                    let admit = match game.phase {
                        GamePhase::Active => Some(true),
                        _ if game.non_spectator_count() < 4 => Some(false),
                        _ => None,
                    };
                    if let Some(as_spectator) = admit {
                        if add_player(&mut game, player_id, ctx.name.clone(), as_spectator).joined
                        {
                            joined = true;
                            spectator = as_spectator;
                            if game.phase == GamePhase::Active {
                                table = Some(game.public_view());
                            }
                        }
                    }
                }
                if joined {
                    players.insert(player_id, PlayerConnection { sender: tx.clone() });
                }
            }
            if !joined {
                tracing::debug!("房间 {} 已满，加入请求被忽略", lobby_id);
                return;
            }

            info!("玩家 {} 加入了房间 {}（观战: {}）", player_id, lobby_id, spectator);
            ctx.lobby = Some((lobby_id, player_id));
            let _ = tx
                .send(ServerMessage::Joined { name: ctx.name.clone(), spectator })
                .await;
            if let Some(view) = table {
                let _ = tx.send(ServerMessage::TableState(view)).await;
            }
            let info = lobby_info(&lobby, lobby_id);
            deliver(&lobby, Some(tx), vec![(Target::Room, info)]).await;
            broadcast_lobby_list(&state).await;
        }
        // --- 以下消息都要求已经在房间里 ---
        other => {
            let Some((lobby_id, player_id)) = ctx.lobby else {
                tracing::debug!("未入房的连接发来游戏内消息，忽略");
                return;
            };
            let Some(lobby) = state.lobbies.get(&lobby_id).map(|e| e.value().clone()) else {
                return;
            };

            match other {
                ClientMessage::StartGame => {
                    if *lobby.host_id.read() != player_id {
                        tracing::debug!("非房主请求开局，忽略");
                        return;
                    }
                    let mut plan: Plan = Vec::new();
                    {
                        let mut game = lobby.game.lock();
                        if start_game(&mut game) {
                            // 初始手牌每人私发一份
                            for id in game.active.clone() {
                                plan.push((
                                    Target::Player(id),
                                    ServerMessage::GameStarted { hand: game.hand_of(&id) },
                                ));
                            }
                            plan.push((Target::Room, ServerMessage::TableState(game.public_view())));
                        }
                    }
                    if plan.is_empty() {
                        return;
                    }
                    info!("房间 {} 开局", lobby_id);
                    let info = lobby_info(&lobby, lobby_id);
                    plan.push((Target::Room, info));
                    deliver(&lobby, Some(tx), plan).await;
                    broadcast_lobby_list(&state).await;
                }
                ClientMessage::ReturnToLobby => {
                    if *lobby.host_id.read() != player_id {
                        tracing::debug!("非房主请求返回大厅，忽略");
                        return;
                    }
                    let ok = {
                        let mut game = lobby.game.lock();
                        return_to_lobby(&mut game)
                    };
                    if !ok {
                        return;
                    }
                    let info = lobby_info(&lobby, lobby_id);
                    deliver(
                        &lobby,
                        Some(tx),
                        vec![(Target::Room, ServerMessage::ReturnedToLobby), (Target::Room, info)],
                    )
                    .await;
                    broadcast_lobby_list(&state).await;
                }
                ClientMessage::Play { cards } => {
                    let mut game_over = false;
                    let plan: Plan = {
                        let mut game = lobby.game.lock();
                        match handle_play(&mut game, player_id, &cards) {
                            // 规则校验失败只通知出牌者本人
                            None => vec![(Target::Caller, ServerMessage::Invalid)],
                            Some(outcome) => {
                                let mut plan: Plan = vec![
                                    (
                                        Target::Player(player_id),
                                        ServerMessage::Hand { hand: game.hand_of(&player_id) },
                                    ),
                                    (Target::Room, ServerMessage::TableState(game.public_view())),
                                ];
                                if outcome.finished {
                                    plan.push((
                                        Target::Room,
                                        ServerMessage::PlayerFinished {
                                            player: game.nickname_of(&player_id),
                                        },
                                    ));
                                }
                                if outcome.game_over {
                                    plan.push((
                                        Target::Room,
                                        ServerMessage::GameOver { rankings: game.ranking_names() },
                                    ));
                                    game_over = true;
                                }
                                plan
                            }
                        }
                    };
                    deliver(&lobby, Some(tx), plan).await;
                    if game_over {
                        broadcast_lobby_list(&state).await;
                    }
                }
                ClientMessage::Pass => {
                    let plan: Plan = {
                        let mut game = lobby.game.lock();
                        if handle_pass(&mut game, player_id) {
                            vec![(Target::Room, ServerMessage::TableState(game.public_view()))]
                        } else {
                            vec![(Target::Caller, ServerMessage::Invalid)]
                        }
                    };
                    deliver(&lobby, Some(tx), plan).await;
                }
                ClientMessage::Ready => {
                    let mut restarted = false;
                    let plan: Plan = {
                        let mut game = lobby.game.lock();
                        let outcome = ready_up(&mut game, player_id);
                        if outcome.restarted {
                            restarted = true;
                            let mut plan: Plan = game
                                .active
                                .clone()
                                .into_iter()
                                .map(|id| {
                                    (
                                        Target::Player(id),
                                        ServerMessage::GameStarted { hand: game.hand_of(&id) },
                                    )
                                })
                                .collect();
                            plan.push((Target::Room, ServerMessage::TableState(game.public_view())));
                            plan
                        } else if outcome.accepted {
                            let ready = game.ready.iter().map(|p| game.nickname_of(p)).collect();
                            vec![(Target::Room, ServerMessage::ReadyState { ready })]
                        } else {
                            Vec::new()
                        }
                    };
                    deliver(&lobby, Some(tx), plan).await;
                    if restarted {
                        broadcast_lobby_list(&state).await;
                    }
                }
                ClientMessage::LeaveLobby => {
                    info!("玩家 {} 离开了房间 {}", player_id, lobby_id);
                    leave_lobby(&state, lobby_id, player_id).await;
                    ctx.lobby = None;
                }
                _ => {}
            }
        }
    }
}

/// 玩家离开房间（显式离开或断线）后的处理
async fn leave_lobby(state: &SharedState, lobby_id: LobbyId, player_id: PlayerId) {
    let Some(lobby) = state.lobbies.get(&lobby_id).map(|e| e.value().clone()) else {
        return;
    };

    // 从连接映射中移除
    let remaining: Vec<PlayerId> = {
        let mut players = lobby.players.write().await;
        players.remove(&player_id);
        players.keys().cloned().collect()
    };

    // 更新游戏状态；离开可能直接终结进行中的对局
    let (mut plan, first_seat) = {
        let mut game = lobby.game.lock();
        let outcome = remove_player(&mut game, player_id);
        let mut plan: Plan = Vec::new();
        if outcome.removed && !remaining.is_empty() {
            plan.push((Target::Room, ServerMessage::TableState(game.public_view())));
            if outcome.game_over {
                plan.push((
                    Target::Room,
                    ServerMessage::GameOver { rankings: game.ranking_names() },
                ));
            }
        }
        (plan, game.seats.first().copied())
    };

    if remaining.is_empty() {
        state.lobbies.remove(&lobby_id);
        info!("房间 {} 已空，已被移除", lobby_id);
    } else {
        // 房主离开时移交给按加入顺序的第一位剩余占用者
        {
            let mut host = lobby.host_id.write();
            if *host == player_id {
                if let Some(next) = first_seat {
                    *host = next;
                    info!("房间 {} 的房主已转移给 {}", lobby_id, next);
                }
            }
        }
        let info = lobby_info(&lobby, lobby_id);
        plan.push((Target::Room, info));
        deliver(&lobby, None, plan).await;
    }
    broadcast_lobby_list(state).await;
}

/// 按计划把消息分发给调用方、指定玩家或房间全体
///
/// 断线清理路径没有"调用方"，传 None 时丢弃 Caller 目标的消息。
async fn deliver(lobby: &Lobby, tx: Option<&mpsc::Sender<ServerMessage>>, plan: Plan) {
    if plan.is_empty() {
        return;
    }
    let players = lobby.players.read().await;
    for (target, msg) in plan {
        match target {
            Target::Caller => {
                if let Some(tx) = tx {
                    let _ = tx.send(msg).await;
                }
            }
            Target::Player(id) => {
                if let Some(conn) = players.get(&id) {
                    let _ = conn.sender.send(msg).await;
                }
            }
            Target::Room => {
                for (player_id, conn) in players.iter() {
                    if conn.sender.send(msg.clone()).await.is_err() {
                        // 发送失败，说明该玩家也断开了，后续由其自己的 handle_socket 任务处理
                        tracing::warn!("向玩家 {} 发送消息失败（可能已断开）", player_id);
                    }
                }
            }
        }
    }
}

/// 构造某房间的详情消息
fn lobby_info(lobby: &Lobby, id: LobbyId) -> ServerMessage {
    let host_id = *lobby.host_id.read();
    let game = lobby.game.lock();
    ServerMessage::LobbyInfo {
        id,
        host_id,
        host_name: game.nickname_of(&host_id),
        players: game.seats.iter().map(|p| game.nickname_of(p)).collect(),
        started: game.phase == GamePhase::Active,
    }
}

/// 当前所有房间的列表快照
fn lobby_list(state: &AppState) -> Vec<LobbySummary> {
    state
        .lobbies
        .iter()
        .map(|entry| {
            let lobby = entry.value();
            let host_id = *lobby.host_id.read();
            let game = lobby.game.lock();
            LobbySummary {
                id: *entry.key(),
                host_name: game.nickname_of(&host_id),
                players: game.seats.iter().map(|p| game.nickname_of(p)).collect(),
                started: game.phase == GamePhase::Active,
            }
        })
        .collect()
}

/// 任一房间的成员或阶段变化后，向所有连接广播最新列表
async fn broadcast_lobby_list(state: &AppState) {
    let msg = ServerMessage::LobbyList(lobby_list(state));
    let senders: Vec<_> = state.clients.iter().map(|e| e.value().clone()).collect();
    for sender in senders {
        let _ = sender.send(msg.clone()).await;
    }
}
