use crate::card::Card;
use crate::state::{LobbyId, PlayerId, TableView};
use serde::{Deserialize, Serialize};

// --- 客户端 -> 服务器 的消息 ---
// 这些是客户端可以发送给服务器的指令或动作。
// 断线没有对应消息，服务端把连接关闭当作隐式的 LeaveLobby 处理。

#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum ClientMessage {
    /// 设置自己的昵称（加入房间前后都可以）
    SetName(String),
    /// 请求当前的房间列表
    ListLobbies,
    /// 创建一个新房间，创建者成为房主兼首位玩家
    CreateLobby,
    /// 加入一个已存在的房间；对局进行中则以观战者身份加入
    JoinLobby { lobby_id: LobbyId },
    /// 开始对局（仅房主，且至少要有两名活动玩家）
    StartGame,
    /// 一局结束后把房间拉回等待阶段（仅房主）
    ReturnToLobby,
    /// 在轮到自己时出牌
    Play { cards: Vec<Card> },
    /// 在轮到自己时过牌
    Pass,
    /// 自由模式下确认再来一局
    Ready,
    /// 离开当前房间
    LeaveLobby,
}

// --- 服务器 -> 客户端 的消息 ---
// 游戏状态改变后服务器推送给相关客户端的事件通知。

#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum ServerMessage {
    /// 昵称设置成功
    NameSet { name: String },
    /// 房间列表；任一房间的成员或阶段变化时广播给所有连接
    LobbyList(Vec<LobbySummary>),
    /// 所在房间的详情，成员变动或开局/回厅时发给全体占用者
    LobbyInfo {
        id: LobbyId,
        host_id: PlayerId,
        host_name: String,
        players: Vec<String>,
        started: bool,
    },
    /// 成功加入房间后私发给本人
    Joined { name: String, spectator: bool },
    /// 发牌完成，携带本人的初始手牌（每局只发一次）
    GameStarted { hand: Vec<Card> },
    /// 本人手牌的完整快照，手牌每次变动后重发（不是增量）
    Hand { hand: Vec<Card> },
    /// 公开桌面状态，任何影响轮次的变动后广播给房间全体
    TableState(TableView),
    /// 某玩家出完了手牌
    PlayerFinished { player: String },
    /// 本局结束，携带完整名次
    GameOver { rankings: Vec<String> },
    /// 自由模式下已确认再来一局的玩家名单
    ReadyState { ready: Vec<String> },
    /// 房主把房间拉回了等待阶段
    ReturnedToLobby,
    /// 对本人最近一次出牌/过牌请求的拒绝
    Invalid,
}

/// 房间列表中的单个条目
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LobbySummary {
    pub id: LobbyId,
    pub host_name: String,
    pub players: Vec<String>,
    pub started: bool,
}
