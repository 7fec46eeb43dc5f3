use crate::card::{Card, Play};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

pub type LobbyId = Uuid;
pub type PlayerId = Uuid;

/// 一局游戏的完整状态
///
/// 仅由 `logic` 模块中的操作函数修改；服务端每个房间持有一个实例，
/// 并保证每条消息处理完才处理下一条，因此不需要内部锁。
#[derive(Debug, Clone)]
pub struct GameState {
    pub players: HashMap<PlayerId, Player>, // 可以根据 player id 查找 player
    // 所有在座者（含观战者和已出完的玩家），按加入顺序
    pub seats: Vec<PlayerId>,
    // 仍持有手牌、轮流出牌的玩家，座位顺序的子序列
    pub active: Vec<PlayerId>,
    // 当前行动玩家在 active 中的索引；active 非空时必须有效
    pub turn_idx: usize,

    pub phase: GamePhase,
    // 桌面上待压的牌型；None 表示新一轮自由出牌
    pub current_play: Option<Play>,
    // 自上一次成功出牌以来连续过牌的人数
    pub pass_count: usize,
    // 上一次成功出牌的玩家。用稳定的身份而不是索引记录，
    // active 收缩（出完、离开）后据此重新推导轮次。
    pub last_leader: Option<PlayerId>,
    // 出完牌的先后顺序，游戏结束时即最终名次
    pub rankings: Vec<PlayerId>,
    // 自由模式下已确认再来一局的玩家
    pub ready: HashSet<PlayerId>,

    // true: 自由模式，凑满两人自动开局、ready 齐全自动重开
    // false: 大厅模式，开局始终由房主显式触发
    pub auto_start: bool,
}

/// 单个玩家
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub nickname: String,
    // 手牌只会通过 hand_of 发给本人，公开视图里只有张数
    pub hand: Vec<Card>,
    pub finished: bool,
    pub spectator: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GamePhase {
    /// 等待玩家加入，尚未发牌
    Waiting,
    /// 已发牌，轮流出牌中
    Active,
    /// 一局结束，等待 ready 或房主重开
    AwaitingReady,
}

/// 广播给房间内所有人的公开桌面视图，不含任何人的手牌
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableView {
    pub players: Vec<SeatView>,
    pub current_turn: Option<String>,
    pub last_play: Option<Play>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatView {
    pub name: String,
    pub hand_count: usize,
    pub finished: bool,
    pub spectator: bool,
}

// --- GameState 的实现方法 ---

impl GameState {
    pub fn new(auto_start: bool) -> Self {
        GameState {
            players: HashMap::new(),
            seats: Vec::new(),
            active: Vec::new(),
            turn_idx: 0,
            phase: GamePhase::Waiting,
            current_play: None,
            pass_count: 0,
            last_leader: None,
            rankings: Vec::new(),
            ready: HashSet::new(),
            auto_start,
        }
    }

    /// 获取当前行动的玩家ID (如果存在)
    pub fn current_player_id(&self) -> Option<PlayerId> {
        if self.phase != GamePhase::Active {
            return None;
        }
        self.active.get(self.turn_idx).copied()
    }

    /// 非观战者数量（上限 4）
    pub fn non_spectator_count(&self) -> usize {
        self.seats
            .iter()
            .filter_map(|id| self.players.get(id))
            .filter(|p| !p.spectator)
            .count()
    }

    pub fn nickname_of(&self, id: &PlayerId) -> String {
        self.players
            .get(id)
            .map_or_else(|| "(已离开)".to_string(), |p| p.nickname.clone())
    }

    /// 某玩家手牌的有序快照，只发给本人
    pub fn hand_of(&self, id: &PlayerId) -> Vec<Card> {
        let mut hand = self
            .players
            .get(id)
            .map(|p| p.hand.clone())
            .unwrap_or_default();
        hand.sort();
        hand
    }

    /// 公开桌面视图：名字、剩余张数、当前行动者与桌面牌型，
    /// 绝不包含任何玩家的手牌内容。
    pub fn public_view(&self) -> TableView {
        let players = self
            .seats
            .iter()
            .filter_map(|id| self.players.get(id))
            .map(|p| SeatView {
                name: p.nickname.clone(),
                hand_count: p.hand.len(),
                finished: p.finished,
                spectator: p.spectator,
            })
            .collect();
        let current_turn = self
            .current_player_id()
            .map(|id| self.nickname_of(&id));
        TableView {
            players,
            current_turn,
            last_play: self.current_play.clone(),
        }
    }

    /// 最终名次对应的昵称列表
    pub fn ranking_names(&self) -> Vec<String> {
        self.rankings.iter().map(|id| self.nickname_of(id)).collect()
    }
}
