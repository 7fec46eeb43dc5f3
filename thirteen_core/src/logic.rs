use crate::card::*;
use crate::state::*;

// --- 核心游戏流程函数 ---

/// add_player 的结果
pub struct AddOutcome {
    pub joined: bool,
    /// 自由模式下这次加入是否触发了自动开局
    pub started: bool,
}

/// handle_play 成功时的结果
pub struct PlayOutcome {
    pub play: Play,
    /// 该玩家是否借这次出牌清空了手牌
    pub finished: bool,
    /// 本局是否随之结束
    pub game_over: bool,
}

/// remove_player 的结果
pub struct RemoveOutcome {
    pub removed: bool,
    pub game_over: bool,
}

/// ready_up 的结果
pub struct ReadyOutcome {
    pub accepted: bool,
    pub restarted: bool,
}

/// 玩家加入游戏
///
/// 活动席位最多 4 个；席位已满时只接受观战者。
/// 自由模式下凑满两名活动玩家会立即自动开局。
pub fn add_player(state: &mut GameState, id: PlayerId, nickname: String, spectator: bool) -> AddOutcome {
    if !spectator && state.non_spectator_count() >= 4 {
        return AddOutcome { joined: false, started: false };
    }
    state.players.insert(
        id,
        Player { id, nickname, hand: Vec::new(), finished: false, spectator },
    );
    state.seats.push(id);

    let mut started = false;
    if state.auto_start && state.phase == GamePhase::Waiting && state.non_spectator_count() >= 2 {
        started = start_game(state);
    }
    AddOutcome { joined: true, started }
}

/// 开始新的一局
///
/// - 若活动席位不满 4 人，按加入顺序把观战者转为活动玩家补位。
/// - 洗一副新牌，给每名活动玩家发 13 张；2~3 人时余牌弃置不用。
/// - 重置桌面、过牌计数、名次与 ready 集合。
/// - 首轮轮到持有全场最小一张牌的玩家，由其自由选择领出的组合。
///
/// 对局进行中或活动玩家不足 2 人时不开局，返回 false。
pub fn start_game(state: &mut GameState) -> bool {
    if state.phase == GamePhase::Active {
        return false;
    }
    promote_spectators(state);
    let dealt: Vec<PlayerId> = state
        .seats
        .iter()
        .filter(|id| state.players.get(*id).map_or(false, |p| !p.spectator))
        .cloned()
        .collect();
    if dealt.len() < 2 {
        return false;
    }

    // 清掉上一局遗留的状态
    state.current_play = None;
    state.pass_count = 0;
    state.last_leader = None;
    state.rankings.clear();
    state.ready.clear();
    for p in state.players.values_mut() {
        p.hand.clear();
        p.finished = false;
    }

    let mut deck = shuffled_deck();
    for id in &dealt {
        let player = state.players.get_mut(id).unwrap();
        for _ in 0..13 {
            player.hand.push(deck.pop().unwrap());
        }
        player.hand.sort();
    }

    state.active = dealt;
    // 手牌已排序，hand[0] 即每人最小的一张
    let lowest_holder = *state
        .active
        .iter()
        .min_by_key(|id| state.players.get(*id).unwrap().hand[0])
        .unwrap();
    state.turn_idx = state.active.iter().position(|id| *id == lowest_holder).unwrap();
    state.phase = GamePhase::Active;
    true
}

/// 开局补位：活动席位未满 4 人时，按加入顺序把观战者转为活动玩家
fn promote_spectators(state: &mut GameState) {
    let mut slots = 4usize.saturating_sub(state.non_spectator_count());
    if slots == 0 {
        return;
    }
    for id in state.seats.clone() {
        if slots == 0 {
            break;
        }
        if let Some(p) = state.players.get_mut(&id) {
            if p.spectator {
                p.spectator = false;
                slots -= 1;
            }
        }
    }
}

/// 处理一次出牌
///
/// 不是该玩家的回合、牌不全在其手中、组合不可识别或压不过
/// 桌面时返回 None；调用方只向出牌者本人回一个拒绝信号。
///
/// 成功时：从手牌移除这些牌，更新桌面与领出者，轮次移交下一位
/// 活动玩家。若该玩家就此出完，记入名次并移出活动序列；只剩一名
/// 活动玩家时其自动垫底，本局结束。
pub fn handle_play(state: &mut GameState, id: PlayerId, cards: &[Card]) -> Option<PlayOutcome> {
    if state.current_player_id() != Some(id) {
        return None;
    }
    let play = classify(cards)?;
    if !is_legal(&play, state.current_play.as_ref()) {
        return None;
    }
    if !play.cards.iter().all(|c| state.players[&id].hand.contains(c)) {
        return None;
    }

    let player = state.players.get_mut(&id).unwrap();
    player.hand.retain(|c| !play.cards.contains(c));
    let emptied = player.hand.is_empty();

    state.current_play = Some(play.clone());
    state.pass_count = 0;
    state.last_leader = Some(id);

    let mut game_over = false;
    if emptied {
        state.players.get_mut(&id).unwrap().finished = true;
        state.rankings.push(id);
        // 轮次不是按索引平移，而是先记住座位顺序上的下一位，
        // 移除后重新定位，避免收缩带来的越界或错位。
        let next = state.active[(state.turn_idx + 1) % state.active.len()];
        state.active.retain(|p| *p != id);
        if state.active.len() == 1 {
            let last = state.active[0];
            state.rankings.push(last);
            end_game(state);
            game_over = true;
        } else {
            state.turn_idx = state.active.iter().position(|p| *p == next).unwrap();
        }
    } else {
        advance_turn(state);
    }

    Some(PlayOutcome { play, finished: emptied, game_over })
}

/// 处理过牌
///
/// 桌面为空时的过牌只是把轮次让给下一位（正常流程里领出者
/// 总会出牌，这条路径基本不可达）。其余情况累计过牌数；当除
/// 领出者以外的所有活动玩家都过了牌，本轮清空，由最后出牌者
/// 重新自由领出。
pub fn handle_pass(state: &mut GameState, id: PlayerId) -> bool {
    if state.current_player_id() != Some(id) {
        return false;
    }
    if state.current_play.is_none() {
        advance_turn(state);
        return true;
    }

    state.pass_count += 1;
    if state.pass_count >= state.active.len() - 1 {
        state.current_play = None;
        state.pass_count = 0;
        state.turn_idx = leader_turn_idx(state);
    } else {
        advance_turn(state);
    }
    true
}

/// 新一轮的领出者：上一次成功出牌的玩家。
/// 若其已出完或离开，按座位顺序顺延到其后第一位仍在场的活动玩家。
fn leader_turn_idx(state: &GameState) -> usize {
    let Some(leader) = state.last_leader else {
        return state.turn_idx;
    };
    if let Some(idx) = state.active.iter().position(|p| *p == leader) {
        return idx;
    }
    next_active_after(state, &leader).unwrap_or(state.turn_idx)
}

/// 座位顺序中紧跟某玩家之后的第一位活动玩家，返回其在 active 中的索引
fn next_active_after(state: &GameState, id: &PlayerId) -> Option<usize> {
    let seat = state.seats.iter().position(|p| p == id)?;
    let n = state.seats.len();
    for step in 1..=n {
        let candidate = state.seats[(seat + step) % n];
        if let Some(idx) = state.active.iter().position(|p| *p == candidate) {
            return Some(idx);
        }
    }
    None
}

fn advance_turn(state: &mut GameState) {
    if !state.active.is_empty() {
        state.turn_idx = (state.turn_idx + 1) % state.active.len();
    }
}

/// 把玩家从游戏中彻底移除（离开房间或断线）
///
/// 与出完牌不同，离开者同时从座位列表消失，手牌直接作废。
/// 进行中的对局只剩一名活动玩家时，该玩家按最后在场记名次，
/// 本局就此结束。
pub fn remove_player(state: &mut GameState, id: PlayerId) -> RemoveOutcome {
    if !state.players.contains_key(&id) {
        return RemoveOutcome { removed: false, game_over: false };
    }

    // 先记下当前行动者，移除后据此重新定位轮次
    let turn_holder = state.current_player_id();
    let was_active = state.active.contains(&id);
    let next_after = if was_active && state.active.len() > 1 && turn_holder == Some(id) {
        Some(state.active[(state.turn_idx + 1) % state.active.len()])
    } else {
        None
    };

    state.players.remove(&id);
    state.seats.retain(|p| *p != id);
    state.active.retain(|p| *p != id);
    state.ready.remove(&id);

    let mut game_over = false;
    if state.phase == GamePhase::Active && was_active {
        if state.active.len() == 1 {
            let last = state.active[0];
            state.rankings.push(last);
            end_game(state);
            game_over = true;
        } else if let Some(next) = next_after {
            state.turn_idx = state.active.iter().position(|p| *p == next).unwrap();
        } else if let Some(holder) = turn_holder {
            // 轮次在别人手里，重新找到其位置即可
            if let Some(idx) = state.active.iter().position(|p| *p == holder) {
                state.turn_idx = idx;
            }
        }
    }
    RemoveOutcome { removed: true, game_over }
}

/// 自由模式下确认再来一局；大厅模式中此操作不生效。
/// 当所有活动玩家都已确认时自动重新开局。
pub fn ready_up(state: &mut GameState, id: PlayerId) -> ReadyOutcome {
    if !state.auto_start
        || state.phase != GamePhase::AwaitingReady
        || !state.players.contains_key(&id)
    {
        return ReadyOutcome { accepted: false, restarted: false };
    }
    state.ready.insert(id);

    let all_ready = state
        .seats
        .iter()
        .filter(|p| state.players.get(*p).map_or(false, |p| !p.spectator))
        .all(|p| state.ready.contains(p));
    let restarted = all_ready && start_game(state);
    ReadyOutcome { accepted: true, restarted }
}

/// 大厅模式：一局结束后由房主把房间拉回等待阶段，不重新发牌
pub fn return_to_lobby(state: &mut GameState) -> bool {
    if state.phase != GamePhase::AwaitingReady {
        return false;
    }
    state.phase = GamePhase::Waiting;
    state.ready.clear();
    true
}

/// 结束本局：清空手牌与桌面，进入等待确认阶段。
/// 名次保留到下一次开局。
fn end_game(state: &mut GameState) {
    for p in state.players.values_mut() {
        p.hand.clear();
    }
    state.active.clear();
    state.turn_idx = 0;
    state.current_play = None;
    state.pass_count = 0;
    state.last_leader = None;
    state.phase = GamePhase::AwaitingReady;
}

// --- 单元测试 ---
