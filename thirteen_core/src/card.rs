use rand::prelude::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
// --- 核心数据结构定义 ---

/// 花色 (Suit)
/// 从弱到强：黑桃 < 梅花 < 方块 < 红桃
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum Suit {
    Spade,   // 黑桃 ♠️
    Club,    // 梅花 ♣️
    Diamond, // 方块 ♦️
    Heart,   // 红桃 ♥️
}

/// 点数 (Rank)
/// 3 最小，2 最大
/// Ord 的派生顺序即牌力顺序
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum Rank {
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
    Two,
}

/// 单张扑克牌 (Card)
/// 派生的 Ord 先比点数，点数相同再比花色。
/// 点数+花色唯一确定一张牌，52 张牌之间不存在并列。
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Card {
        Card { rank, suit }
    }
}

/// 牌型 (ComboKind)
/// 一次出牌必须构成以下组合之一。
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum ComboKind {
    Single,         // 单张
    Pair,           // 对子
    Triplet,        // 三条
    Quartet,        // 四条（炸弹）
    Sequence,       // 顺子（3 张起，不含 2）
    DoubleSequence, // 连对（3 连对起，不含 2）
}

/// 一次出牌 (Play)
/// cards 始终按牌力升序排列，highest 为其中最大的一张
/// （对顺子和连对来说就是最顶端的那张牌）。
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Play {
    pub kind: ComboKind,
    pub cards: Vec<Card>,
    pub highest: Card,
}

// --- 实现辅助功能 ---

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            Suit::Spade => "♠️",
            Suit::Club => "♣️",
            Suit::Diamond => "♦️",
            Suit::Heart => "♥️",
        })
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
            Rank::Ace => "A",
            Rank::Two => "2",
        })
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

/// 无法识别的牌面表示
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCardError(pub String);

impl fmt::Display for ParseCardError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "无法识别的牌: {}", self.0)
    }
}

impl std::error::Error for ParseCardError {}

impl FromStr for Card {
    type Err = ParseCardError;

    /// 解析形如 "3s"、"10h"、"Jd" 的文本牌面（点数 + 花色字母，不区分大小写）
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim().to_ascii_lowercase();
        let mut chars = text.chars();
        let suit = match chars.next_back() {
            Some('s') => Suit::Spade,
            Some('c') => Suit::Club,
            Some('d') => Suit::Diamond,
            Some('h') => Suit::Heart,
            _ => return Err(ParseCardError(s.to_string())),
        };
        let rank = match chars.as_str() {
            "3" => Rank::Three,
            "4" => Rank::Four,
            "5" => Rank::Five,
            "6" => Rank::Six,
            "7" => Rank::Seven,
            "8" => Rank::Eight,
            "9" => Rank::Nine,
            "10" | "t" => Rank::Ten,
            "j" => Rank::Jack,
            "q" => Rank::Queen,
            "k" => Rank::King,
            "a" => Rank::Ace,
            "2" => Rank::Two,
            _ => return Err(ParseCardError(s.to_string())),
        };
        Ok(Card { rank, suit })
    }
}

// --- 牌组生成 ---

/// 创建一副完整的 52 张扑克牌
pub fn create_deck() -> Vec<Card> {
    let suits = [Suit::Spade, Suit::Club, Suit::Diamond, Suit::Heart];
    let ranks = [
        Rank::Three, Rank::Four, Rank::Five, Rank::Six, Rank::Seven, Rank::Eight, Rank::Nine,
        Rank::Ten, Rank::Jack, Rank::Queen, Rank::King, Rank::Ace, Rank::Two,
    ];
    let mut deck = Vec::with_capacity(52);
    for &suit in &suits {
        for &rank in &ranks {
            deck.push(Card { rank, suit });
        }
    }
    deck
}

/// 创建一副洗好的新牌
pub fn shuffled_deck() -> Vec<Card> {
    let mut deck = create_deck();
    let mut rng = rand::rng();
    deck.shuffle(&mut rng);
    deck
}

// --- 牌型判定逻辑 ---

/// 把一组无序的牌判定为一个合法牌型
///
/// 返回 None 表示不构成任何可识别的组合
/// （空输入、重复牌、点数杂乱等都会被拒绝）。
/// 同一组牌无论输入顺序如何，判定结果相同。
pub fn classify(cards: &[Card]) -> Option<Play> {
    if cards.is_empty() {
        return None;
    }
    let mut sorted = cards.to_vec();
    sorted.sort();
    // 同一张牌出现两次的输入直接拒绝
    if sorted.windows(2).any(|w| w[0] == w[1]) {
        return None;
    }

    let kind = match sorted.len() {
        1 => ComboKind::Single,
        2 if same_rank(&sorted) => ComboKind::Pair,
        3 if same_rank(&sorted) => ComboKind::Triplet,
        4 if same_rank(&sorted) => ComboKind::Quartet,
        n if n >= 3 && is_sequence(&sorted) => ComboKind::Sequence,
        n if n >= 6 && n % 2 == 0 && is_double_sequence(&sorted) => ComboKind::DoubleSequence,
        _ => return None,
    };

    let highest = *sorted.last().unwrap();
    Some(Play { kind, cards: sorted, highest })
}

fn same_rank(cards: &[Card]) -> bool {
    cards.windows(2).all(|w| w[0].rank == w[1].rank)
}

/// 顺子：点数逐张递增一级，2 不能参与
fn is_sequence(cards: &[Card]) -> bool {
    if cards.iter().any(|c| c.rank == Rank::Two) {
        return false;
    }
    cards.windows(2).all(|w| w[1].rank as u8 == w[0].rank as u8 + 1)
}

/// 连对：相邻两张同点数成对，对与对之间点数递增一级，2 不能参与
fn is_double_sequence(cards: &[Card]) -> bool {
    if cards.iter().any(|c| c.rank == Rank::Two) {
        return false;
    }
    let pairs: Vec<_> = cards.chunks(2).collect();
    pairs.iter().all(|p| p[0].rank == p[1].rank)
        && pairs
            .windows(2)
            .all(|w| w[1][0].rank as u8 == w[0][0].rank as u8 + 1)
}

// --- 出牌合法性比较 ---

/// 判断候选牌型能否压过桌面上的当前牌型
///
/// - 桌面为空时自由出牌，任何合法牌型都可以领出。
/// - 牌型与张数完全一致时比较 highest，必须严格更大。
/// - 牌型不一致时只允许炸弹压制，且仅当桌面牌型的 highest 点数为 2：
///
/// | 桌面牌型 | 可炸组合            |
/// |----------|---------------------|
/// | 单张     | 四条，或 ≥6 张连对  |
/// | 对子     | 四条，或 ≥8 张连对  |
/// | 三条     | ≥10 张连对          |
/// | 四条     | 无                  |
pub fn is_legal(candidate: &Play, current: Option<&Play>) -> bool {
    let Some(current) = current else {
        return true;
    };

    if candidate.kind == current.kind && candidate.cards.len() == current.cards.len() {
        return candidate.highest > current.highest;
    }

    // 炸弹只在桌面被 2 领住时生效
    if current.highest.rank != Rank::Two {
        return false;
    }
    let len = candidate.cards.len();
    match (current.kind, candidate.kind) {
        (ComboKind::Single, ComboKind::Quartet) => true,
        (ComboKind::Single, ComboKind::DoubleSequence) => len >= 6,
        (ComboKind::Pair, ComboKind::Quartet) => true,
        (ComboKind::Pair, ComboKind::DoubleSequence) => len >= 8,
        (ComboKind::Triplet, ComboKind::DoubleSequence) => len >= 10,
        _ => false,
    }
}

// --- 单元测试 ---

#[cfg(test)]
mod tests {
    use super::*;
    use Rank::*;
    use Suit::*;

    // 辅助函数，用于快速创建牌
    fn card(rank: Rank, suit: Suit) -> Card {
        Card { rank, suit }
    }

    fn play(cards: &[Card]) -> Play {
        classify(cards).unwrap()
    }

    // --- 大小关系测试 ---

    #[test]
    fn test_card_total_order() {
        // 点数优先：3 最小，2 最大
        assert!(card(Three, Heart) < card(Four, Spade));
        assert!(card(Ace, Heart) < card(Two, Spade));
        // 点数相同比花色：黑桃 < 梅花 < 方块 < 红桃
        assert!(card(Seven, Spade) < card(Seven, Club));
        assert!(card(Seven, Club) < card(Seven, Diamond));
        assert!(card(Seven, Diamond) < card(Seven, Heart));
        // 全局最小与最大
        let mut deck = create_deck();
        deck.sort();
        assert_eq!(deck[0], card(Three, Spade));
        assert_eq!(deck[51], card(Two, Heart));
    }

    #[test]
    fn test_deck_has_52_unique_cards() {
        let deck = create_deck();
        assert_eq!(deck.len(), 52);
        let unique: std::collections::HashSet<Card> = deck.into_iter().collect();
        assert_eq!(unique.len(), 52);
    }

    #[test]
    fn test_card_parsing() {
        assert_eq!("3s".parse::<Card>().unwrap(), card(Three, Spade));
        assert_eq!("10h".parse::<Card>().unwrap(), card(Ten, Heart));
        assert_eq!("Jd".parse::<Card>().unwrap(), card(Jack, Diamond));
        assert_eq!("2C".parse::<Card>().unwrap(), card(Two, Club));
        assert!("".parse::<Card>().is_err());
        assert!("xx".parse::<Card>().is_err());
        assert!("11h".parse::<Card>().is_err());
    }

    // --- 牌型判定测试 ---

    #[test]
    fn test_classify_basic_kinds() {
        assert_eq!(classify(&[card(Five, Heart)]).unwrap().kind, ComboKind::Single);
        assert_eq!(
            classify(&[card(Five, Heart), card(Five, Spade)]).unwrap().kind,
            ComboKind::Pair
        );
        assert_eq!(
            classify(&[card(Nine, Heart), card(Nine, Spade), card(Nine, Club)]).unwrap().kind,
            ComboKind::Triplet
        );
        assert_eq!(
            classify(&[
                card(Queen, Heart),
                card(Queen, Spade),
                card(Queen, Club),
                card(Queen, Diamond)
            ])
            .unwrap()
            .kind,
            ComboKind::Quartet
        );
    }

    #[test]
    fn test_classify_rejects_garbage() {
        // 空输入
        assert!(classify(&[]).is_none());
        // 点数不同的两张不是对子
        assert!(classify(&[card(Three, Spade), card(Four, Spade)]).is_none());
        // 同一张牌出现两次
        assert!(classify(&[card(Three, Spade), card(Three, Spade)]).is_none());
        // 点数杂乱
        assert!(classify(&[card(Three, Spade), card(Five, Club), card(Nine, Heart)]).is_none());
    }

    #[test]
    fn test_classify_sequence() {
        let run = classify(&[card(Three, Spade), card(Four, Club), card(Five, Heart)]).unwrap();
        assert_eq!(run.kind, ComboKind::Sequence);
        assert_eq!(run.highest, card(Five, Heart));

        // 顺子长度必须至少为 3
        assert!(classify(&[card(Three, Spade), card(Four, Club)]).is_none());
        // 含 2 的顺子不成立
        assert!(classify(&[card(King, Spade), card(Ace, Club), card(Two, Heart)]).is_none());
        // 点数断开不成立
        assert!(classify(&[card(Three, Spade), card(Four, Club), card(Six, Heart)]).is_none());
    }

    #[test]
    fn test_classify_double_sequence() {
        let run = classify(&[
            card(Three, Spade),
            card(Three, Heart),
            card(Four, Club),
            card(Four, Diamond),
            card(Five, Spade),
            card(Five, Heart),
        ])
        .unwrap();
        assert_eq!(run.kind, ComboKind::DoubleSequence);
        assert_eq!(run.highest, card(Five, Heart));

        // 奇数张不成立
        assert!(classify(&[
            card(Three, Spade),
            card(Three, Heart),
            card(Four, Club),
            card(Four, Diamond),
            card(Five, Spade),
        ])
        .is_none());
        // 两连对（4 张）不够长
        assert!(classify(&[
            card(Three, Spade),
            card(Three, Heart),
            card(Four, Club),
            card(Four, Diamond),
        ])
        .is_none());
        // 含 2 的连对不成立
        assert!(classify(&[
            card(King, Spade),
            card(King, Heart),
            card(Ace, Club),
            card(Ace, Diamond),
            card(Two, Spade),
            card(Two, Heart),
        ])
        .is_none());
        // 对与对之间断开不成立
        assert!(classify(&[
            card(Three, Spade),
            card(Three, Heart),
            card(Five, Club),
            card(Five, Diamond),
            card(Six, Spade),
            card(Six, Heart),
        ])
        .is_none());
    }

    #[test]
    fn test_classify_ignores_input_order() {
        let a = classify(&[card(Five, Heart), card(Three, Spade), card(Four, Club)]).unwrap();
        let b = classify(&[card(Three, Spade), card(Four, Club), card(Five, Heart)]).unwrap();
        assert_eq!(a, b);
        // cards 总是升序排列
        assert_eq!(a.cards, vec![card(Three, Spade), card(Four, Club), card(Five, Heart)]);
    }

    // --- 合法性比较测试 ---

    #[test]
    fn test_free_lead_accepts_anything() {
        let single = play(&[card(Three, Spade)]);
        assert!(is_legal(&single, None));
    }

    #[test]
    fn test_same_kind_comparison() {
        let low = play(&[card(Seven, Club)]);
        let high = play(&[card(Seven, Diamond)]);
        // 同点数靠花色分高下
        assert!(is_legal(&high, Some(&low)));
        assert!(!is_legal(&low, Some(&high)));
        // 相同的牌压不住自己
        assert!(!is_legal(&low, Some(&low)));

        let pair_nines = play(&[card(Nine, Spade), card(Nine, Club)]);
        let pair_tens = play(&[card(Ten, Spade), card(Ten, Club)]);
        assert!(is_legal(&pair_tens, Some(&pair_nines)));
        assert!(!is_legal(&pair_nines, Some(&pair_tens)));
    }

    #[test]
    fn test_sequence_length_must_match() {
        let three_run = play(&[card(Three, Spade), card(Four, Club), card(Five, Heart)]);
        let four_run = play(&[
            card(Four, Spade),
            card(Five, Club),
            card(Six, Heart),
            card(Seven, Heart),
        ]);
        // 长度不同的顺子互不能压
        assert!(!is_legal(&four_run, Some(&three_run)));
        assert!(!is_legal(&three_run, Some(&four_run)));
    }

    #[test]
    fn test_bomb_table_over_led_two() {
        let single_two = play(&[card(Two, Spade)]);
        let pair_twos = play(&[card(Two, Spade), card(Two, Club)]);
        let triplet_twos = play(&[card(Two, Spade), card(Two, Club), card(Two, Diamond)]);

        let quartet = play(&[
            card(Three, Spade),
            card(Three, Club),
            card(Three, Diamond),
            card(Three, Heart),
        ]);
        let double_seq_6 = play(&[
            card(Three, Spade),
            card(Three, Heart),
            card(Four, Club),
            card(Four, Diamond),
            card(Five, Spade),
            card(Five, Heart),
        ]);
        let double_seq_8 = play(&[
            card(Three, Spade),
            card(Three, Heart),
            card(Four, Club),
            card(Four, Diamond),
            card(Five, Spade),
            card(Five, Heart),
            card(Six, Club),
            card(Six, Diamond),
        ]);
        let double_seq_10 = play(&[
            card(Three, Spade),
            card(Three, Heart),
            card(Four, Club),
            card(Four, Diamond),
            card(Five, Spade),
            card(Five, Heart),
            card(Six, Club),
            card(Six, Diamond),
            card(Seven, Spade),
            card(Seven, Heart),
        ]);

        // 单张 2：四条或 ≥6 张连对可炸
        assert!(is_legal(&quartet, Some(&single_two)));
        assert!(is_legal(&double_seq_6, Some(&single_two)));
        // 对 2：四条或 ≥8 张连对可炸，6 张不够
        assert!(is_legal(&quartet, Some(&pair_twos)));
        assert!(!is_legal(&double_seq_6, Some(&pair_twos)));
        assert!(is_legal(&double_seq_8, Some(&pair_twos)));
        // 三条 2：只有 ≥10 张连对可炸
        assert!(!is_legal(&quartet, Some(&triplet_twos)));
        assert!(!is_legal(&double_seq_8, Some(&triplet_twos)));
        assert!(is_legal(&double_seq_10, Some(&triplet_twos)));
    }

    #[test]
    fn test_bomb_requires_led_two() {
        // 桌面是单张 A 而不是 2，炸弹不生效
        let single_ace = play(&[card(Ace, Spade)]);
        let quartet = play(&[
            card(Three, Spade),
            card(Three, Club),
            card(Three, Diamond),
            card(Three, Heart),
        ]);
        assert!(!is_legal(&quartet, Some(&single_ace)));
    }

    #[test]
    fn test_quartet_of_twos_is_unbeatable() {
        let quartet_twos = play(&[
            card(Two, Spade),
            card(Two, Club),
            card(Two, Diamond),
            card(Two, Heart),
        ]);
        let double_seq_10 = play(&[
            card(Three, Spade),
            card(Three, Heart),
            card(Four, Club),
            card(Four, Diamond),
            card(Five, Spade),
            card(Five, Heart),
            card(Six, Club),
            card(Six, Diamond),
            card(Seven, Spade),
            card(Seven, Heart),
        ]);
        // 四条 2 没有任何炸弹可压
        assert!(!is_legal(&double_seq_10, Some(&quartet_twos)));

        // 普通四条仍然可以被更大的四条按常规压过
        let quartet_threes = play(&[
            card(Three, Spade),
            card(Three, Club),
            card(Three, Diamond),
            card(Three, Heart),
        ]);
        let quartet_fours = play(&[
            card(Four, Spade),
            card(Four, Club),
            card(Four, Diamond),
            card(Four, Heart),
        ]);
        assert!(is_legal(&quartet_fours, Some(&quartet_threes)));
    }
}
