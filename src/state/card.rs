//! Card model and the play-legality rule.
//!
//! A card is an immutable `{id, color, value}` triple. The id is the only key
//! used to locate a specific card; two cards with the same face are never
//! interchangeable.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Session-unique card identifier.
pub type CardId = u32;

/// Card colors. `Wild` is the printed color of wild and draw4 cards until a
/// participant picks a real color at play time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Green,
    Blue,
    Yellow,
    Wild,
}

impl Color {
    /// The four colors a wild card may be assigned.
    pub const PLAYABLE: [Color; 4] = [Color::Red, Color::Green, Color::Blue, Color::Yellow];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Yellow => "yellow",
            Self::Wild => "wild",
        }
    }

    pub fn is_wild(&self) -> bool {
        matches!(self, Self::Wild)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Card face values.
///
/// Serialized as the strings `"0"`..`"9"`, `"skip"`, `"reverse"`, `"draw2"`,
/// `"wild"` and `"draw4"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Value {
    Number(u8),
    Skip,
    Reverse,
    Draw2,
    Wild,
    Draw4,
}

impl Value {
    /// Colored action faces, printed twice per color.
    pub const ACTIONS: [Value; 3] = [Value::Skip, Value::Reverse, Value::Draw2];

    /// Whether the player picks the color when playing this card.
    pub fn takes_color(&self) -> bool {
        matches!(self, Self::Wild | Self::Draw4)
    }

    /// Cards forced onto the next seat when this card is played.
    pub fn penalty(&self) -> usize {
        match self {
            Self::Draw2 => 2,
            Self::Draw4 => 4,
            _ => 0,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Skip => f.write_str("skip"),
            Self::Reverse => f.write_str("reverse"),
            Self::Draw2 => f.write_str("draw2"),
            Self::Wild => f.write_str("wild"),
            Self::Draw4 => f.write_str("draw4"),
        }
    }
}

impl FromStr for Value {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skip" => Ok(Self::Skip),
            "reverse" => Ok(Self::Reverse),
            "draw2" => Ok(Self::Draw2),
            "wild" => Ok(Self::Wild),
            "draw4" => Ok(Self::Draw4),
            _ => match s.parse::<u8>() {
                Ok(n) if n <= 9 => Ok(Self::Number(n)),
                _ => Err(format!("unknown card value: {}", s)),
            },
        }
    }
}

impl TryFrom<String> for Value {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Value> for String {
    fn from(v: Value) -> Self {
        v.to_string()
    }
}

/// A single card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub color: Color,
    pub value: Value,
}

impl Card {
    pub fn new(id: CardId, color: Color, value: Value) -> Self {
        Self { id, color, value }
    }

    /// Same card with a different color. Used when a wild is played.
    pub fn recolored(self, color: Color) -> Self {
        Self { color, ..self }
    }

    /// Face-matching rule: same color, same value, or a wild/draw4.
    ///
    /// Does not include the draw4 restriction, see [`check_play`].
    pub fn matches(&self, top: &Card) -> bool {
        self.color == top.color || self.value == top.value || self.value.takes_color()
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} (#{})", self.color, self.value, self.id)
    }
}

/// Why a card may not be played on the current top card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayRejection {
    /// Draw4 while holding a card of the top card's color.
    Draw4WithColor(Color),
    /// Neither color nor value matches.
    NoMatch,
}

impl fmt::Display for PlayRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draw4WithColor(c) => {
                write!(f, "Cannot play Draw 4 when you have {} cards", c)
            }
            Self::NoMatch => write!(f, "Card does not match the top card"),
        }
    }
}

/// Full legality check for playing `card` from `hand` onto `top`.
///
/// `hand` is the actor's hand before the card leaves it.
pub fn check_play(hand: &[Card], card: &Card, top: &Card) -> Result<(), PlayRejection> {
    let holds_top_color = !top.color.is_wild() && hand.iter().any(|c| c.color == top.color);
    if card.value == Value::Draw4 && holds_top_color {
        return Err(PlayRejection::Draw4WithColor(top.color));
    }
    if !card.matches(top) {
        return Err(PlayRejection::NoMatch);
    }
    Ok(())
}

/// Mints session-unique card ids.
#[derive(Debug, Clone)]
pub struct CardIds {
    next: CardId,
}

impl Default for CardIds {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl CardIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint(&mut self) -> CardId {
        let id = self.next;
        self.next += 1;
        id
    }
}
