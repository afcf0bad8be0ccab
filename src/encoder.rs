//! Position history frames and the policy for padding short histories.

use crate::options::{FromOptionValue, OptionValue};

use chess::{BitBoard, Board};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of positions (current plus previous) the network looks at.
pub const HISTORY_LENGTH: usize = 8;

/// Piece planes (6 per side) plus two repetition bits.
pub const FRAME_SIZE: usize = 14;

/// How to fill history slots that precede the first known position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillEmptyHistory {
    /// Leave missing frames empty.
    No,
    /// Synthesize missing frames only when the game did not begin at the standard start position.
    FenOnly,
    /// Always synthesize missing frames.
    Always,
}

impl FillEmptyHistory {
    /// Option strings, in declaration order.
    pub const CHOICES: &'static [&'static str] = &["no", "fen_only", "always"];

    pub fn as_str(&self) -> &'static str {
        match self {
            FillEmptyHistory::No => "no",
            FillEmptyHistory::FenOnly => "fen_only",
            FillEmptyHistory::Always => "always",
        }
    }
}

impl Default for FillEmptyHistory {
    fn default() -> Self {
        FillEmptyHistory::FenOnly
    }
}

impl fmt::Display for FillEmptyHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FillEmptyHistory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no" => Ok(FillEmptyHistory::No),
            "fen_only" => Ok(FillEmptyHistory::FenOnly),
            "always" => Ok(FillEmptyHistory::Always),
            _ => Err(format!("unknown history fill policy '{}'", s)),
        }
    }
}

impl FromOptionValue for FillEmptyHistory {
    const TYPE_NAME: &'static str = "history fill";

    fn from_option(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

/// Input planes for a single board.
///
/// Includes piece and repetition bits.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryFrame {
    frame: [[[f32; FRAME_SIZE]; 8]; 8],
}

impl HistoryFrame {
    pub fn new(b: &Board, reps: usize) -> Self {
        let mut frame = [[[0.0; FRAME_SIZE]; 8]; 8];
        let rbitlow = (reps & 1) as f32;
        let rbithigh = ((reps >> 1) & 1) as f32;

        for sq in BitBoard::new(u64::MAX) {
            let (r, f) = (sq.get_rank().to_index(), sq.get_file().to_index());

            frame[r][f][12] = rbitlow;
            frame[r][f][13] = rbithigh;

            if let (Some(pc), Some(color)) = (b.piece_on(sq), b.color_on(sq)) {
                frame[r][f][pc.to_index() + color.to_index() * 6] = 1.0;
            }
        }

        HistoryFrame { frame: frame }
    }

    /// An all-zero frame, used for history that is left unfilled.
    pub fn empty() -> Self {
        HistoryFrame {
            frame: [[[0.0; FRAME_SIZE]; 8]; 8],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.frame.iter().flatten().flatten().all(|&x| x == 0.0)
    }

    pub fn get_data(&self) -> &[[[f32; FRAME_SIZE]; 8]; 8] {
        &self.frame
    }
}

/// Frames of the positions played so far, oldest first.
#[derive(Clone, Debug)]
pub struct History {
    frames: Vec<HistoryFrame>,
    from_startpos: bool,
}

impl History {
    /// Starts a history at `b`, which may be a position loaded from FEN.
    pub fn new(b: &Board) -> Self {
        History {
            frames: vec![HistoryFrame::new(b, 0)],
            from_startpos: *b == Board::default(),
        }
    }

    pub fn push(&mut self, b: &Board, reps: usize) {
        self.frames.push(HistoryFrame::new(b, reps));
    }

    pub fn pop(&mut self) {
        assert!(self.frames.len() > 1, "cannot pop the initial frame");
        self.frames.pop();
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Whether the game began at the standard start position.
    pub fn from_startpos(&self) -> bool {
        self.from_startpos
    }

    /// Returns exactly `len` frames, newest first.
    ///
    /// Slots older than the first known position are padded according to `fill`:
    /// either with copies of the oldest known frame or with empty frames.
    pub fn window(&self, len: usize, fill: FillEmptyHistory) -> Vec<HistoryFrame> {
        let mut out: Vec<HistoryFrame> = self.frames.iter().rev().take(len).cloned().collect();

        let synthesize = match fill {
            FillEmptyHistory::No => false,
            FillEmptyHistory::FenOnly => !self.from_startpos,
            FillEmptyHistory::Always => true,
        };

        let pad = match (synthesize, self.frames.first()) {
            (true, Some(oldest)) => oldest.clone(),
            _ => HistoryFrame::empty(),
        };

        out.resize(len, pad);
        out
    }
}
