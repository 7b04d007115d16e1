//! # BiDi Text Support
//!
//! UAX#9 (Unicode Bidirectional Algorithm) for shop names that mix Arabic
//! or Hebrew with Latin text and digits. Uses `unicode-bidi` for the level
//! analysis.
//!
//! The pipeline:
//! 1. Resolve embedding levels and split the text into directional runs
//! 2. Each run is shaped on its own, in its own direction
//! 3. Runs are put into visual order with rule L2

use crate::style::Direction;
use unicode_bidi::{BidiInfo, Level};

/// A contiguous run of text with a single embedding level.
#[derive(Debug, Clone, PartialEq)]
pub struct BidiRun {
    /// Start byte offset in the original text.
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
    /// Embedding level (even = LTR, odd = RTL).
    pub level: Level,
}

impl BidiRun {
    pub fn is_rtl(&self) -> bool {
        self.level.is_rtl()
    }
}

/// Split `text` into runs of equal embedding level.
///
/// `direction` sets the paragraph level; `Auto` detects it from the first
/// strong character. Only the first paragraph is analyzed: cell text is a
/// single line.
pub fn analyze_bidi(text: &str, direction: Direction) -> Vec<BidiRun> {
    if text.is_empty() {
        return vec![];
    }

    let para_level = match direction {
        Direction::Ltr => Some(Level::ltr()),
        Direction::Rtl => Some(Level::rtl()),
        Direction::Auto => None,
    };

    let bidi_info = BidiInfo::new(text, para_level);
    let Some(paragraph) = bidi_info.paragraphs.first() else {
        return vec![];
    };
    let levels = &bidi_info.levels;

    let mut runs: Vec<BidiRun> = Vec::new();
    for (byte_idx, ch) in text.char_indices() {
        if byte_idx < paragraph.range.start || byte_idx >= paragraph.range.end {
            continue;
        }
        let level = levels[byte_idx];
        let end = byte_idx + ch.len_utf8();
        match runs.last_mut() {
            Some(run) if run.level == level && run.end == byte_idx => run.end = end,
            _ => runs.push(BidiRun {
                start: byte_idx,
                end,
                level,
            }),
        }
    }

    runs
}

/// Check if text needs no reordering at all.
/// This is a fast path to skip BiDi processing for the common case.
pub fn is_pure_ltr(text: &str, direction: Direction) -> bool {
    if matches!(direction, Direction::Rtl) {
        return false;
    }
    !text.chars().any(is_rtl_char)
}

/// Check if a character belongs to a right-to-left script block.
fn is_rtl_char(ch: char) -> bool {
    matches!(ch,
        '\u{0590}'..='\u{05FF}' |  // Hebrew
        '\u{0600}'..='\u{06FF}' |  // Arabic
        '\u{0700}'..='\u{074F}' |  // Syriac
        '\u{0750}'..='\u{077F}' |  // Arabic Supplement
        '\u{0780}'..='\u{07BF}' |  // Thaana
        '\u{08A0}'..='\u{08FF}' |  // Arabic Extended-A
        '\u{FB1D}'..='\u{FB4F}' |  // Hebrew Presentation Forms
        '\u{FB50}'..='\u{FDFF}' |  // Arabic Presentation Forms-A
        '\u{FE70}'..='\u{FEFF}' |  // Arabic Presentation Forms-B
        '\u{200F}' | '\u{202B}' | '\u{202E}' | '\u{2067}'
    )
}

/// Visual order of runs given their levels (rule L2).
///
/// From the highest level down to the lowest odd level, every maximal
/// sequence of runs at that level or above is reversed. Returns indices into
/// `levels`.
pub fn visual_order(levels: &[Level]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..levels.len()).collect();
    let Some(max_level) = levels.iter().copied().max() else {
        return order;
    };
    // Even levels only: every reversal would be undone one level lower.
    if levels.iter().all(|l| l.is_ltr()) {
        return order;
    }

    let min_level = levels.iter().copied().min().unwrap_or(Level::ltr());
    let min_odd = if min_level.is_rtl() {
        min_level.number()
    } else {
        min_level.number() + 1
    };

    let mut current = max_level.number();
    while current >= min_odd {
        let mut i = 0;
        while i < order.len() {
            if levels[order[i]].number() >= current {
                let start = i;
                while i < order.len() && levels[order[i]].number() >= current {
                    i += 1;
                }
                order[start..i].reverse();
            } else {
                i += 1;
            }
        }
        if current == 0 {
            break;
        }
        current -= 1;
    }

    order
}
