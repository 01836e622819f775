// src/transform/reviews.rs
//
// The order_reviews export contains comments with unescaped commas and line
// breaks. Those rows spill into extra trailing columns (headers
// `Unnamed: 7` … `Unnamed: 12`), pushing the real creation date and answer
// timestamp to the end of the row. Everything here is positional.

use clap::ValueEnum;
use tracing::debug;

use crate::process::RawTable;

/// review_id, order_id, review_score, review_comment_title,
/// review_comment_message, review_creation_date, review_answer_timestamp
pub const CANONICAL_COLUMNS: usize = 7;

const COMMENT_MESSAGE: usize = 4;
const CREATION_DATE: usize = 5;
const ANSWER_TIMESTAMP: usize = 6;

/// Overflow columns, scanned widest first.
pub const FIRST_OVERFLOW: usize = 7;
pub const LAST_OVERFLOW: usize = 12;

const SEPARATOR: &str = ",";

/// How the comment message is rebuilt for a spilled row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum CommentMode {
    /// Known defect, kept on purpose: each fragment overwrites the previous
    /// one, so the comment ends up as `","` plus the last fragment only
    /// (which is also the value moved into the creation date).
    #[default]
    Literal,
    /// Join the message and every fragment before the date with `","`.
    Accumulate,
}

/// Fold overflow fragments back into comment/date/timestamp, then keep only
/// the canonical columns.
///
/// For each overflow column `i` (12 down to 7) and each row with a value in
/// column `i`: the comment is rebuilt per `mode`, the creation date becomes
/// column `i - 1`, the answer timestamp becomes column `i`, and all overflow
/// cells are cleared. A cleared row is not revisited by narrower widths, so
/// each row is repaired exactly once, by its widest populated overflow
/// column, even when several overflow columns hold values.
pub fn format_review_comments(mut table: RawTable, mode: CommentMode) -> RawTable {
    let width = table.num_columns();

    for i in (FIRST_OVERFLOW..=LAST_OVERFLOW).rev() {
        if i >= width {
            continue;
        }

        let mut repaired = 0usize;
        for row in table.rows.iter_mut().filter(|row| row[i].is_some()) {
            let comment = match mode {
                CommentMode::Literal => {
                    row[i - 1].as_ref().map(|f| format!("{}{}", SEPARATOR, f))
                }
                CommentMode::Accumulate => {
                    let parts: Vec<&str> = row[COMMENT_MESSAGE..i - 1]
                        .iter()
                        .flatten()
                        .map(String::as_str)
                        .collect();
                    (!parts.is_empty()).then(|| parts.join(SEPARATOR))
                }
            };

            // read both before writing: for i == 7, column i - 1 is the
            // answer timestamp itself
            let creation_date = row[i - 1].take();
            let answer_timestamp = row[i].take();
            row[COMMENT_MESSAGE] = comment;
            row[CREATION_DATE] = creation_date;
            row[ANSWER_TIMESTAMP] = answer_timestamp;

            for cell in row.iter_mut().take(LAST_OVERFLOW + 1).skip(FIRST_OVERFLOW) {
                *cell = None;
            }
            repaired += 1;
        }

        if repaired > 0 {
            debug!(column = i, rows = repaired, "folded overflow columns");
        }
    }

    table.truncate_columns(CANONICAL_COLUMNS);
    table
}
