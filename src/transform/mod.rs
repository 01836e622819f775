// src/transform/mod.rs

use anyhow::Result;
use std::fmt;

use crate::process::RawTable;

pub mod reviews;
pub mod sellers;

use reviews::CommentMode;

/// Cleaning rule picked from an object key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    OrderReviews,
    Sellers,
}

impl Rule {
    /// Case-insensitive substring match on the key. Reviews are checked
    /// first, so a key naming both datasets gets the review rule only.
    pub fn for_key(key: &str) -> Option<Rule> {
        let key = key.to_lowercase();
        if key.contains("order_reviews") {
            Some(Rule::OrderReviews)
        } else if key.contains("sellers") {
            Some(Rule::Sellers)
        } else {
            None
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Rule::OrderReviews => "order_reviews",
            Rule::Sellers => "sellers",
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TransformOptions {
    pub comment_mode: CommentMode,
}

/// Run `rule` (if any) over `table`. No rule means the table is returned as is.
pub fn apply(rule: Option<Rule>, table: RawTable, options: &TransformOptions) -> Result<RawTable> {
    match rule {
        Some(Rule::OrderReviews) => Ok(reviews::format_review_comments(
            table,
            options.comment_mode,
        )),
        Some(Rule::Sellers) => sellers::drop_geographic_columns(table),
        None => Ok(table),
    }
}
