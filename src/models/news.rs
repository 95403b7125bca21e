//! News model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A public news item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct News {
    pub id: i64,
    pub title: String,
    pub text: String,
    /// Publication date
    pub date: NaiveDate,
}

/// Input for publishing a news item out of band
#[derive(Debug, Clone)]
pub struct NewsInput {
    pub title: String,
    pub text: String,
    pub date: NaiveDate,
}
