//! Byte spans into the source text

use serde::{Deserialize, Serialize};

/// Half-open byte range of a token or diagnostic in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }
}
