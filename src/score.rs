//! Per-customer score triple and its composite code

use std::fmt;

/// Bin labels of one customer, each in `1..=num_bins`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RfmScores {
    pub recency: u8,
    pub frequency: u8,
    pub monetary: u8,
}

impl RfmScores {
    pub fn new(recency: u8, frequency: u8, monetary: u8) -> Self {
        RfmScores {
            recency,
            frequency,
            monetary,
        }
    }

    /// Digits concatenated in R, F, M order: `(4, 2, 3)` gives `"423"`
    pub fn composite(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RfmScores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.recency, self.frequency, self.monetary)
    }
}
