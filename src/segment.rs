//! Behavioral segments and the ordered rules that assign them

use std::fmt;

use crate::score::RfmScores;

/// Scores at or above this count as high
const HIGH: u8 = 3;
/// Scores at or below this count as low
const LOW: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Active,
    Inactive,
    Departing,
    New,
    Other,
}

impl Segment {
    pub const ALL: [Segment; 5] = [
        Segment::Active,
        Segment::Inactive,
        Segment::Departing,
        Segment::New,
        Segment::Other,
    ];

    /// Segments reported on their own; `Other` only shows in the full table
    pub const NAMED: [Segment; 4] = [
        Segment::Active,
        Segment::Inactive,
        Segment::Departing,
        Segment::New,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Segment::Active => "Active",
            Segment::Inactive => "Inactive",
            Segment::Departing => "Departing",
            Segment::New => "New",
            Segment::Other => "Other",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A predicate over the score triple and the segment it selects
pub type SegmentRule = (fn(&RfmScores) -> bool, Segment);

/// Evaluated top to bottom, first match wins; no match means `Other`.
///
/// Thresholds assume four bins.
pub const SEGMENT_RULES: [SegmentRule; 4] = [
    (all_high, Segment::Active),
    (all_low, Segment::Inactive),
    (lapsed_high_value, Segment::Departing),
    (recent_low_value, Segment::New),
];

fn all_high(s: &RfmScores) -> bool {
    s.recency >= HIGH && s.frequency >= HIGH && s.monetary >= HIGH
}

fn all_low(s: &RfmScores) -> bool {
    s.recency <= LOW && s.frequency <= LOW && s.monetary <= LOW
}

fn lapsed_high_value(s: &RfmScores) -> bool {
    s.recency <= LOW && s.frequency >= HIGH && s.monetary >= HIGH
}

fn recent_low_value(s: &RfmScores) -> bool {
    s.recency >= HIGH && s.frequency <= LOW && s.monetary <= LOW
}

/// Classify a customer from its score triple
pub fn classify(scores: &RfmScores) -> Segment {
    SEGMENT_RULES
        .iter()
        .find(|(predicate, _)| predicate(scores))
        .map_or(Segment::Other, |&(_, segment)| segment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_rule_examples() {
        assert_eq!(classify(&RfmScores::new(4, 4, 4)), Segment::Active);
        assert_eq!(classify(&RfmScores::new(3, 3, 3)), Segment::Active);
        assert_eq!(classify(&RfmScores::new(1, 1, 1)), Segment::Inactive);
        assert_eq!(classify(&RfmScores::new(2, 2, 2)), Segment::Inactive);
        assert_eq!(classify(&RfmScores::new(1, 4, 4)), Segment::Departing);
        assert_eq!(classify(&RfmScores::new(4, 1, 1)), Segment::New);
        assert_eq!(classify(&RfmScores::new(4, 1, 3)), Segment::Other);
        assert_eq!(classify(&RfmScores::new(2, 3, 2)), Segment::Other);
    }

    #[test]
    fn test_every_triple_resolves_to_one_segment() {
        let mut counts: HashMap<Segment, usize> = HashMap::new();

        for r in 1..=4u8 {
            for f in 1..=4u8 {
                for m in 1..=4u8 {
                    let scores = RfmScores::new(r, f, m);
                    let matching = SEGMENT_RULES
                        .iter()
                        .filter(|(predicate, _)| predicate(&scores))
                        .count();
                    // The four rules are mutually exclusive for 4 bins
                    assert!(matching <= 1, "{scores} matched {matching} rules");

                    let segment = classify(&scores);
                    assert_eq!(segment, classify(&scores));
                    *counts.entry(segment).or_default() += 1;
                }
            }
        }

        assert_eq!(counts[&Segment::Active], 8);
        assert_eq!(counts[&Segment::Inactive], 8);
        assert_eq!(counts[&Segment::Departing], 8);
        assert_eq!(counts[&Segment::New], 8);
        assert_eq!(counts[&Segment::Other], 32);
    }

    #[test]
    fn test_segment_names() {
        let names: Vec<String> = Segment::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["Active", "Inactive", "Departing", "New", "Other"]);
        assert!(!Segment::NAMED.contains(&Segment::Other));
    }
}
