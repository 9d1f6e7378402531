//! Result ranker
//!
//! Match count descending, then release year ascending, then title ascending.
//! Years and titles compare as plain strings (ordinal, case-sensitive) so the
//! output does not depend on locale. The sort is stable, so records equal on
//! all three keys keep their accumulator order.

use std::cmp::Ordering;

use crate::domain::MovieRecord;

pub fn compare(a: &MovieRecord, b: &MovieRecord) -> Ordering {
    b.match_count
        .cmp(&a.match_count)
        .then_with(|| a.year.cmp(&b.year))
        .then_with(|| a.title.cmp(&b.title))
}

pub fn rank(mut records: Vec<MovieRecord>) -> Vec<MovieRecord> {
    records.sort_by(compare);
    records
}
