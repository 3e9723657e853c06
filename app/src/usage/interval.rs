use anyhow::Context;
use serde_json::{Map, Number, Value};

use crate::core::time::DateTime;

const INTERVAL_TIME_FORMAT: &str = "%H:%M %Y%m%d";

/// Identifies one billing sub-interval by its local start and end instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
#[display("{start}-{end}")]
pub struct IntervalKey {
    start: i64,
    end: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeafInterval {
    pub total_spend: Number,
    pub start_ts: i64,
    pub end_ts: i64,
    pub key: IntervalKey,
}

impl LeafInterval {
    pub fn new(total_spend: Number, start_ts: i64, end_ts: i64) -> Self {
        Self {
            total_spend,
            start_ts,
            end_ts,
            key: IntervalKey {
                start: start_ts,
                end: end_ts,
            },
        }
    }
}

/// Lazily walks a tree of usage intervals and yields every node carrying a spend and a time range.
///
/// Nested intervals are visited before the node containing them, independent of whether that
/// node is a leaf itself. Iteration follows document order. The same interval may be yielded
/// more than once if the document repeats it.
pub struct IntervalWalker<'a> {
    //entries still to visit per nesting level, together with the node owning that level
    stack: Vec<(serde_json::map::Iter<'a>, Option<(&'a str, &'a Value)>)>,
    include_zero_spend: bool,
}

pub fn walk(intervals: &Map<String, Value>, include_zero_spend: bool) -> IntervalWalker<'_> {
    IntervalWalker {
        stack: vec![(intervals.iter(), None)],
        include_zero_spend,
    }
}

impl<'a> Iterator for IntervalWalker<'a> {
    type Item = LeafInterval;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (entries, _) = self.stack.last_mut()?;

            match entries.next() {
                Some((id, node)) => match node.get("intervals").and_then(Value::as_object) {
                    Some(nested) => self.stack.push((nested.iter(), Some((id.as_str(), node)))),
                    None => {
                        if let Some(leaf) = self.to_leaf(id, node) {
                            return Some(leaf);
                        }
                    }
                },
                None => {
                    if let Some((_, Some((id, node)))) = self.stack.pop() {
                        if let Some(leaf) = self.to_leaf(id, node) {
                            return Some(leaf);
                        }
                    }
                }
            }
        }
    }
}

impl IntervalWalker<'_> {
    fn to_leaf(&self, id: &str, node: &Value) -> Option<LeafInterval> {
        let range = node.get("interval_range")?;

        let total_spend = match node.get("data")?.get("total_spend")? {
            Value::Number(n) => n,
            Value::Null => return None,
            other => {
                tracing::warn!("Skipping interval {}: total_spend is not a number: {}", id, other);
                return None;
            }
        };

        if !self.include_zero_spend && is_zero(total_spend) {
            return None;
        }

        match parse_range(range) {
            Ok((start, end)) => Some(LeafInterval::new(total_spend.clone(), start.timestamp(), end.timestamp())),
            Err(e) => {
                tracing::warn!("Skipping interval {}: {:#}", id, e);
                None
            }
        }
    }
}

fn is_zero(n: &Number) -> bool {
    n.as_f64() == Some(0.0)
}

fn parse_range(range: &Value) -> anyhow::Result<(DateTime, DateTime)> {
    Ok((
        parse_boundary(range, "starts_at")?,
        parse_boundary(range, "ends_at")?,
    ))
}

fn parse_boundary(range: &Value, name: &str) -> anyhow::Result<DateTime> {
    let boundary = range.get(name).with_context(|| format!("{} missing", name))?;

    let time = boundary
        .get("time")
        .and_then(Value::as_str)
        .with_context(|| format!("{}.time missing", name))?;
    let date = boundary
        .get("yyyymmdd")
        .and_then(Value::as_str)
        .with_context(|| format!("{}.yyyymmdd missing", name))?;

    DateTime::parse_local(&format!("{} {}", time, date), INTERVAL_TIME_FORMAT)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn range(start: &str, end: &str) -> Value {
        json!({
            "starts_at": {"time": start, "yyyymmdd": "20240101"},
            "ends_at": {"time": end, "yyyymmdd": "20240101"}
        })
    }

    fn ts(time: &str) -> i64 {
        DateTime::parse_local(&format!("{} 20240101", time), INTERVAL_TIME_FORMAT)
            .unwrap()
            .timestamp()
    }

    fn intervals(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn yields_leaf_with_spend_and_range() {
        let tree = intervals(json!({
            "a": {"data": {"total_spend": 5}, "interval_range": range("00:00", "00:30")}
        }));

        let leaves: Vec<_> = walk(&tree, false).collect();

        assert_eq!(leaves, vec![LeafInterval::new(Number::from(5), ts("00:00"), ts("00:30"))]);
    }

    #[test]
    fn key_is_start_and_end_timestamp() {
        let leaf = LeafInterval::new(Number::from(1), 1704067200, 1704069000);

        assert_eq!(leaf.key.to_string(), "1704067200-1704069000");
    }

    #[test]
    fn key_is_reproducible() {
        let tree = intervals(json!({
            "a": {"data": {"total_spend": 1}, "interval_range": range("00:00", "00:30")}
        }));

        let first: Vec<_> = walk(&tree, false).map(|l| l.key).collect();
        let second: Vec<_> = walk(&tree, false).map(|l| l.key).collect();

        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn skips_zero_and_null_spend() {
        let tree = intervals(json!({
            "zero": {"data": {"total_spend": 0}, "interval_range": range("00:00", "00:30")},
            "zero_float": {"data": {"total_spend": 0.0}, "interval_range": range("00:30", "01:00")},
            "null": {"data": {"total_spend": null}, "interval_range": range("01:00", "01:30")}
        }));

        assert_eq!(walk(&tree, false).count(), 0);
    }

    #[test]
    fn yields_zero_spend_when_included() {
        let tree = intervals(json!({
            "zero": {"data": {"total_spend": 0}, "interval_range": range("00:00", "00:30")},
            "null": {"data": {"total_spend": null}, "interval_range": range("01:00", "01:30")}
        }));

        let leaves: Vec<_> = walk(&tree, true).collect();

        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].start_ts, ts("00:00"));
    }

    #[test]
    fn requires_data_and_range() {
        let tree = intervals(json!({
            "no_range": {"data": {"total_spend": 3}},
            "no_data": {"interval_range": range("00:00", "00:30")},
            "no_spend": {"data": {}, "interval_range": range("00:00", "00:30")}
        }));

        assert_eq!(walk(&tree, false).count(), 0);
    }

    #[test]
    fn finds_deeply_nested_leaf() {
        let tree = intervals(json!({
            "week": {"intervals": {
                "day": {"intervals": {
                    "hour": {"intervals": {
                        "slot": {"data": {"total_spend": 2}, "interval_range": range("00:00", "00:30")}
                    }}
                }}
            }}
        }));

        let leaves: Vec<_> = walk(&tree, false).collect();

        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].end_ts, ts("00:30"));
    }

    #[test]
    fn yields_children_before_qualifying_parent() {
        let tree = intervals(json!({
            "day": {
                "data": {"total_spend": 10},
                "interval_range": range("00:00", "02:00"),
                "intervals": {
                    "first": {"data": {"total_spend": 4}, "interval_range": range("00:00", "01:00")},
                    "second": {"data": {"total_spend": 6}, "interval_range": range("01:00", "02:00")}
                }
            },
            "next": {"data": {"total_spend": 1}, "interval_range": range("02:00", "02:30")}
        }));

        let starts: Vec<_> = walk(&tree, false).map(|l| (l.start_ts, l.end_ts)).collect();

        assert_eq!(
            starts,
            vec![
                (ts("00:00"), ts("01:00")),
                (ts("01:00"), ts("02:00")),
                (ts("00:00"), ts("02:00")),
                (ts("02:00"), ts("02:30")),
            ]
        );
    }

    #[test]
    fn yields_duplicates_unchanged() {
        let tree = intervals(json!({
            "a": {"data": {"total_spend": 1}, "interval_range": range("00:00", "00:30")},
            "b": {"data": {"total_spend": 1}, "interval_range": range("00:00", "00:30")}
        }));

        let keys: Vec<_> = walk(&tree, false).map(|l| l.key).collect();

        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0], keys[1]);
    }

    #[test]
    fn skips_malformed_range() {
        let tree = intervals(json!({
            "bad": {"data": {"total_spend": 1}, "interval_range": {"starts_at": {"time": "xx"}}},
            "good": {"data": {"total_spend": 1}, "interval_range": range("00:00", "00:30")}
        }));

        assert_eq!(walk(&tree, false).count(), 1);
    }
}
