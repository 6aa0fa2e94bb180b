use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::aggregation::config::AggregationConfig;
use crate::models::{AttributeResult, SummaryRecord};

/// Result of polling the buffer at a given instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// The interval has not elapsed yet; the window keeps growing.
    Pending,
    /// The interval elapsed over an empty window. The clock was still reset.
    Empty,
    /// The interval elapsed and the window reduced to a record.
    Record(SummaryRecord),
}

/// Accumulates per-frame results between two flush points.
#[derive(Debug)]
pub struct AggregationBuffer {
    window: Vec<AttributeResult>,
    window_start: DateTime<Utc>,
    config: AggregationConfig,
}

impl AggregationBuffer {
    pub fn new(window_start: DateTime<Utc>, config: AggregationConfig) -> Self {
        Self {
            window: Vec::new(),
            window_start,
            config,
        }
    }

    pub fn add(&mut self, result: AttributeResult) {
        self.window.push(result);
    }

    pub fn window_start(&self) -> DateTime<Utc> {
        self.window_start
    }

    /// Flush when the interval has elapsed since the window start.
    ///
    /// The window start moves to `now` every time the interval elapses,
    /// whether or not a record came out.
    pub fn poll(&mut self, now: DateTime<Utc>) -> FlushOutcome {
        if !should_flush(now, self.window_start, self.config.interval) {
            return FlushOutcome::Pending;
        }

        let window = std::mem::take(&mut self.window);
        self.window_start = now;

        match flush(&window) {
            Some(record) => FlushOutcome::Record(record),
            None => FlushOutcome::Empty,
        }
    }

    /// Drop the open window without producing a record. Returns how many
    /// results were dropped.
    pub fn discard(&mut self) -> usize {
        let dropped = self.window.len();
        self.window.clear();
        dropped
    }
}

/// True once `interval` or more has passed between `window_start` and `now`.
pub fn should_flush(now: DateTime<Utc>, window_start: DateTime<Utc>, interval: Duration) -> bool {
    match (now - window_start).to_std() {
        Ok(elapsed) => elapsed >= interval,
        // now is before the window start
        Err(_) => false,
    }
}

/// Reduce a window to one record. Empty windows produce nothing.
pub fn flush(window: &[AttributeResult]) -> Option<SummaryRecord> {
    let first = window.first()?;
    let last = window.last()?;
    let emotion = dominant_emotion(window.iter().map(AttributeResult::dominant_emotion))?;

    Some(SummaryRecord {
        window_start: first.timestamp,
        window_end: last.timestamp,
        dominant_emotion: emotion.to_string(),
    })
}

/// Most frequent label. On a tie, the label seen first wins.
pub fn dominant_emotion<'a, I>(labels: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    // Kept in first-occurrence order so the tie-break falls out of the scan.
    let mut counts: Vec<(&'a str, usize)> = Vec::new();
    for label in labels {
        match counts.iter_mut().find(|(seen, _)| *seen == label) {
            Some((_, count)) => *count += 1,
            None => counts.push((label, 1)),
        }
    }

    let mut best: Option<(&'a str, usize)> = None;
    for (label, count) in counts {
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((label, count)),
        }
    }
    best.map(|(label, _)| label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attributes::fixtures::result_at;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn window(emotions: &[&str]) -> Vec<AttributeResult> {
        emotions
            .iter()
            .enumerate()
            .map(|(i, emotion)| result_at(t(i as i64 * 15), emotion))
            .collect()
    }

    #[test]
    fn mode_picks_most_frequent() {
        let record = flush(&window(&["happy", "happy", "sad", "happy"])).unwrap();
        assert_eq!(record.dominant_emotion, "happy");
    }

    #[test]
    fn tie_goes_to_first_seen() {
        let record = flush(&window(&["sad", "happy", "sad", "happy"])).unwrap();
        assert_eq!(record.dominant_emotion, "sad");

        let record = flush(&window(&["happy", "sad", "sad", "happy"])).unwrap();
        assert_eq!(record.dominant_emotion, "happy");
    }

    #[test]
    fn later_majority_beats_early_label() {
        assert_eq!(
            dominant_emotion(["neutral", "angry", "angry"]),
            Some("angry")
        );
    }

    #[test]
    fn empty_window_yields_nothing() {
        assert!(flush(&[]).is_none());
        assert!(dominant_emotion(std::iter::empty::<&str>()).is_none());
    }

    #[test]
    fn record_spans_first_to_last_entry() {
        let entries = window(&["fear", "fear", "surprise"]);
        let record = flush(&entries).unwrap();
        assert_eq!(record.window_start, t(0));
        assert_eq!(record.window_end, t(30));
    }

    #[test]
    fn should_flush_boundary_is_inclusive() {
        let interval = Duration::from_secs(60);
        assert!(!should_flush(t(59), t(0), interval));
        assert!(should_flush(t(60), t(0), interval));
        assert!(should_flush(t(61), t(0), interval));
        assert!(!should_flush(t(0), t(10), interval));
    }

    #[test]
    fn two_checks_thirty_seconds_apart() {
        let mut buffer = AggregationBuffer::new(t(0), AggregationConfig::default());

        buffer.add(result_at(t(30), "happy"));
        assert_eq!(buffer.poll(t(30)), FlushOutcome::Pending);
        assert_eq!(buffer.window_start(), t(0));

        buffer.add(result_at(t(60), "happy"));
        match buffer.poll(t(60)) {
            FlushOutcome::Record(record) => {
                assert_eq!(record.dominant_emotion, "happy");
                assert_eq!(record.window_start, t(30));
                assert_eq!(record.window_end, t(60));
            }
            other => panic!("expected a record, got {other:?}"),
        }
        assert_eq!(buffer.discard(), 0);
        assert_eq!(buffer.window_start(), t(60));
    }

    #[test]
    fn empty_window_still_resets_clock() {
        let mut buffer = AggregationBuffer::new(t(0), AggregationConfig::with_interval_secs(60));
        assert_eq!(buffer.poll(t(75)), FlushOutcome::Empty);
        assert_eq!(buffer.window_start(), t(75));
        assert_eq!(buffer.poll(t(120)), FlushOutcome::Pending);
    }

    #[test]
    fn discard_drops_open_window() {
        let mut buffer = AggregationBuffer::new(t(0), AggregationConfig::default());
        buffer.add(result_at(t(1), "sad"));
        buffer.add(result_at(t(2), "sad"));
        assert_eq!(buffer.discard(), 2);
        assert_eq!(buffer.discard(), 0);
    }
}
