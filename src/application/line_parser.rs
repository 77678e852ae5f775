use regex::Regex;

use crate::domain::ItemProgress;
use crate::utils::item_name_from_path;

const DOWNLOAD_MARKER: &str = "[download]";

/// Percentages at or above this count as a finished item.
pub const ITEM_DONE_PERCENT: f64 = 99.9;

#[derive(Debug, Clone, PartialEq)]
pub enum ParseEvent {
    TotalItems(u32),
    ItemName(String),
    /// Percent of the current item, 0 to 100
    Percent(f64),
    ItemCompleted,
}

/// Best-effort scraper for human readable downloader output.
///
/// Nothing in here fails: a line that matches no rule simply yields no
/// events and leaves the job state alone.
#[derive(Debug, Clone)]
pub struct LineParser {
    count: Regex,
    fraction: Regex,
    destination: Regex,
}

impl LineParser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            count: Regex::new(r"(?i)\b(?:contains|downloading)\s+(\d+)\s+(?:entries|videos|tracks|items)\b")?,
            fraction: Regex::new(r"(\d+)/(\d+)")?,
            destination: Regex::new(r"Destination:\s*(.+)")?,
        })
    }

    pub fn parse_line(&self, line: &str, state: &mut ItemProgress) -> Vec<ParseEvent> {
        let mut events = Vec::new();

        if state.total_items.is_none() {
            if let Some(total) = self.total_items(line) {
                state.total_items = Some(total);
                events.push(ParseEvent::TotalItems(total));
            }
        }

        if let Some(name) = self.item_name(line) {
            state.current_item = Some(name.clone());
            events.push(ParseEvent::ItemName(name));
        }

        if let Some(percent) = item_percent(line) {
            events.push(ParseEvent::Percent(percent));
            if percent >= ITEM_DONE_PERCENT {
                state.completed_items += 1;
                events.push(ParseEvent::ItemCompleted);
            }
        }

        events
    }

    fn total_items(&self, line: &str) -> Option<u32> {
        // The count phrase wins over an index/total pair on the same line.
        // The pair also matches HLS fragment counters like `(frag 2/40)`,
        // which can set the total of a single-track job.
        let from_count = self
            .count
            .captures(line)
            .and_then(|c| c[1].parse::<u32>().ok());
        let total = from_count.or_else(|| {
            self.fraction
                .captures(line)
                .and_then(|c| c[2].parse::<u32>().ok())
        })?;
        (total > 0).then_some(total)
    }

    fn item_name(&self, line: &str) -> Option<String> {
        let captures = self.destination.captures(line)?;
        item_name_from_path(captures[1].trim())
    }
}

/// Number right before the first `%` of a download progress line.
fn item_percent(line: &str) -> Option<f64> {
    if !line.contains(DOWNLOAD_MARKER) {
        return None;
    }
    let (head, _) = line.split_once('%')?;
    let value = head.split_whitespace().last()?.parse::<f64>().ok()?;
    if value.is_nan() {
        return None;
    }
    Some(value.clamp(0.0, 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> LineParser {
        LineParser::new().unwrap()
    }

    #[test]
    fn test_playlist_walkthrough() {
        let parser = parser();
        let mut state = ItemProgress::default();

        let events = parser.parse_line("[youtube] Downloading 3 videos", &mut state);
        assert_eq!(events, vec![ParseEvent::TotalItems(3)]);
        assert_eq!(state.total_items, Some(3));

        parser.parse_line("[download] Destination: foo/01 - Song.mp3", &mut state);
        assert_eq!(state.current_item.as_deref(), Some("01 - Song"));

        let events = parser.parse_line("[download]  45.0% of ~3.50MiB", &mut state);
        assert_eq!(events, vec![ParseEvent::Percent(45.0)]);
        assert_eq!(state.completed_items, 0);

        let events = parser.parse_line("[download] 100.0% of 3.50MiB", &mut state);
        assert_eq!(events, vec![ParseEvent::Percent(100.0), ParseEvent::ItemCompleted]);
        assert_eq!(state.completed_items, 1);
    }

    #[test]
    fn test_unmatched_lines_change_nothing() {
        let parser = parser();
        let mut state = ItemProgress {
            total_items: Some(4),
            completed_items: 2,
            current_item: Some("03 - Three".to_string()),
        };
        let before = state.clone();

        for line in [
            "",
            "[soundcloud] Extracting URL: https://soundcloud.com/artist/sets/mix",
            "[ExtractAudio] Not converting audio; file is already in target format",
            "Deleting original file 03 - Three.webm (pass -k to keep)",
            "45% done but no marker",
        ] {
            assert!(parser.parse_line(line, &mut state).is_empty(), "line: {line:?}");
        }
        assert_eq!(state, before);
    }

    #[test]
    fn test_total_is_set_once() {
        let parser = parser();
        let mut state = ItemProgress::default();

        parser.parse_line("[soundcloud:set] mix: Downloading 12 items", &mut state);
        parser.parse_line("[youtube] Playlist x: Downloading 40 videos", &mut state);
        parser.parse_line("[download] Downloading item 2/7", &mut state);

        assert_eq!(state.total_items, Some(12));
    }

    #[test]
    fn test_fraction_fallback() {
        let parser = parser();
        let mut state = ItemProgress::default();

        parser.parse_line("[download] Downloading item 1/7", &mut state);
        assert_eq!(state.total_items, Some(7));
    }

    #[test]
    fn test_count_phrase_beats_fraction() {
        let parser = parser();
        let mut state = ItemProgress::default();

        parser.parse_line("[info] 1/9 playlist contains 5 entries", &mut state);
        assert_eq!(state.total_items, Some(5));
    }

    #[test]
    fn test_oversized_count_falls_back_to_fraction() {
        let parser = parser();
        let mut state = ItemProgress::default();

        parser.parse_line("[info] 2/6 playlist contains 99999999999 entries", &mut state);
        assert_eq!(state.total_items, Some(6));
    }

    #[test]
    fn test_zero_total_ignored() {
        let parser = parser();
        let mut state = ItemProgress::default();

        parser.parse_line("[youtube] Downloading 0 videos", &mut state);
        assert_eq!(state.total_items, None);
    }

    #[test]
    fn test_destination_overwrites_name() {
        let parser = parser();
        let mut state = ItemProgress::default();

        parser.parse_line("[download] Destination: Mix/01 - First.webm", &mut state);
        parser.parse_line("[ExtractAudio] Destination: Mix\\02 - Second.mp3", &mut state);
        assert_eq!(state.current_item.as_deref(), Some("02 - Second"));

        parser.parse_line("[download] Destination: Mix/README", &mut state);
        assert_eq!(state.current_item.as_deref(), Some("README"));
    }

    #[test]
    fn test_malformed_percent_is_skipped() {
        let parser = parser();
        let mut state = ItemProgress::default();

        assert!(parser.parse_line("[download] N/A% of ~3.50MiB", &mut state).is_empty());
        assert!(parser.parse_line("[download] %", &mut state).is_empty());
        assert_eq!(state.completed_items, 0);
    }

    #[test]
    fn test_completion_threshold() {
        let parser = parser();
        let mut state = ItemProgress::default();

        parser.parse_line("[download]  99.8% of 2.00MiB", &mut state);
        assert_eq!(state.completed_items, 0);
        parser.parse_line("[download]  99.9% of 2.00MiB", &mut state);
        assert_eq!(state.completed_items, 1);
    }

    #[test]
    fn test_repeated_completion_counts_twice() {
        // A retried item reports 100% again and is counted again.
        let parser = parser();
        let mut state = ItemProgress::default();

        parser.parse_line("[download] 100% of 1.00MiB in 00:00:01", &mut state);
        parser.parse_line("[download] 100% of 1.00MiB in 00:00:01", &mut state);
        assert_eq!(state.completed_items, 2);
    }
}
