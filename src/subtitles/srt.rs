use crate::domain::segment::Segment;

fn timestamp(seconds: f64) -> String {
    let total_ms = (seconds * 1000.0).round().max(0.0) as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Formats segments as an SRT file (spec.md S4.5): one numbered block per
/// segment, blank-line separated.
pub fn format_srt(segments: &[Segment]) -> String {
    let mut out = String::new();
    for (i, segment) in segments.iter().enumerate() {
        out.push_str(&(i + 1).to_string());
        out.push('\n');
        out.push_str(&format!("{} --> {}\n", timestamp(segment.start), timestamp(segment.end)));
        if let Some(speaker) = &segment.speaker {
            out.push_str(&format!("[{}] {}\n", speaker, segment.text));
        } else {
            out.push_str(&segment.text);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

/// Parses an SRT file back into segments. Test-only: used to check the
/// format/parse round trip (spec.md S8 property P5), not exposed to
/// production callers.
#[cfg(test)]
pub fn parse_srt(input: &str) -> Vec<Segment> {
    fn parse_timestamp(s: &str) -> f64 {
        let s = s.trim().replace(',', ".");
        let parts: Vec<&str> = s.split(':').collect();
        let hours: f64 = parts[0].parse().unwrap();
        let minutes: f64 = parts[1].parse().unwrap();
        let secs: f64 = parts[2].parse().unwrap();
        hours * 3600.0 + minutes * 60.0 + secs
    }

    let mut segments = Vec::new();
    for block in input.split("\n\n") {
        let block = block.trim();
        if block.is_empty() {
            continue;
        }
        let mut lines = block.lines();
        let _index = lines.next();
        let Some(time_line) = lines.next() else { continue };
        let Some((start_str, end_str)) = time_line.split_once("-->") else { continue };
        let text: String = lines.collect::<Vec<_>>().join("\n");
        segments.push(Segment::new(parse_timestamp(start_str), parse_timestamp(end_str), text, None));
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_basic_block() {
        let segments = vec![Segment::new(0.0, 1.5, "hello", None)];
        let srt = format_srt(&segments);
        assert_eq!(srt, "1\n00:00:00,000 --> 00:00:01,500\nhello\n\n");
    }

    #[test]
    fn formats_speaker_prefix() {
        let segments = vec![Segment::new(0.0, 1.0, "hi", Some("Speaker 1".to_string()))];
        let srt = format_srt(&segments);
        assert!(srt.contains("[Speaker 1] hi"));
    }

    #[test]
    fn round_trips_through_parse() {
        let segments = vec![Segment::new(1.234, 4.5, "one", None), Segment::new(5.0, 6.75, "two", None)];
        let formatted = format_srt(&segments);
        let parsed = parse_srt(&formatted);
        assert_eq!(parsed.len(), 2);
        assert!((parsed[0].start - 1.234).abs() < 0.001);
        assert_eq!(parsed[1].text, "two");
    }
}
