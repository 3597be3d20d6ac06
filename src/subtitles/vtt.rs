use crate::domain::segment::Segment;

fn timestamp(seconds: f64) -> String {
    let total_ms = (seconds * 1000.0).round().max(0.0) as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}

/// Formats segments as a WebVTT file (spec.md S4.5): `WEBVTT` header
/// followed by blank-line separated cues.
pub fn format_vtt(segments: &[Segment]) -> String {
    let mut out = String::from("WEBVTT\n\n");
    for segment in segments {
        out.push_str(&format!("{} --> {}\n", timestamp(segment.start), timestamp(segment.end)));
        if let Some(speaker) = &segment.speaker {
            out.push_str(&format!("<v {}>{}\n", speaker, segment.text));
        } else {
            out.push_str(&segment.text);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
pub fn parse_vtt(input: &str) -> Vec<Segment> {
    fn parse_timestamp(s: &str) -> f64 {
        let parts: Vec<&str> = s.trim().split(':').collect();
        let hours: f64 = parts[0].parse().unwrap();
        let minutes: f64 = parts[1].parse().unwrap();
        let secs: f64 = parts[2].parse().unwrap();
        hours * 3600.0 + minutes * 60.0 + secs
    }

    let mut segments = Vec::new();
    for block in input.split("\n\n") {
        let block = block.trim();
        if block.is_empty() || block == "WEBVTT" {
            continue;
        }
        let mut lines = block.lines();
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
    fn starts_with_webvtt_header() {
        let vtt = format_vtt(&[]);
        assert_eq!(vtt, "WEBVTT\n\n");
    }

    #[test]
    fn formats_cue_with_dot_millis() {
        let segments = vec![Segment::new(0.0, 1.5, "hello", None)];
        let vtt = format_vtt(&segments);
        assert!(vtt.contains("00:00:00.000 --> 00:00:01.500"));
    }

    #[test]
    fn round_trips_through_parse() {
        let segments = vec![Segment::new(1.0, 2.0, "a", None), Segment::new(2.5, 3.0, "b", None)];
        let formatted = format_vtt(&segments);
        let parsed = parse_vtt(&formatted);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].text, "b");
    }
}
