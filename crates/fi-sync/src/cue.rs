//! Timed caption records and their timestamp syntax.

use std::fmt;
use std::time::Duration;

use fi_core::SubtitleDialect;

/// Duration assigned to a cue whose end does not lie after its begin.
pub const MIN_CUE_DURATION: Duration = Duration::from_secs(1);

/// Separator between the two timestamps of a timing line.
pub const TIMING_ARROW: &str = "-->";

/// One timed caption record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    begin: Duration,
    end: Duration,
    label: String,
}

impl Cue {
    pub fn new(begin: Duration, end: Duration, label: impl Into<String>) -> Self {
        Self {
            begin,
            end,
            label: label.into(),
        }
    }

    /// Offset from stream start at which the cue appears.
    pub fn begin(&self) -> Duration {
        self.begin
    }

    /// Offset from stream start at which the cue disappears, as written.
    pub fn end(&self) -> Duration {
        self.end
    }

    /// Caption text; lines are joined with `\n`.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// `end - begin`, or [`MIN_CUE_DURATION`] when that would be zero.
    pub fn duration(&self) -> Duration {
        match self.end.checked_sub(self.begin) {
            Some(d) if !d.is_zero() => d,
            _ => MIN_CUE_DURATION,
        }
    }

    /// `begin + duration()`, the first instant the cue is no longer shown.
    pub fn effective_end(&self) -> Duration {
        self.begin + self.duration()
    }

    /// Parse a `<begin> --> <end>` timing line.
    ///
    /// Anything after the end timestamp (WebVTT cue settings) is ignored.
    pub fn parse_timing(line: &str) -> Option<(Duration, Duration)> {
        let (begin, rest) = line.split_once(TIMING_ARROW)?;
        let end = rest.split_whitespace().next()?;
        Some((parse_timestamp(begin)?, parse_timestamp(end)?))
    }

    /// Render the cue as a WebVTT cue block.
    pub fn to_webvtt(&self) -> String {
        format!(
            "{} {TIMING_ARROW} {}\n{}\n",
            format_timestamp(self.begin, '.'),
            format_timestamp(self.end, '.'),
            self.label
        )
    }

    /// Render the cue as a numbered SubRip record.
    ///
    /// SubRip always spells out the hour field.
    pub fn to_subrip(&self, counter: usize) -> String {
        format!(
            "{counter}\n{} {TIMING_ARROW} {}\n{}\n",
            format_full_timestamp(self.begin, ','),
            format_full_timestamp(self.end, ','),
            self.label
        )
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {TIMING_ARROW} {}: {}",
            format_timestamp(self.begin, '.'),
            format_timestamp(self.end, '.'),
            self.label
        )
    }
}

/// Render a complete caption document, header included.
pub fn render<'a>(dialect: SubtitleDialect, cues: impl IntoIterator<Item = &'a Cue>) -> String {
    let mut out = String::new();
    if let Some(signature) = dialect.signature() {
        out.push_str(signature);
        out.push_str("\n\n");
    }
    for (n, cue) in cues.into_iter().enumerate() {
        match dialect {
            SubtitleDialect::WebVtt => out.push_str(&cue.to_webvtt()),
            SubtitleDialect::SubRip => out.push_str(&cue.to_subrip(n + 1)),
        }
        out.push('\n');
    }
    out
}

/// Parse a `[hh:]mm:ss.mmm` timestamp.
///
/// Both `.` (WebVTT) and `,` (SubRip) are accepted before the milliseconds,
/// which may be omitted.
pub fn parse_timestamp(s: &str) -> Option<Duration> {
    let s = s.trim();
    let (clock, millis) = match s.find(['.', ',']) {
        Some(pos) => (&s[..pos], Some(&s[pos + 1..])),
        None => (s, None),
    };

    let fields: Vec<&str> = clock.split(':').collect();
    let (hours, minutes, seconds) = match fields.as_slice() {
        [h, m, s] => (parse_field(h)?, parse_field(m)?, parse_field(s)?),
        [m, s] => (0, parse_field(m)?, parse_field(s)?),
        _ => return None,
    };
    if minutes >= 60 || seconds >= 60 {
        return None;
    }

    let millis = match millis {
        Some(m) if !m.is_empty() && m.len() <= 3 && m.bytes().all(|b| b.is_ascii_digit()) => {
            // "5" means 500 ms, "05" means 50 ms.
            let scale = 10u64.pow(3 - m.len() as u32);
            m.parse::<u64>().ok()? * scale
        }
        Some(_) => return None,
        None => 0,
    };

    Some(Duration::from_millis(
        ((hours * 60 + minutes) * 60 + seconds) * 1000 + millis,
    ))
}

fn parse_field(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Format as `hh:mm:ss.mmm`, dropping the hour field when it is zero.
pub fn format_timestamp(d: Duration, separator: char) -> String {
    let (h, m, s, ms) = split(d);
    if h == 0 {
        format!("{m:02}:{s:02}{separator}{ms:03}")
    } else {
        format!("{h:02}:{m:02}:{s:02}{separator}{ms:03}")
    }
}

fn format_full_timestamp(d: Duration, separator: char) -> String {
    let (h, m, s, ms) = split(d);
    format!("{h:02}:{m:02}:{s:02}{separator}{ms:03}")
}

fn split(d: Duration) -> (u64, u64, u64, u32) {
    let secs = d.as_secs();
    (secs / 3600, (secs / 60) % 60, secs % 60, d.subsec_millis())
}
