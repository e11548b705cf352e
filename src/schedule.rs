// 🗓️ Weekly Schedule - section listing, meeting times, timetable layout
//
// Meeting-time cells look like:
//   "Sun/Tue 08:00-09:15"
//   "Mon 1:30 PM - 2:45 PM; Wed 13:30-14:45"
// Entries are split on ';' or newlines. Entries that do not parse are
// skipped; a section with none left is reported as unscheduled.

use crate::error::{PlannerError, PlannerResult};
use chrono::{NaiveTime, Timelike, Weekday};
use csv::{ReaderBuilder, StringRecord};
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

/// Day rows of the timetable, top to bottom.
pub const DAY_ORDER: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

/// Block colours, cycled per section code.
pub const PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

/// Narrowest block drawn, in hours.
pub const MIN_BLOCK_HOURS: f64 = 0.2;

fn entry_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)^\s*(?P<days>(?:sun|mon|tue|wed|thu|fri|sat)(?:/(?:sun|mon|tue|wed|thu|fri|sat))*)\s+(?P<start>\d{1,2}:\d{2}\s*(?:am|pm)?)\s*-\s*(?P<end>\d{1,2}:\d{2}\s*(?:am|pm)?)\s*$",
        )
        .expect("meeting-time pattern is valid")
    })
}

// ============================================================================
// MEETING TIMES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MeetingSlot {
    pub day: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl MeetingSlot {
    /// Timetable row (Sunday = 0)
    pub fn row(&self) -> usize {
        day_row(self.day)
    }

    pub fn label(&self) -> String {
        format!("{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

pub fn day_row(day: Weekday) -> usize {
    day.num_days_from_sunday() as usize
}

/// Fractional hours since midnight
pub fn hours(t: NaiveTime) -> f64 {
    f64::from(t.hour()) + f64::from(t.minute()) / 60.0
}

/// Parse "HH:MM", "H:MM AM/PM" or "H:MMPM"; a bare 12-hour time is AM.
pub fn parse_time(text: &str) -> Option<NaiveTime> {
    let text = text.trim().to_uppercase();

    if let Ok(t) = NaiveTime::parse_from_str(&text, "%H:%M") {
        return Some(t);
    }

    let spaced = match text.strip_suffix("AM").or_else(|| text.strip_suffix("PM")) {
        Some(clock) => format!("{} {}", clock.trim(), &text[text.len() - 2..]),
        None => format!("{} AM", text),
    };
    NaiveTime::parse_from_str(&spaced, "%I:%M %p").ok()
}

fn parse_day(text: &str) -> Option<Weekday> {
    match text.trim().to_lowercase().as_str() {
        "sun" => Some(Weekday::Sun),
        "mon" => Some(Weekday::Mon),
        "tue" => Some(Weekday::Tue),
        "wed" => Some(Weekday::Wed),
        "thu" => Some(Weekday::Thu),
        "fri" => Some(Weekday::Fri),
        "sat" => Some(Weekday::Sat),
        _ => None,
    }
}

/// Parse a meeting-time cell into one slot per (day, entry)
pub fn parse_timeslots(cell: &str) -> Vec<MeetingSlot> {
    let mut slots = Vec::new();

    for chunk in cell.split([';', '\n']).map(str::trim).filter(|c| !c.is_empty()) {
        let Some(caps) = entry_pattern().captures(chunk) else {
            debug!(entry = chunk, "Unrecognized meeting time");
            continue;
        };

        let (Some(start), Some(end)) = (parse_time(&caps["start"]), parse_time(&caps["end"])) else {
            continue;
        };

        slots.extend(
            caps["days"]
                .split('/')
                .filter_map(parse_day)
                .map(|day| MeetingSlot { day, start, end }),
        );
    }

    slots
}

// ============================================================================
// SECTION LISTING
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub code: String,
    pub name: String,
    pub teacher: String,
    pub students: String,
    pub status: String,
    pub time: String,
    pub slots: Vec<MeetingSlot>,
}

impl Section {
    /// "CODE — Name", the label used for selection
    pub fn label(&self) -> String {
        format!("{} — {}", self.code, self.name)
    }

    pub fn is_scheduled(&self) -> bool {
        !self.slots.is_empty()
    }
}

struct ColumnSpec {
    field: &'static str,
    aliases: &'static [&'static str],
    fallback: usize,
}

const COLUMNS: [ColumnSpec; 6] = [
    ColumnSpec { field: "code", aliases: &["code", "subject code", "course code"], fallback: 0 },
    ColumnSpec { field: "name", aliases: &["name", "subject name", "course name"], fallback: 1 },
    ColumnSpec { field: "time", aliases: &["time", "date and time", "date & time", "datetime"], fallback: 7 },
    ColumnSpec { field: "status", aliases: &["status"], fallback: 9 },
    ColumnSpec { field: "teacher", aliases: &["teacher", "instructor"], fallback: 10 },
    ColumnSpec {
        field: "students",
        aliases: &["students", "enrolled", "no. of students", "number of students"],
        fallback: 11,
    },
];

fn resolve_columns(headers: &StringRecord) -> PlannerResult<[usize; 6]> {
    let by_name: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_lowercase(), i))
        .collect();

    let mut resolved = [0usize; 6];
    for (slot, spec) in resolved.iter_mut().zip(COLUMNS.iter()) {
        *slot = spec
            .aliases
            .iter()
            .find_map(|alias| by_name.get(*alias).copied())
            .or_else(|| (spec.fallback < headers.len()).then_some(spec.fallback))
            .ok_or(PlannerError::MissingColumn(spec.field))?;
    }
    Ok(resolved)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SectionListing {
    pub sections: Vec<Section>,
}

impl SectionListing {
    pub fn from_file<P: AsRef<Path>>(path: P) -> PlannerResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| PlannerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file, path)
    }

    pub fn from_reader<R: Read>(input: R, source: &Path) -> PlannerResult<Self> {
        let csv_err = |err: csv::Error| PlannerError::Csv {
            path: source.to_path_buf(),
            source: err,
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(input);

        let headers = reader.headers().map_err(csv_err)?.clone();
        let [code, name, time, status, teacher, students] = resolve_columns(&headers)?;

        let mut sections = Vec::new();
        for result in reader.records() {
            let record = result.map_err(csv_err)?;
            let field = |i: usize| record.get(i).unwrap_or("").trim().to_string();

            let time_text = field(time);
            sections.push(Section {
                code: field(code),
                name: field(name),
                teacher: field(teacher),
                students: field(students),
                status: field(status),
                slots: parse_timeslots(&time_text),
                time: time_text,
            });
        }

        debug!(file = %source.display(), sections = sections.len(), "Section listing loaded");
        Ok(SectionListing { sections })
    }

    /// Distinct non-empty values of a column, sorted
    fn distinct(&self, pick: impl Fn(&Section) -> &str) -> Vec<String> {
        let mut values: Vec<String> = self
            .sections
            .iter()
            .map(|s| pick(s).to_string())
            .filter(|v| !v.is_empty())
            .collect();
        values.sort();
        values.dedup();
        values
    }

    pub fn statuses(&self) -> Vec<String> {
        self.distinct(|s| s.status.as_str())
    }

    pub fn teachers(&self) -> Vec<String> {
        self.distinct(|s| s.teacher.as_str())
    }

    /// Keep sections matching any given status and teacher (empty = any)
    pub fn filtered(&self, statuses: &[String], teachers: &[String]) -> SectionListing {
        let sections = self
            .sections
            .iter()
            .filter(|s| statuses.is_empty() || statuses.contains(&s.status))
            .filter(|s| teachers.is_empty() || teachers.contains(&s.teacher))
            .cloned()
            .collect();
        SectionListing { sections }
    }

    /// Sections chosen by code (case-insensitive) or by full label
    pub fn select(&self, choices: &[String]) -> Vec<&Section> {
        self.sections
            .iter()
            .filter(|s| {
                choices
                    .iter()
                    .any(|c| c.trim().eq_ignore_ascii_case(&s.code) || *c == s.label())
            })
            .collect()
    }
}

// ============================================================================
// TIMETABLE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimetableBlock {
    pub code: String,
    pub row: usize,
    /// Start, in hours since midnight
    pub x: f64,
    pub width: f64,
    pub color: &'static str,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timetable {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub blocks: Vec<TimetableBlock>,

    /// Selected sections with no parseable meeting time
    pub unscheduled: Vec<String>,
}

/// One colour per code, cycling the palette
pub fn palette(n: usize) -> Vec<&'static str> {
    PALETTE.iter().copied().cycle().take(n).collect()
}

/// Padded display range: an hour before the first start, an hour after
/// the last end. 08:00–21:00 when nothing is scheduled.
pub fn time_bounds(slots: &[MeetingSlot]) -> (NaiveTime, NaiveTime) {
    let on_hour = |h: u32| NaiveTime::from_hms_opt(h, 0, 0).unwrap_or(NaiveTime::MIN);

    let earliest = slots.iter().map(|s| s.start).min();
    let latest = slots.iter().map(|s| s.end).max();
    match (earliest, latest) {
        (Some(first), Some(last)) => (
            on_hour(first.hour().saturating_sub(1)),
            on_hour((last.hour() + 1).min(23)),
        ),
        _ => (on_hour(8), on_hour(21)),
    }
}

impl Timetable {
    pub fn build(sections: &[&Section]) -> Self {
        let (scheduled, unscheduled): (Vec<&Section>, Vec<&Section>) =
            sections.iter().copied().partition(|s| s.is_scheduled());

        let colors = palette(scheduled.len());
        let color_for: HashMap<&str, &'static str> = scheduled
            .iter()
            .zip(colors)
            .map(|(s, c)| (s.code.as_str(), c))
            .collect();

        let mut blocks = Vec::new();
        let mut all_slots = Vec::new();
        for section in &scheduled {
            for slot in &section.slots {
                let x = hours(slot.start);
                blocks.push(TimetableBlock {
                    code: section.code.clone(),
                    row: slot.row(),
                    x,
                    width: (hours(slot.end) - x).max(MIN_BLOCK_HOURS),
                    color: color_for.get(section.code.as_str()).copied().unwrap_or(PALETTE[0]),
                    label: format!("{}\n{}", section.code, slot.label()),
                });
                all_slots.push(*slot);
            }
        }

        let (start, end) = time_bounds(&all_slots);
        Timetable {
            start,
            end,
            blocks,
            unscheduled: unscheduled.iter().map(|s| s.code.clone()).collect(),
        }
    }

    /// Blocks on a given day row, earliest first
    pub fn day(&self, row: usize) -> Vec<&TimetableBlock> {
        let mut blocks: Vec<&TimetableBlock> = self.blocks.iter().filter(|b| b.row == row).collect();
        blocks.sort_by(|a, b| a.x.total_cmp(&b.x));
        blocks
    }
}

// ============================================================================
// TESTS
// ============================================================================
