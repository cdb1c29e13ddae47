// Copyright (C) 2025 Paul Hampson
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License version 3 as  published by the
// Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <https://www.gnu.org/licenses/>.

//! Text lines sent over the serial link, one per channel per pass:
//!
//! ```text
//! Gewicht links [kg]: 9.86979
//! HX711 (rechts) nicht bereit!
//! HX711 (rechts) Zeitüberschreitung!
//! HX711 ist im 10 Hz-Modus bereit!
//! ```

use core::fmt::Write;
use heapless::String;

pub const LINE_CAPACITY: usize = 96;

pub type ReportLine = String<LINE_CAPACITY>;

const WEIGHT_PREFIX: &str = "Gewicht ";
const SENSOR_PREFIX: &str = "HX711 (";
const NOT_READY_SUFFIX: &str = ") nicht bereit!";
const TIMED_OUT_SUFFIX: &str = ") Zeitüberschreitung!";
const STARTUP_PREFIX: &str = "HX711 ist im ";
const STARTUP_SUFFIX: &str = " Hz-Modus bereit!";

/// Outcome of one channel in one control loop pass.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reading {
    Weight(f32),
    NotReady,
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReportFormat {
    /// Shown in brackets after the label, omitted when `None`.
    pub unit: Option<&'static str>,
    pub decimals: usize,
}

impl Default for ReportFormat {
    fn default() -> Self {
        Self {
            unit: Some("kg"),
            decimals: 5,
        }
    }
}

/// Builds the line for one channel. A line that would not fit in `LINE_CAPACITY` is truncated.
pub fn format_reading(label: &str, reading: Reading, format: &ReportFormat) -> ReportLine {
    let mut line = ReportLine::new();
    let _ = match reading {
        Reading::Weight(weight) => match format.unit {
            Some(unit) => write!(
                line,
                "{WEIGHT_PREFIX}{label} [{unit}]: {:.*}",
                format.decimals, weight
            ),
            None => write!(line, "{WEIGHT_PREFIX}{label}: {:.*}", format.decimals, weight),
        },
        Reading::NotReady => write!(line, "{SENSOR_PREFIX}{label}{NOT_READY_SUFFIX}"),
        Reading::TimedOut => write!(line, "{SENSOR_PREFIX}{label}{TIMED_OUT_SUFFIX}"),
    };
    line
}

/// Announces that every channel is initialised and tared.
pub fn format_startup(output_rate_hz: u32) -> ReportLine {
    let mut line = ReportLine::new();
    let _ = write!(line, "{STARTUP_PREFIX}{output_rate_hz}{STARTUP_SUFFIX}");
    line
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParsedLine<'a> {
    Weight {
        label: &'a str,
        unit: Option<&'a str>,
        value: f32,
    },
    NotReady {
        label: &'a str,
    },
    TimedOut {
        label: &'a str,
    },
    Startup {
        output_rate_hz: u32,
    },
}

/// Recognises a line produced by the firmware. Surrounding whitespace, including the CR of the
/// line ending, is ignored. Anything else gives `None`.
pub fn parse_line(line: &str) -> Option<ParsedLine<'_>> {
    let line = line.trim();

    if let Some(rest) = line.strip_prefix(WEIGHT_PREFIX) {
        let (head, value) = rest.rsplit_once(": ")?;
        let value = value.trim().parse::<f32>().ok()?;
        let (label, unit) = match head.strip_suffix(']').and_then(|h| h.rsplit_once(" [")) {
            Some((label, unit)) => (label, Some(unit)),
            None => (head, None),
        };
        if label.is_empty() {
            return None;
        }
        return Some(ParsedLine::Weight { label, unit, value });
    }

    if let Some(rest) = line.strip_prefix(STARTUP_PREFIX) {
        let output_rate_hz = rest.strip_suffix(STARTUP_SUFFIX)?.parse().ok()?;
        return Some(ParsedLine::Startup { output_rate_hz });
    }

    let rest = line.strip_prefix(SENSOR_PREFIX)?;
    if let Some(label) = rest.strip_suffix(NOT_READY_SUFFIX) {
        return Some(ParsedLine::NotReady { label });
    }
    if let Some(label) = rest.strip_suffix(TIMED_OUT_SUFFIX) {
        return Some(ParsedLine::TimedOut { label });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_line_with_unit() {
        let line = format_reading("links", Reading::Weight(9.869_79), &ReportFormat::default());
        assert_eq!(line.as_str(), "Gewicht links [kg]: 9.86979");
    }

    #[test]
    fn weight_line_without_unit_uses_configured_decimals() {
        let format = ReportFormat { unit: None, decimals: 2 };
        let line = format_reading("rechts", Reading::Weight(-0.126), &format);
        assert_eq!(line.as_str(), "Gewicht rechts: -0.13");
    }

    #[test]
    fn diagnostic_lines() {
        let format = ReportFormat::default();
        assert_eq!(
            format_reading("links", Reading::NotReady, &format).as_str(),
            "HX711 (links) nicht bereit!"
        );
        assert_eq!(
            format_reading("rechts", Reading::TimedOut, &format).as_str(),
            "HX711 (rechts) Zeitüberschreitung!"
        );
        assert_eq!(format_startup(10).as_str(), "HX711 ist im 10 Hz-Modus bereit!");
    }

    #[test]
    fn parses_weight_lines() {
        assert_eq!(
            parse_line("Gewicht rechts [kg]: -0.00118\r\n"),
            Some(ParsedLine::Weight { label: "rechts", unit: Some("kg"), value: -0.00118 })
        );
        assert_eq!(
            parse_line("Gewicht links: 12.50"),
            Some(ParsedLine::Weight { label: "links", unit: None, value: 12.5 })
        );
    }

    #[test]
    fn parses_diagnostic_lines() {
        assert_eq!(
            parse_line("HX711 (links) nicht bereit!"),
            Some(ParsedLine::NotReady { label: "links" })
        );
        assert_eq!(
            parse_line("HX711 (rechts) Zeitüberschreitung!\r"),
            Some(ParsedLine::TimedOut { label: "rechts" })
        );
        assert_eq!(
            parse_line("HX711 ist im 80 Hz-Modus bereit!"),
            Some(ParsedLine::Startup { output_rate_hz: 80 })
        );
    }

    #[test]
    fn rejects_noise() {
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("Gewicht links [kg]: "), None);
        assert_eq!(parse_line("Gewicht : 1.0"), None);
        assert_eq!(parse_line("HX711 (links) kaputt"), None);
        assert_eq!(parse_line("\u{fffd}\u{fffd}wicht links [kg]: 1.0"), None);
    }

    #[test]
    fn formatted_lines_parse_back() {
        let format = ReportFormat::default();
        let line = format_reading("links", Reading::Weight(9.869_79), &format);
        match parse_line(&line) {
            Some(ParsedLine::Weight { label, unit, value }) => {
                assert_eq!(label, "links");
                assert_eq!(unit, Some("kg"));
                assert!((value - 9.869_79).abs() < 1e-5);
            }
            other => panic!("unexpected parse result {other:?}"),
        }
    }
}
