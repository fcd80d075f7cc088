//! The iCalendar parser: folded text in, typed components and diagnostics
//! out.

use super::text::{is_allowed_scheme, unescape_text, unfold_lines};
use crate::config::CalSyncConfig;
use crate::error::{ParseDiagnostic, ParseError};
use crate::model::alarm::{AlarmAction, AlarmProximity, AlarmTrigger, ICalAlarm};
use crate::model::datetime::ICalDateTime;
use crate::model::event::{
    Attendee, AttendeeRole, Conference, EventClass, EventImage, EventSpan, EventStatus,
    EventTransparency, ICalEvent, Organizer, ParticipationStatus,
};
use crate::model::rrule::RRule;
use ahash::AHashMap;

/// One tokenised content line: `NAME[;PARAM=VAL(,VAL)*]*:VALUE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLine {
    pub name: String,
    pub params: Vec<(String, Vec<String>)>,
    pub value: String,
}

impl ContentLine {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .and_then(|(_, v)| v.first())
            .map(String::as_str)
    }

    pub fn is_date_only(&self) -> bool {
        self.param("VALUE").is_some_and(|v| v.eq_ignore_ascii_case("DATE"))
    }
}

/// Tokenise one already-unfolded logical line. Returns `None` for a
/// structurally empty line (blank), which the caller should skip.
pub fn parse_content_line(line: &str) -> Option<ContentLine> {
    if line.is_empty() {
        return None;
    }
    let colon = find_unquoted(line, ':')?;
    let head = &line[..colon];
    let value = line[colon + 1..].to_string();

    let mut parts = head.split(';');
    let name = parts.next()?.to_string();
    let mut params = Vec::new();
    for part in parts {
        let Some((key, val)) = part.split_once('=') else {
            continue;
        };
        let values = split_param_values(val);
        params.push((key.to_string(), values));
    }
    Some(ContentLine { name, params, value })
}

/// Find the first `:` not inside a double-quoted parameter value.
fn find_unquoted(s: &str, needle: char) -> Option<usize> {
    let mut in_quote = false;
    for (i, ch) in s.char_indices() {
        match ch {
            '"' => in_quote = !in_quote,
            c if c == needle && !in_quote => return Some(i),
            _ => {}
        }
    }
    None
}

fn split_param_values(s: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    for ch in s.chars() {
        match ch {
            '"' => in_quote = !in_quote,
            ',' if !in_quote => {
                out.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    out.push(current);
    out.into_iter().map(|v| v.trim_matches('"').to_string()).collect()
}

/// The result of parsing a full `VCALENDAR` document.
#[derive(Debug, Clone, Default)]
pub struct ParseResult {
    pub events: Vec<ICalEvent>,
    /// A flat table of timezone ids seen in the document's `VTIMEZONE`
    /// blocks: parsed-but-inert, resolved against `chrono-tz` at use rather
    /// than interpreted ourselves.
    pub timezones: AHashMap<String, ()>,
    /// Opaque `VTODO`/`VJOURNAL` blocks, preserved verbatim so a
    /// round-tripping client does not silently drop them.
    pub other_components: Vec<String>,
    pub diagnostics: Vec<ParseDiagnostic>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Outside,
    InsideVCalendar,
    InsideComponent,
    InsideAlarm,
}

/// Parse a `VCALENDAR` document from UTF-8 text with `CRLF` or `LF` line
/// terminators, honouring `config.max_input_bytes`.
pub fn parse_calendar(input: &str, config: &CalSyncConfig) -> Result<ParseResult, ParseError> {
    if input.len() > config.max_input_bytes {
        return Err(ParseError::InputTooLarge {
            limit: config.max_input_bytes,
        });
    }

    let mut result = ParseResult::default();
    let mut state = State::Outside;
    let mut stack: Vec<String> = Vec::new();

    let mut current_event: Option<ICalEvent> = None;
    let mut current_alarm: Option<ICalAlarm> = None;
    let mut skip_component_depth = 0usize;
    let mut skip_buffer: Vec<String> = Vec::new();
    // `VTIMEZONE` is tracked separately from the VTODO/VJOURNAL skip path:
    // it contributes a `TZID` to `result.timezones` instead of being kept
    // verbatim, per the flat-table representation in spec.md §9.
    let mut tz_depth = 0usize;
    let mut pending_tzid: Option<String> = None;

    for (line_no, raw_line) in unfold_lines(input).into_iter().enumerate() {
        let Some(cl) = parse_content_line(&raw_line) else {
            continue;
        };

        if tz_depth > 0 {
            if cl.name.eq_ignore_ascii_case("BEGIN") {
                tz_depth += 1;
            } else if cl.name.eq_ignore_ascii_case("END") {
                tz_depth -= 1;
                if tz_depth == 0 {
                    if let Some(tzid) = pending_tzid.take() {
                        result.timezones.insert(tzid, ());
                    }
                }
            } else if tz_depth == 1 && cl.name.eq_ignore_ascii_case("TZID") {
                pending_tzid = Some(unescape_text(&cl.value));
            }
            continue;
        }

        if skip_component_depth > 0 {
            skip_buffer.push(raw_line.clone());
            if cl.name.eq_ignore_ascii_case("BEGIN") {
                skip_component_depth += 1;
            } else if cl.name.eq_ignore_ascii_case("END") {
                skip_component_depth -= 1;
                if skip_component_depth == 0 {
                    result.other_components.push(skip_buffer.join("\r\n"));
                    skip_buffer.clear();
                }
            }
            continue;
        }

        if cl.name.eq_ignore_ascii_case("BEGIN") {
            match cl.value.as_str() {
                "VCALENDAR" => {
                    state = State::InsideVCalendar;
                }
                "VEVENT" if state == State::InsideVCalendar => {
                    state = State::InsideComponent;
                    stack.push("VEVENT".to_string());
                    current_event = Some(ICalEvent::new(
                        String::new(),
                        ICalDateTime::epoch_placeholder(),
                        ICalDateTime::epoch_placeholder(),
                    ));
                }
                "VALARM" if state == State::InsideComponent => {
                    state = State::InsideAlarm;
                    current_alarm = Some(ICalAlarm::new(
                        AlarmAction::Display,
                        AlarmTrigger::Relative {
                            offset_seconds: 0,
                            related_end: false,
                        },
                    ));
                }
                "VTIMEZONE" if state == State::InsideVCalendar => {
                    tz_depth = 1;
                    pending_tzid = None;
                }
                "VTODO" | "VJOURNAL" if state == State::InsideVCalendar => {
                    skip_component_depth = 1;
                    skip_buffer.push(raw_line.clone());
                }
                other => {
                    result.diagnostics.push(ParseDiagnostic::PropertyMalformed {
                        line: line_no,
                        name: format!("BEGIN:{other}"),
                    });
                }
            }
            continue;
        }

        if cl.name.eq_ignore_ascii_case("END") {
            match cl.value.as_str() {
                "VALARM" if state == State::InsideAlarm => {
                    if let (Some(event), Some(alarm)) = (current_event.as_mut(), current_alarm.take()) {
                        event.alarms.push(alarm);
                    }
                    state = State::InsideComponent;
                }
                "VEVENT" if state == State::InsideComponent => {
                    if stack.pop().as_deref() != Some("VEVENT") {
                        return Err(ParseError::StructuralError(
                            "mismatched END:VEVENT".to_string(),
                        ));
                    }
                    if let Some(event) = current_event.take() {
                        result.events.push(event);
                    }
                    state = State::InsideVCalendar;
                }
                "VCALENDAR" if state == State::InsideVCalendar => {
                    state = State::Outside;
                }
                _ => {
                    return Err(ParseError::StructuralError(format!(
                        "mismatched END:{}",
                        cl.value
                    )));
                }
            }
            continue;
        }

        match state {
            State::Outside => {
                // Properties outside VCALENDAR are diagnostics, not fatal.
                result.diagnostics.push(ParseDiagnostic::PropertyMalformed {
                    line: line_no,
                    name: cl.name.clone(),
                });
            }
            State::InsideVCalendar => {
                // VERSION/PRODID/CALSCALE/METHOD at the calendar level: not
                // modelled explicitly, nothing to preserve beyond round trip
                // of events, so they are silently accepted.
            }
            State::InsideComponent => {
                if let Some(event) = current_event.as_mut() {
                    apply_event_property(
                        event,
                        &cl,
                        line_no,
                        config,
                        &result.timezones,
                        &mut result.diagnostics,
                    );
                }
            }
            State::InsideAlarm => {
                if let Some(alarm) = current_alarm.as_mut() {
                    apply_alarm_property(alarm, &cl, line_no, &mut result.diagnostics);
                }
            }
        }
    }

    if state != State::Outside || tz_depth != 0 || skip_component_depth != 0 {
        return Err(ParseError::StructuralError(
            "unterminated component at end of input".to_string(),
        ));
    }

    Ok(result)
}

fn parse_datetime_property(
    cl: &ContentLine,
    line_no: usize,
    timezones: &AHashMap<String, ()>,
    diagnostics: &mut Vec<ParseDiagnostic>,
) -> Option<ICalDateTime> {
    let tzid = cl.param("TZID");
    let dt = ICalDateTime::parse(&cl.value, cl.is_date_only(), tzid)?;
    flag_unresolved_tzid(&dt, tzid, line_no, timezones, diagnostics);
    Some(dt)
}

/// Push a `FloatingFallback` diagnostic unless `tzid` resolves against
/// either the ambient `chrono-tz` IANA database or the document's own
/// `VTIMEZONE` table — a locally defined `TZID` (common for legacy
/// Windows/Outlook ids) must not be misdiagnosed just because it is
/// absent from the IANA list.
fn flag_unresolved_tzid(
    dt: &ICalDateTime,
    tzid: Option<&str>,
    line_no: usize,
    timezones: &AHashMap<String, ()>,
    diagnostics: &mut Vec<ParseDiagnostic>,
) {
    if let Some(tzid) = tzid {
        if dt.resolved_tz().is_none() && !timezones.contains_key(tzid) {
            diagnostics.push(ParseDiagnostic::FloatingFallback {
                line: line_no,
                tzid: tzid.to_string(),
            });
        }
    }
}

fn check_url_scheme(
    url: &str,
    line_no: usize,
    config: &CalSyncConfig,
    diagnostics: &mut Vec<ParseDiagnostic>,
) {
    if !url.is_empty() && !is_allowed_scheme(url, &config.allowed_schemes) {
        let scheme = url.split_once(':').map(|(s, _)| s.to_string()).unwrap_or_default();
        diagnostics.push(ParseDiagnostic::UnsafeScheme { line: line_no, scheme });
    }
}

fn apply_event_property(
    event: &mut ICalEvent,
    cl: &ContentLine,
    line_no: usize,
    config: &CalSyncConfig,
    timezones: &AHashMap<String, ()>,
    diagnostics: &mut Vec<ParseDiagnostic>,
) {
    match cl.name.to_ascii_uppercase().as_str() {
        "UID" => event.uid = unescape_text(&cl.value),
        "DTSTAMP" => {
            if let Some(dt) = parse_datetime_property(cl, line_no, timezones, diagnostics) {
                event.dtstamp = dt;
            }
        }
        "DTSTART" => {
            if let Some(dt) = parse_datetime_property(cl, line_no, timezones, diagnostics) {
                event.dtstart = dt;
            }
        }
        "DTEND" => {
            if let Some(dt) = parse_datetime_property(cl, line_no, timezones, diagnostics) {
                event.span = Some(EventSpan::End(dt));
            }
        }
        "DURATION" => {
            if let Some(secs) = parse_iso8601_duration(&cl.value) {
                event.span = Some(EventSpan::Duration(secs));
            }
        }
        "RECURRENCE-ID" => {
            event.recurrence_id = parse_datetime_property(cl, line_no, timezones, diagnostics);
        }
        "RRULE" => event.rrule = RRule::parse(&cl.value),
        "RDATE" => {
            let tzid = cl.param("TZID");
            for part in cl.value.split(',') {
                if let Some(dt) = ICalDateTime::parse(part, cl.is_date_only(), tzid) {
                    flag_unresolved_tzid(&dt, tzid, line_no, timezones, diagnostics);
                    event.rdate.push(dt);
                }
            }
        }
        "EXDATE" => {
            let tzid = cl.param("TZID");
            for part in cl.value.split(',') {
                if let Some(dt) = ICalDateTime::parse(part, cl.is_date_only(), tzid) {
                    flag_unresolved_tzid(&dt, tzid, line_no, timezones, diagnostics);
                    event.exdate.push(dt);
                }
            }
        }
        "TRANSP" => event.transparency = EventTransparency::parse(&cl.value),
        "SUMMARY" => event.summary = Some(unescape_text(&cl.value)),
        "DESCRIPTION" => event.description = Some(unescape_text(&cl.value)),
        "LOCATION" => event.location = Some(unescape_text(&cl.value)),
        "STATUS" => event.status = EventStatus::parse(&cl.value),
        "CLASS" => event.class = EventClass::parse(&cl.value),
        "SEQUENCE" => event.sequence = cl.value.parse().unwrap_or(0),
        "CATEGORIES" => {
            event
                .categories
                .extend(cl.value.split(',').map(|v| unescape_text(v.trim())));
        }
        "COMMENT" => event.comment.push(unescape_text(&cl.value)),
        "CONTACT" => event.contact = Some(unescape_text(&cl.value)),
        "COLOR" => event.color = Some(cl.value.clone()),
        "URL" => {
            check_url_scheme(&cl.value, line_no, config, diagnostics);
            event.url = Some(cl.value.clone());
        }
        "IMAGE" => {
            check_url_scheme(&cl.value, line_no, config, diagnostics);
            event.images.push(EventImage {
                uri: cl.value.clone(),
                display: cl.param("DISPLAY").map(String::from),
                fmttype: cl.param("FMTTYPE").map(String::from),
                altrep: cl.param("ALTREP").map(|v| unescape_text(v)),
            });
        }
        "CONFERENCE" => {
            check_url_scheme(&cl.value, line_no, config, diagnostics);
            event.conferences.push(Conference {
                uri: cl.value.clone(),
                feature: cl.param("FEATURE").map(String::from),
                label: cl.param("LABEL").map(String::from),
                language: cl.param("LANGUAGE").map(String::from),
            });
        }
        "ORGANIZER" => {
            event.organizer = Some(Organizer {
                uri: cl.value.clone(),
                common_name: cl.param("CN").map(String::from),
            });
        }
        "ATTENDEE" => {
            event.attendees.push(Attendee {
                uri: cl.value.clone(),
                common_name: cl.param("CN").map(String::from),
                role: cl.param("ROLE").and_then(AttendeeRole::parse),
                partstat: cl.param("PARTSTAT").and_then(ParticipationStatus::parse),
            });
        }
        "CREATED" | "LAST-MODIFIED" => {
            // Recognized but not modelled as dedicated fields at the event
            // level beyond round trip; callers needing them round-trip via
            // extra_properties below is intentionally skipped here since
            // these two are common enough to special-case as raw strings.
            event
                .extra_properties
                .push((cl.name.to_ascii_uppercase(), cl.value.clone()));
        }
        "" => {}
        name => {
            event.extra_properties.push((name.to_string(), cl.value.clone()));
        }
    }
}

fn apply_alarm_property(
    alarm: &mut ICalAlarm,
    cl: &ContentLine,
    _line_no: usize,
    _diagnostics: &mut [ParseDiagnostic],
) {
    match cl.name.to_ascii_uppercase().as_str() {
        "ACTION" => {
            if let Some(action) = AlarmAction::parse(&cl.value) {
                alarm.action = action;
            }
        }
        "TRIGGER" => {
            let related_end = cl.param("RELATED").is_some_and(|v| v.eq_ignore_ascii_case("END"));
            if cl.param("VALUE").is_some_and(|v| v.eq_ignore_ascii_case("DATE-TIME")) {
                if let Some(dt) = ICalDateTime::parse(&cl.value, false, cl.param("TZID")) {
                    alarm.trigger = AlarmTrigger::Absolute(dt);
                }
            } else if let Some(secs) = parse_iso8601_duration(&cl.value) {
                alarm.trigger = AlarmTrigger::Relative {
                    offset_seconds: secs,
                    related_end,
                };
            }
        }
        "DESCRIPTION" => alarm.description = Some(unescape_text(&cl.value)),
        "SUMMARY" => alarm.summary = Some(unescape_text(&cl.value)),
        "REPEAT" => alarm.repeat = cl.value.parse().ok(),
        "DURATION" => alarm.duration_seconds = parse_iso8601_duration(&cl.value),
        "UID" => alarm.uid = Some(cl.value.clone()),
        "ACKNOWLEDGED" => alarm.acknowledged = ICalDateTime::parse(&cl.value, false, None),
        "RELATED-TO" => alarm.related_to = Some(cl.value.clone()),
        "X-DEFAULT-ALARM" | "DEFAULT-ALARM" => {
            alarm.default_alarm = cl.value.eq_ignore_ascii_case("TRUE");
        }
        "PROXIMITY" => alarm.proximity = AlarmProximity::parse(&cl.value),
        _ => {}
    }
}

/// Parse an RFC 5545 `DURATION` value (`P...T...`) into signed seconds.
pub fn parse_iso8601_duration(value: &str) -> Option<i64> {
    let (sign, rest) = if let Some(rest) = value.strip_prefix('-') {
        (-1i64, rest)
    } else if let Some(rest) = value.strip_prefix('+') {
        (1i64, rest)
    } else {
        (1i64, value)
    };
    let rest = rest.strip_prefix('P')?;
    let (date_part, time_part) = match rest.split_once('T') {
        Some((d, t)) => (d, Some(t)),
        None => (rest, None),
    };

    let mut total = 0i64;
    total += parse_designators(date_part, &[('W', 7 * 86400), ('D', 86400)])?;
    if let Some(time_part) = time_part {
        total += parse_designators(time_part, &[('H', 3600), ('M', 60), ('S', 1)])?;
    }
    Some(sign * total)
}

fn parse_designators(s: &str, units: &[(char, i64)]) -> Option<i64> {
    let mut total = 0i64;
    let mut num = String::new();
    for ch in s.chars() {
        if ch.is_ascii_digit() {
            num.push(ch);
        } else {
            let value: i64 = num.parse().ok()?;
            num.clear();
            let (_, seconds) = units.iter().find(|(d, _)| *d == ch)?;
            total += value * seconds;
        }
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_content_line() {
        let cl = parse_content_line("DTSTART;TZID=America/New_York:20240101T090000").unwrap();
        assert_eq!(cl.name, "DTSTART");
        assert_eq!(cl.param("TZID"), Some("America/New_York"));
        assert_eq!(cl.value, "20240101T090000");
    }

    #[test]
    fn parses_multi_value_param() {
        let cl = parse_content_line("ATTENDEE;DELEGATED-TO=\"a\",\"b\":mailto:x").unwrap();
        assert_eq!(
            cl.params[0].1,
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn scenario_one_minimal_calendar() {
        let input = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nUID:a@x\r\nDTSTART:20240101T120000Z\r\nSUMMARY:Hi\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        let result = parse_calendar(input, &CalSyncConfig::default()).unwrap();
        assert_eq!(result.events.len(), 1);
        let ev = &result.events[0];
        assert_eq!(ev.uid, "a@x");
        assert!(ev.dtstart.is_utc());
        assert_eq!(ev.summary.as_deref(), Some("Hi"));
    }

    #[test]
    fn scenario_two_escaped_summary_roundtrips() {
        let input = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:a@x\r\nDTSTART:20240101T120000Z\r\nSUMMARY:Meeting\\, agenda\\; review\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        let result = parse_calendar(input, &CalSyncConfig::default()).unwrap();
        assert_eq!(
            result.events[0].summary.as_deref(),
            Some("Meeting, agenda; review")
        );
    }

    #[test]
    fn scenario_four_rrule_count() {
        let input = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:a@x\r\nDTSTART:20240101T090000Z\r\nRRULE:FREQ=DAILY;COUNT=3\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        let result = parse_calendar(input, &CalSyncConfig::default()).unwrap();
        let rrule = result.events[0].rrule.as_ref().unwrap();
        assert_eq!(rrule.freq, crate::model::rrule::Frequency::Daily);
    }

    #[test]
    fn mismatched_end_is_fatal() {
        let input = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:a@x\r\nEND:VTODO\r\nEND:VCALENDAR\r\n";
        assert!(parse_calendar(input, &CalSyncConfig::default()).is_err());
    }

    #[test]
    fn unsafe_scheme_is_diagnosed() {
        let input = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:a@x\r\nDTSTART:20240101T090000Z\r\nURL:ftp://evil.example\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        let result = parse_calendar(input, &CalSyncConfig::default()).unwrap();
        assert!(result
            .diagnostics
            .iter()
            .any(|d| matches!(d, ParseDiagnostic::UnsafeScheme { .. })));
    }

    #[test]
    fn input_too_large_is_rejected() {
        let config = CalSyncConfig::builder().max_input_bytes(4).build();
        let result = parse_calendar("BEGIN:VCALENDAR\r\n", &config);
        assert!(matches!(result, Err(ParseError::InputTooLarge { .. })));
    }

    #[test]
    fn unrecognized_x_property_is_preserved() {
        let input = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:a@x\r\nDTSTART:20240101T090000Z\r\nX-CUSTOM:value\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        let result = parse_calendar(input, &CalSyncConfig::default()).unwrap();
        assert!(result
            .events[0]
            .extra_properties
            .iter()
            .any(|(k, v)| k == "X-CUSTOM" && v == "value"));
    }

    #[test]
    fn vtodo_is_preserved_as_opaque_block() {
        let input = "BEGIN:VCALENDAR\r\nBEGIN:VTODO\r\nUID:t@x\r\nEND:VTODO\r\nEND:VCALENDAR\r\n";
        let result = parse_calendar(input, &CalSyncConfig::default()).unwrap();
        assert_eq!(result.other_components.len(), 1);
        assert!(result.other_components[0].contains("UID:t@x"));
    }

    #[test]
    fn locally_defined_tzid_suppresses_floating_fallback() {
        let input = "BEGIN:VCALENDAR\r\n\
BEGIN:VTIMEZONE\r\n\
TZID:Custom/Legacy-Zone\r\n\
BEGIN:STANDARD\r\n\
DTSTART:19700101T000000\r\n\
TZOFFSETFROM:+0000\r\n\
TZOFFSETTO:+0000\r\n\
END:STANDARD\r\n\
END:VTIMEZONE\r\n\
BEGIN:VEVENT\r\n\
UID:a@x\r\n\
DTSTAMP:20240101T090000Z\r\n\
DTSTART;TZID=Custom/Legacy-Zone:20240101T090000\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";
        let result = parse_calendar(input, &CalSyncConfig::default()).unwrap();
        assert!(result.timezones.contains_key("Custom/Legacy-Zone"));
        assert!(result.other_components.is_empty());
        assert!(!result
            .diagnostics
            .iter()
            .any(|d| matches!(d, ParseDiagnostic::FloatingFallback { .. })));
    }

    #[test]
    fn unresolved_tzid_without_vtimezone_flags_floating_fallback() {
        let input = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:a@x\r\nDTSTAMP:20240101T090000Z\r\nDTSTART;TZID=Bogus/Nowhere:20240101T090000\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        let result = parse_calendar(input, &CalSyncConfig::default()).unwrap();
        assert!(result
            .diagnostics
            .iter()
            .any(|d| matches!(d, ParseDiagnostic::FloatingFallback { .. })));
    }

    #[test]
    fn parses_duration() {
        assert_eq!(parse_iso8601_duration("PT1H30M"), Some(5400));
        assert_eq!(parse_iso8601_duration("-PT15M"), Some(-900));
        assert_eq!(parse_iso8601_duration("P1D"), Some(86400));
    }
}
