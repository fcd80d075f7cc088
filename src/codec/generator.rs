//! The iCalendar generator: deterministic, ordered emission of `VCALENDAR`
//! text from the value model.

use super::text::{escape_text, fold_line, quote_param_value, quote_param_value_always};
use crate::config::CalSyncConfig;
use crate::error::GenerateError;
use crate::model::alarm::{AlarmAction, AlarmTrigger, ICalAlarm};
use crate::model::datetime::ICalDateTime;
use crate::model::event::{EventSpan, EventStatus, EventTransparency, ICalEvent};
use std::fmt::Write as _;

/// Generate a complete `VCALENDAR` document containing `events`, in order.
/// `method` controls the optional `METHOD` property; `None` omits it.
pub fn generate_calendar(
    events: &[ICalEvent],
    config: &CalSyncConfig,
    method: Option<&str>,
) -> Result<String, GenerateError> {
    let mut out = String::new();
    write_line(&mut out, "BEGIN:VCALENDAR");
    write_line(&mut out, "VERSION:2.0");
    write_line(&mut out, &format!("PRODID:{}", config.prod_id));
    write_line(&mut out, "CALSCALE:GREGORIAN");
    if let Some(method) = method {
        write_line(&mut out, &format!("METHOD:{method}"));
    }
    for event in events {
        generate_event(&mut out, event)?;
    }
    write_line(&mut out, "END:VCALENDAR");
    Ok(out)
}

fn write_line(out: &mut String, logical: &str) {
    // Fold only when the physical line would exceed the 75-octet budget;
    // short lines are emitted verbatim to match real-world calendar output
    // byte-for-byte.
    if logical.len() > 75 {
        out.push_str(&fold_line(logical));
    } else {
        out.push_str(logical);
    }
    out.push_str("\r\n");
}

fn datetime_property(name: &str, dt: &ICalDateTime) -> String {
    match dt {
        ICalDateTime::Date(_) => format!("{name};VALUE=DATE:{}", dt.format_value()),
        ICalDateTime::Utc(_) | ICalDateTime::Floating(_) => {
            format!("{name}:{}", dt.format_value())
        }
        ICalDateTime::Local { tzid, .. } => {
            format!("{name};TZID={}:{}", tzid, dt.format_value())
        }
    }
}

fn generate_event(out: &mut String, event: &ICalEvent) -> Result<(), GenerateError> {
    if event.uid.is_empty() {
        return Err(GenerateError::Serialize("UID".to_string()));
    }

    write_line(out, "BEGIN:VEVENT");
    write_line(out, &format!("UID:{}", escape_text(&event.uid)));
    write_line(out, &datetime_property("DTSTAMP", &event.dtstamp));
    write_line(out, &datetime_property("DTSTART", &event.dtstart));

    match &event.span {
        Some(EventSpan::End(end)) => write_line(out, &datetime_property("DTEND", end)),
        Some(EventSpan::Duration(secs)) => {
            write_line(out, &format!("DURATION:{}", format_iso8601_duration(*secs)))
        }
        None => {}
    }

    if let Some(recurrence_id) = &event.recurrence_id {
        write_line(out, &datetime_property("RECURRENCE-ID", recurrence_id));
    }

    // An event representing a modified single instance never emits RRULE,
    // even if one is retained in memory.
    if event.recurrence_id.is_none() {
        if let Some(rrule) = &event.rrule {
            write_line(out, &format!("RRULE:{}", rrule.to_value_string()));
        }
    }

    for rdate in &event.rdate {
        write_line(out, &datetime_property("RDATE", rdate));
    }
    for exdate in &event.exdate {
        write_line(out, &datetime_property("EXDATE", exdate));
    }

    if let Some(summary) = &event.summary {
        write_line(out, &format!("SUMMARY:{}", escape_text(summary)));
    }
    if let Some(description) = &event.description {
        write_line(out, &format!("DESCRIPTION:{}", escape_text(description)));
    }
    if let Some(location) = &event.location {
        write_line(out, &format!("LOCATION:{}", escape_text(location)));
    }

    // Some servers 400 on a missing STATUS even though RFC 5545 marks it
    // optional, so it is always emitted, defaulting to CONFIRMED.
    let status = event.status.unwrap_or(EventStatus::Confirmed);
    write_line(out, &format!("STATUS:{}", status.as_str()));
    write_line(out, &format!("SEQUENCE:{}", event.sequence));

    if event.transparency == EventTransparency::Transparent {
        write_line(out, &format!("TRANSP:{}", event.transparency.as_str()));
    }

    for comment in &event.comment {
        write_line(out, &format!("COMMENT:{}", escape_text(comment)));
    }
    if let Some(contact) = &event.contact {
        write_line(out, &format!("CONTACT:{}", escape_text(contact)));
    }

    if !event.categories.is_empty() {
        let joined = event
            .categories
            .iter()
            .map(|c| escape_text(c))
            .collect::<Vec<_>>()
            .join(",");
        write_line(out, &format!("CATEGORIES:{joined}"));
    }

    if let Some(color) = &event.color {
        write_line(out, &format!("COLOR:{color}"));
    }

    for image in &event.images {
        let mut line = "IMAGE;VALUE=URI".to_string();
        if let Some(display) = &image.display {
            if !display.eq_ignore_ascii_case("GRAPHIC") {
                let _ = write!(line, ";DISPLAY={display}");
            }
        }
        if let Some(fmttype) = &image.fmttype {
            let _ = write!(line, ";FMTTYPE={fmttype}");
        }
        if let Some(altrep) = &image.altrep {
            let _ = write!(line, ";ALTREP={}", quote_param_value_always(&escape_text(altrep)));
        }
        let _ = write!(line, ":{}", image.uri);
        write_line(out, &line);
    }

    for conference in &event.conferences {
        let mut line = "CONFERENCE;VALUE=URI".to_string();
        if let Some(feature) = &conference.feature {
            let _ = write!(line, ";FEATURE={feature}");
        }
        if let Some(label) = &conference.label {
            let _ = write!(line, ";LABEL={}", quote_param_value(&escape_text(label)));
        }
        if let Some(language) = &conference.language {
            let _ = write!(line, ";LANGUAGE={language}");
        }
        let _ = write!(line, ":{}", conference.uri);
        write_line(out, &line);
    }

    if let Some(url) = &event.url {
        write_line(out, &format!("URL:{url}"));
    }

    if let Some(organizer) = &event.organizer {
        let mut line = "ORGANIZER".to_string();
        if let Some(cn) = &organizer.common_name {
            let _ = write!(line, ";CN={}", quote_param_value(cn));
        }
        let _ = write!(line, ":{}", organizer.uri);
        write_line(out, &line);
    }

    for attendee in &event.attendees {
        let mut line = "ATTENDEE".to_string();
        if let Some(role) = attendee.role {
            let _ = write!(line, ";ROLE={}", role.as_str());
        }
        if let Some(partstat) = attendee.partstat {
            let _ = write!(line, ";PARTSTAT={}", partstat.as_str());
        }
        if let Some(cn) = &attendee.common_name {
            let _ = write!(line, ";CN={}", quote_param_value(cn));
        }
        let _ = write!(line, ":{}", attendee.uri);
        write_line(out, &line);
    }

    for alarm in &event.alarms {
        generate_alarm(out, alarm)?;
    }

    for (name, value) in &event.extra_properties {
        write_line(out, &format!("{name}:{value}"));
    }

    write_line(out, "END:VEVENT");
    Ok(())
}

fn generate_alarm(out: &mut String, alarm: &ICalAlarm) -> Result<(), GenerateError> {
    write_line(out, "BEGIN:VALARM");
    write_line(out, &format!("ACTION:{}", alarm.action.as_str()));

    match &alarm.trigger {
        AlarmTrigger::Relative {
            offset_seconds,
            related_end,
        } => {
            let mut line = format!("TRIGGER:{}", format_iso8601_duration(*offset_seconds));
            if *related_end {
                line = format!("TRIGGER;RELATED=END:{}", format_iso8601_duration(*offset_seconds));
            }
            write_line(out, &line);
        }
        AlarmTrigger::Absolute(dt) => {
            write_line(
                out,
                &format!("TRIGGER;VALUE=DATE-TIME:{}", dt.format_value()),
            );
        }
    }

    // DISPLAY alarms must carry a description; default one in if the
    // caller never set it.
    if alarm.action == AlarmAction::Display {
        let description = alarm.description.clone().unwrap_or_else(|| "Reminder".to_string());
        write_line(out, &format!("DESCRIPTION:{}", escape_text(&description)));
    } else if let Some(description) = &alarm.description {
        write_line(out, &format!("DESCRIPTION:{}", escape_text(description)));
    }

    if let Some(summary) = &alarm.summary {
        write_line(out, &format!("SUMMARY:{}", escape_text(summary)));
    }

    if let Some(repeat) = alarm.repeat {
        if repeat > 0 {
            write_line(out, &format!("REPEAT:{repeat}"));
            let duration = alarm
                .duration_seconds
                .ok_or_else(|| GenerateError::Serialize("DURATION".to_string()))?;
            write_line(out, &format!("DURATION:{}", format_iso8601_duration(duration)));
        }
    }

    if let Some(uid) = &alarm.uid {
        write_line(out, &format!("UID:{uid}"));
    }
    if let Some(acknowledged) = &alarm.acknowledged {
        write_line(out, &format!("ACKNOWLEDGED:{}", acknowledged.format_value()));
    }
    if let Some(related_to) = &alarm.related_to {
        write_line(out, &format!("RELATED-TO:{related_to}"));
    }
    if alarm.default_alarm {
        write_line(out, "DEFAULT-ALARM:TRUE");
    }
    if let Some(proximity) = alarm.proximity {
        write_line(out, &format!("PROXIMITY:{}", proximity.as_str()));
    }

    write_line(out, "END:VALARM");
    Ok(())
}

/// Inverse of [`crate::codec::parser::parse_iso8601_duration`].
pub fn format_iso8601_duration(total_seconds: i64) -> String {
    let sign = if total_seconds < 0 { "-" } else { "" };
    let mut remaining = total_seconds.unsigned_abs();
    let days = remaining / 86400;
    remaining %= 86400;
    let hours = remaining / 3600;
    remaining %= 3600;
    let minutes = remaining / 60;
    let seconds = remaining % 60;

    let mut s = format!("{sign}P");
    if days > 0 {
        let _ = write!(s, "{days}D");
    }
    if hours > 0 || minutes > 0 || seconds > 0 {
        s.push('T');
        if hours > 0 {
            let _ = write!(s, "{hours}H");
        }
        if minutes > 0 {
            let _ = write!(s, "{minutes}M");
        }
        if seconds > 0 || (days == 0 && hours == 0 && minutes == 0) {
            let _ = write!(s, "{seconds}S");
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::parser::parse_calendar;
    use crate::model::event::EventSpan;

    fn sample_event() -> ICalEvent {
        let dt = ICalDateTime::parse("20240101T120000Z", false, None).unwrap();
        let mut ev = ICalEvent::new("a@x", dt.clone(), dt);
        ev.summary = Some("Hi".to_string());
        ev
    }

    #[test]
    fn transparent_event_emits_transp_opaque_is_omitted() {
        let config = CalSyncConfig::default();
        let mut ev = sample_event();
        ev.transparency = EventTransparency::Transparent;
        let out = generate_calendar(&[ev], &config, None).unwrap();
        assert!(out.contains("TRANSP:TRANSPARENT\r\n"));

        let out = generate_calendar(&[sample_event()], &config, None).unwrap();
        assert!(!out.contains("TRANSP:"));
    }

    #[test]
    fn image_and_conference_params_round_trip() {
        let config = CalSyncConfig::default();
        let mut ev = sample_event();
        ev.images.push(crate::model::event::EventImage {
            uri: "https://example.com/a.png".to_string(),
            display: None,
            fmttype: Some("image/png".to_string()),
            altrep: Some("a picture".to_string()),
        });
        ev.conferences.push(crate::model::event::Conference {
            uri: "https://example.com/room".to_string(),
            feature: Some("VIDEO".to_string()),
            label: None,
            language: Some("en".to_string()),
        });
        let out = generate_calendar(&[ev], &config, None).unwrap();
        assert!(out.contains("FMTTYPE=image/png"));
        assert!(out.contains("ALTREP=\"a picture\""));
        assert!(out.contains("LANGUAGE=en"));

        let parsed = parse_calendar(&out, &config).unwrap();
        assert_eq!(parsed.events[0].images[0].fmttype.as_deref(), Some("image/png"));
        assert_eq!(parsed.events[0].conferences[0].language.as_deref(), Some("en"));
    }

    #[test]
    fn generates_minimal_calendar() {
        let config = CalSyncConfig::default();
        let out = generate_calendar(&[sample_event()], &config, None).unwrap();
        assert!(out.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(out.contains("VERSION:2.0\r\n"));
        assert!(out.contains("CALSCALE:GREGORIAN\r\n"));
        assert!(out.contains("STATUS:CONFIRMED\r\n"));
        assert!(out.contains("SEQUENCE:0\r\n"));
        assert!(out.ends_with("END:VCALENDAR\r\n"));
    }

    #[test]
    fn omits_rrule_when_recurrence_id_set() {
        let dt = ICalDateTime::parse("20240101T120000Z", false, None).unwrap();
        let mut ev = ICalEvent::new("a@x", dt.clone(), dt.clone());
        ev.recurrence_id = Some(dt);
        ev.rrule = Some(crate::model::rrule::RRule::new(
            crate::model::rrule::Frequency::Daily,
        ));
        let out = generate_calendar(&[ev], &CalSyncConfig::default(), None).unwrap();
        assert!(!out.contains("RRULE:"));
    }

    #[test]
    fn round_trips_through_parse() {
        let config = CalSyncConfig::default();
        let event = sample_event();
        let generated = generate_calendar(&[event.clone()], &config, None).unwrap();
        let parsed = parse_calendar(&generated, &config).unwrap();
        assert_eq!(parsed.events.len(), 1);
        assert_eq!(parsed.events[0].uid, event.uid);
        assert_eq!(parsed.events[0].summary, event.summary);
    }

    #[test]
    fn duration_emits_and_parses_inverse() {
        assert_eq!(format_iso8601_duration(5400), "PT1H30M");
        assert_eq!(format_iso8601_duration(-900), "-PT15M");
        assert_eq!(
            crate::codec::parser::parse_iso8601_duration(&format_iso8601_duration(5400)),
            Some(5400)
        );
    }

    #[test]
    fn display_alarm_gets_default_description() {
        let mut ev = sample_event();
        ev.alarms.push(ICalAlarm::new(
            AlarmAction::Display,
            AlarmTrigger::Relative {
                offset_seconds: -600,
                related_end: false,
            },
        ));
        let out = generate_calendar(&[ev], &CalSyncConfig::default(), None).unwrap();
        assert!(out.contains("DESCRIPTION:Reminder"));
    }

    #[test]
    fn long_summary_is_folded() {
        let mut ev = sample_event();
        ev.summary = Some("x".repeat(200));
        let out = generate_calendar(&[ev], &CalSyncConfig::default(), None).unwrap();
        for line in out.split("\r\n") {
            assert!(line.len() <= 75);
        }
    }

    #[test]
    fn empty_uid_is_a_generate_error() {
        let dt = ICalDateTime::parse("20240101T120000Z", false, None).unwrap();
        let ev = ICalEvent::new("", dt.clone(), dt);
        assert!(generate_calendar(&[ev], &CalSyncConfig::default(), None).is_err());
    }

    #[test]
    fn duration_span_round_trips() {
        let dt = ICalDateTime::parse("20240101T120000Z", false, None).unwrap();
        let mut ev = ICalEvent::new("a@x", dt.clone(), dt);
        ev.span = Some(EventSpan::Duration(3600));
        let out = generate_calendar(&[ev], &CalSyncConfig::default(), None).unwrap();
        assert!(out.contains("DURATION:PT1H"));
    }
}
