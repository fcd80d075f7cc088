//! `ICalAlarm` — VALARM with the RFC 9074 extensions.

use super::datetime::ICalDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlarmAction {
    Audio,
    Display,
    Email,
    Procedure,
}

impl AlarmAction {
    pub fn parse(s: &str) -> Option<Self> {
        hashify::tiny_map_ignore_case!(s.as_bytes(),
            "AUDIO" => AlarmAction::Audio,
            "DISPLAY" => AlarmAction::Display,
            "EMAIL" => AlarmAction::Email,
            "PROCEDURE" => AlarmAction::Procedure,
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlarmAction::Audio => "AUDIO",
            AlarmAction::Display => "DISPLAY",
            AlarmAction::Email => "EMAIL",
            AlarmAction::Procedure => "PROCEDURE",
        }
    }
}

/// `TRIGGER` is either a duration relative to `DTSTART`/`DTEND` or an
/// absolute instant (`VALUE=DATE-TIME`), per RFC 5545 §3.8.6.3.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AlarmTrigger {
    /// Offset in seconds from the anchor; negative means "before".
    Relative {
        offset_seconds: i64,
        related_end: bool,
    },
    Absolute(ICalDateTime),
}

/// RFC 9074 `PROXIMITY` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlarmProximity {
    Arrive,
    Depart,
    Connect,
    Disconnect,
}

impl AlarmProximity {
    pub fn parse(s: &str) -> Option<Self> {
        hashify::tiny_map_ignore_case!(s.as_bytes(),
            "ARRIVE" => AlarmProximity::Arrive,
            "DEPART" => AlarmProximity::Depart,
            "CONNECT" => AlarmProximity::Connect,
            "DISCONNECT" => AlarmProximity::Disconnect,
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlarmProximity::Arrive => "ARRIVE",
            AlarmProximity::Depart => "DEPART",
            AlarmProximity::Connect => "CONNECT",
            AlarmProximity::Disconnect => "DISCONNECT",
        }
    }
}

/// A `VALARM` sub-component, carrying the RFC 9074 identity and
/// acknowledgement fields alongside the RFC 5545 core.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ICalAlarm {
    pub action: AlarmAction,
    pub trigger: AlarmTrigger,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub repeat: Option<u32>,
    pub duration_seconds: Option<i64>,
    /// RFC 9074 `UID` — stable identity for an alarm across edits.
    pub uid: Option<String>,
    /// RFC 9074 `ACKNOWLEDGED` — last time the user dismissed this alarm.
    pub acknowledged: Option<ICalDateTime>,
    /// RFC 9074 `RELATED-TO` — links a snooze/supersession chain.
    pub related_to: Option<String>,
    pub default_alarm: bool,
    pub proximity: Option<AlarmProximity>,
}

impl ICalAlarm {
    pub fn new(action: AlarmAction, trigger: AlarmTrigger) -> Self {
        Self {
            action,
            trigger,
            description: None,
            summary: None,
            repeat: None,
            duration_seconds: None,
            uid: None,
            acknowledged: None,
            related_to: None,
            default_alarm: false,
            proximity: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_alarm_action() {
        assert_eq!(AlarmAction::parse("display"), Some(AlarmAction::Display));
        assert_eq!(AlarmAction::parse("bogus"), None);
    }
}
