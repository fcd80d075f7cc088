//! `ICalEvent` and its supporting RFC 5545 / RFC 7986 structures.

use super::alarm::ICalAlarm;
use super::datetime::ICalDateTime;
use super::rrule::RRule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventClass {
    Public,
    Private,
    Confidential,
}

impl EventClass {
    pub fn parse(s: &str) -> Option<Self> {
        hashify::tiny_map_ignore_case!(s.as_bytes(),
            "PUBLIC" => EventClass::Public,
            "PRIVATE" => EventClass::Private,
            "CONFIDENTIAL" => EventClass::Confidential,
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventClass::Public => "PUBLIC",
            EventClass::Private => "PRIVATE",
            EventClass::Confidential => "CONFIDENTIAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventStatus {
    Tentative,
    Confirmed,
    Cancelled,
}

impl EventStatus {
    pub fn parse(s: &str) -> Option<Self> {
        hashify::tiny_map_ignore_case!(s.as_bytes(),
            "TENTATIVE" => EventStatus::Tentative,
            "CONFIRMED" => EventStatus::Confirmed,
            "CANCELLED" => EventStatus::Cancelled,
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Tentative => "TENTATIVE",
            EventStatus::Confirmed => "CONFIRMED",
            EventStatus::Cancelled => "CANCELLED",
        }
    }
}

/// `TRANSP`: whether the event blocks free/busy time. Defaults to
/// `OPAQUE` per RFC 5545 §3.8.2.7 and is omitted from generated output in
/// that case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EventTransparency {
    #[default]
    Opaque,
    Transparent,
}

impl EventTransparency {
    pub fn parse(s: &str) -> Option<Self> {
        hashify::tiny_map_ignore_case!(s.as_bytes(),
            "OPAQUE" => EventTransparency::Opaque,
            "TRANSPARENT" => EventTransparency::Transparent,
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventTransparency::Opaque => "OPAQUE",
            EventTransparency::Transparent => "TRANSPARENT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttendeeRole {
    Chair,
    ReqParticipant,
    OptParticipant,
    NonParticipant,
}

impl AttendeeRole {
    pub fn parse(s: &str) -> Option<Self> {
        hashify::tiny_map_ignore_case!(s.as_bytes(),
            "CHAIR" => AttendeeRole::Chair,
            "REQ-PARTICIPANT" => AttendeeRole::ReqParticipant,
            "OPT-PARTICIPANT" => AttendeeRole::OptParticipant,
            "NON-PARTICIPANT" => AttendeeRole::NonParticipant,
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttendeeRole::Chair => "CHAIR",
            AttendeeRole::ReqParticipant => "REQ-PARTICIPANT",
            AttendeeRole::OptParticipant => "OPT-PARTICIPANT",
            AttendeeRole::NonParticipant => "NON-PARTICIPANT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticipationStatus {
    NeedsAction,
    Accepted,
    Declined,
    Tentative,
    Delegated,
}

impl ParticipationStatus {
    pub fn parse(s: &str) -> Option<Self> {
        hashify::tiny_map_ignore_case!(s.as_bytes(),
            "NEEDS-ACTION" => ParticipationStatus::NeedsAction,
            "ACCEPTED" => ParticipationStatus::Accepted,
            "DECLINED" => ParticipationStatus::Declined,
            "TENTATIVE" => ParticipationStatus::Tentative,
            "DELEGATED" => ParticipationStatus::Delegated,
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipationStatus::NeedsAction => "NEEDS-ACTION",
            ParticipationStatus::Accepted => "ACCEPTED",
            ParticipationStatus::Declined => "DECLINED",
            ParticipationStatus::Tentative => "TENTATIVE",
            ParticipationStatus::Delegated => "DELEGATED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Organizer {
    pub uri: String,
    pub common_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attendee {
    pub uri: String,
    pub common_name: Option<String>,
    pub role: Option<AttendeeRole>,
    pub partstat: Option<ParticipationStatus>,
}

/// RFC 7986 `IMAGE` property: a URI plus its declared media type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventImage {
    pub uri: String,
    pub display: Option<String>,
    /// `FMTTYPE` — the image's MIME type.
    pub fmttype: Option<String>,
    /// `ALTREP` — an alternate text representation of the URI.
    pub altrep: Option<String>,
}

/// RFC 7986 `CONFERENCE` property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Conference {
    pub uri: String,
    pub feature: Option<String>,
    pub label: Option<String>,
    /// `LANGUAGE` — the language tag of `label`.
    pub language: Option<String>,
}

/// The end of an event's time span: an explicit `DTEND` or a `DURATION`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventSpan {
    End(ICalDateTime),
    Duration(i64),
}

/// A `VEVENT` component, extended per RFC 7986.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ICalEvent {
    pub uid: String,
    pub dtstamp: ICalDateTime,
    pub dtstart: ICalDateTime,
    pub span: Option<EventSpan>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub status: Option<EventStatus>,
    pub class: Option<EventClass>,
    pub sequence: u32,
    /// `TRANSP` — whether the event blocks free/busy time. Defaults to
    /// `OPAQUE`, which is omitted on generation.
    pub transparency: EventTransparency,
    pub rrule: Option<RRule>,
    pub rdate: Vec<ICalDateTime>,
    pub exdate: Vec<ICalDateTime>,
    pub recurrence_id: Option<ICalDateTime>,
    pub organizer: Option<Organizer>,
    pub attendees: Vec<Attendee>,
    pub alarms: Vec<ICalAlarm>,
    /// RFC 7986 `COLOR` — a CSS3 color name.
    pub color: Option<String>,
    /// RFC 7986 `IMAGE`, repeatable.
    pub images: Vec<EventImage>,
    /// RFC 7986 `CONFERENCE`, repeatable.
    pub conferences: Vec<Conference>,
    pub categories: Vec<String>,
    /// `COMMENT`, repeatable per RFC 5545 §3.8.1.4.
    pub comment: Vec<String>,
    /// `CONTACT`, RFC 5545 §3.8.4.2.
    pub contact: Option<String>,
    pub url: Option<String>,
    /// Properties the codec does not model explicitly, preserved verbatim
    /// as `(name, raw value)` so a round trip never silently drops data.
    pub extra_properties: Vec<(String, String)>,
}

impl ICalEvent {
    pub fn new(uid: impl Into<String>, dtstamp: ICalDateTime, dtstart: ICalDateTime) -> Self {
        Self {
            uid: uid.into(),
            dtstamp,
            dtstart,
            span: None,
            summary: None,
            description: None,
            location: None,
            status: None,
            class: None,
            sequence: 0,
            transparency: EventTransparency::Opaque,
            rrule: None,
            rdate: Vec::new(),
            exdate: Vec::new(),
            recurrence_id: None,
            organizer: None,
            attendees: Vec::new(),
            alarms: Vec::new(),
            color: None,
            images: Vec::new(),
            conferences: Vec::new(),
            categories: Vec::new(),
            comment: Vec::new(),
            contact: None,
            url: None,
            extra_properties: Vec::new(),
        }
    }

    /// Whether this event carries a recurrence rule or extra instances.
    pub fn is_recurring(&self) -> bool {
        self.rrule.is_some() || !self.rdate.is_empty()
    }

    /// Whether this is an exception override for a specific recurrence
    /// instance of a recurring master.
    pub fn is_recurrence_override(&self) -> bool {
        self.recurrence_id.is_some()
    }
}
