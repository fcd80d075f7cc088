//! The value model: immutable types with no parsing/generation logic of
//! their own. The codec module builds and reads these.

pub mod alarm;
pub mod datetime;
pub mod event;
pub mod rrule;

pub use alarm::{AlarmAction, AlarmProximity, AlarmTrigger, ICalAlarm};
pub use datetime::ICalDateTime;
pub use event::{
    Attendee, AttendeeRole, Conference, EventClass, EventImage, EventSpan, EventStatus,
    EventTransparency, ICalEvent, Organizer, ParticipationStatus,
};
pub use rrule::{Frequency, RRule, Termination, Weekday, WeekdayNum};
