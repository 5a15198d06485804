use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Reservation ids are allocated sequentially, starting at 1.
pub type ReservationId = i64;
pub type RoomId = i64;

/// Half-open interval `[start, end)` on the club's local clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Span {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    /// Span of a booking starting at `start` and running `duration_hours` whole hours.
    pub fn from_hours(start: NaiveDateTime, duration_hours: u32) -> Self {
        Self::new(start, start + Duration::hours(i64::from(duration_hours)))
    }

    /// Touching endpoints do not overlap: back-to-back bookings are legal.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Membership role. Only coordinators may own reservations, and only when
/// their `coordinator_since` date is set as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Student,
    Teacher,
    Technician,
    Coordinator,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollee {
    pub email: String,
    pub name: String,
    pub surname: String,
    pub birth_date: NaiveDate,
    pub role: Role,
    pub coordinator_since: Option<NaiveDate>,
}

impl Enrollee {
    /// Booking privilege needs both the role and the since-date; the role
    /// alone is not enough.
    pub fn is_coordinator(&self) -> bool {
        self.role == Role::Coordinator && self.coordinator_since.is_some()
    }
}

/// Resolved caller identity, handed in by the (out-of-scope) session layer.
/// The engine never authenticates; it only authorizes from these three fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
    pub role: Role,
    pub coordinator_since: Option<NaiveDate>,
}

impl Identity {
    pub fn is_coordinator(&self) -> bool {
        self.role == Role::Coordinator && self.coordinator_since.is_some()
    }
}

impl From<&Enrollee> for Identity {
    fn from(e: &Enrollee) -> Self {
        Self {
            email: e.email.clone(),
            role: e.role,
            coordinator_since: e.coordinator_since,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub sector: String,
    pub capacity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub start: NaiveDateTime,
    pub duration_hours: u32,
    pub activity: String,
    /// Snapshot of the room's sector at creation time. Deliberately never
    /// re-synced if the room's sector changes later.
    pub sector: String,
    pub room_id: RoomId,
    pub owner_email: String,
}

impl Reservation {
    pub fn span(&self) -> Span {
        Span::from_hours(self.start, self.duration_hours)
    }
}

/// Invitation response state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rsvp {
    Pending,
    Accepted,
    Declined,
}

/// A respond() call carries one of the two terminal answers; Pending is only
/// reachable through reset().
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reply {
    Accepted,
    Declined,
}

impl From<Reply> for Rsvp {
    fn from(r: Reply) -> Self {
        match r {
            Reply::Accepted => Rsvp::Accepted,
            Reply::Declined => Rsvp::Declined,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub enrollee_email: String,
    pub reservation_id: ReservationId,
    pub response: Rsvp,
    /// Present iff `response` is Declined.
    pub reason: Option<String>,
    /// Stamped on accept/decline, cleared on reset.
    pub responded_at: Option<NaiveDateTime>,
}

impl Invitation {
    pub fn pending(email: &str, reservation_id: ReservationId) -> Self {
        Self {
            enrollee_email: email.to_string(),
            reservation_id,
            response: Rsvp::Pending,
            reason: None,
            responded_at: None,
        }
    }
}

/// The event types — flat, no nesting. This is the WAL record format.
///
/// Each engine operation maps to exactly one event, so a multi-step change
/// (seeding invitations, cascade deletion, roster reconciliation) is atomic
/// on disk: either the whole event replays or none of it does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    EnrolleeRegistered {
        enrollee: Enrollee,
    },
    ProfileUpdated {
        email: String,
        name: String,
        surname: String,
        birth_date: NaiveDate,
    },
    /// Cascades: the enrollee's invitations, the invitations of reservations
    /// they own, those reservations, then the enrollee.
    EnrolleeRemoved {
        email: String,
    },
    RoomAdded {
        room: Room,
    },
    /// Cascades: one pending invitation per invitee.
    ReservationCreated {
        reservation: Reservation,
        invitees: Vec<String>,
    },
    /// `invitees: None` leaves the roster untouched; `Some` reconciles it
    /// (pending rows not listed are dropped, new emails become pending).
    ReservationUpdated {
        id: ReservationId,
        start: NaiveDateTime,
        duration_hours: u32,
        activity: String,
        invitees: Option<Vec<String>>,
    },
    /// Cascades: every invitation of the reservation, then the reservation.
    ReservationDeleted {
        id: ReservationId,
    },
    InvitationAnswered {
        reservation_id: ReservationId,
        email: String,
        reply: Reply,
        reason: Option<String>,
        at: NaiveDateTime,
    },
    InvitationReset {
        reservation_id: ReservationId,
        email: String,
    },
}

// ── Query result types ───────────────────────────────────────────

/// A reservation joined with its room and owner, as listed to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationInfo {
    pub id: ReservationId,
    pub start: NaiveDateTime,
    pub duration_hours: u32,
    pub activity: String,
    pub sector: String,
    pub room_id: RoomId,
    pub room_name: String,
    pub capacity: u32,
    pub owner_email: String,
    pub owner_name: String,
    pub owner_surname: String,
    /// Currently-accepted invitations.
    pub accepted_count: u32,
}

/// An invitation joined with its reservation, room, and owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitationInfo {
    pub enrollee_email: String,
    pub response: Rsvp,
    pub reason: Option<String>,
    pub responded_at: Option<NaiveDateTime>,
    pub reservation: ReservationInfo,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn span_overlap_is_half_open() {
        let a = Span::from_hours(at(10), 2); // [10, 12)
        let b = Span::from_hours(at(11), 2); // [11, 13)
        let c = Span::from_hours(at(12), 1); // [12, 13)
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c)); // back-to-back
        assert!(!c.overlaps(&a));
    }

    #[test]
    fn span_containment_within_longer_booking() {
        let outer = Span::from_hours(at(9), 6); // [9, 15)
        let inner = Span::from_hours(at(11), 1); // [11, 12)
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
    }

    #[test]
    fn coordinator_requires_both_role_and_date() {
        let mut e = Enrollee {
            email: "a@club.it".into(),
            name: "Anna".into(),
            surname: "Bianchi".into(),
            birth_date: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            role: Role::Coordinator,
            coordinator_since: None,
        };
        assert!(!e.is_coordinator()); // role alone is not enough
        e.coordinator_since = NaiveDate::from_ymd_opt(2020, 9, 1);
        assert!(e.is_coordinator());
        e.role = Role::Teacher;
        assert!(!e.is_coordinator()); // date alone is not enough either
    }

    #[test]
    fn event_serialization_roundtrip() {
        let event = Event::ReservationCreated {
            reservation: Reservation {
                id: 1,
                start: at(10),
                duration_hours: 2,
                activity: "prova".into(),
                sector: "musica".into(),
                room_id: 7,
                owner_email: "resp@club.it".into(),
            },
            invitees: vec!["b@club.it".into(), "c@club.it".into()],
        };
        let bytes = bincode::serialize(&event).unwrap();
        let decoded: Event = bincode::deserialize(&bytes).unwrap();
        assert_eq!(event, decoded);
    }
}
