use chrono::NaiveDateTime;

use crate::calendar;
use crate::limits::MAX_DURATION_HOURS;
use crate::model::*;

use super::store::ClubState;
use super::{BookingPolicy, EngineError};

pub(crate) fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// Validate the shape of a booking window: whole-hour start between 09:00 and
/// 23:00, duration at least one hour, and (policy-dependent) contained in a
/// single day.
pub(crate) fn validate_window(
    start: NaiveDateTime,
    duration_hours: u32,
    policy: &BookingPolicy,
) -> Result<(), EngineError> {
    if !calendar::is_valid_window(start) {
        return Err(EngineError::Validation(
            "start must be on the hour between 09:00 and 23:00",
        ));
    }
    if duration_hours == 0 {
        return Err(EngineError::Validation("duration must be at least one hour"));
    }
    if duration_hours > MAX_DURATION_HOURS {
        return Err(EngineError::Validation("duration too long"));
    }
    if policy.reject_midnight_crossing && calendar::crosses_midnight(start, duration_hours) {
        return Err(EngineError::Validation("reservation must not cross midnight"));
    }
    Ok(())
}

/// First *other* reservation of the room whose half-open interval overlaps
/// the candidate span. `exclude` skips the reservation being edited in place.
pub(crate) fn room_conflict(
    state: &ClubState,
    room_id: RoomId,
    span: &Span,
    exclude: Option<ReservationId>,
) -> Option<ReservationId> {
    state
        .reservations
        .values()
        .filter(|r| r.room_id == room_id && Some(r.id) != exclude)
        .find(|r| r.span().overlaps(span))
        .map(|r| r.id)
}

/// First *other* reservation the person has ACCEPTED whose interval overlaps
/// the candidate span. Pending and declined invitations never clash.
pub(crate) fn person_conflict(
    state: &ClubState,
    email: &str,
    span: &Span,
    exclude: Option<ReservationId>,
) -> Option<ReservationId> {
    state
        .invitations
        .values()
        .filter(|inv| {
            inv.enrollee_email == email
                && inv.response == Rsvp::Accepted
                && Some(inv.reservation_id) != exclude
        })
        .filter_map(|inv| state.reservations.get(&inv.reservation_id))
        .find(|r| r.span().overlaps(span))
        .map(|r| r.id)
}
