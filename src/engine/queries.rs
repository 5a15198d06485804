use chrono::NaiveDate;

use crate::calendar;
use crate::model::*;

use super::conflict::now;
use super::store::ClubState;
use super::{Engine, EngineError};

/// Join one reservation with its room and owner. Returns None only when the
/// join partners are gone, which live state never allows (rooms are never
/// deleted, owner removal cascades the reservation away).
fn reservation_info(state: &ClubState, r: &Reservation) -> Option<ReservationInfo> {
    let room = state.rooms.get(&r.room_id)?;
    let owner = state.enrollees.get(&r.owner_email)?;
    Some(ReservationInfo {
        id: r.id,
        start: r.start,
        duration_hours: r.duration_hours,
        activity: r.activity.clone(),
        sector: r.sector.clone(),
        room_id: r.room_id,
        room_name: room.name.clone(),
        capacity: room.capacity,
        owner_email: owner.email.clone(),
        owner_name: owner.name.clone(),
        owner_surname: owner.surname.clone(),
        accepted_count: state.accepted_count(r.id),
    })
}

impl Engine {
    /// The week's schedule: reservations whose start date falls on the ISO
    /// week containing `week_of`, optionally narrowed to one room, ordered by
    /// start.
    pub async fn list_reservations(
        &self,
        week_of: NaiveDate,
        room_id: Option<RoomId>,
    ) -> Vec<ReservationInfo> {
        let (monday, sunday) = calendar::week_window(week_of);
        let state = self.state.read().await;
        let mut out: Vec<ReservationInfo> = state
            .reservations
            .values()
            .filter(|r| {
                let day = r.start.date();
                day >= monday && day <= sunday && room_id.is_none_or(|id| r.room_id == id)
            })
            .filter_map(|r| reservation_info(&state, r))
            .collect();
        out.sort_by_key(|r| (r.start, r.id));
        out
    }

    pub async fn get_reservation(
        &self,
        id: ReservationId,
    ) -> Result<ReservationInfo, EngineError> {
        let state = self.state.read().await;
        state
            .reservations
            .get(&id)
            .and_then(|r| reservation_info(&state, r))
            .ok_or(EngineError::ReservationNotFound(id))
    }

    /// The caller's invitations on reservations that have not started yet,
    /// in any response state, ordered by reservation start.
    pub async fn list_invitations_for(&self, email: &str) -> Vec<InvitationInfo> {
        let threshold = now();
        let state = self.state.read().await;
        let mut out: Vec<InvitationInfo> = state
            .invitations
            .values()
            .filter(|inv| inv.enrollee_email == email)
            .filter_map(|inv| {
                let r = state.reservations.get(&inv.reservation_id)?;
                if r.start < threshold {
                    return None;
                }
                Some(InvitationInfo {
                    enrollee_email: inv.enrollee_email.clone(),
                    response: inv.response,
                    reason: inv.reason.clone(),
                    responded_at: inv.responded_at,
                    reservation: reservation_info(&state, r)?,
                })
            })
            .collect();
        out.sort_by_key(|i| (i.reservation.start, i.reservation.id));
        out
    }

    /// The caller's confirmed engagements for one week: reservations they
    /// have ACCEPTED, start date within the resolved Monday..Sunday window.
    pub async fn list_accepted_for(
        &self,
        email: &str,
        week_of: NaiveDate,
    ) -> Vec<ReservationInfo> {
        let (monday, sunday) = calendar::week_window(week_of);
        let state = self.state.read().await;
        let mut out: Vec<ReservationInfo> = state
            .invitations
            .values()
            .filter(|inv| inv.enrollee_email == email && inv.response == Rsvp::Accepted)
            .filter_map(|inv| {
                let r = state.reservations.get(&inv.reservation_id)?;
                let day = r.start.date();
                (day >= monday && day <= sunday).then(|| reservation_info(&state, r))?
            })
            .collect();
        out.sort_by_key(|r| (r.start, r.id));
        out
    }

    /// Every invitation row of one reservation, in invitee order.
    pub async fn invitees_of(
        &self,
        reservation_id: ReservationId,
    ) -> Result<Vec<Invitation>, EngineError> {
        let state = self.state.read().await;
        if !state.reservations.contains_key(&reservation_id) {
            return Err(EngineError::ReservationNotFound(reservation_id));
        }
        Ok(state
            .invitations_of(reservation_id)
            .into_iter()
            .cloned()
            .collect())
    }

    /// All rooms, ordered by (sector, name).
    pub async fn list_rooms(&self) -> Vec<Room> {
        let state = self.state.read().await;
        let mut rooms: Vec<Room> = state.rooms.values().cloned().collect();
        rooms.sort_by(|a, b| (&a.sector, &a.name).cmp(&(&b.sector, &b.name)));
        rooms
    }

    /// All enrollees, optionally narrowed to one role, ordered by
    /// (surname, name).
    pub async fn list_enrollees(&self, role: Option<Role>) -> Vec<Enrollee> {
        let state = self.state.read().await;
        let mut out: Vec<Enrollee> = state
            .enrollees
            .values()
            .filter(|e| role.is_none_or(|r| e.role == r))
            .cloned()
            .collect();
        out.sort_by(|a, b| (&a.surname, &a.name).cmp(&(&b.surname, &b.name)));
        out
    }

    pub async fn get_enrollee(&self, email: &str) -> Result<Enrollee, EngineError> {
        let state = self.state.read().await;
        state
            .enrollees
            .get(email)
            .cloned()
            .ok_or_else(|| EngineError::EnrolleeNotFound(email.to_string()))
    }
}
