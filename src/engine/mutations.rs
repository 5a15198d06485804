use chrono::{NaiveDate, NaiveDateTime};

use crate::limits::*;
use crate::model::*;
use crate::observability;

use super::conflict::{now, person_conflict, room_conflict, validate_window};
use super::{Engine, EngineError};

/// Registration request. `coordinator_since` is not a caller input: it is
/// stamped by the engine iff the role is Coordinator.
#[derive(Debug, Clone)]
pub struct NewEnrollee {
    pub email: String,
    pub name: String,
    pub surname: String,
    pub birth_date: NaiveDate,
    pub role: Role,
}

#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub surname: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct CreateReservation {
    pub room_id: RoomId,
    pub start: NaiveDateTime,
    pub duration_hours: u32,
    pub activity: String,
    pub invitees: Vec<String>,
}

/// Edit-in-place patch. Omitted fields keep their current value; an omitted
/// invitee list leaves the roster untouched, an empty one clears every
/// still-pending invitation.
#[derive(Debug, Clone, Default)]
pub struct ReservationPatch {
    pub start: Option<NaiveDateTime>,
    pub duration_hours: Option<u32>,
    pub activity: Option<String>,
    pub invitees: Option<Vec<String>>,
}

fn dedup_preserving_order(emails: &[String]) -> Vec<String> {
    let mut seen = std::collections::BTreeSet::new();
    emails
        .iter()
        .filter(|e| seen.insert(e.as_str()))
        .cloned()
        .collect()
}

impl Engine {
    // ── Enrollee lifecycle ───────────────────────────────────

    pub async fn register_enrollee(&self, req: NewEnrollee) -> Result<(), EngineError> {
        if req.email.trim().is_empty() || req.name.trim().is_empty() || req.surname.trim().is_empty()
        {
            return Err(EngineError::Validation("all fields are required"));
        }
        if req.email.len() > MAX_EMAIL_LEN {
            return Err(EngineError::Validation("email too long"));
        }
        if req.name.len() > MAX_NAME_LEN || req.surname.len() > MAX_NAME_LEN {
            return Err(EngineError::Validation("name too long"));
        }

        let mut state = self.state.write().await;
        if state.enrollees.contains_key(&req.email) {
            return Err(EngineError::Validation("email already registered"));
        }

        let coordinator_since = match req.role {
            Role::Coordinator => Some(now().date()),
            _ => None,
        };
        let event = Event::EnrolleeRegistered {
            enrollee: Enrollee {
                email: req.email.clone(),
                name: req.name,
                surname: req.surname,
                birth_date: req.birth_date,
                role: req.role,
                coordinator_since,
            },
        };
        self.persist_and_apply(&mut state, event).await?;
        tracing::debug!(email = %req.email, "enrollee registered");
        Ok(())
    }

    pub async fn update_profile(&self, email: &str, patch: ProfilePatch) -> Result<(), EngineError> {
        let mut state = self.state.write().await;
        let current = state
            .enrollees
            .get(email)
            .ok_or_else(|| EngineError::EnrolleeNotFound(email.to_string()))?;

        let name = patch.name.unwrap_or_else(|| current.name.clone());
        let surname = patch.surname.unwrap_or_else(|| current.surname.clone());
        let birth_date = patch.birth_date.unwrap_or(current.birth_date);
        if name.trim().is_empty() || surname.trim().is_empty() {
            return Err(EngineError::Validation("all fields are required"));
        }
        if name.len() > MAX_NAME_LEN || surname.len() > MAX_NAME_LEN {
            return Err(EngineError::Validation("name too long"));
        }

        let event = Event::ProfileUpdated {
            email: email.to_string(),
            name,
            surname,
            birth_date,
        };
        self.persist_and_apply(&mut state, event).await
    }

    /// Remove an enrollee and everything hanging off them: their invitations,
    /// the reservations they own, and those reservations' invitations. One
    /// event, so the cascade is all-or-nothing.
    pub async fn remove_enrollee(&self, email: &str) -> Result<(), EngineError> {
        let mut state = self.state.write().await;
        if !state.enrollees.contains_key(email) {
            return Err(EngineError::EnrolleeNotFound(email.to_string()));
        }
        let event = Event::EnrolleeRemoved {
            email: email.to_string(),
        };
        self.persist_and_apply(&mut state, event).await?;
        tracing::info!(email, "enrollee removed with owned reservations");
        Ok(())
    }

    // ── Rooms ────────────────────────────────────────────────

    pub async fn add_room(
        &self,
        name: &str,
        sector: &str,
        capacity: u32,
    ) -> Result<RoomId, EngineError> {
        if name.trim().is_empty() || sector.trim().is_empty() {
            return Err(EngineError::Validation("all fields are required"));
        }
        if name.len() > MAX_NAME_LEN || sector.len() > MAX_NAME_LEN {
            return Err(EngineError::Validation("name too long"));
        }
        if capacity == 0 {
            return Err(EngineError::Validation("capacity must be positive"));
        }

        let mut state = self.state.write().await;
        let id = state.next_room_id();
        let event = Event::RoomAdded {
            room: Room {
                id,
                name: name.to_string(),
                sector: sector.to_string(),
                capacity,
            },
        };
        self.persist_and_apply(&mut state, event).await?;
        Ok(id)
    }

    // ── Reservation lifecycle ────────────────────────────────

    pub async fn create_reservation(
        &self,
        caller: &Identity,
        req: CreateReservation,
    ) -> Result<ReservationId, EngineError> {
        if !caller.is_coordinator() {
            return Err(EngineError::Forbidden(
                "only coordinators can create reservations",
            ));
        }
        if req.activity.trim().is_empty() {
            return Err(EngineError::Validation("all fields are required"));
        }
        if req.activity.len() > MAX_ACTIVITY_LEN {
            return Err(EngineError::Validation("activity label too long"));
        }
        if req.invitees.len() > MAX_INVITEES_PER_RESERVATION {
            return Err(EngineError::Validation("too many invitees"));
        }
        validate_window(req.start, req.duration_hours, &self.policy)?;

        let mut state = self.state.write().await;
        // The session layer vouches for the identity, but the owner must
        // still exist in the directory or the reservation's owner join (and
        // every listing built on it) would dangle.
        if !state.enrollees.contains_key(&caller.email) {
            return Err(EngineError::EnrolleeNotFound(caller.email.clone()));
        }
        let room = state
            .rooms
            .get(&req.room_id)
            .ok_or(EngineError::RoomNotFound(req.room_id))?;
        let sector = room.sector.clone();

        let span = Span::from_hours(req.start, req.duration_hours);
        if let Some(clash) = room_conflict(&state, req.room_id, &span, None) {
            metrics::counter!(observability::BOOKING_CONFLICTS_TOTAL).increment(1);
            return Err(EngineError::RoomBusy(clash));
        }

        let invitees = dedup_preserving_order(&req.invitees);
        for email in &invitees {
            if !state.enrollees.contains_key(email) {
                return Err(EngineError::EnrolleeNotFound(email.clone()));
            }
        }

        let id = state.next_reservation_id();
        let event = Event::ReservationCreated {
            reservation: Reservation {
                id,
                start: req.start,
                duration_hours: req.duration_hours,
                activity: req.activity,
                sector,
                room_id: req.room_id,
                owner_email: caller.email.clone(),
            },
            invitees,
        };
        self.persist_and_apply(&mut state, event).await?;
        metrics::counter!(observability::RESERVATIONS_CREATED_TOTAL).increment(1);
        tracing::info!(id, room_id = req.room_id, owner = %caller.email, "reservation created");
        Ok(id)
    }

    pub async fn update_reservation(
        &self,
        caller: &Identity,
        id: ReservationId,
        patch: ReservationPatch,
    ) -> Result<(), EngineError> {
        let mut state = self.state.write().await;
        let current = state
            .reservations
            .get(&id)
            .ok_or(EngineError::ReservationNotFound(id))?;
        if current.owner_email != caller.email {
            return Err(EngineError::Forbidden("not the reservation owner"));
        }

        // Merge the patch over the stored values, then re-run the same checks
        // a fresh booking would face, minus the reservation itself.
        let start = patch.start.unwrap_or(current.start);
        let duration_hours = patch.duration_hours.unwrap_or(current.duration_hours);
        let activity = patch
            .activity
            .unwrap_or_else(|| current.activity.clone());
        let room_id = current.room_id;

        if activity.trim().is_empty() {
            return Err(EngineError::Validation("all fields are required"));
        }
        if activity.len() > MAX_ACTIVITY_LEN {
            return Err(EngineError::Validation("activity label too long"));
        }
        validate_window(start, duration_hours, &self.policy)?;

        let span = Span::from_hours(start, duration_hours);
        if let Some(clash) = room_conflict(&state, room_id, &span, Some(id)) {
            metrics::counter!(observability::BOOKING_CONFLICTS_TOTAL).increment(1);
            return Err(EngineError::RoomBusy(clash));
        }

        let invitees = match patch.invitees {
            Some(roster) => {
                if roster.len() > MAX_INVITEES_PER_RESERVATION {
                    return Err(EngineError::Validation("too many invitees"));
                }
                let roster = dedup_preserving_order(&roster);
                for email in &roster {
                    if !state.enrollees.contains_key(email) {
                        return Err(EngineError::EnrolleeNotFound(email.clone()));
                    }
                }
                Some(roster)
            }
            None => None,
        };

        let event = Event::ReservationUpdated {
            id,
            start,
            duration_hours,
            activity,
            invitees,
        };
        self.persist_and_apply(&mut state, event).await?;
        metrics::counter!(observability::RESERVATIONS_UPDATED_TOTAL).increment(1);
        Ok(())
    }

    pub async fn delete_reservation(
        &self,
        caller: &Identity,
        id: ReservationId,
    ) -> Result<(), EngineError> {
        let mut state = self.state.write().await;
        let current = state
            .reservations
            .get(&id)
            .ok_or(EngineError::ReservationNotFound(id))?;
        if current.owner_email != caller.email {
            return Err(EngineError::Forbidden("not the reservation owner"));
        }

        let event = Event::ReservationDeleted { id };
        self.persist_and_apply(&mut state, event).await?;
        metrics::counter!(observability::RESERVATIONS_DELETED_TOTAL).increment(1);
        tracing::info!(id, owner = %caller.email, "reservation deleted with its invitations");
        Ok(())
    }

    // ── Invitation lifecycle ─────────────────────────────────

    /// Record an accept or decline. Deliberately re-entrant: answering again
    /// re-validates and re-applies exactly like a first answer, so no edge of
    /// the pending/accepted/declined triangle is blocked here.
    pub async fn respond_invitation(
        &self,
        email: &str,
        reservation_id: ReservationId,
        reply: Reply,
        reason: Option<String>,
    ) -> Result<(), EngineError> {
        let reason = reason.filter(|r| !r.trim().is_empty());
        if reply == Reply::Declined && reason.is_none() {
            return Err(EngineError::Validation("declining requires a reason"));
        }
        if reason.as_ref().is_some_and(|r| r.len() > MAX_REASON_LEN) {
            return Err(EngineError::Validation("reason too long"));
        }

        let mut state = self.state.write().await;
        let reservation = state
            .reservations
            .get(&reservation_id)
            .ok_or(EngineError::ReservationNotFound(reservation_id))?
            .clone();
        if state.invitation(reservation_id, email).is_none() {
            // Only previously-invited enrollees may answer; there is no
            // self-service opt-in.
            return Err(EngineError::InvitationNotFound(
                reservation_id,
                email.to_string(),
            ));
        }

        if reply == Reply::Accepted {
            let room = state
                .rooms
                .get(&reservation.room_id)
                .ok_or(EngineError::RoomNotFound(reservation.room_id))?;
            if state.accepted_count(reservation_id) >= room.capacity {
                return Err(EngineError::CapacityFull(room.capacity));
            }
            if let Some(clash) =
                person_conflict(&state, email, &reservation.span(), Some(reservation_id))
            {
                metrics::counter!(observability::BOOKING_CONFLICTS_TOTAL).increment(1);
                return Err(EngineError::ScheduleClash(clash));
            }
        }

        let event = Event::InvitationAnswered {
            reservation_id,
            email: email.to_string(),
            reply,
            reason,
            at: now(),
        };
        self.persist_and_apply(&mut state, event).await?;
        metrics::counter!(observability::INVITATION_REPLIES_TOTAL).increment(1);
        Ok(())
    }

    /// Withdraw an answer: back to pending, reason and timestamp cleared.
    /// Idempotent — resetting a missing invitation is a no-op.
    pub async fn reset_invitation(
        &self,
        email: &str,
        reservation_id: ReservationId,
    ) -> Result<(), EngineError> {
        let mut state = self.state.write().await;
        if state.invitation(reservation_id, email).is_none() {
            return Ok(());
        }
        let event = Event::InvitationReset {
            reservation_id,
            email: email.to_string(),
        };
        self.persist_and_apply(&mut state, event).await
    }
}
