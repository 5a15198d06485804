use std::collections::BTreeMap;

use crate::model::*;

/// The whole club's booking state. Lives behind the engine's single write
/// lock; every mutation reaches it as one WAL [`Event`] through [`apply`],
/// both live and during replay, so disk and memory can never diverge.
///
/// [`apply`]: ClubState::apply
#[derive(Debug, Default)]
pub struct ClubState {
    pub enrollees: BTreeMap<String, Enrollee>,
    pub rooms: BTreeMap<RoomId, Room>,
    pub reservations: BTreeMap<ReservationId, Reservation>,
    /// Keyed by (reservation, email): the uniqueness invariant that makes
    /// duplicate invitee entries unrepresentable.
    pub invitations: BTreeMap<(ReservationId, String), Invitation>,
    next_reservation_id: ReservationId,
    next_room_id: RoomId,
}

impl ClubState {
    pub fn new() -> Self {
        Self {
            next_reservation_id: 1,
            next_room_id: 1,
            ..Default::default()
        }
    }

    /// Rebuild state from a replayed event stream.
    pub fn from_events(events: &[Event]) -> Self {
        let mut state = Self::new();
        for event in events {
            state.apply(event);
        }
        state
    }

    /// The id the next created reservation will get.
    pub fn next_reservation_id(&self) -> ReservationId {
        self.next_reservation_id
    }

    /// The id the next added room will get.
    pub fn next_room_id(&self) -> RoomId {
        self.next_room_id
    }

    // ── Lookups ──────────────────────────────────────────────

    pub fn invitation(&self, reservation_id: ReservationId, email: &str) -> Option<&Invitation> {
        self.invitations.get(&(reservation_id, email.to_string()))
    }

    /// All invitation rows of one reservation, in email order.
    pub fn invitations_of(&self, reservation_id: ReservationId) -> Vec<&Invitation> {
        self.invitations
            .range((reservation_id, String::new())..(reservation_id + 1, String::new()))
            .map(|(_, inv)| inv)
            .collect()
    }

    /// Currently-accepted invitations of one reservation.
    pub fn accepted_count(&self, reservation_id: ReservationId) -> u32 {
        self.invitations_of(reservation_id)
            .iter()
            .filter(|inv| inv.response == Rsvp::Accepted)
            .count() as u32
    }

    // ── Event application ────────────────────────────────────

    pub fn apply(&mut self, event: &Event) {
        match event {
            Event::EnrolleeRegistered { enrollee } => {
                self.enrollees.insert(enrollee.email.clone(), enrollee.clone());
            }
            Event::ProfileUpdated {
                email,
                name,
                surname,
                birth_date,
            } => {
                if let Some(e) = self.enrollees.get_mut(email) {
                    e.name = name.clone();
                    e.surname = surname.clone();
                    e.birth_date = *birth_date;
                }
            }
            Event::EnrolleeRemoved { email } => {
                let owned: Vec<ReservationId> = self
                    .reservations
                    .values()
                    .filter(|r| &r.owner_email == email)
                    .map(|r| r.id)
                    .collect();
                self.invitations.retain(|(rid, invitee), _| {
                    invitee != email && !owned.contains(rid)
                });
                for id in owned {
                    self.reservations.remove(&id);
                }
                self.enrollees.remove(email);
            }
            Event::RoomAdded { room } => {
                self.next_room_id = self.next_room_id.max(room.id + 1);
                self.rooms.insert(room.id, room.clone());
            }
            Event::ReservationCreated {
                reservation,
                invitees,
            } => {
                self.next_reservation_id = self.next_reservation_id.max(reservation.id + 1);
                self.reservations.insert(reservation.id, reservation.clone());
                for email in invitees {
                    self.invitations
                        .entry((reservation.id, email.clone()))
                        .or_insert_with(|| Invitation::pending(email, reservation.id));
                }
            }
            Event::ReservationUpdated {
                id,
                start,
                duration_hours,
                activity,
                invitees,
            } => {
                if let Some(r) = self.reservations.get_mut(id) {
                    r.start = *start;
                    r.duration_hours = *duration_hours;
                    r.activity = activity.clone();
                }
                if let Some(roster) = invitees {
                    // Pending rows fall off when dropped from the roster;
                    // accepted and declined rows always survive it.
                    self.invitations.retain(|(rid, email), inv| {
                        rid != id || inv.response != Rsvp::Pending || roster.contains(email)
                    });
                    for email in roster {
                        self.invitations
                            .entry((*id, email.clone()))
                            .or_insert_with(|| Invitation::pending(email, *id));
                    }
                }
            }
            Event::ReservationDeleted { id } => {
                self.invitations.retain(|(rid, _), _| rid != id);
                self.reservations.remove(id);
            }
            Event::InvitationAnswered {
                reservation_id,
                email,
                reply,
                reason,
                at,
            } => {
                if let Some(inv) = self
                    .invitations
                    .get_mut(&(*reservation_id, email.clone()))
                {
                    inv.response = (*reply).into();
                    inv.reason = if *reply == Reply::Declined {
                        reason.clone()
                    } else {
                        None
                    };
                    inv.responded_at = Some(*at);
                }
            }
            Event::InvitationReset {
                reservation_id,
                email,
            } => {
                if let Some(inv) = self
                    .invitations
                    .get_mut(&(*reservation_id, email.clone()))
                {
                    inv.response = Rsvp::Pending;
                    inv.reason = None;
                    inv.responded_at = None;
                }
            }
        }
    }

    /// Emit the minimal event stream that recreates this state, for WAL
    /// compaction. Reservations carry their full invitation rows by replaying
    /// the seeding event followed by each recorded answer.
    pub fn snapshot_events(&self) -> Vec<Event> {
        let mut events = Vec::new();
        for enrollee in self.enrollees.values() {
            events.push(Event::EnrolleeRegistered {
                enrollee: enrollee.clone(),
            });
        }
        for room in self.rooms.values() {
            events.push(Event::RoomAdded { room: room.clone() });
        }
        for reservation in self.reservations.values() {
            let invitations = self.invitations_of(reservation.id);
            events.push(Event::ReservationCreated {
                reservation: reservation.clone(),
                invitees: invitations
                    .iter()
                    .map(|inv| inv.enrollee_email.clone())
                    .collect(),
            });
            for inv in invitations {
                let reply = match inv.response {
                    Rsvp::Pending => continue,
                    Rsvp::Accepted => Reply::Accepted,
                    Rsvp::Declined => Reply::Declined,
                };
                events.push(Event::InvitationAnswered {
                    reservation_id: reservation.id,
                    email: inv.enrollee_email.clone(),
                    reply,
                    reason: inv.reason.clone(),
                    at: inv.responded_at.unwrap_or(reservation.start),
                });
            }
        }
        events
    }
}
