use crate::model::{ReservationId, RoomId};

#[derive(Debug)]
pub enum EngineError {
    /// Missing or malformed input; the caller can correct and retry.
    Validation(&'static str),
    RoomNotFound(RoomId),
    ReservationNotFound(ReservationId),
    EnrolleeNotFound(String),
    InvitationNotFound(ReservationId, String),
    /// Caller lacks coordinator privilege or does not own the reservation.
    Forbidden(&'static str),
    /// The room is already booked over an overlapping interval; carries the
    /// clashing reservation.
    RoomBusy(ReservationId),
    /// The responder already holds an accepted, overlapping invitation.
    ScheduleClash(ReservationId),
    /// All accepted slots of the room are taken.
    CapacityFull(u32),
    Wal(String),
}

/// The machine-readable failure kinds the transport layer maps to status
/// codes. Everything the engine returns collapses into one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Forbidden,
    Conflict,
    Capacity,
    Storage,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Validation(_) => ErrorKind::Validation,
            EngineError::RoomNotFound(_)
            | EngineError::ReservationNotFound(_)
            | EngineError::EnrolleeNotFound(_)
            | EngineError::InvitationNotFound(..) => ErrorKind::NotFound,
            EngineError::Forbidden(_) => ErrorKind::Forbidden,
            EngineError::RoomBusy(_) | EngineError::ScheduleClash(_) => ErrorKind::Conflict,
            EngineError::CapacityFull(_) => ErrorKind::Capacity,
            EngineError::Wal(_) => ErrorKind::Storage,
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Validation(msg) => write!(f, "invalid request: {msg}"),
            EngineError::RoomNotFound(id) => write!(f, "room not found: {id}"),
            EngineError::ReservationNotFound(id) => write!(f, "reservation not found: {id}"),
            EngineError::EnrolleeNotFound(email) => write!(f, "enrollee not found: {email}"),
            EngineError::InvitationNotFound(id, email) => {
                write!(f, "no invitation for {email} on reservation {id}")
            }
            EngineError::Forbidden(msg) => write!(f, "forbidden: {msg}"),
            EngineError::RoomBusy(id) => write!(f, "room already booked by reservation {id}"),
            EngineError::ScheduleClash(id) => {
                write!(f, "already attending overlapping reservation {id}")
            }
            EngineError::CapacityFull(cap) => {
                write!(f, "room capacity {cap} reached: all seats taken")
            }
            EngineError::Wal(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
