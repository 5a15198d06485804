//! Hard input limits. These are not business rules; they bound what a single
//! request may ask the engine to hold in memory or write to the WAL.

/// Max length of names, surnames, room names, and sector names.
pub const MAX_NAME_LEN: usize = 128;

/// Max length of an email address.
pub const MAX_EMAIL_LEN: usize = 254;

/// Max length of a reservation's activity label.
pub const MAX_ACTIVITY_LEN: usize = 256;

/// Max length of a decline reason.
pub const MAX_REASON_LEN: usize = 512;

/// Max invitees a single reservation may carry.
pub const MAX_INVITEES_PER_RESERVATION: usize = 256;

/// Max whole-hour duration of a booking. The day opens at 09:00, so nothing
/// can legally run longer than this even when midnight crossing is allowed.
pub const MAX_DURATION_HOURS: u32 = 24;
