mod bill;
mod game_match;
mod participant;
mod session;

pub use bill::{Bill, BillLineItem, BillStatus};
pub use game_match::{
    CourtRef, GameMatch, MatchAssignment, MatchOutcome, MatchStatus, Team, DEFAULT_BENCH_SLOT,
};
pub use participant::{Participant, ParticipantStatus, PlayerProfile};
pub use session::{Session, SessionStatus};
