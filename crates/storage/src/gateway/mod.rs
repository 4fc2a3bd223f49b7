//! The persistence gateway consumed by the session core: typed per-entity
//! operations plus an explicit transaction boundary. Two implementations
//! exist, an in-memory store used by the test suite and a PostgreSQL store
//! used by the server binary.

mod memory;
mod postgres;

use std::collections::HashSet;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Bill, BillLineItem, GameMatch, MatchAssignment, MatchStatus, Participant, Session};

pub use memory::MemoryGateway;
pub use postgres::{Database, PgGateway};

/// Typed entity operations available inside a transaction.
///
/// Every listing returns rows in a deterministic order so that FIFO
/// promotion and tie-breaking behave identically across backends.
#[async_trait]
pub trait StoreOps: Send {
    // -- sessions --------------------------------------------------------
    async fn find_session(&mut self, session_id: Uuid) -> Result<Option<Session>>;
    async fn insert_session(&mut self, session: &Session) -> Result<()>;
    async fn update_session(&mut self, session: &Session) -> Result<()>;
    async fn sessions_owned_by(&mut self, owner_id: Uuid) -> Result<Vec<Session>>;

    // -- participants ----------------------------------------------------
    async fn find_participant(&mut self, participant_id: Uuid) -> Result<Option<Participant>>;
    /// The member's record in a session, if any non-cancelled or cancelled
    /// one exists. Guests cannot be looked up this way.
    async fn participant_for_member(
        &mut self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Participant>>;
    /// All participants of a session ordered by `(joined_at, participant_id)`.
    async fn participants_in_session(&mut self, session_id: Uuid) -> Result<Vec<Participant>>;
    async fn insert_participant(&mut self, participant: &Participant) -> Result<()>;
    async fn update_participant(&mut self, participant: &Participant) -> Result<()>;

    // -- matches ---------------------------------------------------------
    async fn find_match(&mut self, match_id: Uuid) -> Result<Option<GameMatch>>;
    /// Matches of a session with the given status, ordered by
    /// `(created_at, match_id)`.
    async fn matches_by_status(
        &mut self,
        session_id: Uuid,
        status: MatchStatus,
    ) -> Result<Vec<GameMatch>>;
    async fn playing_match_on_court(
        &mut self,
        session_id: Uuid,
        court: &str,
    ) -> Result<Option<GameMatch>>;
    async fn staged_match_on_slot(
        &mut self,
        session_id: Uuid,
        slot: &str,
    ) -> Result<Option<GameMatch>>;
    /// Matches in a session that a participant is assigned to, ordered by
    /// `(created_at, match_id)`.
    async fn matches_for_participant(
        &mut self,
        session_id: Uuid,
        participant_id: Uuid,
    ) -> Result<Vec<GameMatch>>;
    async fn insert_match(&mut self, game_match: &GameMatch) -> Result<()>;
    async fn update_match(&mut self, game_match: &GameMatch) -> Result<()>;
    /// Removes the match and its assignments.
    async fn delete_match(&mut self, match_id: Uuid) -> Result<()>;

    // -- assignments -----------------------------------------------------
    /// Assignments of a match ordered by `(team, assignment_id)`.
    async fn assignments_for_match(&mut self, match_id: Uuid) -> Result<Vec<MatchAssignment>>;
    async fn insert_assignment(&mut self, assignment: &MatchAssignment) -> Result<()>;
    async fn update_assignment(&mut self, assignment: &MatchAssignment) -> Result<()>;
    async fn delete_assignments_for_match(&mut self, match_id: Uuid) -> Result<()>;
    /// Participant ids assigned to any staged or playing match of the
    /// session, optionally excluding one match (used when resyncing it).
    async fn participants_in_open_matches(
        &mut self,
        session_id: Uuid,
        exclude_match: Option<Uuid>,
    ) -> Result<HashSet<Uuid>>;

    // -- bills -----------------------------------------------------------
    /// Persists the bill and its line items together.
    async fn insert_bill(&mut self, bill: &Bill, lines: &[BillLineItem]) -> Result<()>;
    async fn bill_for_participant(&mut self, participant_id: Uuid) -> Result<Option<Bill>>;
}

/// An open transaction. Dropping it without [`GatewayTx::commit`] rolls
/// every staged change back.
#[async_trait]
pub trait GatewayTx: StoreOps {
    async fn commit(self: Box<Self>) -> Result<()>;
}

/// Handle to the persistence backend. All reads and writes, including
/// read-only projection, go through a transaction so that each command's
/// view of the data is consistent.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn GatewayTx>>;
}
