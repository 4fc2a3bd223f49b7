use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::models::{
    Bill, BillLineItem, GameMatch, MatchAssignment, MatchStatus, Participant, PlayerProfile,
    Session,
};

use super::{Gateway, GatewayTx, StoreOps};

/// Connection handle plus migration runner, mirroring the server bootstrap.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!().run(&self.pool).await?;
        Ok(())
    }
}

/// PostgreSQL persistence gateway.
#[derive(Clone)]
pub struct PgGateway {
    pool: PgPool,
}

impl PgGateway {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

#[async_trait]
impl Gateway for PgGateway {
    async fn begin(&self) -> Result<Box<dyn GatewayTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }
}

struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl GatewayTx for PgTx {
    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[derive(FromRow)]
struct SessionRow {
    session_id: Uuid,
    owner_id: Uuid,
    group_name: String,
    max_participants: i32,
    number_of_courts: i32,
    configured_courts: Option<Vec<String>>,
    court_fee_per_person: Option<Decimal>,
    shuttlecock_fee_per_person: Option<Decimal>,
    notes: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<SessionRow> for Session {
    type Error = StorageError;

    fn try_from(row: SessionRow) -> Result<Self> {
        Ok(Session {
            session_id: row.session_id,
            owner_id: row.owner_id,
            group_name: row.group_name,
            max_participants: row.max_participants,
            number_of_courts: row.number_of_courts,
            configured_courts: row.configured_courts,
            court_fee_per_person: row.court_fee_per_person,
            shuttlecock_fee_per_person: row.shuttlecock_fee_per_person,
            notes: row.notes,
            status: row.status.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ParticipantRow {
    participant_id: Uuid,
    session_id: Uuid,
    participant_type: String,
    user_id: Option<Uuid>,
    nickname: Option<String>,
    guest_name: Option<String>,
    gender: Option<i16>,
    skill_level: Option<String>,
    status: String,
    joined_at: DateTime<Utc>,
    checked_in_at: Option<DateTime<Utc>>,
    checked_out_at: Option<DateTime<Utc>>,
}

impl TryFrom<ParticipantRow> for Participant {
    type Error = StorageError;

    fn try_from(row: ParticipantRow) -> Result<Self> {
        let profile = match row.participant_type.as_str() {
            "member" => PlayerProfile::Member {
                user_id: row.user_id.ok_or_else(|| {
                    StorageError::validation("member participant without user_id")
                })?,
                nickname: row.nickname.ok_or_else(|| {
                    StorageError::validation("member participant without nickname")
                })?,
            },
            "guest" => PlayerProfile::Guest {
                name: row.guest_name.ok_or_else(|| {
                    StorageError::validation("guest participant without guest_name")
                })?,
            },
            other => {
                return Err(StorageError::validation(format!(
                    "unknown participant type '{other}'"
                )))
            }
        };
        Ok(Participant {
            participant_id: row.participant_id,
            session_id: row.session_id,
            profile,
            gender: row.gender,
            skill_level: row.skill_level,
            status: row.status.parse()?,
            joined_at: row.joined_at,
            checked_in_at: row.checked_in_at,
            checked_out_at: row.checked_out_at,
        })
    }
}

#[derive(FromRow)]
struct MatchRow {
    match_id: Uuid,
    session_id: Uuid,
    court: Option<String>,
    status: String,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<MatchRow> for GameMatch {
    type Error = StorageError;

    fn try_from(row: MatchRow) -> Result<Self> {
        Ok(GameMatch {
            match_id: row.match_id,
            session_id: row.session_id,
            court: row.court,
            status: row.status.parse()?,
            started_at: row.started_at,
            ended_at: row.ended_at,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct AssignmentRow {
    assignment_id: Uuid,
    match_id: Uuid,
    participant_id: Uuid,
    team: String,
    result: Option<String>,
    notes: Option<String>,
}

impl TryFrom<AssignmentRow> for MatchAssignment {
    type Error = StorageError;

    fn try_from(row: AssignmentRow) -> Result<Self> {
        Ok(MatchAssignment {
            assignment_id: row.assignment_id,
            match_id: row.match_id,
            participant_id: row.participant_id,
            team: row.team.parse()?,
            result: row.result.as_deref().map(str::parse).transpose()?,
            notes: row.notes,
        })
    }
}

#[derive(FromRow)]
struct BillRow {
    bill_id: Uuid,
    session_id: Uuid,
    participant_id: Uuid,
    total: Decimal,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<BillRow> for Bill {
    type Error = StorageError;

    fn try_from(row: BillRow) -> Result<Self> {
        Ok(Bill {
            bill_id: row.bill_id,
            session_id: row.session_id,
            participant_id: row.participant_id,
            total: row.total,
            status: row.status.parse()?,
            created_at: row.created_at,
        })
    }
}

const SESSION_COLUMNS: &str = "session_id, owner_id, group_name, max_participants, \
     number_of_courts, configured_courts, court_fee_per_person, \
     shuttlecock_fee_per_person, notes, status, created_at, updated_at";

const PARTICIPANT_COLUMNS: &str = "participant_id, session_id, participant_type, user_id, \
     nickname, guest_name, gender, skill_level, status, joined_at, \
     checked_in_at, checked_out_at";

const MATCH_COLUMNS: &str = "match_id, session_id, court, status, started_at, ended_at, created_at";

const ASSIGNMENT_COLUMNS: &str =
    "assignment_id, match_id, participant_id, team, result, notes";

#[async_trait]
impl StoreOps for PgTx {
    async fn find_session(&mut self, session_id: Uuid) -> Result<Option<Session>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE session_id = $1");
        let row = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(session_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(Session::try_from).transpose()
    }

    async fn insert_session(&mut self, session: &Session) -> Result<()> {
        sqlx::query(
            "INSERT INTO sessions (session_id, owner_id, group_name, max_participants, \
             number_of_courts, configured_courts, court_fee_per_person, \
             shuttlecock_fee_per_person, notes, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(session.session_id)
        .bind(session.owner_id)
        .bind(&session.group_name)
        .bind(session.max_participants)
        .bind(session.number_of_courts)
        .bind(&session.configured_courts)
        .bind(session.court_fee_per_person)
        .bind(session.shuttlecock_fee_per_person)
        .bind(&session.notes)
        .bind(session.status.as_str())
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_session(&mut self, session: &Session) -> Result<()> {
        let result = sqlx::query(
            "UPDATE sessions SET group_name = $2, max_participants = $3, \
             number_of_courts = $4, configured_courts = $5, court_fee_per_person = $6, \
             shuttlecock_fee_per_person = $7, notes = $8, status = $9, updated_at = $10 \
             WHERE session_id = $1",
        )
        .bind(session.session_id)
        .bind(&session.group_name)
        .bind(session.max_participants)
        .bind(session.number_of_courts)
        .bind(&session.configured_courts)
        .bind(session.court_fee_per_person)
        .bind(session.shuttlecock_fee_per_person)
        .bind(&session.notes)
        .bind(session.status.as_str())
        .bind(session.updated_at)
        .execute(&mut *self.tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn sessions_owned_by(&mut self, owner_id: Uuid) -> Result<Vec<Session>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE owner_id = $1 \
             ORDER BY created_at DESC, session_id DESC"
        );
        let rows = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(owner_id)
            .fetch_all(&mut *self.tx)
            .await?;
        rows.into_iter().map(Session::try_from).collect()
    }

    async fn find_participant(&mut self, participant_id: Uuid) -> Result<Option<Participant>> {
        let sql =
            format!("SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE participant_id = $1");
        let row = sqlx::query_as::<_, ParticipantRow>(&sql)
            .bind(participant_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(Participant::try_from).transpose()
    }

    async fn participant_for_member(
        &mut self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Participant>> {
        let sql = format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants \
             WHERE session_id = $1 AND user_id = $2 \
             ORDER BY joined_at, participant_id LIMIT 1"
        );
        let row = sqlx::query_as::<_, ParticipantRow>(&sql)
            .bind(session_id)
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(Participant::try_from).transpose()
    }

    async fn participants_in_session(&mut self, session_id: Uuid) -> Result<Vec<Participant>> {
        let sql = format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE session_id = $1 \
             ORDER BY joined_at, participant_id"
        );
        let rows = sqlx::query_as::<_, ParticipantRow>(&sql)
            .bind(session_id)
            .fetch_all(&mut *self.tx)
            .await?;
        rows.into_iter().map(Participant::try_from).collect()
    }

    async fn insert_participant(&mut self, participant: &Participant) -> Result<()> {
        let (user_id, nickname, guest_name) = match &participant.profile {
            PlayerProfile::Member { user_id, nickname } => {
                (Some(*user_id), Some(nickname.clone()), None)
            }
            PlayerProfile::Guest { name } => (None, None, Some(name.clone())),
        };
        sqlx::query(
            "INSERT INTO participants (participant_id, session_id, participant_type, \
             user_id, nickname, guest_name, gender, skill_level, status, joined_at, \
             checked_in_at, checked_out_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(participant.participant_id)
        .bind(participant.session_id)
        .bind(participant.profile.kind())
        .bind(user_id)
        .bind(nickname)
        .bind(guest_name)
        .bind(participant.gender)
        .bind(&participant.skill_level)
        .bind(participant.status.as_str())
        .bind(participant.joined_at)
        .bind(participant.checked_in_at)
        .bind(participant.checked_out_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_participant(&mut self, participant: &Participant) -> Result<()> {
        // Replaces every mutable column; a cancelled player who rejoins gets a
        // fresh joined_at and must land at the back of the waitlist.
        let (user_id, nickname, guest_name) = match &participant.profile {
            PlayerProfile::Member { user_id, nickname } => {
                (Some(*user_id), Some(nickname.clone()), None)
            }
            PlayerProfile::Guest { name } => (None, None, Some(name.clone())),
        };
        let result = sqlx::query(
            "UPDATE participants SET participant_type = $2, user_id = $3, nickname = $4, \
             guest_name = $5, gender = $6, skill_level = $7, status = $8, joined_at = $9, \
             checked_in_at = $10, checked_out_at = $11 WHERE participant_id = $1",
        )
        .bind(participant.participant_id)
        .bind(participant.profile.kind())
        .bind(user_id)
        .bind(nickname)
        .bind(guest_name)
        .bind(participant.gender)
        .bind(&participant.skill_level)
        .bind(participant.status.as_str())
        .bind(participant.joined_at)
        .bind(participant.checked_in_at)
        .bind(participant.checked_out_at)
        .execute(&mut *self.tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn find_match(&mut self, match_id: Uuid) -> Result<Option<GameMatch>> {
        let sql = format!("SELECT {MATCH_COLUMNS} FROM matches WHERE match_id = $1");
        let row = sqlx::query_as::<_, MatchRow>(&sql)
            .bind(match_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(GameMatch::try_from).transpose()
    }

    async fn matches_by_status(
        &mut self,
        session_id: Uuid,
        status: MatchStatus,
    ) -> Result<Vec<GameMatch>> {
        let sql = format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE session_id = $1 AND status = $2 \
             ORDER BY created_at, match_id"
        );
        let rows = sqlx::query_as::<_, MatchRow>(&sql)
            .bind(session_id)
            .bind(status.as_str())
            .fetch_all(&mut *self.tx)
            .await?;
        rows.into_iter().map(GameMatch::try_from).collect()
    }

    async fn playing_match_on_court(
        &mut self,
        session_id: Uuid,
        court: &str,
    ) -> Result<Option<GameMatch>> {
        let sql = format!(
            "SELECT {MATCH_COLUMNS} FROM matches \
             WHERE session_id = $1 AND status = 'playing' AND court = $2 LIMIT 1"
        );
        let row = sqlx::query_as::<_, MatchRow>(&sql)
            .bind(session_id)
            .bind(court)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(GameMatch::try_from).transpose()
    }

    async fn staged_match_on_slot(
        &mut self,
        session_id: Uuid,
        slot: &str,
    ) -> Result<Option<GameMatch>> {
        let sql = format!(
            "SELECT {MATCH_COLUMNS} FROM matches \
             WHERE session_id = $1 AND status = 'staged' AND court = $2 \
             ORDER BY created_at, match_id LIMIT 1"
        );
        let row = sqlx::query_as::<_, MatchRow>(&sql)
            .bind(session_id)
            .bind(slot)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(GameMatch::try_from).transpose()
    }

    async fn matches_for_participant(
        &mut self,
        session_id: Uuid,
        participant_id: Uuid,
    ) -> Result<Vec<GameMatch>> {
        let sql = format!(
            "SELECT {MATCH_COLUMNS} FROM matches m \
             WHERE m.session_id = $1 AND EXISTS (\
                 SELECT 1 FROM match_assignments a \
                 WHERE a.match_id = m.match_id AND a.participant_id = $2) \
             ORDER BY m.created_at, m.match_id"
        );
        let rows = sqlx::query_as::<_, MatchRow>(&sql)
            .bind(session_id)
            .bind(participant_id)
            .fetch_all(&mut *self.tx)
            .await?;
        rows.into_iter().map(GameMatch::try_from).collect()
    }

    async fn insert_match(&mut self, game_match: &GameMatch) -> Result<()> {
        sqlx::query(
            "INSERT INTO matches (match_id, session_id, court, status, started_at, \
             ended_at, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(game_match.match_id)
        .bind(game_match.session_id)
        .bind(&game_match.court)
        .bind(game_match.status.as_str())
        .bind(game_match.started_at)
        .bind(game_match.ended_at)
        .bind(game_match.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_match(&mut self, game_match: &GameMatch) -> Result<()> {
        let result = sqlx::query(
            "UPDATE matches SET court = $2, status = $3, started_at = $4, ended_at = $5 \
             WHERE match_id = $1",
        )
        .bind(game_match.match_id)
        .bind(&game_match.court)
        .bind(game_match.status.as_str())
        .bind(game_match.started_at)
        .bind(game_match.ended_at)
        .execute(&mut *self.tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_match(&mut self, match_id: Uuid) -> Result<()> {
        // match_assignments cascade on delete
        sqlx::query("DELETE FROM matches WHERE match_id = $1")
            .bind(match_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn assignments_for_match(&mut self, match_id: Uuid) -> Result<Vec<MatchAssignment>> {
        let sql = format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM match_assignments WHERE match_id = $1 \
             ORDER BY team, assignment_id"
        );
        let rows = sqlx::query_as::<_, AssignmentRow>(&sql)
            .bind(match_id)
            .fetch_all(&mut *self.tx)
            .await?;
        rows.into_iter().map(MatchAssignment::try_from).collect()
    }

    async fn insert_assignment(&mut self, assignment: &MatchAssignment) -> Result<()> {
        sqlx::query(
            "INSERT INTO match_assignments (assignment_id, match_id, participant_id, \
             team, result, notes) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(assignment.assignment_id)
        .bind(assignment.match_id)
        .bind(assignment.participant_id)
        .bind(assignment.team.as_str())
        .bind(assignment.result.map(|r| r.as_str()))
        .bind(&assignment.notes)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_assignment(&mut self, assignment: &MatchAssignment) -> Result<()> {
        let result = sqlx::query(
            "UPDATE match_assignments SET result = $2, notes = $3 WHERE assignment_id = $1",
        )
        .bind(assignment.assignment_id)
        .bind(assignment.result.map(|r| r.as_str()))
        .bind(&assignment.notes)
        .execute(&mut *self.tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_assignments_for_match(&mut self, match_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM match_assignments WHERE match_id = $1")
            .bind(match_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn participants_in_open_matches(
        &mut self,
        session_id: Uuid,
        exclude_match: Option<Uuid>,
    ) -> Result<HashSet<Uuid>> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT a.participant_id FROM match_assignments a \
             JOIN matches m ON m.match_id = a.match_id \
             WHERE m.session_id = $1 AND m.status <> 'ended' \
               AND ($2::uuid IS NULL OR m.match_id <> $2)",
        )
        .bind(session_id)
        .bind(exclude_match)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn insert_bill(&mut self, bill: &Bill, lines: &[BillLineItem]) -> Result<()> {
        sqlx::query(
            "INSERT INTO bills (bill_id, session_id, participant_id, total, status, \
             created_at) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(bill.bill_id)
        .bind(bill.session_id)
        .bind(bill.participant_id)
        .bind(bill.total)
        .bind(bill.status.as_str())
        .bind(bill.created_at)
        .execute(&mut *self.tx)
        .await?;
        for line in lines {
            sqlx::query(
                "INSERT INTO bill_line_items (line_item_id, bill_id, description, amount) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(line.line_item_id)
            .bind(line.bill_id)
            .bind(&line.description)
            .bind(line.amount)
            .execute(&mut *self.tx)
            .await?;
        }
        Ok(())
    }

    async fn bill_for_participant(&mut self, participant_id: Uuid) -> Result<Option<Bill>> {
        let row = sqlx::query_as::<_, BillRow>(
            "SELECT bill_id, session_id, participant_id, total, status, created_at \
             FROM bills WHERE participant_id = $1 \
             ORDER BY created_at, bill_id LIMIT 1",
        )
        .bind(participant_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(Bill::try_from).transpose()
    }
}
