use chrono::Utc;
use storage::{
    dto::billing::BillSummary,
    error::StorageError,
    models::{Bill, BillLineItem, BillStatus},
    services::fees,
    StoreOps,
};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::features::live;
use crate::features::roster::services::owned_session;
use crate::state::AppState;

/// Check a participant out and bill them. One line item per configured
/// positive fee component; the bill total is the sum of its lines. A
/// participant checks out at most once.
pub async fn checkout(
    state: &AppState,
    caller_id: Uuid,
    participant_id: Uuid,
) -> ApiResult<BillSummary> {
    // Resolve the session first so the command lock can be taken before the
    // billing transaction starts.
    let session_id = {
        let mut tx = state.begin().await?;
        tx.find_participant(participant_id)
            .await?
            .ok_or(StorageError::NotFound)?
            .session_id
    };

    let lock = state.session_lock(session_id);
    let _guard = lock.lock().await;

    let mut tx = state.begin().await?;

    let session = owned_session(tx.as_mut(), session_id, caller_id).await?;

    let mut participant = tx
        .find_participant(participant_id)
        .await?
        .ok_or(StorageError::NotFound)?;
    if participant.checked_out_at.is_some() {
        return Err(StorageError::conflict("Participant has already checked out").into());
    }
    if tx.bill_for_participant(participant_id).await?.is_some() {
        return Err(StorageError::conflict("Participant has already been billed").into());
    }

    let now = Utc::now();
    participant.checked_out_at = Some(now);
    tx.update_participant(&participant).await?;

    let fee_lines = fees::fee_lines(&session);
    let bill = Bill {
        bill_id: Uuid::new_v4(),
        session_id,
        participant_id,
        total: fees::total_of(&fee_lines),
        status: BillStatus::Unpaid,
        created_at: now,
    };
    let lines: Vec<BillLineItem> = fee_lines
        .into_iter()
        .map(|(description, amount)| BillLineItem {
            line_item_id: Uuid::new_v4(),
            bill_id: bill.bill_id,
            description,
            amount,
        })
        .collect();
    tx.insert_bill(&bill, &lines).await?;

    tx.commit().await?;

    tracing::info!(%session_id, %participant_id, total = %bill.total, "Participant checked out");
    live::services::broadcast_after_commit(state, session_id);

    Ok(BillSummary::from_bill(&bill, &lines))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::testing::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn checkout_bills_each_configured_fee() {
        let state = test_state();
        let session = seed_session(&state, |s| {
            s.court_fee_per_person = Some(dec!(100));
            s.shuttlecock_fee_per_person = Some(dec!(40));
        })
        .await;
        let p = seed_checked_in(&state, &session, &["Air"]).await;

        let bill = checkout(&state, session.owner_id, p[0]).await.unwrap();
        assert_eq!(bill.total, dec!(140));
        assert_eq!(bill.line_items.len(), 2);
        assert_eq!(bill.line_items[0].description, "Court fee");
        assert_eq!(bill.status, BillStatus::Unpaid);

        let mut tx = state.begin().await.unwrap();
        let participant = tx.find_participant(p[0]).await.unwrap().unwrap();
        assert!(participant.checked_out_at.is_some());
    }

    #[tokio::test]
    async fn zero_fee_component_produces_no_line() {
        let state = test_state();
        let session = seed_session(&state, |s| {
            s.court_fee_per_person = Some(dec!(100));
            s.shuttlecock_fee_per_person = Some(dec!(0));
        })
        .await;
        let p = seed_checked_in(&state, &session, &["Air"]).await;

        let bill = checkout(&state, session.owner_id, p[0]).await.unwrap();
        assert_eq!(bill.line_items.len(), 1);
        assert_eq!(bill.total, dec!(100));
    }

    #[tokio::test]
    async fn no_configured_fees_yield_an_empty_bill() {
        let state = test_state();
        let session = seed_session(&state, |_| {}).await;
        let p = seed_checked_in(&state, &session, &["Air"]).await;

        let bill = checkout(&state, session.owner_id, p[0]).await.unwrap();
        assert!(bill.line_items.is_empty());
        assert_eq!(bill.total, rust_decimal::Decimal::ZERO);
    }

    #[tokio::test]
    async fn duplicate_checkout_is_rejected() {
        let state = test_state();
        let session = seed_session(&state, |s| {
            s.court_fee_per_person = Some(dec!(100));
        })
        .await;
        let p = seed_checked_in(&state, &session, &["Air"]).await;

        checkout(&state, session.owner_id, p[0]).await.unwrap();
        let err = checkout(&state, session.owner_id, p[0]).await.unwrap_err();
        assert_conflict(err);
    }

    #[tokio::test]
    async fn checkout_is_owner_only() {
        let state = test_state();
        let session = seed_session(&state, |_| {}).await;
        let p = seed_checked_in(&state, &session, &["Air"]).await;

        let err = checkout(&state, Uuid::new_v4(), p[0]).await.unwrap_err();
        assert_forbidden(err);

        let err = checkout(&state, session.owner_id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert_not_found(err);
    }

    #[tokio::test]
    async fn checked_out_player_leaves_the_waiting_pool() {
        let state = test_state();
        let session = seed_session(&state, |_| {}).await;
        let p = seed_checked_in(&state, &session, &["Air", "Bank"]).await;

        checkout(&state, session.owner_id, p[0]).await.unwrap();

        let mut tx = state.begin().await.unwrap();
        let snapshot = crate::features::live::services::project(tx.as_mut(), &session)
            .await
            .unwrap();
        assert_eq!(snapshot.waiting_pool.len(), 1);
        assert_eq!(snapshot.waiting_pool[0].display_name, "Bank");
    }
}
