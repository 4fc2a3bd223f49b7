use rust_decimal::Decimal;

use crate::models::Session;

pub const COURT_FEE_DESCRIPTION: &str = "Court fee";
pub const SHUTTLECOCK_FEE_DESCRIPTION: &str = "Shuttlecock fee";

/// Build the billable line items for one checkout from the session's fee
/// schedule. Only components configured with a positive amount produce a
/// line; the order is fixed (court fee first).
pub fn fee_lines(session: &Session) -> Vec<(String, Decimal)> {
    let mut lines = Vec::new();

    if let Some(fee) = session.court_fee_per_person {
        if fee > Decimal::ZERO {
            lines.push((COURT_FEE_DESCRIPTION.to_string(), fee));
        }
    }

    if let Some(fee) = session.shuttlecock_fee_per_person {
        if fee > Decimal::ZERO {
            lines.push((SHUTTLECOCK_FEE_DESCRIPTION.to_string(), fee));
        }
    }

    lines
}

/// Sum of the line amounts; the bill total must equal this by construction.
pub fn total_of(lines: &[(String, Decimal)]) -> Decimal {
    lines.iter().map(|(_, amount)| *amount).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionStatus;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn session(court: Option<Decimal>, shuttle: Option<Decimal>) -> Session {
        Session {
            session_id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            group_name: "Evening group".into(),
            max_participants: 8,
            number_of_courts: 2,
            configured_courts: None,
            court_fee_per_person: court,
            shuttlecock_fee_per_person: shuttle,
            notes: None,
            status: SessionStatus::Open,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn both_fees_produce_two_lines() {
        let lines = fee_lines(&session(Some(dec!(100)), Some(dec!(40))));
        assert_eq!(lines.len(), 2);
        assert_eq!(total_of(&lines), dec!(140));
    }

    #[test]
    fn zero_fee_is_skipped() {
        let lines = fee_lines(&session(Some(dec!(100)), Some(dec!(0))));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0, COURT_FEE_DESCRIPTION);
        assert_eq!(total_of(&lines), dec!(100));
    }

    #[test]
    fn unset_fees_produce_no_lines() {
        let lines = fee_lines(&session(None, None));
        assert!(lines.is_empty());
        assert_eq!(total_of(&lines), Decimal::ZERO);
    }
}
