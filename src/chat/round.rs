/// Which session-length threshold (§4.6 interval defaults) governs day rollover for round
/// arithmetic: realtime's longer nominal session, or simulated/historical's 6.5-hour one.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SessionKind {
    Realtime,
    Simulated,
}

fn session_length_hours(kind: SessionKind) -> f64 {
    match kind {
        SessionKind::Realtime => 7.0,
        SessionKind::Simulated => 6.5,
    }
}

/// `formatRoundId(day, intradayHour) = "{day}-{hour.toFixed(3)}"`.
pub fn format_round_id(day: u64, intraday_hour: f64) -> String {
    format!("{day}-{intraday_hour:.3}")
}

/// Advances `(day, intradayHour)` by one trade-window interval, rolling over into `(day + 1, 0)`
/// once the computed hour reaches the mode-dependent session length.
pub fn next_round(day: u64, intraday_hour: f64, trade_interval_hours: f64, kind: SessionKind) -> (u64, f64) {
    let candidate = intraday_hour + trade_interval_hours;
    if candidate >= session_length_hours(kind) {
        (day + 1, 0.0)
    } else {
        (day, candidate)
    }
}

/// Assigns the round an incoming chat message targets, applying the 60-second safety buffer:
/// a message arriving within 60 seconds of the next round is pushed one round further out so it
/// cannot be delivered into a round that is already about to close.
pub fn assign_target_round(
    day: u64,
    intraday_hour: f64,
    trade_interval_hours: f64,
    seconds_until_next_round: f64,
    kind: SessionKind,
) -> (u64, f64) {
    let (next_day, next_hour) = next_round(day, intraday_hour, trade_interval_hours, kind);

    if seconds_until_next_round <= 60.0 {
        next_round(next_day, next_hour, trade_interval_hours, kind)
    } else {
        (next_day, next_hour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_round_id_pads_hour_to_three_decimals() {
        assert_eq!(format_round_id(3, 2.5), "3-2.500");
    }

    #[test]
    fn next_round_advances_by_interval_within_session() {
        assert_eq!(next_round(1, 1.0, 2.0, SessionKind::Simulated), (1, 3.0));
    }

    #[test]
    fn next_round_rolls_over_at_simulated_session_boundary() {
        assert_eq!(next_round(1, 5.0, 2.0, SessionKind::Simulated), (2, 0.0));
    }

    #[test]
    fn next_round_rolls_over_at_realtime_session_boundary() {
        assert_eq!(next_round(1, 6.0, 2.0, SessionKind::Realtime), (2, 0.0));
    }

    #[test]
    fn assign_target_round_uses_next_round_outside_safety_buffer() {
        let (day, hour) = assign_target_round(1, 1.0, 2.0, 300.0, SessionKind::Simulated);
        assert_eq!((day, hour), (1, 3.0));
    }

    #[test]
    fn assign_target_round_skips_ahead_within_safety_buffer() {
        let (day, hour) = assign_target_round(1, 1.0, 2.0, 45.0, SessionKind::Simulated);
        assert_eq!((day, hour), (1, 5.0));
    }
}
