use crate::model::*;

// ── Availability Matching ─────────────────────────────────────────

/// True if any declared day overlaps the window.
///
/// Overlap, not containment: a provider free 14:00–18:00 matches a search for
/// 12:00–16:00. Endpoints that merely touch do not overlap.
pub fn is_available(weekly: &WeeklyAvailability, window: &SearchWindow) -> bool {
    let wanted = window.interval();
    weekly.iter().any(|(_, declared)| declared.overlaps(&wanted))
}

/// Every day whose declared interval overlaps the window, Monday first.
pub fn matching_days(weekly: &WeeklyAvailability, window: &SearchWindow) -> Vec<Day> {
    let wanted = window.interval();
    weekly
        .iter()
        .filter(|(_, declared)| declared.overlaps(&wanted))
        .map(|(day, _)| day)
        .collect()
}
