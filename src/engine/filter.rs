use chrono::{Datelike, NaiveDate};

use crate::model::*;

use super::availability::is_available;

/// Tags offered by the hobby picker.
pub const HOBBY_CATALOG: [&str; 18] = [
    "Reading",
    "Hiking",
    "Coffee",
    "Dancing",
    "Photography",
    "Fishing",
    "Volunteering",
    "Sports",
    "Movies",
    "Cooking",
    "Video games",
    "Music",
    "Art",
    "Travel",
    "Writing",
    "Gardening",
    "Languages",
    "Meditation",
];

/// Gender values meaning "no preference".
const ANY_GENDER: [&str; 2] = ["any", "cualquiera"];

/// Inclusive age bounds in whole years.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeRange {
    pub min: u32,
    pub max: u32,
}

/// Search query. Every field left unset is an identity filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    pub text: Option<String>,
    pub gender: Option<String>,
    pub age: Option<AgeRange>,
    pub hobbies: Vec<String>,
    pub window: Option<SearchWindow>,
}

/// Whole years between `birth` and `today`, not counting a birthday that has
/// not come around yet this year.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl FilterSpec {
    fn text_query(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    fn gender_query(&self) -> Option<&str> {
        self.gender
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty() && !ANY_GENDER.iter().any(|any| g.eq_ignore_ascii_case(any)))
    }

    fn hobby_tags(&self) -> impl Iterator<Item = &str> {
        self.hobbies.iter().map(|h| h.trim()).filter(|h| !h.is_empty())
    }

    pub fn is_identity(&self) -> bool {
        self.text_query().is_none()
            && self.gender_query().is_none()
            && self.age.is_none()
            && self.hobby_tags().next().is_none()
            && self.window.is_none()
    }

    fn matches_text(&self, candidate: &Profile) -> bool {
        match self.text_query() {
            None => true,
            Some(q) => contains_ci(&candidate.name, q) || contains_ci(&candidate.interests, q),
        }
    }

    fn matches_gender(&self, candidate: &Profile) -> bool {
        match self.gender_query() {
            None => true,
            Some(wanted) => candidate
                .gender
                .as_deref()
                .is_some_and(|g| g.trim().to_lowercase() == wanted.to_lowercase()),
        }
    }

    fn matches_age(&self, candidate: &Profile, today: NaiveDate) -> bool {
        let Some(range) = self.age else { return true };
        let Some(birth) = candidate.birth_date else { return false };
        let age = age_on(birth, today);
        age >= 0 && (range.min..=range.max).contains(&(age as u32))
    }

    fn matches_hobbies(&self, candidate: &Profile) -> bool {
        let mut tags = self.hobby_tags().peekable();
        if tags.peek().is_none() {
            return true;
        }
        let interests = candidate.interests.to_lowercase();
        tags.any(|tag| interests.contains(&tag.to_lowercase()))
    }

    fn matches_window(&self, candidate: &Profile) -> bool {
        match &self.window {
            None => true,
            Some(window) => is_available(&candidate.availability, window),
        }
    }

    /// All active filters, AND-ed.
    pub fn matches(&self, candidate: &Profile, today: NaiveDate) -> bool {
        self.matches_text(candidate)
            && self.matches_gender(candidate)
            && self.matches_age(candidate, today)
            && self.matches_hobbies(candidate)
            && self.matches_window(candidate)
    }
}

/// Stable filter: survivors keep their input order.
pub fn filter(candidates: Vec<Profile>, query: &FilterSpec, today: NaiveDate) -> Vec<Profile> {
    if query.is_identity() {
        return candidates;
    }
    candidates
        .into_iter()
        .filter(|candidate| query.matches(candidate, today))
        .collect()
}
