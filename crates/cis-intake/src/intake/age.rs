use chrono::{Datelike, NaiveDate};

/// Whole years between `birth` and `today`. Absent or future birth dates yield zero.
pub fn age_on(birth: Option<NaiveDate>, today: NaiveDate) -> u32 {
    let Some(birth) = birth else {
        return 0;
    };

    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }

    u32::try_from(years).unwrap_or(0)
}
