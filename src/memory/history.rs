//! Date buckets for browsing saved conversations

use super::types::Conversation;
use chrono::{DateTime, Days, TimeZone, Utc};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Period {
    Today,
    Yesterday,
    Previous7Days,
    Previous30Days,
    Older,
}

impl Period {
    pub const ALL: [Period; 5] = [
        Period::Today,
        Period::Yesterday,
        Period::Previous7Days,
        Period::Previous30Days,
        Period::Older,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Period::Today => "Today",
            Period::Yesterday => "Yesterday",
            Period::Previous7Days => "Previous 7 days",
            Period::Previous30Days => "Previous 30 days",
            Period::Older => "Older",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Bucket a conversation start time relative to `now`, using `now`'s calendar
pub fn period_of<Tz: TimeZone>(started: DateTime<Utc>, now: &DateTime<Tz>) -> Period {
    let local = started.with_timezone(&now.timezone());
    let today = now.date_naive();
    let day = local.date_naive();

    if day >= today {
        return Period::Today;
    }
    if today.checked_sub_days(Days::new(1)) == Some(day) {
        return Period::Yesterday;
    }

    let age_days = (now.with_timezone(&Utc) - started).num_days();
    match age_days {
        d if d < 7 => Period::Previous7Days,
        d if d < 30 => Period::Previous30Days,
        _ => Period::Older,
    }
}

/// Group conversations by period in display order, skipping empty periods.
/// Order inside a group follows the input order.
pub fn group_by_period<'a, Tz: TimeZone>(
    conversations: &'a [Conversation],
    now: &DateTime<Tz>,
) -> Vec<(Period, Vec<&'a Conversation>)> {
    Period::ALL
        .iter()
        .map(|period| {
            let members: Vec<&Conversation> = conversations
                .iter()
                .filter(|c| period_of(c.timestamp, now) == *period)
                .collect();
            (*period, members)
        })
        .filter(|(_, members)| !members.is_empty())
        .collect()
}
