//! Historical roll-ups over the snapshot table.
//!
//! The aggregator reduces the whole history to one [`Member`] per identity
//! (its most recent stored row), so people who have since disappeared from
//! the directory are still counted. Bots never count. All outputs are sorted
//! and depend only on stored rows.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::store::SnapshotStore;
use crate::value::Leaf;

/// Label of the cross-category weekly series.
pub const ALL_CATEGORIES: &str = "ALL";

/// How a date is mapped to the Monday that labels its week.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WeekStart {
    /// Monday of the ISO-8601 week.
    Iso,
    /// Monday of week *n* counted from the first Monday of the ISO year,
    /// where *n* is the ISO week number. Matches the week labels of
    /// reports produced before the move to this tool.
    #[default]
    MondayOfYear,
}

impl WeekStart {
    #[must_use]
    pub fn week_of(self, date: NaiveDate) -> NaiveDate {
        let iso = date.iso_week();
        match self {
            Self::Iso => NaiveDate::from_isoywd_opt(iso.year(), iso.week(), Weekday::Mon)
                .unwrap_or(date),
            Self::MondayOfYear => {
                let Some(jan_first) = NaiveDate::from_ymd_opt(iso.year(), 1, 1) else {
                    return date;
                };
                let to_monday = (7 - jan_first.weekday().num_days_from_monday()) % 7;
                jan_first
                    .checked_add_days(Days::new(u64::from(to_monday)))
                    .and_then(|monday| {
                        monday.checked_add_days(Days::new(7 * u64::from(iso.week() - 1)))
                    })
                    .unwrap_or(date)
            }
        }
    }
}

/// Which stored columns feed the aggregates, and how they are filtered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateOptions {
    pub identity_column: String,
    pub status_column: String,
    /// Unix seconds of the member's last profile change.
    pub updated_column: String,
    pub title_column: String,
    pub bot_column: String,
    /// The category is the part of the title before this delimiter.
    pub category_delimiter: String,
    pub excluded_categories: Vec<String>,
    /// Categories with fewer active members are left out of
    /// [`Aggregator::category_counts`].
    pub min_active: usize,
    /// The `ALL` series only keeps weeks starting after this date.
    pub series_cutoff: NaiveDate,
    pub week_start: WeekStart,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            identity_column: "id".to_string(),
            status_column: "deleted".to_string(),
            updated_column: "updated".to_string(),
            title_column: "title".to_string(),
            bot_column: "is_bot".to_string(),
            category_delimiter: "-".to_string(),
            excluded_categories: vec!["null".into(), "no".into(), "Jesspatch".into()],
            min_active: 2,
            series_cutoff: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap_or_default(),
            week_start: WeekStart::default(),
        }
    }
}

/// One tracked identity as of its latest stored row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    pub identity: Leaf,
    pub active: bool,
    pub updated: Option<NaiveDate>,
    pub category: String,
    pub bot: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub active: usize,
    pub deactivated: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklyCount {
    pub week: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryWeek {
    pub category: String,
    pub week: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone)]
pub struct Aggregator {
    members: Vec<Member>,
    options: AggregateOptions,
}

impl Aggregator {
    /// Build members from every row of the snapshot history.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RosterError::NotInitialized`] before the first
    /// snapshot, or an `SQLite` error.
    pub fn load(store: &SnapshotStore, options: AggregateOptions) -> Result<Self> {
        let attrs = [
            options.identity_column.clone(),
            options.status_column.clone(),
            options.updated_column.clone(),
            options.title_column.clone(),
            options.bot_column.clone(),
        ];

        let mut latest: BTreeMap<Leaf, Vec<Leaf>> = BTreeMap::new();
        for (_, mut tuple) in store.history(&attrs)? {
            if tuple.first().is_none_or(Leaf::is_null) {
                continue;
            }
            let identity = tuple.remove(0);
            latest.insert(identity, tuple);
        }

        let members: Vec<Member> = latest
            .into_iter()
            .map(|(identity, fields)| member_from_fields(identity, &fields, &options))
            .collect();
        debug!(members = members.len(), "loaded members from snapshot history");

        Ok(Self::from_members(members, options))
    }

    #[must_use]
    pub const fn from_members(members: Vec<Member>, options: AggregateOptions) -> Self {
        Self { members, options }
    }

    #[must_use]
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    #[must_use]
    pub const fn options(&self) -> &AggregateOptions {
        &self.options
    }

    /// Categories held by at least one active human, minus unusable labels
    /// (empty, containing a space, or excluded).
    #[must_use]
    pub fn categories(&self) -> BTreeSet<String> {
        let excluded = self.excluded();
        self.humans()
            .filter(|m| m.active)
            .map(|m| m.category.as_str())
            .filter(|c| !c.is_empty() && !c.contains(' ') && !excluded.contains(c))
            .map(str::to_string)
            .collect()
    }

    /// Active and deactivated headcount per category.
    #[must_use]
    pub fn category_counts(&self) -> Vec<CategoryCount> {
        self.categories()
            .into_iter()
            .map(|category| {
                let (active, deactivated) = self
                    .humans()
                    .filter(|m| m.category == category)
                    .fold((0, 0), |(a, d), m| if m.active { (a + 1, d) } else { (a, d + 1) });
                CategoryCount {
                    category,
                    active,
                    deactivated,
                }
            })
            .filter(|count| count.active >= self.options.min_active)
            .collect()
    }

    /// Deactivations per week of the member's last update.
    #[must_use]
    pub fn weekly_deactivations(&self) -> Vec<WeeklyCount> {
        self.count_weeks(|_| true)
            .into_iter()
            .map(|(week, count)| WeeklyCount { week, count })
            .collect()
    }

    /// Weekly deactivations per category, plus the [`ALL_CATEGORIES`] series.
    ///
    /// Sorted by week, then category.
    #[must_use]
    pub fn weekly_by_category(&self) -> Vec<CategoryWeek> {
        let mut series: Vec<CategoryWeek> = Vec::new();
        for category in self.categories() {
            for (week, count) in self.count_weeks(|m| m.category == category) {
                series.push(CategoryWeek {
                    category: category.clone(),
                    week,
                    count,
                });
            }
        }

        let excluded = self.excluded();
        let cutoff = self.options.series_cutoff;
        series.extend(
            self.count_weeks(|m| !excluded.contains(m.category.as_str()))
                .into_iter()
                .filter(|(week, _)| *week > cutoff)
                .map(|(week, count)| CategoryWeek {
                    category: ALL_CATEGORIES.to_string(),
                    week,
                    count,
                }),
        );

        series.sort_by(|a, b| a.week.cmp(&b.week).then_with(|| a.category.cmp(&b.category)));
        series
    }

    fn humans(&self) -> impl Iterator<Item = &Member> {
        self.members.iter().filter(|m| !m.bot)
    }

    fn excluded(&self) -> HashSet<&str> {
        self.options
            .excluded_categories
            .iter()
            .map(String::as_str)
            .collect()
    }

    fn count_weeks(&self, keep: impl Fn(&Member) -> bool) -> BTreeMap<NaiveDate, usize> {
        let mut weeks: BTreeMap<NaiveDate, usize> = BTreeMap::new();
        for member in self.humans().filter(|m| !m.active && keep(m)) {
            if let Some(updated) = member.updated {
                *weeks.entry(self.options.week_start.week_of(updated)).or_default() += 1;
            }
        }
        weeks
    }
}

fn member_from_fields(identity: Leaf, fields: &[Leaf], options: &AggregateOptions) -> Member {
    let field = |idx: usize| fields.get(idx).unwrap_or(&Leaf::Null);

    let title = field(2).to_string();
    let category = title
        .split(options.category_delimiter.as_str())
        .next()
        .unwrap_or_default()
        .to_string();
    let bot = match field(3) {
        Leaf::Null => true,
        flag => flag.is_truthy(),
    };

    Member {
        identity,
        active: !field(0).is_truthy(),
        updated: field(1).as_f64().and_then(unix_date),
        category,
        bot,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn unix_date(seconds: f64) -> Option<NaiveDate> {
    if !seconds.is_finite() {
        return None;
    }
    DateTime::from_timestamp(seconds.floor() as i64, 0).map(|at| at.date_naive())
}
