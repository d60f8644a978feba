//! Projecting decoded loyalty responses into reward records.
//!
//! The loyalty summary carries its rewards as repeated field 1 of the root
//! message. Each entry uses these fields:
//!
//! | Field | Meaning |
//! |-------|---------|
//! | 4     | item name |
//! | 5.1   | offer type (`"corporate"` for national offers) |
//! | 8     | status: 1 = available, 2 = redeemed |
//! | 9     | longer description |
//! | 10    | title |
//! | 14    | expiry date `{1: year, 2: month, 3: day}` |
//! | 15.1  | redemption time, Unix seconds |
//!
//! Which date applies depends on the status, so fields 14 and 15 are
//! resolved per entry rather than per schema.

use crate::tree::Tree;
use crate::value::Value;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use tracing::{debug, trace};

/// Title used when field 10 is missing
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Item name used when field 4 is missing
pub const UNKNOWN_ITEM: &str = "Unknown Item";

/// Date value used when no date source is usable
pub const UNKNOWN_DATE: &str = "Unknown Date";

/// Offer type marking a national offer
pub const CORPORATE_OFFER: &str = "corporate";

/// Format of redemption timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const REWARDS: u32 = 1;
const ITEM: u32 = 4;
const OFFER_TYPE: [u32; 2] = [5, 1];
const STATUS: u32 = 8;
const CONTEXT: u32 = 9;
const TITLE: u32 = 10;
const EXPIRY: u32 = 14;
const REDEEMED_AT: [u32; 2] = [15, 1];

/// Where a reward can be used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// Offered by the corporate program
    National,
    /// Offered by a single location
    Local,
}

impl Scope {
    /// Display name
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::National => "National",
            Scope::Local => "Local",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the date of a record means
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DateLabel {
    /// The reward expires on the date
    Expires,
    /// The reward was redeemed at the date
    Redeemed,
    /// No usable date was present
    Unknown,
}

impl DateLabel {
    /// Display name
    pub fn as_str(&self) -> &'static str {
        match self {
            DateLabel::Expires => "Expires",
            DateLabel::Redeemed => "Redeemed",
            DateLabel::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for DateLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a reward entry (field 8)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RewardStatus {
    /// 1
    Available,
    /// 2
    Redeemed,
    /// Missing, not an integer, or any other value
    Unrecognized,
}

impl RewardStatus {
    fn of(entry: &Tree) -> Self {
        match entry.first(STATUS).and_then(Value::as_integer) {
            Some(1) => RewardStatus::Available,
            Some(2) => RewardStatus::Redeemed,
            _ => RewardStatus::Unrecognized,
        }
    }
}

/// Which entries end up in the projected list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    /// Only available rewards
    #[default]
    Available,
    /// Available and redeemed rewards
    AvailableAndRedeemed,
    /// Every entry, whatever its status
    Any,
}

impl StatusFilter {
    /// Returns true if entries with `status` pass the filter
    pub fn admits(&self, status: RewardStatus) -> bool {
        match self {
            StatusFilter::Available => status == RewardStatus::Available,
            StatusFilter::AvailableAndRedeemed => status != RewardStatus::Unrecognized,
            StatusFilter::Any => true,
        }
    }
}

/// Configuration for [`RewardProjector`]
#[derive(Debug, Clone)]
pub struct ProjectorConfig {
    /// Which statuses to keep
    pub status_filter: StatusFilter,
    /// Offset applied when formatting redemption timestamps
    pub utc_offset: FixedOffset,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            status_filter: StatusFilter::default(),
            utc_offset: Utc.fix(),
        }
    }
}

impl ProjectorConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the status filter
    pub fn status_filter(mut self, filter: StatusFilter) -> Self {
        self.status_filter = filter;
        self
    }

    /// Sets the offset used for redemption timestamps
    pub fn utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }
}

/// One reward, as presented to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardRecord {
    /// Short promotional title
    pub title: String,
    /// National or local offer
    pub scope: Scope,
    /// Item the reward is for
    pub item: String,
    /// Longer description; may be empty
    pub context: String,
    /// Meaning of `date_value`
    pub date_label: DateLabel,
    /// Formatted date
    #[serde(rename = "date_str")]
    pub date_value: String,
}

impl fmt::Display for RewardRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "Scope:      {}", self.scope)?;
        writeln!(f, "Item:       {}", self.item)?;
        writeln!(f, "Details:    {}", self.context)?;
        write!(f, "{:<12}{}", format!("{}:", self.date_label), self.date_value)
    }
}

/// Turns decoded loyalty responses into [`RewardRecord`]s
#[derive(Debug, Clone, Default)]
pub struct RewardProjector {
    config: ProjectorConfig,
}

impl RewardProjector {
    /// Creates a projector with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a projector with custom configuration
    pub fn with_config(config: ProjectorConfig) -> Self {
        Self { config }
    }

    /// Extracts the rewards admitted by the status filter, in wire order.
    ///
    /// Returns an empty list if field 1 is absent. Entries that are not
    /// messages are skipped.
    pub fn project(&self, tree: &Tree) -> Vec<RewardRecord> {
        let entries = tree.values(REWARDS);
        let records: Vec<RewardRecord> = entries
            .iter()
            .enumerate()
            .filter_map(|(i, value)| {
                let Some(entry) = value.as_message() else {
                    trace!("Skipping reward entry {}: {} is not a message", i, value.kind());
                    return None;
                };
                let (status, record) = self.project_entry(entry);
                if self.config.status_filter.admits(status) {
                    Some(record)
                } else {
                    trace!("Filtered reward entry {} with status {:?}", i, status);
                    None
                }
            })
            .collect();

        debug!(
            "Projected {} of {} reward entries",
            records.len(),
            entries.len()
        );
        records
    }

    /// Builds the record for a single entry, without filtering.
    pub fn project_entry(&self, entry: &Tree) -> (RewardStatus, RewardRecord) {
        let status = RewardStatus::of(entry);
        let scope = match entry.path(&OFFER_TYPE).and_then(Value::as_text) {
            Some(offer) if offer == CORPORATE_OFFER => Scope::National,
            _ => Scope::Local,
        };
        let (date_label, date_value) = self.resolve_date(entry, status);

        let record = RewardRecord {
            title: text_field(entry, TITLE, UNKNOWN_TITLE),
            scope,
            item: text_field(entry, ITEM, UNKNOWN_ITEM),
            context: text_field(entry, CONTEXT, ""),
            date_label,
            date_value,
        };
        (status, record)
    }

    /// Redeemed entries prefer the redemption time, everything else prefers
    /// the expiry date. Either falls back to the other source.
    fn resolve_date(&self, entry: &Tree, status: RewardStatus) -> (DateLabel, String) {
        let expiry = || expiry_date(entry);
        let redeemed = || self.redemption_time(entry);

        let resolved = match status {
            RewardStatus::Redeemed => redeemed().or_else(expiry).map(|d| (DateLabel::Redeemed, d)),
            _ => expiry().or_else(redeemed).map(|d| (DateLabel::Expires, d)),
        };
        resolved.unwrap_or_else(|| (DateLabel::Unknown, UNKNOWN_DATE.to_string()))
    }

    fn redemption_time(&self, entry: &Tree) -> Option<String> {
        // Zero is an unset timestamp
        let seconds = nonzero(entry.path(&REDEEMED_AT))?;
        let utc = DateTime::from_timestamp(i64::try_from(seconds).ok()?, 0)?;
        Some(
            utc.with_timezone(&self.config.utc_offset)
                .format(TIMESTAMP_FORMAT)
                .to_string(),
        )
    }
}

/// Project `tree` with the default configuration.
pub fn project(tree: &Tree) -> Vec<RewardRecord> {
    RewardProjector::new().project(tree)
}

fn text_field(entry: &Tree, number: u32, default: &str) -> String {
    entry
        .first(number)
        .and_then(Value::as_text)
        .map(Cow::into_owned)
        .unwrap_or_else(|| default.to_string())
}

/// Field 14 formatted as `month/day/year`; all three parts are required
/// and a zero part counts as missing.
fn expiry_date(entry: &Tree) -> Option<String> {
    let date = entry.first(EXPIRY)?.as_message()?;
    let year = nonzero(date.first(1))?;
    let month = nonzero(date.first(2))?;
    let day = nonzero(date.first(3))?;
    Some(format!("{}/{}/{}", month, day, year))
}

fn nonzero(value: Option<&Value>) -> Option<u64> {
    value?.as_integer().filter(|v| *v != 0)
}
