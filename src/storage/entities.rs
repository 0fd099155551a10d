use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

use crate::accounting::money::AnnualSalary;

/// Raw key/value form of the state, as it's kept on disk and passed to
/// [StateStore](super::state_store::StateStore).
pub type StateRecord = Map<String, Value>;

/// Every key the surfaces read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKey {
    Enabled,
    EnabledAt,
    DisabledAt,
    TotalTimeSaved,
    TotalTimeWasted,
    AnnualSalary,
    BlockNotifications,
    BlockMessages,
    BlockExplore,
    BlockPost,
}

impl StateKey {
    pub const ALL: [StateKey; 10] = [
        StateKey::Enabled,
        StateKey::EnabledAt,
        StateKey::DisabledAt,
        StateKey::TotalTimeSaved,
        StateKey::TotalTimeWasted,
        StateKey::AnnualSalary,
        StateKey::BlockNotifications,
        StateKey::BlockMessages,
        StateKey::BlockExplore,
        StateKey::BlockPost,
    ];

    /// Keys a transition rewrites.
    pub const ACCOUNTING: [StateKey; 5] = [
        StateKey::Enabled,
        StateKey::EnabledAt,
        StateKey::DisabledAt,
        StateKey::TotalTimeSaved,
        StateKey::TotalTimeWasted,
    ];

    pub const FLAGS: [StateKey; 4] = [
        StateKey::BlockNotifications,
        StateKey::BlockMessages,
        StateKey::BlockExplore,
        StateKey::BlockPost,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StateKey::Enabled => "enabled",
            StateKey::EnabledAt => "enabledAt",
            StateKey::DisabledAt => "disabledAt",
            StateKey::TotalTimeSaved => "totalTimeSaved",
            StateKey::TotalTimeWasted => "totalTimeWasted",
            StateKey::AnnualSalary => "annualSalary",
            StateKey::BlockNotifications => "blockNotifications",
            StateKey::BlockMessages => "blockMessages",
            StateKey::BlockExplore => "blockExplore",
            StateKey::BlockPost => "blockPost",
        }
    }
}

/// Key older versions used for [StateKey::Enabled].
pub const LEGACY_ENABLED_KEY: &str = "xFeedBlockerEnabled";

/// Optional restrictions on top of hiding the feed. All of them are off by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FeatureFlags {
    #[serde(deserialize_with = "flag_or_off")]
    pub block_notifications: bool,
    #[serde(deserialize_with = "flag_or_off")]
    pub block_messages: bool,
    #[serde(deserialize_with = "flag_or_off")]
    pub block_explore: bool,
    #[serde(deserialize_with = "flag_or_off")]
    pub block_post: bool,
}

impl FeatureFlags {
    pub fn merge(&mut self, patch: FlagsPatch) {
        if let Some(v) = patch.block_notifications {
            self.block_notifications = v;
        }
        if let Some(v) = patch.block_messages {
            self.block_messages = v;
        }
        if let Some(v) = patch.block_explore {
            self.block_explore = v;
        }
        if let Some(v) = patch.block_post {
            self.block_post = v;
        }
    }
}

/// Partial update of [FeatureFlags]. Missing fields are left as they are.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlagsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_notifications: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_messages: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_explore: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_post: Option<bool>,
}

impl FlagsPatch {
    pub fn is_empty(&self) -> bool {
        *self == FlagsPatch::default()
    }

    /// Keys of the flags this patch sets.
    pub fn keys(&self) -> Vec<StateKey> {
        [
            (self.block_notifications, StateKey::BlockNotifications),
            (self.block_messages, StateKey::BlockMessages),
            (self.block_explore, StateKey::BlockExplore),
            (self.block_post, StateKey::BlockPost),
        ]
        .into_iter()
        .filter_map(|(value, key)| value.map(|_| key))
        .collect()
    }
}

/// The whole persisted state. Timestamps and totals are stored as milliseconds.
///
/// Every key is read on its own: a value of the wrong type takes that key's default and leaves
/// the rest of the record intact.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(deserialize_with = "flag_or_on")]
    pub enabled: bool,
    /// Start of the open "saved" interval. Present only while enabled.
    #[serde(deserialize_with = "timestamp_from_ms")]
    pub enabled_at: Option<DateTime<Utc>>,
    /// Start of the open "wasted" interval. Present only while disabled.
    #[serde(deserialize_with = "timestamp_from_ms")]
    pub disabled_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "duration_from_ms")]
    pub total_time_saved: Duration,
    #[serde(deserialize_with = "duration_from_ms")]
    pub total_time_wasted: Duration,
    /// Zero, negative or non-numeric salaries count as never entered.
    #[serde(deserialize_with = "salary_if_positive")]
    pub annual_salary: Option<AnnualSalary>,
    #[serde(flatten)]
    pub flags: FeatureFlags,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            enabled: true,
            enabled_at: None,
            disabled_at: None,
            total_time_saved: Duration::zero(),
            total_time_wasted: Duration::zero(),
            annual_salary: None,
            flags: FeatureFlags::default(),
        }
    }
}

impl PersistedState {
    /// Builds the state from a (possibly partial) record. Missing keys take their defaults.
    pub fn from_record(record: StateRecord) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(record))
    }

    /// Serializes the requested keys into a record ready for
    /// [StateStore::set](super::state_store::StateStore::set).
    pub fn record(&self, keys: &[StateKey]) -> StateRecord {
        keys.iter()
            .map(|key| (key.as_str().to_string(), self.value_of(*key)))
            .collect()
    }

    fn value_of(&self, key: StateKey) -> Value {
        match key {
            StateKey::Enabled => json!(self.enabled),
            StateKey::EnabledAt => json!(self.enabled_at.map(|v| v.timestamp_millis())),
            StateKey::DisabledAt => json!(self.disabled_at.map(|v| v.timestamp_millis())),
            StateKey::TotalTimeSaved => json!(self.total_time_saved.num_milliseconds()),
            StateKey::TotalTimeWasted => json!(self.total_time_wasted.num_milliseconds()),
            StateKey::AnnualSalary => json!(self.annual_salary.map(|v| *v)),
            StateKey::BlockNotifications => json!(self.flags.block_notifications),
            StateKey::BlockMessages => json!(self.flags.block_messages),
            StateKey::BlockExplore => json!(self.flags.block_explore),
            StateKey::BlockPost => json!(self.flags.block_post),
        }
    }

    /// Start of whichever interval is open for the current mode.
    pub fn open_interval_start(&self) -> Option<DateTime<Utc>> {
        if self.enabled {
            self.enabled_at
        } else {
            self.disabled_at
        }
    }

    /// Makes sure exactly the timestamp of the current mode is set, opening the interval at `now`
    /// when there is none yet. Returns true if anything changed.
    pub fn ensure_open_interval(&mut self, now: DateTime<Utc>) -> bool {
        let (open, closed) = if self.enabled {
            (&mut self.enabled_at, &mut self.disabled_at)
        } else {
            (&mut self.disabled_at, &mut self.enabled_at)
        };
        let mut changed = closed.take().is_some();
        if open.is_none() {
            *open = Some(now);
            changed = true;
        }
        changed
    }
}

fn millis(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|v| v.is_finite()).map(|v| v as i64))
}

fn flag_or_off<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Value::deserialize(deserializer)?.as_bool().unwrap_or(false))
}

/// Blocking stays on unless the record clearly says otherwise.
fn flag_or_on<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Value::deserialize(deserializer)?.as_bool().unwrap_or(true))
}

fn timestamp_from_ms<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(millis(&value).and_then(|ms| Utc.timestamp_millis_opt(ms).single()))
}

/// Totals never go below zero, whatever ended up in the file.
fn duration_from_ms<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(millis(&value)
        .map(|ms| Duration::milliseconds(ms.max(0)))
        .unwrap_or_else(Duration::zero))
}

fn salary_if_positive<'de, D>(deserializer: D) -> Result<Option<AnnualSalary>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_f64().and_then(AnnualSalary::new_opt))
}
