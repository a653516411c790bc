//! Device records and the values they are built from.
//!
//! A [`DeviceRecord`] is what the registry stores and what the snapshot file holds.
//! A [`CheckIn`] carries only the caller-supplied fields of one check-in; the registry
//! owns the counters and timestamps.

use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Wire format of every timestamp in the snapshot file.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current UTC time at the precision the snapshot keeps (whole seconds).
pub fn now_utc() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Operating mode reported by a device.
///
/// Only the two controller modes make a device a LAN discovery target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeviceMode {
    ClientSmartphone,
    ClientComputer,
    ClientIot,
    ControllerLite,
    ControllerPro,
    UnsetSmartphone,
    UnsetComputer,
    /// Mode string was missing or not recognized.
    #[default]
    Unset,
}

impl DeviceMode {
    /// Modes in the order of their legacy integer encoding.
    const LEGACY_ORDER: [DeviceMode; 7] = [
        DeviceMode::ClientSmartphone,
        DeviceMode::ClientComputer,
        DeviceMode::ClientIot,
        DeviceMode::ControllerLite,
        DeviceMode::ControllerPro,
        DeviceMode::UnsetSmartphone,
        DeviceMode::UnsetComputer,
    ];

    /// The string clients send and the snapshot stores.
    pub fn as_wire(&self) -> &'static str {
        match self {
            DeviceMode::ClientSmartphone => "clientSP",
            DeviceMode::ClientComputer => "clientComp",
            DeviceMode::ClientIot => "clientIOT",
            DeviceMode::ControllerLite => "ctrlLite",
            DeviceMode::ControllerPro => "ctrlPro",
            DeviceMode::UnsetSmartphone => "noneSP",
            DeviceMode::UnsetComputer => "noneComp",
            DeviceMode::Unset => "unset",
        }
    }

    /// Total mapping from a wire string; anything unrecognized is [`DeviceMode::Unset`].
    pub fn from_wire(value: &str) -> Self {
        match value {
            "clientSP" => DeviceMode::ClientSmartphone,
            "clientComp" => DeviceMode::ClientComputer,
            "clientIOT" => DeviceMode::ClientIot,
            "ctrlLite" => DeviceMode::ControllerLite,
            "ctrlPro" => DeviceMode::ControllerPro,
            "noneSP" => DeviceMode::UnsetSmartphone,
            "noneComp" => DeviceMode::UnsetComputer,
            _ => DeviceMode::Unset,
        }
    }

    /// Decode the integer encoding found in older snapshot files.
    pub fn from_legacy_index(index: u64) -> Self {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::LEGACY_ORDER.get(i).copied())
            .unwrap_or(DeviceMode::Unset)
    }

    /// Whether a device in this mode can be returned by LAN discovery.
    pub fn is_controller(&self) -> bool {
        matches!(self, DeviceMode::ControllerLite | DeviceMode::ControllerPro)
    }
}

impl fmt::Display for DeviceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

impl From<&str> for DeviceMode {
    fn from(value: &str) -> Self {
        DeviceMode::from_wire(value)
    }
}

impl Serialize for DeviceMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for DeviceMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ModeVisitor;

        impl Visitor<'_> for ModeVisitor {
            type Value = DeviceMode;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mode string or a legacy mode index")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<DeviceMode, E> {
                Ok(DeviceMode::from_wire(value))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<DeviceMode, E> {
                Ok(DeviceMode::from_legacy_index(value))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<DeviceMode, E> {
                Ok(u64::try_from(value)
                    .map(DeviceMode::from_legacy_index)
                    .unwrap_or(DeviceMode::Unset))
            }
        }

        deserializer.deserialize_any(ModeVisitor)
    }
}

/// `YYYY-MM-DD HH:MM:SS` (UTC) serde adapter.
mod timestamp {
    use super::TIMESTAMP_FORMAT;
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(TIMESTAMP_FORMAT))
    }

    /// An empty string is an unset time; older snapshots write one for never-updated devices.
    pub fn deserialize_optional<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw.trim().is_empty() {
            return Ok(None);
        }
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT)
            .map(|naive| Some(naive.and_utc()))
            .map_err(|err| de::Error::custom(format!("bad timestamp {raw:?}: {err}")))
    }
}

/// The caller-supplied part of a check-in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckIn {
    pub id: String,
    pub name: String,
    pub width_height: String,
    pub aspect_ratio: String,
    pub operating_system: String,
    pub model: String,
    pub mode: DeviceMode,
    pub public_ip: String,
    pub private_ip: String,
}

/// One registered device.
///
/// Field names on disk follow the snapshot format the service has always written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredRecord")]
pub struct DeviceRecord {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "WH", default)]
    pub width_height: String,
    #[serde(rename = "Aspect", default)]
    pub aspect_ratio: String,
    #[serde(rename = "LastPublicIP", default)]
    pub last_public_ip: String,
    #[serde(rename = "LastPrivateIP", default)]
    pub last_private_ip: String,
    #[serde(rename = "OS", default)]
    pub operating_system: String,
    #[serde(rename = "Model", default)]
    pub model: String,
    #[serde(rename = "Logins")]
    pub login_count: u64,
    #[serde(rename = "FirstLogin", serialize_with = "timestamp::serialize")]
    pub first_seen_at: DateTime<Utc>,
    #[serde(rename = "LastLogin", serialize_with = "timestamp::serialize")]
    pub last_seen_at: DateTime<Utc>,
    #[serde(rename = "LastUpdate", serialize_with = "timestamp::serialize")]
    pub last_updated_at: DateTime<Utc>,
    #[serde(rename = "LastMode", default)]
    pub mode: DeviceMode,
}

/// A record as found on disk, before missing timestamps are filled in.
#[derive(Deserialize)]
struct StoredRecord {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "WH", default)]
    width_height: String,
    #[serde(rename = "Aspect", default)]
    aspect_ratio: String,
    #[serde(rename = "LastPublicIP", default)]
    last_public_ip: String,
    #[serde(rename = "LastPrivateIP", default)]
    last_private_ip: String,
    #[serde(rename = "OS", default)]
    operating_system: String,
    #[serde(rename = "Model", default)]
    model: String,
    #[serde(rename = "Logins", default)]
    login_count: u64,
    #[serde(rename = "FirstLogin", default, deserialize_with = "timestamp::deserialize_optional")]
    first_seen_at: Option<DateTime<Utc>>,
    #[serde(rename = "LastLogin", default, deserialize_with = "timestamp::deserialize_optional")]
    last_seen_at: Option<DateTime<Utc>>,
    #[serde(rename = "LastUpdate", default, deserialize_with = "timestamp::deserialize_optional")]
    last_updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "LastMode", default)]
    mode: DeviceMode,
}

impl From<StoredRecord> for DeviceRecord {
    /// Unset times borrow the nearest known one: an update falls back to the last login,
    /// a login to the first login. A record with no time at all gets the Unix epoch.
    fn from(stored: StoredRecord) -> Self {
        let first_seen_at = stored
            .first_seen_at
            .or(stored.last_seen_at)
            .or(stored.last_updated_at)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let last_seen_at = stored.last_seen_at.unwrap_or(first_seen_at);
        let last_updated_at = stored.last_updated_at.unwrap_or(last_seen_at);

        Self {
            id: stored.id,
            name: stored.name,
            width_height: stored.width_height,
            aspect_ratio: stored.aspect_ratio,
            last_public_ip: stored.last_public_ip,
            last_private_ip: stored.last_private_ip,
            operating_system: stored.operating_system,
            model: stored.model,
            login_count: stored.login_count,
            first_seen_at,
            last_seen_at,
            last_updated_at,
            mode: stored.mode,
        }
    }
}

impl DeviceRecord {
    /// Record for the first check-in of an unseen ID.
    pub fn first_check_in(candidate: CheckIn, now: DateTime<Utc>) -> Self {
        Self {
            id: candidate.id,
            name: candidate.name,
            width_height: candidate.width_height,
            aspect_ratio: candidate.aspect_ratio,
            last_public_ip: candidate.public_ip,
            last_private_ip: candidate.private_ip,
            operating_system: candidate.operating_system,
            model: candidate.model,
            login_count: 1,
            first_seen_at: now,
            last_seen_at: now,
            last_updated_at: now,
            mode: candidate.mode,
        }
    }

    /// Overlay a later check-in onto this record.
    ///
    /// `id` and `first_seen_at` never change; the login counter advances by one.
    pub fn apply_check_in(&mut self, candidate: CheckIn, now: DateTime<Utc>) {
        self.name = candidate.name;
        self.width_height = candidate.width_height;
        self.aspect_ratio = candidate.aspect_ratio;
        self.operating_system = candidate.operating_system;
        self.model = candidate.model;
        self.last_public_ip = candidate.public_ip;
        self.last_private_ip = candidate.private_ip;
        self.mode = candidate.mode;
        self.last_seen_at = now;
        self.last_updated_at = now;
        self.login_count = self.login_count.saturating_add(1);
    }
}
