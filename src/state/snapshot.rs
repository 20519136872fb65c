use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Complete persisted state: every user record plus the last broadcast link
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// User records in insertion order
    #[serde(default)]
    pub users: Vec<UserRecord>,

    /// Most recently broadcast link
    #[serde(default, deserialize_with = "null_as_empty")]
    pub link: String,

    /// Top-level keys we do not interpret, written back as found
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// First record with the given WhatsApp number
    pub fn find(&self, whatsapp: &str) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.whatsapp == whatsapp)
    }

    pub fn find_mut(&mut self, whatsapp: &str) -> Option<&mut UserRecord> {
        self.users.iter_mut().find(|u| u.whatsapp == whatsapp)
    }

    /// Remove every record with the given WhatsApp number, returning how many went
    pub fn remove_all(&mut self, whatsapp: &str) -> usize {
        let before = self.users.len();
        self.users.retain(|u| u.whatsapp != whatsapp);
        before - self.users.len()
    }

    /// Verified users, in store order
    pub fn verified(&self) -> impl Iterator<Item = &UserRecord> {
        self.users
            .iter()
            .filter(|u| u.status == UserStatus::Verified)
    }
}

/// One applicant, keyed by WhatsApp number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub whatsapp: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub status: UserStatus,

    /// Bot chat to notify; absent means the user is never messaged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<ChatId>,

    #[serde(default)]
    pub remaining_days: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_verified: Option<NaiveDateTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_renewed: Option<NaiveDateTime>,

    /// Fields written by the registration side that we carry through untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
impl UserRecord {
    pub fn new(whatsapp: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            whatsapp: whatsapp.into(),
            name: name.into(),
            status: UserStatus::Pending,
            chat_id: None,
            remaining_days: 0,
            last_verified: None,
            last_renewed: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_chat_id(mut self, chat_id: impl Into<ChatId>) -> Self {
        self.chat_id = Some(chat_id.into());
        self
    }

    pub fn with_status(mut self, status: UserStatus) -> Self {
        self.status = status;
        self
    }
}

impl UserRecord {

    /// Mark verified: the day counter starts over from zero
    pub fn mark_verified(&mut self, now: NaiveDateTime) {
        self.status = UserStatus::Verified;
        self.remaining_days = 0;
        self.last_verified = Some(now);
    }

    /// Credit renewal days, returning the new total
    pub fn renew(&mut self, days: u32, now: NaiveDateTime) -> u32 {
        self.remaining_days = self.remaining_days.saturating_add(days);
        self.last_renewed = Some(now);
        self.remaining_days
    }
}

/// Review status of an applicant
///
/// Anything other than the three known values is kept verbatim so that a
/// status written by the admin panel survives a load/save cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UserStatus {
    #[default]
    Pending,
    Verified,
    Rejected,
    Other(String),
}

impl UserStatus {
    pub fn as_str(&self) -> &str {
        match self {
            UserStatus::Pending => "pending",
            UserStatus::Verified => "verified",
            UserStatus::Rejected => "rejected",
            UserStatus::Other(s) => s,
        }
    }
}

impl From<String> for UserStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending" => UserStatus::Pending,
            "verified" => UserStatus::Verified,
            "rejected" => UserStatus::Rejected,
            _ => UserStatus::Other(value),
        }
    }
}

impl From<&str> for UserStatus {
    fn from(value: &str) -> Self {
        UserStatus::from(value.to_string())
    }
}

impl From<UserStatus> for String {
    fn from(value: UserStatus) -> Self {
        match value {
            UserStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque bot chat identifier, kept in whichever JSON form it arrived in
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatId {
    Numeric(i64),
    Text(String),
}

impl ChatId {
    /// Whether a message can be addressed to this chat at all
    pub fn is_addressable(&self) -> bool {
        match self {
            ChatId::Numeric(id) => *id != 0,
            ChatId::Text(s) => !s.is_empty(),
        }
    }
}

impl From<i64> for ChatId {
    fn from(value: i64) -> Self {
        ChatId::Numeric(value)
    }
}

impl From<&str> for ChatId {
    fn from(value: &str) -> Self {
        ChatId::Text(value.to_string())
    }
}

impl From<String> for ChatId {
    fn from(value: String) -> Self {
        ChatId::Text(value)
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatId::Numeric(id) => write!(f, "{}", id),
            ChatId::Text(s) => f.write_str(s),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_legacy_data_file() {
        let json = r#"{
            "users": [
                {
                    "whatsapp": "555",
                    "name": "Ana",
                    "status": "verified",
                    "chat_id": 123456789,
                    "remaining_days": 30,
                    "last_verified": "2024-05-01T10:15:30.123456",
                    "registered_at": "2024-04-30"
                },
                {"whatsapp": "777", "name": "Bo", "status": "pending"}
            ],
            "link": null
        }"#;

        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.link, "");
        assert_eq!(snapshot.users.len(), 2);

        let ana = snapshot.find("555").unwrap();
        assert_eq!(ana.status, UserStatus::Verified);
        assert_eq!(ana.chat_id, Some(ChatId::Numeric(123456789)));
        assert_eq!(ana.remaining_days, 30);
        assert!(ana.last_verified.is_some());
        assert!(ana.last_renewed.is_none());
        assert_eq!(
            ana.extra.get("registered_at"),
            Some(&serde_json::Value::String("2024-04-30".to_string()))
        );

        let bo = snapshot.find("777").unwrap();
        assert_eq!(bo.chat_id, None);
        assert_eq!(bo.remaining_days, 0);
    }

    #[test]
    fn test_unknown_top_level_keys_survive() {
        let json = r#"{"users": [], "link": "L", "welcome_text": "hi", "version": 2}"#;

        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.link, "L");
        assert_eq!(snapshot.extra.len(), 2);

        let written = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(
            written,
            serde_json::json!({"users": [], "link": "L", "welcome_text": "hi", "version": 2})
        );
    }

    #[test]
    fn test_absent_optionals_are_omitted() {
        let user = UserRecord::new("555", "Ana");
        let value = serde_json::to_value(&user).unwrap();
        let obj = value.as_object().unwrap();

        assert!(!obj.contains_key("chat_id"));
        assert!(!obj.contains_key("last_verified"));
        assert!(!obj.contains_key("last_renewed"));
        assert_eq!(obj.get("status"), Some(&serde_json::json!("pending")));
    }

    #[test]
    fn test_unknown_status_kept_verbatim() {
        let status: UserStatus = serde_json::from_str("\"on-hold\"").unwrap();
        assert_eq!(status, UserStatus::Other("on-hold".to_string()));
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"on-hold\"");
    }

    #[test]
    fn test_mark_verified_resets_days() {
        let now = chrono::Local::now().naive_local();
        let mut user = UserRecord::new("555", "Ana");
        user.remaining_days = 12;

        user.mark_verified(now);

        assert_eq!(user.status, UserStatus::Verified);
        assert_eq!(user.remaining_days, 0);
        assert_eq!(user.last_verified, Some(now));
    }

    #[test]
    fn test_renew_saturates() {
        let now = chrono::Local::now().naive_local();
        let mut user = UserRecord::new("555", "Ana");
        user.remaining_days = u32::MAX - 1;

        assert_eq!(user.renew(5, now), u32::MAX);
        assert_eq!(user.last_renewed, Some(now));
    }

    #[test]
    fn test_remove_all_duplicates() {
        let mut snapshot = Snapshot::new();
        snapshot.users.push(UserRecord::new("555", "Ana"));
        snapshot.users.push(UserRecord::new("777", "Bo"));
        snapshot.users.push(UserRecord::new("555", "Ana again"));

        assert_eq!(snapshot.remove_all("555"), 2);
        assert_eq!(snapshot.users.len(), 1);
        assert_eq!(snapshot.users[0].whatsapp, "777");
    }

    #[test]
    fn test_chat_id_addressable() {
        assert!(ChatId::from("c1").is_addressable());
        assert!(ChatId::from(42i64).is_addressable());
        assert!(ChatId::from(" ").is_addressable());
        assert!(!ChatId::from("").is_addressable());
        assert!(!ChatId::from(0i64).is_addressable());
    }
}
