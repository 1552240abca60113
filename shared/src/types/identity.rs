//! Identity handshake message
//!
//! The first message a client sends after connecting. It names the user
//! whose samples follow on the same connection.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric user identifier
pub type UserId = u64;

/// Single-byte gender code carried verbatim on the wire.
///
/// The set of codes is open: `'f'` and `'m'` have display labels, every
/// other ASCII character is shown as "other". Non-ASCII characters cannot be
/// represented because the wire slot is exactly one UTF-8 byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "char", into = "char")]
pub struct Gender(u8);

impl Gender {
    pub const FEMALE: Gender = Gender(b'f');
    pub const MALE: Gender = Gender(b'm');

    /// Build a gender code from a character, if it fits in one UTF-8 byte.
    pub fn new(c: char) -> Option<Self> {
        c.is_ascii().then_some(Gender(c as u8))
    }

    /// Build a gender code from a raw wire byte.
    pub fn from_byte(b: u8) -> Option<Self> {
        b.is_ascii().then_some(Gender(b))
    }

    pub fn as_byte(self) -> u8 {
        self.0
    }

    pub fn as_char(self) -> char {
        self.0 as char
    }

    /// Human-readable label used when printing an identity
    pub fn label(self) -> &'static str {
        match self.0 {
            b'f' => "female",
            b'm' => "male",
            _ => "other",
        }
    }
}

impl TryFrom<char> for Gender {
    type Error = String;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        Gender::new(c).ok_or_else(|| format!("gender must be a single-byte character, got {c:?}"))
    }
}

impl From<Gender> for char {
    fn from(g: Gender) -> char {
        g.as_char()
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Gender::try_from(c),
            _ => Err(format!("gender must be exactly one character, got {s:?}")),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Identity handshake message
///
/// `birth_date` is stored with whole-second precision: the constructor drops
/// any sub-second part, matching what survives a trip over the wire.
/// Deserialization goes through the same constructor and also rejects dates
/// the wire format cannot carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "IdentityRepr")]
pub struct Identity {
    user_id: UserId,
    username: String,
    birth_date: DateTime<Utc>,
    gender: Gender,
}

impl Identity {
    pub fn new(
        user_id: UserId,
        username: impl Into<String>,
        birth_date: DateTime<Utc>,
        gender: Gender,
    ) -> Self {
        Self {
            user_id,
            username: username.into(),
            birth_date: birth_date.with_nanosecond(0).unwrap_or(birth_date),
            gender,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn birth_date(&self) -> DateTime<Utc> {
        self.birth_date
    }

    pub fn gender(&self) -> Gender {
        self.gender
    }
}

#[derive(Deserialize)]
struct IdentityRepr {
    user_id: UserId,
    username: String,
    birth_date: DateTime<Utc>,
    gender: Gender,
}

impl TryFrom<IdentityRepr> for Identity {
    type Error = String;

    fn try_from(repr: IdentityRepr) -> Result<Self, Self::Error> {
        if u32::try_from(repr.birth_date.timestamp()).is_err() {
            return Err(format!(
                "birth_date {} is outside the 32-bit seconds range",
                repr.birth_date.to_rfc3339()
            ));
        }
        Ok(Identity::new(
            repr.user_id,
            repr.username,
            repr.birth_date,
            repr.gender,
        ))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "user {}: {}, born {} ({})",
            self.user_id,
            self.username,
            self.birth_date.format("%B %d, %Y"),
            self.gender.label()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ada() -> Identity {
        let birth = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        Identity::new(42, "ada", birth, Gender::FEMALE)
    }

    #[test]
    fn test_display() {
        assert_eq!(ada().to_string(), "user 42: ada, born January 01, 2000 (female)");
    }

    #[test]
    fn test_gender_labels() {
        assert_eq!(Gender::FEMALE.label(), "female");
        assert_eq!(Gender::MALE.label(), "male");
        assert_eq!(Gender::new('x').unwrap().label(), "other");
        assert_eq!(Gender::new('x').unwrap().as_char(), 'x');
    }

    #[test]
    fn test_gender_rejects_multibyte() {
        assert!(Gender::new('é').is_none());
        assert!(Gender::from_byte(0xC3).is_none());
        assert!("fm".parse::<Gender>().is_err());
        assert!("".parse::<Gender>().is_err());
        assert_eq!("m".parse::<Gender>().unwrap(), Gender::MALE);
    }

    #[test]
    fn test_subsecond_truncated() {
        let birth = Utc.with_ymd_and_hms(1990, 6, 15, 12, 30, 45).unwrap()
            + chrono::Duration::milliseconds(750);
        let identity = Identity::new(1, "x", birth, Gender::MALE);
        assert_eq!(identity.birth_date().nanosecond(), 0);
        assert_eq!(identity.birth_date().timestamp(), birth.timestamp());
    }

    #[test]
    fn test_json_serialization() {
        let json = serde_json::to_string(&ada()).unwrap();
        assert!(json.contains("\"gender\":\"f\""));
        let back: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ada());
    }

    #[test]
    fn test_json_subsecond_truncated() {
        let json = r#"{"user_id":42,"username":"ada","birth_date":"2000-01-01T00:00:00.750Z","gender":"f"}"#;
        let identity: Identity = serde_json::from_str(json).unwrap();
        assert_eq!(identity, ada());
        assert_eq!(identity.birth_date().nanosecond(), 0);
        assert!(identity.to_bytes().is_ok());
    }

    #[test]
    fn test_json_rejects_unencodable_dates() {
        let before_epoch = r#"{"user_id":1,"username":"x","birth_date":"1960-01-01T00:00:00.750Z","gender":"f"}"#;
        let err = serde_json::from_str::<Identity>(before_epoch).unwrap_err();
        assert!(err.to_string().contains("outside the 32-bit seconds range"));

        let past_u32 = r#"{"user_id":1,"username":"x","birth_date":"2200-01-01T00:00:00Z","gender":"m"}"#;
        assert!(serde_json::from_str::<Identity>(past_u32).is_err());

        let last_second = r#"{"user_id":1,"username":"x","birth_date":"2106-02-07T06:28:15Z","gender":"m"}"#;
        let identity: Identity = serde_json::from_str(last_second).unwrap();
        assert_eq!(identity.birth_date().timestamp(), i64::from(u32::MAX));
    }
}
