use std::time::Duration;

use querystream::Result;
use serde::{Deserialize, Serialize};

/// Options applied to every command issued by a database context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlOptions {
    #[serde(rename = "command_timeout_secs", with = "duration_secs")]
    pub command_timeout: Duration,
}

impl SqlOptions {
    pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }
}

impl Default for SqlOptions {
    fn default() -> Self {
        SqlOptions {
            command_timeout: Self::DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        assert_eq!(Duration::from_secs(30), SqlOptions::default().command_timeout);
        assert_eq!(SqlOptions::default(), SqlOptions::from_json("{}").unwrap());
    }

    #[test]
    fn from_json() {
        let opts = SqlOptions::from_json(r#"{"command_timeout_secs": 5}"#).unwrap();
        assert_eq!(Duration::from_secs(5), opts.command_timeout);
    }

    #[test]
    fn invalid_json() {
        let err = SqlOptions::from_json(r#"{"command_timeout_secs": "soon"}"#).unwrap_err();
        assert!(matches!(err, querystream::QueryError::Json(_)), "{err}");
    }
}
