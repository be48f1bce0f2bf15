//! Discussion settings (Value Object)

use serde::{Deserialize, Serialize};

/// Bounds on a discussion's size, length and turn timing.
///
/// Timeouts are in seconds; `0` disables the corresponding timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscussionSettings {
    /// Maximum simultaneously active participants (2-50)
    pub max_participants: usize,
    /// Conclude once the discussion has run this long
    pub max_duration_minutes: Option<u64>,
    /// Conclude once this many messages have been sent
    pub max_messages: Option<u64>,
    /// Participants with the invite permission may add others
    pub allow_invites: bool,
    /// Maximum duration of a single turn
    pub turn_timeout_secs: u64,
    /// Maximum silence within a turn before it is forfeited
    pub response_timeout_secs: u64,
    /// Maximum message length in characters
    pub max_message_length: usize,
}

impl Default for DiscussionSettings {
    fn default() -> Self {
        Self {
            max_participants: 10,
            max_duration_minutes: None,
            max_messages: None,
            allow_invites: true,
            turn_timeout_secs: 300,
            response_timeout_secs: 60,
            max_message_length: 10_000,
        }
    }
}

impl DiscussionSettings {
    pub const MIN_PARTICIPANTS: usize = 2;
    pub const MAX_PARTICIPANTS: usize = 50;

    /// Validate the settings, returning a description of the first problem.
    pub fn validate(&self) -> Result<(), String> {
        if !(Self::MIN_PARTICIPANTS..=Self::MAX_PARTICIPANTS).contains(&self.max_participants) {
            return Err(format!(
                "max_participants must be between {} and {}, got {}",
                Self::MIN_PARTICIPANTS,
                Self::MAX_PARTICIPANTS,
                self.max_participants
            ));
        }
        if self.max_message_length == 0 {
            return Err("max_message_length must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn turn_timeout(&self) -> Option<chrono::Duration> {
        (self.turn_timeout_secs > 0).then(|| chrono::Duration::seconds(self.turn_timeout_secs as i64))
    }

    pub fn response_timeout(&self) -> Option<chrono::Duration> {
        (self.response_timeout_secs > 0)
            .then(|| chrono::Duration::seconds(self.response_timeout_secs as i64))
    }

    pub fn max_duration(&self) -> Option<chrono::Duration> {
        self.max_duration_minutes
            .map(|m| chrono::Duration::minutes(m as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_platform_defaults() {
        let settings = DiscussionSettings::default();
        assert_eq!(settings.max_participants, 10);
        assert_eq!(settings.turn_timeout_secs, 300);
        assert_eq!(settings.response_timeout_secs, 60);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_participant_bounds() {
        let mut settings = DiscussionSettings {
            max_participants: 1,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
        settings.max_participants = 51;
        assert!(settings.validate().is_err());
        settings.max_participants = 50;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_disables_timer() {
        let settings = DiscussionSettings {
            turn_timeout_secs: 0,
            ..Default::default()
        };
        assert!(settings.turn_timeout().is_none());
        assert_eq!(
            settings.response_timeout(),
            Some(chrono::Duration::seconds(60))
        );
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let settings: DiscussionSettings =
            serde_json::from_str(r#"{"turn_timeout_secs": 30}"#).unwrap();
        assert_eq!(settings.turn_timeout_secs, 30);
        assert_eq!(settings.max_participants, 10);
    }
}
