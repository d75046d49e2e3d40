use crate::store::UploadSession;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A session plus figures derived from it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    #[serde(flatten)]
    pub session: UploadSession,
    /// Whole seconds between start and end (or now for open sessions)
    pub duration: u64,
    /// Bytes per second over the whole session
    pub average_speed: f64,
    /// Completed files as a percentage of all files
    pub completion_rate: f64,
}

impl SessionStats {
    pub fn compute(session: UploadSession, now: DateTime<Utc>) -> Self {
        let end = session.end_time.unwrap_or(now);
        let millis = (end - session.start_time).num_milliseconds().max(0);
        let seconds = millis as f64 / 1000.0;
        let duration = seconds.round() as u64;

        // Speed uses the unrounded duration
        let average_speed = if millis > 0 {
            session.total_size as f64 / seconds
        } else {
            0.0
        };
        let completion_rate = if session.total_files > 0 {
            f64::from(session.completed_files) / f64::from(session.total_files) * 100.0
        } else {
            0.0
        };

        Self {
            session,
            duration,
            average_speed,
            completion_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SessionStatus;
    use chrono::Duration;

    fn session(total_files: u32, completed_files: u32, total_size: u64) -> UploadSession {
        UploadSession {
            id: "s".to_string(),
            total_files,
            total_size,
            completed_files,
            start_time: Utc::now(),
            end_time: None,
            status: SessionStatus::Active,
        }
    }

    #[test]
    fn test_stats_for_closed_session() {
        let mut s = session(2, 2, 3_000_000);
        s.end_time = Some(s.start_time + Duration::milliseconds(2_600));

        let stats = SessionStats::compute(s, Utc::now());
        assert_eq!(stats.duration, 3);
        assert!((stats.average_speed - 3_000_000.0 / 2.6).abs() < 1e-6);
        assert_eq!(stats.completion_rate, 100.0);
    }

    #[test]
    fn test_sub_second_session_still_has_speed() {
        let mut s = session(1, 1, 3_000_000);
        s.end_time = Some(s.start_time + Duration::milliseconds(400));

        let stats = SessionStats::compute(s, Utc::now());
        assert_eq!(stats.duration, 0);
        assert!((stats.average_speed - 7_500_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_duration_and_empty_session() {
        let s = session(0, 0, 0);
        let now = s.start_time;

        let stats = SessionStats::compute(s, now);
        assert_eq!(stats.duration, 0);
        assert_eq!(stats.average_speed, 0.0);
        assert_eq!(stats.completion_rate, 0.0);
    }

    #[test]
    fn test_open_session_uses_now() {
        let s = session(4, 1, 400);
        let now = s.start_time + Duration::seconds(4);

        let stats = SessionStats::compute(s, now);
        assert_eq!(stats.duration, 4);
        assert_eq!(stats.average_speed, 100.0);
        assert_eq!(stats.completion_rate, 25.0);
    }

    #[test]
    fn test_stats_flatten_session_fields() {
        let stats = SessionStats::compute(session(1, 0, 10), Utc::now());
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["totalFiles"], 1);
        assert!(json.get("completionRate").is_some());
        assert!(json.get("session").is_none());
    }
}
