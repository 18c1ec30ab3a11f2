use chrono::{Datelike, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::models::AlertLevel;

/// Per-agent traffic accounting state, stored as JSONB on the agent row.
///
/// `baseline_recv` anchors the cumulative receive counter at the start of the
/// billing period; `used` is recomputed against it on every observation, so a
/// counter that regresses (agent restart) re-anchors without producing a
/// negative delta. The three alert latches are one-way within a period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrafficStats {
    pub enabled: bool,
    /// Bytes per period; 0 disables the limit.
    pub limit: u64,
    /// Bytes counted against the limit in the current period.
    pub used: u64,
    /// Day of month (1-31) the period rolls over; 0 disables rollover.
    pub reset_day: u32,
    /// Unix ms of the current period's start; 0 until first observed.
    pub period_start: i64,
    /// Cumulative receive counter at the period anchor; 0 until first observed.
    pub baseline_recv: u64,
    pub alert_sent_80: bool,
    pub alert_sent_90: bool,
    pub alert_sent_100: bool,
}

/// A usage threshold crossed for the first time this period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdCrossing {
    /// Percent of the limit (80, 90, or 100).
    pub threshold: u32,
    pub level: AlertLevel,
    /// Usage percent at the moment of crossing.
    pub percent: f64,
}

/// What a single observation did to the stats.
#[derive(Debug, Clone, PartialEq)]
pub enum TrafficObservation {
    /// Neither a limit nor a reset day is configured; nothing was touched.
    Disabled,
    /// First observation of the period anchored the baseline.
    Anchored,
    /// Usage was recomputed against the baseline.
    Accounted {
        rolled_over: bool,
        counter_reset: bool,
        crossings: Vec<ThresholdCrossing>,
    },
}

impl TrafficStats {
    /// Folds one cumulative receive-counter sample into the stats.
    ///
    /// Pure state transition; the caller persists the result and records an
    /// alert per returned crossing. Latches flip here, so a crossing is
    /// reported at most once per period even if the caller's record write
    /// fails.
    pub fn observe(&mut self, now_ms: i64, current_recv_total: u64) -> TrafficObservation {
        if self.limit == 0 && self.reset_day == 0 {
            return TrafficObservation::Disabled;
        }

        let rolled_over = self.roll_period_if_due(now_ms, current_recv_total);

        if self.baseline_recv == 0 {
            self.baseline_recv = current_recv_total;
            self.used = 0;
            if self.period_start == 0 {
                self.period_start = now_ms;
            }
            return TrafficObservation::Anchored;
        }

        let counter_reset = current_recv_total < self.baseline_recv;
        if counter_reset {
            // Agent restarted and its counter started over. Re-anchor and
            // keep the usage measured so far.
            self.baseline_recv = current_recv_total;
        } else {
            self.used = current_recv_total - self.baseline_recv;
        }

        let crossings = if self.limit > 0 {
            self.check_thresholds()
        } else {
            Vec::new()
        };

        TrafficObservation::Accounted {
            rolled_over,
            counter_reset,
            crossings,
        }
    }

    /// Checked in the fixed order 100, 90, 80 as independent conditions, so
    /// one large jump can cross all three at once.
    fn check_thresholds(&mut self) -> Vec<ThresholdCrossing> {
        let percent = self.used as f64 / self.limit as f64 * 100.0;
        let mut crossings = Vec::new();

        if percent >= 100.0 && !self.alert_sent_100 {
            self.alert_sent_100 = true;
            crossings.push(ThresholdCrossing {
                threshold: 100,
                level: AlertLevel::Critical,
                percent,
            });
        }
        if percent >= 90.0 && !self.alert_sent_90 {
            self.alert_sent_90 = true;
            crossings.push(ThresholdCrossing {
                threshold: 90,
                level: AlertLevel::Warning,
                percent,
            });
        }
        if percent >= 80.0 && !self.alert_sent_80 {
            self.alert_sent_80 = true;
            crossings.push(ThresholdCrossing {
                threshold: 80,
                level: AlertLevel::Info,
                percent,
            });
        }

        crossings
    }

    /// Starts a fresh period when `now` has passed the configured monthly
    /// reset day since `period_start`. Usage and latches clear; the baseline
    /// re-anchors at the current counter.
    fn roll_period_if_due(&mut self, now_ms: i64, current_recv_total: u64) -> bool {
        if self.reset_day == 0 || self.period_start == 0 {
            return false;
        }
        let Some(boundary) = latest_reset_boundary(now_ms, self.reset_day) else {
            return false;
        };
        if self.period_start >= boundary {
            return false;
        }

        self.used = 0;
        self.period_start = boundary;
        self.baseline_recv = current_recv_total;
        self.alert_sent_80 = false;
        self.alert_sent_90 = false;
        self.alert_sent_100 = false;
        true
    }

    pub fn usage_percent(&self) -> f64 {
        if self.limit == 0 {
            return 0.0;
        }
        self.used as f64 / self.limit as f64 * 100.0
    }
}

/// Most recent midnight-UTC occurrence of `reset_day` at or before `now_ms`.
/// The day is clamped to the length of the month it falls in, so `reset_day
/// = 31` means "last day" in shorter months.
fn latest_reset_boundary(now_ms: i64, reset_day: u32) -> Option<i64> {
    if !(1..=31).contains(&reset_day) {
        return None;
    }
    let now = Utc.timestamp_millis_opt(now_ms).single()?;
    let (year, month) = (now.year(), now.month());

    let this_month = month_boundary_ms(year, month, reset_day)?;
    if this_month <= now_ms {
        return Some(this_month);
    }
    let (prev_year, prev_month) = if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    };
    month_boundary_ms(prev_year, prev_month, reset_day)
}

fn month_boundary_ms(year: i32, month: u32, reset_day: u32) -> Option<i64> {
    let day = reset_day.min(days_in_month(year, month)?);
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis())
}

fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some(next.signed_duration_since(first).num_days() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIB: u64 = 1024 * 1024 * 1024;

    fn ms(date: &str) -> i64 {
        format!("{date}T00:00:00Z")
            .parse::<chrono::DateTime<Utc>>()
            .unwrap()
            .timestamp_millis()
    }

    #[test]
    fn test_observe_skips_when_unconfigured() {
        let mut stats = TrafficStats::default();
        let before = stats.clone();

        let outcome = stats.observe(ms("2026-03-10"), 5 * GIB);

        assert_eq!(outcome, TrafficObservation::Disabled);
        assert_eq!(stats, before);
    }

    #[test]
    fn test_first_observation_anchors_baseline() {
        let mut stats = TrafficStats {
            limit: 100 * GIB,
            ..Default::default()
        };
        let now = ms("2026-03-10");

        let outcome = stats.observe(now, 7 * GIB);

        assert_eq!(outcome, TrafficObservation::Anchored);
        assert_eq!(stats.baseline_recv, 7 * GIB);
        assert_eq!(stats.used, 0);
        assert_eq!(stats.period_start, now);
    }

    #[test]
    fn test_usage_is_delta_from_baseline() {
        let mut stats = TrafficStats {
            limit: 100 * GIB,
            ..Default::default()
        };
        let now = ms("2026-03-10");
        stats.observe(now, 10 * GIB);

        let outcome = stats.observe(now + 60_000, 14 * GIB);

        match outcome {
            TrafficObservation::Accounted {
                counter_reset,
                crossings,
                ..
            } => {
                assert!(!counter_reset);
                assert!(crossings.is_empty());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(stats.used, 4 * GIB);
        assert_eq!(stats.baseline_recv, 10 * GIB);
    }

    #[test]
    fn test_counter_reset_reanchors_and_keeps_used() {
        let mut stats = TrafficStats {
            limit: 100 * GIB,
            ..Default::default()
        };
        let now = ms("2026-03-10");
        stats.observe(now, 10 * GIB);
        stats.observe(now + 1_000, 50 * GIB);
        assert_eq!(stats.used, 40 * GIB);

        // Agent restart drops the cumulative counter back to near zero.
        let outcome = stats.observe(now + 2_000, GIB);

        match outcome {
            TrafficObservation::Accounted { counter_reset, .. } => assert!(counter_reset),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(stats.baseline_recv, GIB);
        assert_eq!(stats.used, 40 * GIB);
    }

    #[test]
    fn test_thresholds_fire_once_each() {
        let mut stats = TrafficStats {
            limit: 100 * GIB,
            ..Default::default()
        };
        let now = ms("2026-03-10");
        stats.observe(now, 0);

        let outcome = stats.observe(now + 1_000, 85 * GIB);
        let crossings = match outcome {
            TrafficObservation::Accounted { crossings, .. } => crossings,
            other => panic!("unexpected outcome: {other:?}"),
        };
        assert_eq!(crossings.len(), 1);
        assert_eq!(crossings[0].threshold, 80);
        assert_eq!(crossings[0].level, AlertLevel::Info);

        // Staying above 80 does not refire.
        let outcome = stats.observe(now + 2_000, 86 * GIB);
        match outcome {
            TrafficObservation::Accounted { crossings, .. } => assert!(crossings.is_empty()),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_big_jump_fires_all_thresholds_in_order() {
        let mut stats = TrafficStats {
            limit: 100 * GIB,
            ..Default::default()
        };
        let now = ms("2026-03-10");
        stats.observe(now, 0);

        let outcome = stats.observe(now + 1_000, 105 * GIB);

        let crossings = match outcome {
            TrafficObservation::Accounted { crossings, .. } => crossings,
            other => panic!("unexpected outcome: {other:?}"),
        };
        let thresholds: Vec<u32> = crossings.iter().map(|c| c.threshold).collect();
        assert_eq!(thresholds, vec![100, 90, 80]);
        assert_eq!(crossings[0].level, AlertLevel::Critical);
        assert_eq!(crossings[1].level, AlertLevel::Warning);
        assert_eq!(crossings[2].level, AlertLevel::Info);
        assert!(stats.alert_sent_80 && stats.alert_sent_90 && stats.alert_sent_100);
    }

    #[test]
    fn test_period_rollover_clears_usage_and_latches() {
        let mut stats = TrafficStats {
            limit: 100 * GIB,
            reset_day: 1,
            ..Default::default()
        };
        stats.observe(ms("2026-03-10"), 10 * GIB);
        stats.observe(ms("2026-03-20"), 95 * GIB);
        assert!(stats.alert_sent_80);

        // First observation in April crosses the March 31 -> April 1 boundary.
        let outcome = stats.observe(ms("2026-04-02"), 96 * GIB);

        match outcome {
            TrafficObservation::Accounted { rolled_over, .. } => assert!(rolled_over),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(stats.used, 0);
        assert_eq!(stats.baseline_recv, 96 * GIB);
        assert_eq!(stats.period_start, ms("2026-04-01"));
        assert!(!stats.alert_sent_80 && !stats.alert_sent_90 && !stats.alert_sent_100);
    }

    #[test]
    fn test_reset_day_clamped_to_month_length() {
        // Day 31 in a 30-day month means the last day of that month.
        assert_eq!(
            latest_reset_boundary(ms("2026-05-01"), 31),
            Some(ms("2026-04-30"))
        );
        // February 2026 has 28 days.
        assert_eq!(
            latest_reset_boundary(ms("2026-03-01") - 1, 30),
            Some(ms("2026-02-28"))
        );
        // Boundary in the previous year when January precedes the reset day.
        assert_eq!(
            latest_reset_boundary(ms("2026-01-05"), 15),
            Some(ms("2025-12-15"))
        );
    }

    #[test]
    fn test_usage_percent() {
        let stats = TrafficStats {
            limit: 200,
            used: 50,
            ..Default::default()
        };
        assert_eq!(stats.usage_percent(), 25.0);
        assert_eq!(TrafficStats::default().usage_percent(), 0.0);
    }

    #[test]
    fn test_serde_wire_field_names() {
        let stats = TrafficStats {
            enabled: true,
            limit: 1,
            reset_day: 5,
            alert_sent_80: true,
            ..Default::default()
        };
        let v = serde_json::to_value(&stats).unwrap();
        assert_eq!(v["resetDay"], 5);
        assert_eq!(v["baselineRecv"], 0);
        assert_eq!(v["alertSent80"], true);
        assert_eq!(v["periodStart"], 0);

        // Older rows may lack fields entirely.
        let decoded: TrafficStats = serde_json::from_str(r#"{"limit": 42}"#).unwrap();
        assert_eq!(decoded.limit, 42);
        assert!(!decoded.enabled);
    }
}
