//! Sequential report over a list of targets.
//!
//! Every target produces exactly one line, in input order. A failing target
//! is reported inline and never stops the run.

use chrono::{DateTime, Duration, Utc};
use std::io::{self, Write};

use crate::config::Target;
use crate::error::ProbeError;

const SECONDS_PER_DAY: i64 = 86_400;

/// Result of probing one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Expires {
        expiry: DateTime<Utc>,
        days_left: i64,
    },
    Failed {
        message: String,
    },
}

/// Whole days from `now` until `expiry`, rounded toward negative infinity.
///
/// An expiry one second in the past is `-1`, not `0`.
pub fn days_left(now: DateTime<Utc>, expiry: DateTime<Utc>) -> i64 {
    let delta = expiry.signed_duration_since(now);
    let mut seconds = delta.num_seconds();
    if delta < Duration::seconds(seconds) {
        seconds -= 1;
    }
    seconds.div_euclid(SECONDS_PER_DAY)
}

/// Formats an expiry as `YYYY-MM-DD HH:MM:SS UTC`.
pub fn format_expiry(expiry: &DateTime<Utc>) -> String {
    expiry.format("%Y-%m-%d %H:%M:%S %Z").to_string()
}

/// Probes a single target and interprets the result against `now`.
pub fn probe_target<F>(target: &Target, now: DateTime<Utc>, prober: &mut F) -> ProbeOutcome
where
    F: FnMut(&Target) -> Result<DateTime<Utc>, ProbeError>,
{
    match prober(target) {
        Ok(expiry) => ProbeOutcome::Expires {
            expiry,
            days_left: days_left(now, expiry),
        },
        Err(e) => {
            tracing::info!("{} failed: {:?}", target, e);
            ProbeOutcome::Failed {
                message: e.to_string(),
            }
        }
    }
}

/// Renders the report line for one target.
pub fn format_line(target: &Target, outcome: &ProbeOutcome) -> String {
    match outcome {
        ProbeOutcome::Expires { expiry, days_left } => format!(
            "{} -> expires {} ({} days left)",
            target,
            format_expiry(expiry),
            days_left
        ),
        ProbeOutcome::Failed { message } => format!("{} -> ERROR: {}", target, message),
    }
}

/// Writes the summary line, then one line per target.
///
/// `now` is captured by the caller once, so all day counts share the same
/// reference instant. Only a failure to write to `out` is returned.
pub fn check_sites<W, F>(
    out: &mut W,
    targets: &[Target],
    now: DateTime<Utc>,
    mut prober: F,
) -> io::Result<()>
where
    W: Write,
    F: FnMut(&Target) -> Result<DateTime<Utc>, ProbeError>,
{
    writeln!(out, "Checking {} site(s)...", targets.len())?;
    for target in targets {
        let outcome = probe_target(target, now, &mut prober);
        writeln!(out, "{}", format_line(target, &outcome))?;
        out.flush()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_days_left_exact_days() {
        assert_eq!(days_left(now(), now() + Duration::days(30)), 30);
        assert_eq!(days_left(now(), now()), 0);
    }

    #[test]
    fn test_days_left_floors_partial_days() {
        assert_eq!(days_left(now(), now() + Duration::hours(47)), 1);
        assert_eq!(days_left(now(), now() - Duration::seconds(1)), -1);
        assert_eq!(days_left(now(), now() - Duration::days(3)), -3);
        assert_eq!(days_left(now(), now() - Duration::days(3) - Duration::hours(1)), -4);
    }

    #[test]
    fn test_days_left_sub_second() {
        let now = now() + Duration::milliseconds(500);
        assert_eq!(days_left(now, now - Duration::milliseconds(500)), -1);
        assert_eq!(days_left(now, now + Duration::milliseconds(500)), 0);
    }

    #[test]
    fn test_format_expiry() {
        let expiry = Utc.with_ymd_and_hms(2025, 6, 15, 23, 59, 59).unwrap();
        assert_eq!(format_expiry(&expiry), "2025-06-15 23:59:59 UTC");
    }

    #[test]
    fn test_check_sites_reports_every_target_in_order() {
        let targets = vec![
            Target::new("slow.example", 443),
            Target::new("ok.example", 8443),
        ];
        let expiry = now() + Duration::days(10);
        let mut out = Vec::new();

        check_sites(&mut out, &targets, now(), |target| {
            if target.host == "slow.example" {
                Err(ProbeError::Timeout {
                    operation: "connect to slow.example:443".to_string(),
                })
            } else {
                Ok(expiry)
            }
        })
        .unwrap();

        let output = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Checking 2 site(s)...",
                "slow.example:443 -> ERROR: Operation timed out: connect to slow.example:443",
                "ok.example:8443 -> expires 2025-01-11 12:00:00 UTC (10 days left)",
            ]
        );
    }

    #[test]
    fn test_check_sites_uses_one_reference_instant() {
        let targets = vec![Target::new("a", 443), Target::new("b", 443)];
        let expiry = now() + Duration::days(5);
        let mut out = Vec::new();

        check_sites(&mut out, &targets, now(), |_| Ok(expiry)).unwrap();

        let output = String::from_utf8(out).unwrap();
        assert_eq!(output.matches("(5 days left)").count(), 2);
    }

    #[test]
    fn test_expired_certificate_reports_negative_days() {
        let target = Target::new("old.example", 443);
        let expiry = now() - Duration::days(2);

        let outcome = probe_target(&target, now(), &mut |_: &Target| Ok(expiry));

        assert_eq!(
            outcome,
            ProbeOutcome::Expires {
                expiry,
                days_left: -2
            }
        );
        assert_eq!(
            format_line(&target, &outcome),
            "old.example:443 -> expires 2024-12-30 12:00:00 UTC (-2 days left)"
        );
    }

    #[test]
    fn test_missing_not_after_reported_inline() {
        let target = Target::new("nodate.example", 443);
        let outcome = probe_target(&target, now(), &mut |_: &Target| {
            Err(ProbeError::MissingNotAfter)
        });
        assert_eq!(
            format_line(&target, &outcome),
            "nodate.example:443 -> ERROR: Certificate missing notAfter field"
        );
    }
}
