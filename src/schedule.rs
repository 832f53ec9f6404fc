//! Daily trigger.
//!
//! Fires once a day at a wall-clock time in an IANA time zone. The scheduler
//! only looks at the shutdown signal between cycles, so a running cycle is
//! never cut short.

use std::future::Future;

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::{error, info};

use crate::controller::{CycleController, CycleReport};
use crate::publisher::Publisher;
use crate::source::LeaderboardSource;
use crate::store::SnapshotStore;

/// Error type for schedule parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    /// Time was not `HH:MM`.
    #[error("Invalid publish time {0:?}, expected HH:MM")]
    InvalidTime(String),
    /// Time zone name is not in the IANA database.
    #[error("Unknown time zone {0:?}")]
    UnknownTimeZone(String),
}

/// A wall-clock time that recurs every day in one time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    time: NaiveTime,
    tz: Tz,
}

impl DailySchedule {
    /// Create a schedule.
    pub fn new(time: NaiveTime, tz: Tz) -> Self {
        Self { time, tz }
    }

    /// Parse `HH:MM` and an IANA zone name such as `America/New_York`.
    pub fn parse(time: &str, tz: &str) -> Result<Self, ScheduleError> {
        let time = NaiveTime::parse_from_str(time.trim(), "%H:%M")
            .map_err(|_| ScheduleError::InvalidTime(time.to_string()))?;
        let tz: Tz = tz
            .trim()
            .parse()
            .map_err(|_| ScheduleError::UnknownTimeZone(tz.to_string()))?;

        Ok(Self::new(time, tz))
    }

    /// Local fire time.
    pub fn time(&self) -> NaiveTime {
        self.time
    }

    /// Time zone the fire time is read in.
    pub fn tz(&self) -> Tz {
        self.tz
    }

    /// First fire time strictly after `now`.
    ///
    /// On a day where the fire time falls in a DST gap the trigger moves one
    /// hour later; where it is ambiguous the earlier instant wins.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.with_timezone(&self.tz).date_naive();

        for offset in 0..=2 {
            let local = (today + Duration::days(offset)).and_time(self.time);
            let resolved = self
                .tz
                .from_local_datetime(&local)
                .earliest()
                .or_else(|| self.tz.from_local_datetime(&(local + Duration::hours(1))).earliest());

            if let Some(fire) = resolved.map(|t| t.with_timezone(&Utc)) {
                if fire > now {
                    return fire;
                }
            }
        }

        // unreachable for real zones; keep the trigger moving regardless
        now + Duration::days(1)
    }
}

/// Run one cycle and log its outcome. Errors do not escape.
pub async fn run_logged<S, P, K>(controller: &CycleController<S, P, K>) -> Option<CycleReport>
where
    S: LeaderboardSource,
    P: Publisher,
    K: SnapshotStore,
{
    match controller.run_cycle().await {
        Ok(report) => Some(report),
        Err(e) => {
            error!(error = %e, "Cycle failed, baseline kept for the next run");
            None
        }
    }
}

/// Run cycles daily until `shutdown` resolves.
pub async fn run_daily<S, P, K, F>(
    controller: &CycleController<S, P, K>,
    schedule: &DailySchedule,
    shutdown: F,
) where
    S: LeaderboardSource,
    P: Publisher,
    K: SnapshotStore,
    F: Future<Output = ()>,
{
    run_daily_with_clock(controller, schedule, shutdown, Utc::now).await
}

/// [`run_daily`] reading the current time from `clock`.
pub async fn run_daily_with_clock<S, P, K, F, C>(
    controller: &CycleController<S, P, K>,
    schedule: &DailySchedule,
    shutdown: F,
    clock: C,
) where
    S: LeaderboardSource,
    P: Publisher,
    K: SnapshotStore,
    F: Future<Output = ()>,
    C: Fn() -> DateTime<Utc>,
{
    tokio::pin!(shutdown);

    loop {
        let now = clock();
        let next = schedule.next_after(now);
        let wait = (next - now).to_std().unwrap_or_default();

        info!(
            next_run = %next,
            local_time = %schedule.time().format("%H:%M"),
            tz = %schedule.tz(),
            wait_secs = wait.as_secs(),
            "Next cycle scheduled"
        );

        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("Scheduler stopping");
                return;
            }
            _ = tokio::time::sleep(wait) => {}
        }

        run_logged(controller).await;
    }
}
