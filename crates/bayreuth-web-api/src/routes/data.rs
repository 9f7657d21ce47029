use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use bayreuth_meal_api::{MensaType, Snapshot, Source, View};
use chrono::{Days, Local, NaiveDate, NaiveDateTime};
use futures::future::join_all;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use super::helpers::{register_jobs, Pinable};

mod data;
pub use data::*;

/// Last good plan pages of both mensas. Cloning is cheap, all clones
/// share the same slots.
pub struct MenuCache<S> {
    inner: Arc<Inner<S>>,
}

struct Inner<S> {
    source: S,
    slots: [MensaSlots; 2],
    gate: Mutex<WeeklyGate>,
}

impl<S> Clone for MenuCache<S> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<S: Source> MenuCache<S> {
    pub fn new(source: S, weekly_min_hour: u32) -> Self {
        let today = Local::now().date_naive();
        Self {
            inner: Arc::new(Inner {
                source,
                slots: MensaType::ALL.map(|mensa| MensaSlots::new(mensa, today)),
                gate: Mutex::new(WeeklyGate::new(weekly_min_hour)),
            }),
        }
    }

    fn slots(&self, mensa: MensaType) -> &MensaSlots {
        &self.inner.slots[mensa.index()]
    }

    pub fn current_today(&self, mensa: MensaType) -> Arc<Snapshot> {
        self.slots(mensa).today.load_full()
    }

    pub fn current_week(&self, mensa: MensaType, week: usize) -> Option<Arc<Snapshot>> {
        self.slots(mensa).weeks.get(week).map(|v| v.load_full())
    }

    /// all week slots, oldest first
    pub fn current_weeks(&self, mensa: MensaType) -> [Arc<Snapshot>; WEEKS] {
        self.slots(mensa).weeks()
    }

    /// Fetches one page and replaces the slot on success. A failed
    /// fetch leaves the previous snapshot in place.
    async fn update(
        &self, slot: &ArcSwap<Snapshot>,
        mensa: MensaType, view: View, date: NaiveDate,
    ) -> bool {
        match self.inner.source.fetch(mensa, date, view).await {
            Ok(snapshot) => {
                slot.store(Arc::new(snapshot));
                true
            },
            Err(err) => {
                tracing::warn!("could not fetch {view} plan of {mensa} for {date}: {err}");
                false
            },
        }
    }

    pub async fn refresh_today(&self, today: NaiveDate) -> usize {
        let jobs: Vec<_> = MensaType::ALL.into_iter().map(|mensa| {
            self.update(&self.slots(mensa).today, mensa, View::Day, today)
        }).collect();

        join_all(jobs).await.into_iter().filter(|v| *v).count()
    }

    /// Week `i` is requested with `today + 7 * i` days.
    pub async fn refresh_weeks(&self, today: NaiveDate) -> usize {
        let jobs: Vec<_> = MensaType::ALL.into_iter()
            .flat_map(|mensa| (0..WEEKS).map(move |week| (mensa, week)))
            .filter_map(|(mensa, week)| {
                let date = today.checked_add_days(Days::new(7 * week as u64))?;
                Some(self.update(&self.slots(mensa).weeks[week], mensa, View::Week, date))
            })
        .collect();

        join_all(jobs).await.into_iter().filter(|v| *v).count()
    }

    fn weekly_due(&self, now: NaiveDateTime) -> bool {
        self.inner.gate.lock()
            .unwrap_or_else(PoisonError::into_inner)
        .is_due(now)
    }

    fn mark_weekly(&self, day: NaiveDate) {
        self.inner.gate.lock()
            .unwrap_or_else(PoisonError::into_inner)
        .mark(day);
    }

    /// One scheduler tick: today's pages always, week pages at most once
    /// a day. The day is marked after any weekly attempt, even if every
    /// fetch of it failed.
    pub async fn refresh(&self, now: NaiveDateTime) -> Refresh {
        let today = now.date();

        if !self.weekly_due(now) {
            let count = self.refresh_today(today).await;
            return Refresh { today: count, weeks: None };
        }

        let (count, weeks) = tokio::join!(
            self.refresh_today(today),
            self.refresh_weeks(today),
        );
        self.mark_weekly(today);

        Refresh { today: count, weeks: Some(weeks) }
    }

    /// Fills every slot regardless of the weekly gate. Counts as the
    /// day's weekly refresh only once the gate would have allowed it.
    pub async fn warm_up(&self, now: NaiveDateTime) -> Refresh {
        let due = self.weekly_due(now);
        let (today, weeks) = tokio::join!(
            self.refresh_today(now.date()),
            self.refresh_weeks(now.date()),
        );
        if due { self.mark_weekly(now.date()); }

        Refresh { today, weeks: Some(weeks) }
    }

    /// Warms the cache in the background and registers the recurring
    /// refresh job.
    pub async fn start(&self, schedule: &str) -> Result<RefreshHandle, JobSchedulerError> {
        let cache = self.clone();
        tokio::spawn(async move {
            let report = cache.warm_up(Local::now().naive_local()).await;
            tracing::info!("initial fetch done: {report:?}");
        });

        let cache = self.clone();
        let scheduler = register_jobs(|shed| async move {
            shed.add(Job::new_async(schedule, move |uuid, _| {
                let cache = cache.clone();
                async move {
                    tracing::info!("refreshing plans (job: {uuid:?})");
                    let start = std::time::Instant::now();
                    let report = cache.refresh(Local::now().naive_local()).await;
                    let took = start.elapsed();
                    tracing::info!("refreshed plans: {report:?} (took {took:?})");
                }.pin()
            })?).await?;

            Ok(shed)
        }).await?;

        Ok(RefreshHandle { scheduler })
    }
}

/// Keeps the refresh job alive until [`RefreshHandle::stop`].
pub struct RefreshHandle {
    scheduler: JobScheduler,
}

impl RefreshHandle {
    pub async fn stop(mut self) -> Result<(), JobSchedulerError> {
        tracing::info!("stopping refresh job");
        self.scheduler.shutdown().await
    }
}
