// Free-submission quota - per-user counters over a configurable period.
//
// Policy comes from the settings store every time it is needed, so changing
// the period or limit takes effect on the next submission without a restart.
//
// Counters are only incremented after a submission was accepted. A user with
// the unlimited flag never touches a counter or their bonus balance.

use crate::core::marketplace::MarketplaceError;
use crate::core::settings::{
    SettingsStore, DEFAULT_QUOTA_FREE_LIMIT, DEFAULT_QUOTA_PERIOD, DEFAULT_QUOTA_TIMEZONE,
    QUOTA_FREE_LIMIT, QUOTA_PERIOD, QUOTA_TIMEZONE,
};
use crate::core::users::{User, UserStore};
use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

/// Counter key for free ad submissions.
pub const FREE_AD_COUNTER: &str = "FreeAdPublish";

// ============================================================================
// DOMAIN MODELS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaPeriod {
    Day,
    /// Monday through today.
    Week,
    /// First of the month through today.
    Month,
    /// No limit at all.
    Unlimited,
}

impl QuotaPeriod {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "day" | "daily" => Some(QuotaPeriod::Day),
            "week" | "weekly" => Some(QuotaPeriod::Week),
            "month" | "monthly" => Some(QuotaPeriod::Month),
            "none" | "unlimited" | "off" => Some(QuotaPeriod::Unlimited),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QuotaPeriod::Day => "day",
            QuotaPeriod::Week => "week",
            QuotaPeriod::Month => "month",
            QuotaPeriod::Unlimited => "none",
        }
    }

    /// Inclusive date range the period covers, or None when unlimited.
    pub fn window(&self, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        let start = match self {
            QuotaPeriod::Day => today,
            QuotaPeriod::Week => {
                today - Duration::days(i64::from(today.weekday().num_days_from_monday()))
            }
            QuotaPeriod::Month => {
                NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap_or(today)
            }
            QuotaPeriod::Unlimited => return None,
        };
        Some((start, today))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaPolicy {
    pub period: QuotaPeriod,
    pub free_limit: i64,
    pub timezone: Tz,
}

impl QuotaPolicy {
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }
}

/// Result of a quota check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allowance {
    pub allowed: bool,
    pub used: i64,
    pub limit: i64,
    pub period_label: String,
    /// The submission is only allowed by spending a bonus placement.
    pub uses_bonus: bool,
    /// No counting at all: unlimited user or unlimited period.
    pub unlimited: bool,
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// Sum of a user's counter entries for `key` between two dates, inclusive.
    async fn count_between(
        &self,
        user_id: u64,
        key: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<i64, MarketplaceError>;

    async fn increment_counter(
        &self,
        user_id: u64,
        key: &str,
        day: NaiveDate,
    ) -> Result<(), MarketplaceError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct QuotaService<S: QuotaStore + UserStore> {
    store: Arc<S>,
    settings: Arc<dyn SettingsStore>,
}

impl<S: QuotaStore + UserStore> QuotaService<S> {
    pub fn new(store: Arc<S>, settings: Arc<dyn SettingsStore>) -> Self {
        Self { store, settings }
    }

    /// Read the current policy, falling back to built-in defaults.
    pub async fn policy(&self) -> QuotaPolicy {
        let raw_period = self
            .settings
            .get_string(QUOTA_PERIOD, DEFAULT_QUOTA_PERIOD)
            .await;
        let period = QuotaPeriod::parse(&raw_period).unwrap_or_else(|| {
            tracing::warn!(value = %raw_period, "Unknown quota period, using default");
            QuotaPeriod::Day
        });

        let raw_tz = self
            .settings
            .get_string(QUOTA_TIMEZONE, DEFAULT_QUOTA_TIMEZONE)
            .await;
        let timezone = raw_tz.parse::<Tz>().unwrap_or_else(|_| {
            tracing::warn!(value = %raw_tz, "Unknown quota timezone, using UTC");
            chrono_tz::UTC
        });

        QuotaPolicy {
            period,
            free_limit: self
                .settings
                .get_int(QUOTA_FREE_LIMIT, DEFAULT_QUOTA_FREE_LIMIT)
                .await,
            timezone,
        }
    }

    pub async fn check_free_allowance(&self, user_id: u64) -> Result<Allowance, MarketplaceError> {
        let policy = self.policy().await;
        let today = policy.today();
        self.check_free_allowance_on(user_id, &policy, today).await
    }

    pub async fn check_free_allowance_on(
        &self,
        user_id: u64,
        policy: &QuotaPolicy,
        today: NaiveDate,
    ) -> Result<Allowance, MarketplaceError> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .unwrap_or_else(|| User::new(user_id, ""));

        let mut allowance = Allowance {
            allowed: true,
            used: 0,
            limit: policy.free_limit,
            period_label: policy.period.label().to_string(),
            uses_bonus: false,
            unlimited: false,
        };

        let window = match policy.period.window(today) {
            Some(window) if !user.unlimited => window,
            _ => {
                allowance.unlimited = true;
                return Ok(allowance);
            }
        };

        allowance.used = self
            .store
            .count_between(user_id, FREE_AD_COUNTER, window.0, window.1)
            .await?;

        if allowance.used < allowance.limit {
            return Ok(allowance);
        }

        if user.bonus_balance > 0 {
            allowance.uses_bonus = true;
        } else {
            allowance.allowed = false;
        }

        tracing::debug!(
            user_id,
            used = allowance.used,
            limit = allowance.limit,
            uses_bonus = allowance.uses_bonus,
            "Free quota exhausted"
        );
        Ok(allowance)
    }

    /// Record one accepted free submission. Call exactly once per submission.
    pub async fn register_consumption(
        &self,
        user_id: u64,
        used_bonus: bool,
    ) -> Result<(), MarketplaceError> {
        let today = self.policy().await.today();
        self.register_consumption_on(user_id, used_bonus, today)
            .await
    }

    pub async fn register_consumption_on(
        &self,
        user_id: u64,
        used_bonus: bool,
        today: NaiveDate,
    ) -> Result<(), MarketplaceError> {
        if used_bonus {
            if !self.store.consume_bonus(user_id).await? {
                tracing::warn!(user_id, "Bonus placement was already spent");
            }
            return Ok(());
        }

        self.store
            .increment_counter(user_id, FREE_AD_COUNTER, today)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::marketplace::InMemoryMarketplaceStore;
    use crate::infra::settings::InMemorySettingsStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn policy(period: QuotaPeriod, free_limit: i64) -> QuotaPolicy {
        QuotaPolicy {
            period,
            free_limit,
            timezone: chrono_tz::UTC,
        }
    }

    fn service() -> (Arc<InMemoryMarketplaceStore>, QuotaService<InMemoryMarketplaceStore>) {
        let store = Arc::new(InMemoryMarketplaceStore::new());
        let settings = Arc::new(InMemorySettingsStore::new());
        (Arc::clone(&store), QuotaService::new(store, settings))
    }

    #[tokio::test]
    async fn daily_limit_then_bonus_then_denied() {
        let (store, quota) = service();
        let mut user = User::new(1, "alice");
        user.bonus_balance = 1;
        store.add_user(user);

        let policy = policy(QuotaPeriod::Day, 1);
        let today = date(2024, 5, 15);

        let first = quota.check_free_allowance_on(1, &policy, today).await.unwrap();
        assert!(first.allowed);
        assert!(!first.uses_bonus);
        quota.register_consumption_on(1, false, today).await.unwrap();

        let second = quota.check_free_allowance_on(1, &policy, today).await.unwrap();
        assert!(second.allowed);
        assert!(second.uses_bonus);
        assert_eq!(second.used, 1);
        quota.register_consumption_on(1, true, today).await.unwrap();
        assert_eq!(store.get_user(1).await.unwrap().unwrap().bonus_balance, 0);

        let third = quota.check_free_allowance_on(1, &policy, today).await.unwrap();
        assert!(!third.allowed);
        assert_eq!(third.used, 1);
        assert_eq!(third.limit, 1);
        assert_eq!(third.period_label, "day");
    }

    #[tokio::test]
    async fn without_bonus_second_submission_is_denied() {
        let (store, quota) = service();
        store.add_user(User::new(2, "bob"));

        let policy = policy(QuotaPeriod::Day, 1);
        let today = date(2024, 5, 15);
        quota.register_consumption_on(2, false, today).await.unwrap();

        let check = quota.check_free_allowance_on(2, &policy, today).await.unwrap();
        assert!(!check.allowed);
        assert!(!check.uses_bonus);

        // Yesterday's count does not leak into tomorrow.
        let tomorrow = quota
            .check_free_allowance_on(2, &policy, date(2024, 5, 16))
            .await
            .unwrap();
        assert!(tomorrow.allowed);
        assert_eq!(tomorrow.used, 0);
    }

    #[tokio::test]
    async fn week_window_is_monday_aligned() {
        let (store, quota) = service();
        store.add_user(User::new(3, "carol"));

        // 2024-05-12 is a Sunday, 2024-05-13 a Monday.
        quota
            .register_consumption_on(3, false, date(2024, 5, 12))
            .await
            .unwrap();
        quota
            .register_consumption_on(3, false, date(2024, 5, 13))
            .await
            .unwrap();

        let policy = policy(QuotaPeriod::Week, 2);
        let check = quota
            .check_free_allowance_on(3, &policy, date(2024, 5, 16))
            .await
            .unwrap();
        assert_eq!(check.used, 1);
        assert!(check.allowed);
    }

    #[tokio::test]
    async fn month_window_starts_on_the_first() {
        let (store, quota) = service();
        store.add_user(User::new(4, "dan"));

        for day in [date(2024, 4, 30), date(2024, 5, 1), date(2024, 5, 20)] {
            quota.register_consumption_on(4, false, day).await.unwrap();
        }

        let policy = policy(QuotaPeriod::Month, 2);
        let check = quota
            .check_free_allowance_on(4, &policy, date(2024, 5, 31))
            .await
            .unwrap();
        assert_eq!(check.used, 2);
        assert!(!check.allowed);
    }

    #[tokio::test]
    async fn unlimited_user_and_unlimited_period_skip_counting() {
        let (store, quota) = service();
        let mut vip = User::new(5, "vip");
        vip.unlimited = true;
        store.add_user(vip);
        store.add_user(User::new(6, "eve"));

        let today = date(2024, 5, 15);
        let daily = policy(QuotaPeriod::Day, 0);
        let check = quota.check_free_allowance_on(5, &daily, today).await.unwrap();
        assert!(check.allowed && check.unlimited && !check.uses_bonus);

        let open = policy(QuotaPeriod::Unlimited, 0);
        let check = quota.check_free_allowance_on(6, &open, today).await.unwrap();
        assert!(check.allowed && check.unlimited);
        assert_eq!(check.period_label, "none");
    }

    #[tokio::test]
    async fn policy_reads_settings_with_fallbacks() {
        let store = Arc::new(InMemoryMarketplaceStore::new());
        let settings = Arc::new(InMemorySettingsStore::new());
        settings.set(QUOTA_PERIOD, "weekly");
        settings.set(QUOTA_FREE_LIMIT, "3");
        settings.set(QUOTA_TIMEZONE, "Mars/Olympus");
        let quota = QuotaService::new(store, settings);

        let policy = quota.policy().await;
        assert_eq!(policy.period, QuotaPeriod::Week);
        assert_eq!(policy.free_limit, 3);
        assert_eq!(policy.timezone, chrono_tz::UTC);
    }
}
