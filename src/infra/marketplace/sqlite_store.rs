// SQLite-backed marketplace store - every storage port the pipeline uses.
//
// Tables:
// - users: quota flags and reviewer membership
// - categories / channels / category_channels: the catalog
// - ads, ad_publications: ads and their append-only publish log
// - moderation_requests: per-channel review requests
// - daily_counters: quota ledger, one row per (user, day, key)
//
// Races that matter are settled by the database, not by reads in Rust:
// deciding a request and spending a bonus are conditional UPDATEs, and a
// partial unique index keeps one Pending request per (ad, channel).

use crate::core::ads::{Ad, AdId, AdPublication, AdStatus, AdStore, NewAd, NewPublication};
use crate::core::catalog::{
    CatalogStore, Category, CategoryId, Channel, ChannelId, ModerationMode,
};
use crate::core::marketplace::MarketplaceError;
use crate::core::moderation::{ModerationRequest, ModerationStore, RequestId, RequestStatus};
use crate::core::quota::QuotaStore;
use crate::core::users::{User, UserStore};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;

const DAY_FORMAT: &str = "%Y-%m-%d";

pub struct SqliteMarketplaceStore {
    pool: SqlitePool,
}

fn storage(e: sqlx::Error) -> MarketplaceError {
    MarketplaceError::StorageError(e.to_string())
}

fn parse_ts(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl SqliteMarketplaceStore {
    /// Open (creating if needed) the database file and run migrations.
    pub async fn new(database_path: &str) -> anyhow::Result<Self> {
        if database_path != ":memory:" {
            if let Some(parent) = Path::new(database_path).parent() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let connection_string = format!("sqlite://{}?mode=rwc", database_path);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&connection_string)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Shared with the settings store, which keeps its own table.
    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                user_id INTEGER PRIMARY KEY,
                display_name TEXT NOT NULL DEFAULT '',
                unlimited BOOLEAN NOT NULL DEFAULT 0,
                bonus_balance INTEGER NOT NULL DEFAULT 0,
                reviewer BOOLEAN NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE,
                parent_id INTEGER REFERENCES categories(id),
                active BOOLEAN NOT NULL DEFAULT 1,
                sort_order INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS channels (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                handle TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                active BOOLEAN NOT NULL DEFAULT 1,
                mode TEXT NOT NULL DEFAULT 'auto',
                spam_filter BOOLEAN NOT NULL DEFAULT 0,
                spam_filter_free_only BOOLEAN NOT NULL DEFAULT 1,
                require_subscription BOOLEAN NOT NULL DEFAULT 0,
                subscription_channel TEXT,
                footer_text TEXT,
                footer_link TEXT,
                pinned_message_id INTEGER
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS category_channels (
                category_id INTEGER NOT NULL REFERENCES categories(id),
                channel_id INTEGER NOT NULL REFERENCES channels(id),
                enabled BOOLEAN NOT NULL DEFAULT 1,
                PRIMARY KEY (category_id, channel_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ads (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                category_id INTEGER NOT NULL REFERENCES categories(id),
                country TEXT,
                city TEXT,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                contacts TEXT NOT NULL,
                paid BOOLEAN NOT NULL DEFAULT 0,
                media_url TEXT,
                status TEXT NOT NULL DEFAULT 'draft',
                bump_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_ads_user ON ads(user_id);
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ad_publications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ad_id INTEGER NOT NULL REFERENCES ads(id) ON DELETE CASCADE,
                channel_id INTEGER NOT NULL,
                message_id INTEGER NOT NULL,
                link TEXT,
                is_bump BOOLEAN NOT NULL DEFAULT 0,
                published_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_ad_publications_ad ON ad_publications(ad_id);
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS moderation_requests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ad_id INTEGER NOT NULL REFERENCES ads(id) ON DELETE CASCADE,
                channel_id INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                reject_reason TEXT,
                decided_by INTEGER,
                created_at TEXT NOT NULL,
                decided_at TEXT
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_moderation_one_pending
                ON moderation_requests(ad_id, channel_id) WHERE status = 'pending';
            CREATE INDEX IF NOT EXISTS idx_moderation_requests_ad ON moderation_requests(ad_id);
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS daily_counters (
                user_id INTEGER NOT NULL,
                day TEXT NOT NULL,
                key TEXT NOT NULL,
                count INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (user_id, day, key)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ------------------------------------------------------------------------
    // Catalog writes, used by the seed loader
    // ------------------------------------------------------------------------

    /// Insert or update a category by slug.
    ///
    /// The parent is only set on insert. An existing category is never moved.
    pub async fn upsert_category(
        &self,
        name: &str,
        slug: &str,
        parent_id: Option<CategoryId>,
        active: bool,
        sort_order: i32,
    ) -> anyhow::Result<Category> {
        sqlx::query(
            r#"
            INSERT INTO categories (name, slug, parent_id, active, sort_order)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(slug) DO UPDATE SET
                name = excluded.name,
                active = excluded.active,
                sort_order = excluded.sort_order
            "#,
        )
        .bind(name)
        .bind(slug)
        .bind(parent_id)
        .bind(active)
        .bind(sort_order)
        .execute(&self.pool)
        .await?;

        self.category_by_slug(slug)
            .await?
            .ok_or_else(|| anyhow::anyhow!("category '{slug}' vanished after upsert"))
    }

    pub async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>, MarketplaceError> {
        let row = sqlx::query("SELECT * FROM categories WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        Ok(row.as_ref().map(row_to_category))
    }

    /// Active categories in display order.
    pub async fn list_categories(&self) -> Result<Vec<Category>, MarketplaceError> {
        let rows = sqlx::query(
            "SELECT * FROM categories WHERE active = 1 ORDER BY sort_order, name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        Ok(rows.iter().map(row_to_category).collect())
    }

    /// Insert or update a channel by handle. The id on `channel` is ignored.
    pub async fn upsert_channel(&self, channel: &Channel) -> anyhow::Result<Channel> {
        sqlx::query(
            r#"
            INSERT INTO channels (
                handle, title, active, mode, spam_filter, spam_filter_free_only,
                require_subscription, subscription_channel, footer_text, footer_link,
                pinned_message_id
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(handle) DO UPDATE SET
                title = excluded.title,
                active = excluded.active,
                mode = excluded.mode,
                spam_filter = excluded.spam_filter,
                spam_filter_free_only = excluded.spam_filter_free_only,
                require_subscription = excluded.require_subscription,
                subscription_channel = excluded.subscription_channel,
                footer_text = excluded.footer_text,
                footer_link = excluded.footer_link,
                pinned_message_id = excluded.pinned_message_id
            "#,
        )
        .bind(&channel.handle)
        .bind(&channel.title)
        .bind(channel.active)
        .bind(channel.mode.as_str())
        .bind(channel.spam_filter)
        .bind(channel.spam_filter_free_only)
        .bind(channel.require_subscription)
        .bind(&channel.subscription_channel)
        .bind(&channel.footer_text)
        .bind(&channel.footer_link)
        .bind(channel.pinned_message_id.map(|id| id as i64))
        .execute(&self.pool)
        .await?;

        let row = sqlx::query("SELECT * FROM channels WHERE handle = ?")
            .bind(&channel.handle)
            .fetch_one(&self.pool)
            .await?;
        Ok(row_to_channel(&row)?)
    }

    pub async fn set_link(
        &self,
        category_id: CategoryId,
        channel_id: ChannelId,
        enabled: bool,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO category_channels (category_id, channel_id, enabled)
            VALUES (?, ?, ?)
            ON CONFLICT(category_id, channel_id) DO UPDATE SET enabled = excluded.enabled
            "#,
        )
        .bind(category_id)
        .bind(channel_id)
        .bind(enabled)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_reviewer(&self, user_id: u64, reviewer: bool) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, reviewer, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET reviewer = excluded.reviewer
            "#,
        )
        .bind(user_id as i64)
        .bind(reviewer)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn ads_for_user(&self, user_id: u64) -> Result<Vec<Ad>, MarketplaceError> {
        let rows = sqlx::query("SELECT * FROM ads WHERE user_id = ? ORDER BY id DESC LIMIT 25")
            .bind(user_id as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

        rows.iter().map(row_to_ad).collect()
    }
}

// ============================================================================
// ROW MAPPING
// ============================================================================

fn row_to_category(row: &SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        parent_id: row.get("parent_id"),
        active: row.get("active"),
        sort_order: row.get("sort_order"),
    }
}

fn row_to_channel(row: &SqliteRow) -> Result<Channel, MarketplaceError> {
    let mode: String = row.get("mode");
    let pinned: Option<i64> = row.get("pinned_message_id");

    Ok(Channel {
        id: row.get("id"),
        handle: row.get("handle"),
        title: row.get("title"),
        active: row.get("active"),
        mode: mode
            .parse::<ModerationMode>()
            .map_err(MarketplaceError::StorageError)?,
        spam_filter: row.get("spam_filter"),
        spam_filter_free_only: row.get("spam_filter_free_only"),
        require_subscription: row.get("require_subscription"),
        subscription_channel: row.get("subscription_channel"),
        footer_text: row.get("footer_text"),
        footer_link: row.get("footer_link"),
        pinned_message_id: pinned.map(|id| id as u64),
    })
}

fn row_to_ad(row: &SqliteRow) -> Result<Ad, MarketplaceError> {
    let status: String = row.get("status");
    let user_id: i64 = row.get("user_id");
    let bump_count: i64 = row.get("bump_count");
    let created_at: String = row.get("created_at");

    Ok(Ad {
        id: row.get("id"),
        user_id: user_id as u64,
        category_id: row.get("category_id"),
        country: row.get("country"),
        city: row.get("city"),
        title: row.get("title"),
        body: row.get("body"),
        contacts: row.get("contacts"),
        paid: row.get("paid"),
        media_url: row.get("media_url"),
        status: status
            .parse::<AdStatus>()
            .map_err(MarketplaceError::StorageError)?,
        bump_count: bump_count as u32,
        created_at: parse_ts(&created_at),
    })
}

fn row_to_publication(row: &SqliteRow) -> AdPublication {
    let message_id: i64 = row.get("message_id");
    let published_at: String = row.get("published_at");

    AdPublication {
        id: row.get("id"),
        ad_id: row.get("ad_id"),
        channel_id: row.get("channel_id"),
        message_id: message_id as u64,
        link: row.get("link"),
        is_bump: row.get("is_bump"),
        published_at: parse_ts(&published_at),
    }
}

fn row_to_request(row: &SqliteRow) -> Result<ModerationRequest, MarketplaceError> {
    let status: String = row.get("status");
    let decided_by: Option<i64> = row.get("decided_by");
    let created_at: String = row.get("created_at");
    let decided_at: Option<String> = row.get("decided_at");

    Ok(ModerationRequest {
        id: row.get("id"),
        ad_id: row.get("ad_id"),
        channel_id: row.get("channel_id"),
        status: status
            .parse::<RequestStatus>()
            .map_err(MarketplaceError::StorageError)?,
        reject_reason: row.get("reject_reason"),
        decided_by: decided_by.map(|id| id as u64),
        created_at: parse_ts(&created_at),
        decided_at: decided_at.as_deref().map(parse_ts),
    })
}

fn row_to_user(row: &SqliteRow) -> User {
    let user_id: i64 = row.get("user_id");
    User {
        user_id: user_id as u64,
        display_name: row.get("display_name"),
        unlimited: row.get("unlimited"),
        bonus_balance: row.get("bonus_balance"),
        reviewer: row.get("reviewer"),
    }
}

// ============================================================================
// PORT IMPLEMENTATIONS
// ============================================================================

#[async_trait]
impl CatalogStore for SqliteMarketplaceStore {
    async fn get_category(
        &self,
        category_id: CategoryId,
    ) -> Result<Option<Category>, MarketplaceError> {
        let row = sqlx::query("SELECT * FROM categories WHERE id = ?")
            .bind(category_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        Ok(row.as_ref().map(row_to_category))
    }

    async fn get_channel(
        &self,
        channel_id: ChannelId,
    ) -> Result<Option<Channel>, MarketplaceError> {
        let row = sqlx::query("SELECT * FROM channels WHERE id = ?")
            .bind(channel_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        row.as_ref().map(row_to_channel).transpose()
    }

    async fn linked_channels(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<Channel>, MarketplaceError> {
        let rows = sqlx::query(
            r#"
            SELECT c.*
            FROM channels c
            JOIN category_channels cc ON cc.channel_id = c.id
            WHERE cc.category_id = ? AND cc.enabled = 1
            "#,
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        rows.iter().map(row_to_channel).collect()
    }
}

#[async_trait]
impl AdStore for SqliteMarketplaceStore {
    async fn get_ad(&self, ad_id: AdId) -> Result<Option<Ad>, MarketplaceError> {
        let row = sqlx::query("SELECT * FROM ads WHERE id = ?")
            .bind(ad_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        row.as_ref().map(row_to_ad).transpose()
    }

    async fn insert_ad(&self, ad: NewAd) -> Result<Ad, MarketplaceError> {
        let result = sqlx::query(
            r#"
            INSERT INTO ads (
                user_id, category_id, country, city, title, body, contacts,
                paid, media_url, status, bump_count, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(ad.user_id as i64)
        .bind(ad.category_id)
        .bind(&ad.country)
        .bind(&ad.city)
        .bind(&ad.title)
        .bind(&ad.body)
        .bind(&ad.contacts)
        .bind(ad.paid)
        .bind(&ad.media_url)
        .bind(AdStatus::Draft.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        let id = result.last_insert_rowid();
        self.get_ad(id).await?.ok_or_else(|| {
            MarketplaceError::StorageError(format!("ad {id} missing after insert"))
        })
    }

    async fn set_status(&self, ad_id: AdId, status: AdStatus) -> Result<(), MarketplaceError> {
        sqlx::query("UPDATE ads SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(ad_id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(())
    }

    async fn increment_bump(&self, ad_id: AdId) -> Result<u32, MarketplaceError> {
        sqlx::query("UPDATE ads SET bump_count = bump_count + 1 WHERE id = ?")
            .bind(ad_id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        let row = sqlx::query("SELECT bump_count FROM ads WHERE id = ?")
            .bind(ad_id)
            .fetch_one(&self.pool)
            .await
            .map_err(storage)?;

        let count: i64 = row.get("bump_count");
        Ok(count as u32)
    }

    async fn record_publication(
        &self,
        publication: NewPublication,
    ) -> Result<AdPublication, MarketplaceError> {
        let published_at = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO ad_publications (ad_id, channel_id, message_id, link, is_bump, published_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(publication.ad_id)
        .bind(publication.channel_id)
        .bind(publication.message_id as i64)
        .bind(&publication.link)
        .bind(publication.is_bump)
        .bind(published_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(AdPublication {
            id: result.last_insert_rowid(),
            ad_id: publication.ad_id,
            channel_id: publication.channel_id,
            message_id: publication.message_id,
            link: publication.link,
            is_bump: publication.is_bump,
            published_at,
        })
    }

    async fn publications_for_ad(
        &self,
        ad_id: AdId,
    ) -> Result<Vec<AdPublication>, MarketplaceError> {
        let rows = sqlx::query("SELECT * FROM ad_publications WHERE ad_id = ? ORDER BY id")
            .bind(ad_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

        Ok(rows.iter().map(row_to_publication).collect())
    }
}

#[async_trait]
impl ModerationStore for SqliteMarketplaceStore {
    async fn create_pending(
        &self,
        ad_id: AdId,
        channel_id: ChannelId,
    ) -> Result<Option<ModerationRequest>, MarketplaceError> {
        // The partial unique index turns a second Pending row into a no-op.
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO moderation_requests (ad_id, channel_id, status, created_at)
            VALUES (?, ?, 'pending', ?)
            "#,
        )
        .bind(ad_id)
        .bind(channel_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_request(result.last_insert_rowid()).await
    }

    async fn get_request(
        &self,
        request_id: RequestId,
    ) -> Result<Option<ModerationRequest>, MarketplaceError> {
        let row = sqlx::query("SELECT * FROM moderation_requests WHERE id = ?")
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        row.as_ref().map(row_to_request).transpose()
    }

    async fn decide(
        &self,
        request_id: RequestId,
        status: RequestStatus,
        decided_by: Option<u64>,
        reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<bool, MarketplaceError> {
        let result = sqlx::query(
            r#"
            UPDATE moderation_requests
            SET status = ?, decided_by = ?, reject_reason = ?, decided_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(status.as_str())
        .bind(decided_by.map(|id| id as i64))
        .bind(reason)
        .bind(at.to_rfc3339())
        .bind(request_id)
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(result.rows_affected() == 1)
    }

    async fn reopen(&self, request_id: RequestId) -> Result<bool, MarketplaceError> {
        let result = sqlx::query(
            r#"
            UPDATE moderation_requests
            SET status = 'pending', decided_by = NULL, reject_reason = NULL, decided_at = NULL
            WHERE id = ?
              AND status = 'approved'
              AND NOT EXISTS (
                  SELECT 1 FROM moderation_requests other
                  WHERE other.ad_id = moderation_requests.ad_id
                    AND other.channel_id = moderation_requests.channel_id
                    AND other.status = 'pending'
              )
            "#,
        )
        .bind(request_id)
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(result.rows_affected() == 1)
    }

    async fn requests_for_ad(
        &self,
        ad_id: AdId,
    ) -> Result<Vec<ModerationRequest>, MarketplaceError> {
        let rows = sqlx::query("SELECT * FROM moderation_requests WHERE ad_id = ? ORDER BY id")
            .bind(ad_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

        rows.iter().map(row_to_request).collect()
    }

    async fn pending_requests(
        &self,
        limit: u32,
    ) -> Result<Vec<ModerationRequest>, MarketplaceError> {
        let rows = sqlx::query(
            "SELECT * FROM moderation_requests WHERE status = 'pending' ORDER BY id LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        rows.iter().map(row_to_request).collect()
    }
}

#[async_trait]
impl QuotaStore for SqliteMarketplaceStore {
    async fn count_between(
        &self,
        user_id: u64,
        key: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<i64, MarketplaceError> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(count), 0) AS total
            FROM daily_counters
            WHERE user_id = ? AND key = ? AND day BETWEEN ? AND ?
            "#,
        )
        .bind(user_id as i64)
        .bind(key)
        .bind(from.format(DAY_FORMAT).to_string())
        .bind(to.format(DAY_FORMAT).to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(storage)?;

        Ok(row.get("total"))
    }

    async fn increment_counter(
        &self,
        user_id: u64,
        key: &str,
        day: NaiveDate,
    ) -> Result<(), MarketplaceError> {
        sqlx::query(
            r#"
            INSERT INTO daily_counters (user_id, day, key, count)
            VALUES (?, ?, ?, 1)
            ON CONFLICT(user_id, day, key) DO UPDATE SET count = count + 1
            "#,
        )
        .bind(user_id as i64)
        .bind(day.format(DAY_FORMAT).to_string())
        .bind(key)
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for SqliteMarketplaceStore {
    async fn get_user(&self, user_id: u64) -> Result<Option<User>, MarketplaceError> {
        let row = sqlx::query("SELECT * FROM users WHERE user_id = ?")
            .bind(user_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        Ok(row.as_ref().map(row_to_user))
    }

    async fn ensure_user(
        &self,
        user_id: u64,
        display_name: &str,
    ) -> Result<User, MarketplaceError> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, display_name, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET display_name = excluded.display_name
            "#,
        )
        .bind(user_id as i64)
        .bind(display_name)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        self.get_user(user_id).await?.ok_or_else(|| {
            MarketplaceError::StorageError(format!("user {user_id} missing after upsert"))
        })
    }

    async fn consume_bonus(&self, user_id: u64) -> Result<bool, MarketplaceError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET bonus_balance = bonus_balance - 1
            WHERE user_id = ? AND bonus_balance > 0
            "#,
        )
        .bind(user_id as i64)
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(result.rows_affected() == 1)
    }

    async fn active_reviewers(&self) -> Result<Vec<u64>, MarketplaceError> {
        let rows = sqlx::query("SELECT user_id FROM users WHERE reviewer = 1 ORDER BY user_id")
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

        Ok(rows
            .iter()
            .map(|row| row.get::<i64, _>("user_id") as u64)
            .collect())
    }
}
