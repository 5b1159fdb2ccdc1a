//! Demo data: two accounts, default settings and 30 days of synthetic traffic

use anyhow::Result;
use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::info;

use crate::analytics::window::start_of_day;
use crate::auth::password::hash_password;
use crate::models::{NewPageView, NewSession, NewVisitor, Role};
use crate::storage::{Storage, StorageError};

pub const SEED_PASSWORD: &str = "password";
pub const VISITOR_COUNT: usize = 500;
pub const SEED_DAYS: i64 = 30;

const PAGE_VIEW_CHUNK: usize = 1000;

const COUNTRIES: &[&str] = &["US", "UK", "DE", "FR", "JP", "BR", "CA", "AU", "IN", "NL"];
const BROWSERS: &[&str] = &["Chrome", "Firefox", "Safari", "Edge"];
const DEVICES: &[(&str, f64)] = &[("desktop", 0.6), ("mobile", 0.3), ("tablet", 0.1)];
const PATHS: &[&str] = &[
    "/home",
    "/pricing",
    "/docs",
    "/blog",
    "/about",
    "/contact",
    "/features",
];
const REFERRERS: &[(Option<&str>, f64)] = &[
    (None, 0.4),
    (Some("google"), 0.25),
    (Some("twitter"), 0.1),
    (Some("github"), 0.1),
    (Some("linkedin"), 0.08),
    (Some("newsletter"), 0.07),
];

const USERS: &[(&str, &str, Role)] = &[
    ("Admin User", "admin@pulseboard.io", Role::Admin),
    ("Viewer User", "viewer@pulseboard.io", Role::Viewer),
];

const SETTINGS: &[(&str, &str)] = &[
    ("site_name", "PulseBoard Analytics"),
    ("maintenance_mode", "false"),
    ("max_users", "500"),
    ("theme", "light"),
    ("notification_email", "alerts@pulseboard.io"),
];

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedSummary {
    pub users_created: usize,
    pub settings: usize,
    pub visitors: usize,
    pub sessions: usize,
    pub page_views: usize,
}

/// Pick from `items` with probability proportional to its weight
fn weighted<'a, T, R: Rng>(rng: &mut R, items: &'a [(T, f64)]) -> &'a T {
    let total: f64 = items.iter().map(|(_, w)| w).sum();
    let mut remaining = rng.gen::<f64>() * total;
    for (item, weight) in items {
        remaining -= weight;
        if remaining <= 0.0 {
            return item;
        }
    }
    &items[items.len() - 1].0
}

fn pick<'a, R: Rng>(rng: &mut R, items: &'a [&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

fn operating_systems(device: &str) -> &'static [&'static str] {
    match device {
        "desktop" => &["Windows", "macOS", "Linux"],
        _ => &["iOS", "Android"],
    }
}

pub fn generate_visitors<R: Rng>(rng: &mut R, count: usize) -> Vec<NewVisitor> {
    (0..count)
        .map(|_| {
            let device = *weighted(rng, DEVICES);
            NewVisitor {
                country: pick(rng, COUNTRIES).to_string(),
                browser: pick(rng, BROWSERS).to_string(),
                device: device.to_string(),
                os: pick(rng, operating_systems(device)).to_string(),
            }
        })
        .collect()
}

/// Sessions for the last [`SEED_DAYS`] days: busier weekdays, about 1% growth per day
pub fn generate_sessions<R: Rng>(
    rng: &mut R,
    visitor_ids: &[i64],
    now: DateTime<Utc>,
) -> Vec<NewSession> {
    let mut sessions = Vec::new();
    if visitor_ids.is_empty() {
        return sessions;
    }

    for day_offset in (0..SEED_DAYS).rev() {
        let day = (now - Duration::days(day_offset)).date_naive();
        let day_start = start_of_day(day);
        let weekday = !matches!(day.weekday(), Weekday::Sat | Weekday::Sun);

        let growth = 1.0 + (SEED_DAYS - 1 - day_offset) as f64 * 0.01;
        let base = if weekday { 55.0 } else { 35.0 };
        let jitter = (rng.gen::<f64>() - 0.5) * 10.0;
        let count = (base * growth + jitter + 0.5).floor().max(0.0) as usize;

        for _ in 0..count {
            let visitor_id = visitor_ids[rng.gen_range(0..visitor_ids.len())];
            let started_at = day_start
                + Duration::hours(rng.gen_range(0..24))
                + Duration::minutes(rng.gen_range(0..60));
            let duration = rng.gen_range(30..1800);
            sessions.push(NewSession {
                visitor_id,
                started_at,
                ended_at: started_at + Duration::seconds(duration),
            });
        }
    }

    sessions
}

/// One to six page views per session; only the first one carries a referrer
pub fn generate_page_views<R: Rng>(
    rng: &mut R,
    sessions: &[(i64, NewSession)],
) -> Vec<NewPageView> {
    let mut page_views = Vec::new();

    for (session_id, session) in sessions {
        let view_count = rng.gen_range(1..=6);
        let duration_ms = (session.duration_secs() * 1000).max(1);
        for i in 0..view_count {
            let referrer = if i == 0 {
                let referrer: Option<&str> = *weighted(rng, REFERRERS);
                referrer.map(str::to_string)
            } else {
                None
            };
            page_views.push(NewPageView {
                session_id: *session_id,
                path: pick(rng, PATHS).to_string(),
                referrer,
                created_at: session.started_at
                    + Duration::milliseconds(rng.gen_range(0..duration_ms)),
            });
        }
    }

    page_views
}

/// Replace all traffic with fresh demo data and make sure the demo accounts exist
pub async fn seed<R: Rng>(
    storage: &dyn Storage,
    rng: &mut R,
    now: DateTime<Utc>,
) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    storage.clear_analytics().await?;

    let password_hash = hash_password(SEED_PASSWORD)?;
    let mut admin_id = None;
    for (name, email, role) in USERS {
        let user = match storage.create_user(name, email, &password_hash, *role).await {
            Ok(user) => {
                summary.users_created += 1;
                user
            }
            Err(StorageError::Conflict) => match storage.get_user_by_email(email).await? {
                Some(user) => user,
                None => continue,
            },
            Err(e) => return Err(e.into()),
        };
        if user.role.is_admin() && admin_id.is_none() {
            admin_id = Some(user.id);
        }
    }
    info!("Seeded {} new users", summary.users_created);

    for (key, value) in SETTINGS {
        storage.upsert_setting(key, value, admin_id).await?;
    }
    summary.settings = SETTINGS.len();

    let visitor_ids = storage
        .insert_visitors(&generate_visitors(rng, VISITOR_COUNT))
        .await?;
    summary.visitors = visitor_ids.len();
    info!("Created {} visitors", summary.visitors);

    let sessions = generate_sessions(rng, &visitor_ids, now);
    let session_ids = storage.insert_sessions(&sessions).await?;
    summary.sessions = session_ids.len();
    info!("Created {} sessions", summary.sessions);

    let with_ids: Vec<(i64, NewSession)> = session_ids.into_iter().zip(sessions).collect();
    let page_views = generate_page_views(rng, &with_ids);
    for chunk in page_views.chunks(PAGE_VIEW_CHUNK) {
        storage.insert_page_views(chunk).await?;
    }
    summary.page_views = page_views.len();
    info!("Created {} page views", summary.page_views);

    Ok(summary)
}
