use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::User;

/// Domains broken out in the demographics report.
const TRACKED_DOMAINS: [&str; 3] = ["gmail.com", "yahoo.com", "outlook.com"];

// ─── Demographics ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummaryReport {
    pub total_users: usize,
    /// Rounded to two decimals; absent when no user has an age
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_age: Option<f64>,
    pub users_under_25: usize,
    pub users_25_to_35: usize,
    pub users_36_to_50: usize,
    pub users_over_50: usize,
    pub users_registered_today: usize,
    pub users_registered_this_week: usize,
    pub top_email_domains: Vec<DomainCount>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainCount {
    pub domain: &'static str,
    pub count: usize,
}

/// Quick numbers for the `/stats` endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_users: usize,
    pub average_age: f64,
    pub users_over_18: usize,
    pub timestamp: DateTime<Utc>,
}

// ─── Growth ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthReport {
    pub registrations_today: usize,
    pub registrations_yesterday: usize,
    pub daily_growth_change: i64,
    pub registrations_this_week: usize,
    pub registrations_this_month: usize,
    pub generated_at: DateTime<Utc>,
}

// ─── Builders ────────────────────────────────────────────────────

pub fn summary(users: &[User], now: DateTime<Utc>) -> UserSummaryReport {
    let ages: Vec<i32> = users.iter().filter_map(|u| u.age).collect();
    let average_age = (!ages.is_empty()).then(|| {
        let mean = ages.iter().map(|&a| a as f64).sum::<f64>() / ages.len() as f64;
        (mean * 100.0).round() / 100.0
    });
    let in_range = |lo: i32, hi: i32| ages.iter().filter(|&&a| a >= lo && a <= hi).count();

    let today = start_of_day(now);

    UserSummaryReport {
        total_users: users.len(),
        average_age,
        users_under_25: in_range(0, 24),
        users_25_to_35: in_range(25, 35),
        users_36_to_50: in_range(36, 50),
        users_over_50: in_range(51, 150),
        users_registered_today: created_between(users, today, today + Duration::days(1)),
        users_registered_this_week: created_since(users, now - Duration::days(7)),
        top_email_domains: TRACKED_DOMAINS
            .iter()
            .map(|&domain| {
                let suffix = format!("@{domain}");
                DomainCount {
                    domain,
                    count: users
                        .iter()
                        .filter(|u| u.email.to_lowercase().ends_with(&suffix))
                        .count(),
                }
            })
            .collect(),
        generated_at: now,
    }
}

pub fn growth(users: &[User], now: DateTime<Utc>) -> GrowthReport {
    let today = start_of_day(now);
    let yesterday = today - Duration::days(1);

    let registrations_today = created_between(users, today, today + Duration::days(1));
    let registrations_yesterday = created_between(users, yesterday, today);

    GrowthReport {
        registrations_today,
        registrations_yesterday,
        daily_growth_change: registrations_today as i64 - registrations_yesterday as i64,
        registrations_this_week: created_since(users, now - Duration::days(7)),
        registrations_this_month: created_since(users, now - Duration::days(30)),
        generated_at: now,
    }
}

pub fn stats(users: &[User], now: DateTime<Utc>) -> UserStats {
    let ages: Vec<i32> = users.iter().filter_map(|u| u.age).collect();
    let average_age = if ages.is_empty() {
        0.0
    } else {
        ages.iter().map(|&a| a as f64).sum::<f64>() / ages.len() as f64
    };

    UserStats {
        total_users: users.len(),
        average_age,
        users_over_18: ages.iter().filter(|&&a| a >= 18).count(),
        timestamp: now,
    }
}

fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now)
}

fn created_between(users: &[User], from: DateTime<Utc>, to: DateTime<Utc>) -> usize {
    users
        .iter()
        .filter(|u| u.created_at >= from && u.created_at < to)
        .count()
}

fn created_since(users: &[User], from: DateTime<Utc>) -> usize {
    users.iter().filter(|u| u.created_at >= from).count()
}
