use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::time::Instant;

use crate::store::{self, NewUser, UserRepository};

// ─── Constants ───────────────────────────────────────────────────

/// Creation times are spread over this many days before now.
const SPREAD_DAYS: i64 = 30;
/// Share of demo users that have no age on record.
const NO_AGE_RATIO: f64 = 0.1;

// ─── Name pools ──────────────────────────────────────────────────

static FIRST: &[&str] = &[
    "Emma",
    "Liam",
    "Olivia",
    "Noah",
    "Ava",
    "Ethan",
    "Sophia",
    "Mason",
    "Isabella",
    "William",
    "Mia",
    "James",
    "Charlotte",
    "Benjamin",
    "Amelia",
    "Lucas",
    "Harper",
    "Henry",
    "Evelyn",
    "Alexander",
];

static LAST: &[&str] = &[
    "Smith",
    "Johnson",
    "Williams",
    "Brown",
    "Jones",
    "Garcia",
    "Miller",
    "Davis",
    "Martinez",
    "Wilson",
    "Anderson",
    "Taylor",
    "Moore",
    "Jackson",
    "Lee",
    "Thompson",
    "White",
    "Harris",
    "Clark",
    "Lewis",
];

static DOMAINS: &[&str] = &[
    "gmail.com",
    "yahoo.com",
    "outlook.com",
    "company.com",
    "icloud.com",
];

// ─── Public entry point ──────────────────────────────────────────

/// Inserts `count` demo users. Same seed, same people; only the
/// timestamps move with the clock.
pub async fn seed(repo: &dyn UserRepository, count: usize) -> store::Result<usize> {
    if count == 0 {
        return Ok(0);
    }
    let start = Instant::now();
    tracing::info!(count, "seeding demo users");

    // Deterministic RNG so re-runs produce the same data.
    let mut rng = StdRng::seed_from_u64(42);
    let now = Utc::now();

    let mut inserted = 0;
    for i in 0..count {
        let (user, created_at) = demo_user(&mut rng, i, now);
        match repo.insert(user, created_at).await {
            Ok(_) => inserted += 1,
            // A persistent backend may already hold a previous run's users
            Err(store::StoreError::DuplicateEmail(email)) => {
                tracing::debug!(%email, "demo user already present");
            }
            Err(e) => return Err(e),
        }
    }

    tracing::info!(
        inserted,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "seed complete"
    );
    Ok(inserted)
}

fn demo_user(rng: &mut StdRng, index: usize, now: DateTime<Utc>) -> (NewUser, DateTime<Utc>) {
    let first = FIRST[rng.gen_range(0..FIRST.len())];
    let last = LAST[rng.gen_range(0..LAST.len())];
    let domain = DOMAINS[rng.gen_range(0..DOMAINS.len())];
    let email = format!(
        "{}.{}{}@{}",
        first.to_lowercase(),
        last.to_lowercase(),
        index + 1,
        domain,
    );
    let age = if rng.gen_bool(NO_AGE_RATIO) {
        None
    } else {
        Some(rng.gen_range(16..=75))
    };
    let age_of_record = rng.gen_range(0..SPREAD_DAYS * 24 * 60 * 60);

    let user = NewUser {
        first_name: first.to_owned(),
        last_name: last.to_owned(),
        email,
        age,
    };
    (user, now - Duration::seconds(age_of_record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryUserRepository;
    use crate::validation::UserValidator;

    #[tokio::test]
    async fn seeds_the_requested_number_of_valid_users() {
        let repo = InMemoryUserRepository::new();
        assert_eq!(seed(&repo, 25).await.unwrap(), 25);

        let users = repo.find_all().await.unwrap();
        assert_eq!(users.len(), 25);

        let now = Utc::now();
        let validator = UserValidator::new();
        for user in &users {
            assert!(user.created_at <= now);
            assert!(user.created_at > now - Duration::days(SPREAD_DAYS + 1));
            let candidate = NewUser {
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
                email: user.email.clone(),
                age: user.age,
            };
            let report = validator.validate_user(&candidate);
            assert!(report.valid, "{}: {:?}", user.email, report.errors);
        }
    }

    #[tokio::test]
    async fn same_seed_same_people() {
        let a = InMemoryUserRepository::new();
        let b = InMemoryUserRepository::new();
        seed(&a, 10).await.unwrap();
        seed(&b, 10).await.unwrap();

        let emails = |users: Vec<store::User>| {
            let mut e: Vec<String> = users.into_iter().map(|u| u.email).collect();
            e.sort();
            e
        };
        assert_eq!(
            emails(a.find_all().await.unwrap()),
            emails(b.find_all().await.unwrap())
        );
    }

    #[tokio::test]
    async fn reseeding_skips_existing_users() {
        let repo = InMemoryUserRepository::new();
        seed(&repo, 5).await.unwrap();
        assert_eq!(seed(&repo, 5).await.unwrap(), 0);
        assert_eq!(repo.count().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn zero_is_a_no_op() {
        let repo = InMemoryUserRepository::new();
        assert_eq!(seed(&repo, 0).await.unwrap(), 0);
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
