use std::cmp::Ordering;

use serde::Deserialize;

use super::User;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 100;

// ─── Filter ──────────────────────────────────────────────────────

/// Optional search criteria. Absent fields match everything.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFilter {
    /// Case-insensitive substring of the first name
    pub first_name: Option<String>,
    /// Case-insensitive substring of the last name
    pub last_name: Option<String>,
    /// Inclusive lower age bound
    pub min_age: Option<i32>,
    /// Inclusive upper age bound
    pub max_age: Option<i32>,
    /// Case-insensitive substring of the email, e.g. `gmail.com`
    pub email_domain: Option<String>,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        contains_ci(&user.first_name, self.first_name.as_deref())
            && contains_ci(&user.last_name, self.last_name.as_deref())
            && contains_ci(&user.email, self.email_domain.as_deref())
            && age_within(user.age, self.min_age, self.max_age)
    }
}

fn contains_ci(haystack: &str, needle: Option<&str>) -> bool {
    match needle.map(str::trim) {
        None | Some("") => true,
        Some(needle) => haystack.to_lowercase().contains(&needle.to_lowercase()),
    }
}

fn age_within(age: Option<i32>, min: Option<i32>, max: Option<i32>) -> bool {
    if min.is_none() && max.is_none() {
        return true;
    }
    // Users without an age never satisfy an age bound
    let Some(age) = age else {
        return false;
    };
    min.map_or(true, |min| age >= min) && max.map_or(true, |max| age <= max)
}

// ─── Sorting ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    Id,
    FirstName,
    LastName,
    Email,
    Age,
    #[default]
    CreatedAt,
}

impl SortField {
    /// Unknown names fall back to `createdAt`.
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "id" => Self::Id,
            "firstname" | "first_name" => Self::FirstName,
            "lastname" | "last_name" => Self::LastName,
            "email" => Self::Email,
            "age" => Self::Age,
            _ => Self::CreatedAt,
        }
    }

    fn compare(self, a: &User, b: &User) -> Ordering {
        match self {
            Self::Id => a.id.cmp(&b.id),
            Self::FirstName => a.first_name.cmp(&b.first_name),
            Self::LastName => a.last_name.cmp(&b.last_name),
            Self::Email => a.email.cmp(&b.email),
            Self::Age => a.age.cmp(&b.age),
            Self::CreatedAt => a.created_at.cmp(&b.created_at),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn parse(name: &str) -> Self {
        if name.eq_ignore_ascii_case("asc") {
            Self::Asc
        } else {
            Self::Desc
        }
    }
}

// ─── Paging ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub size: usize,
    pub sort_by: SortField,
    pub direction: SortDirection,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            sort_by: SortField::default(),
            direction: SortDirection::default(),
        }
    }
}

impl PageRequest {
    /// Builds a request from raw query values, clamping out-of-range
    /// numbers instead of rejecting them.
    pub fn from_raw(
        page: Option<i64>,
        size: Option<i64>,
        sort_by: Option<&str>,
        direction: Option<&str>,
    ) -> Self {
        let page = page.unwrap_or(0).max(0) as usize;
        let size = match size {
            None => DEFAULT_PAGE_SIZE,
            Some(s) if s < 1 => DEFAULT_PAGE_SIZE,
            Some(s) => (s as usize).min(MAX_PAGE_SIZE),
        };
        Self {
            page,
            size,
            sort_by: sort_by.map(SortField::parse).unwrap_or_default(),
            direction: direction.map(SortDirection::parse).unwrap_or_default(),
        }
    }
}

/// One page of results plus the totals needed to navigate.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: usize,
    pub size: usize,
    pub total_elements: usize,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> usize {
        if self.size == 0 {
            return 0;
        }
        self.total_elements.div_ceil(self.size)
    }

    pub fn has_next(&self) -> bool {
        self.page + 1 < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.page > 0
    }
}

/// Filter, sort and slice `users` into the requested page.
pub fn paginate(mut users: Vec<User>, filter: &UserFilter, request: &PageRequest) -> Page<User> {
    users.retain(|u| filter.matches(u));
    users.sort_by(|a, b| {
        let ord = request.sort_by.compare(a, b).then(a.id.cmp(&b.id));
        match request.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });

    let total_elements = users.len();
    let content = users
        .into_iter()
        .skip(request.page.saturating_mul(request.size))
        .take(request.size)
        .collect();

    Page {
        content,
        page: request.page,
        size: request.size,
        total_elements,
    }
}
