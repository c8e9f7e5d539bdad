use crate::error::AuthError;
use actix_web::http::Method;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Endpoint class used to select rate-limit thresholds. Limits are static
/// and immutable after process start; unknown paths fall back to `Default`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Login,
    Registration,
    ProfileRead,
    ProfileWrite,
    ListAffairs,
    CreateAffair,
    ModifyAffair,
    GetAffair,
    ListDocuments,
    ContactForm,
    DiscountForm,
    Default,
}

impl Category {
    pub const COUNT: usize = 12;

    pub const ALL: [Category; Self::COUNT] = [
        Category::Login,
        Category::Registration,
        Category::ProfileRead,
        Category::ProfileWrite,
        Category::ListAffairs,
        Category::CreateAffair,
        Category::ModifyAffair,
        Category::GetAffair,
        Category::ListDocuments,
        Category::ContactForm,
        Category::DiscountForm,
        Category::Default,
    ];

    /// (limit, interval) for the category.
    pub fn limit(self) -> (u32, Duration) {
        match self {
            Category::Login => (2, Duration::minutes(1)),
            Category::Registration => (2, Duration::minutes(5)),
            Category::ProfileRead => (30, Duration::minutes(5)),
            Category::ProfileWrite => (5, Duration::minutes(5)),
            Category::ListAffairs => (60, Duration::minutes(1)),
            Category::CreateAffair => (20, Duration::minutes(1)),
            Category::ModifyAffair => (20, Duration::minutes(1)),
            Category::GetAffair => (60, Duration::minutes(1)),
            Category::ListDocuments => (30, Duration::minutes(1)),
            Category::ContactForm => (5, Duration::minutes(5)),
            Category::DiscountForm => (3, Duration::minutes(60)),
            Category::Default => (60, Duration::minutes(1)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Category::Login => "login",
            Category::Registration => "registration",
            Category::ProfileRead => "profile-read",
            Category::ProfileWrite => "profile-write",
            Category::ListAffairs => "list-affairs",
            Category::CreateAffair => "create-affair",
            Category::ModifyAffair => "modify-affair",
            Category::GetAffair => "get-affair",
            Category::ListDocuments => "list-documents",
            Category::ContactForm => "contact-form",
            Category::DiscountForm => "discount-form",
            Category::Default => "default",
        }
    }

    /// Map an inbound request to its category.
    pub fn resolve(method: &Method, path: &str) -> Category {
        match path {
            "/api/login" => Category::Login,
            "/api/register" => Category::Registration,
            "/api/contact" => Category::ContactForm,
            "/api/discount" => Category::DiscountForm,
            "/api/profile" => {
                if *method == Method::GET {
                    Category::ProfileRead
                } else {
                    Category::ProfileWrite
                }
            }
            "/api/affairs" => {
                if *method == Method::GET {
                    Category::ListAffairs
                } else {
                    Category::CreateAffair
                }
            }
            "/api/documents" => Category::ListDocuments,
            _ if path.starts_with("/api/affairs/") => {
                if *method == Method::GET {
                    Category::GetAffair
                } else {
                    Category::ModifyAffair
                }
            }
            _ if path.starts_with("/api/documents/") => Category::ListDocuments,
            _ => Category::Default,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Current-time provider, injectable so window expiry is testable without
/// sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug)]
struct Window {
    count: u32,
    window_start: DateTime<Utc>,
    last_seen: DateTime<Utc>,
}

impl Window {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            window_start: now,
            last_seen: now,
        }
    }
}

/// Fixed-window request counter keyed by (category, identity).
///
/// One mutex-guarded map per category, so checks for different categories
/// never contend and the increment-compare on a given key is atomic under
/// its category lock. Each map tracks at most `max_identities` distinct
/// identities; at the cap the least-recently-active entry is evicted, which
/// bounds memory against high-cardinality or spoofed-address traffic.
///
/// Fixed windows tolerate a burst of up to twice the limit straddling a
/// window boundary. That leniency is accepted: the limits blunt abuse, they
/// are not a fairness guarantee.
pub struct RateLimiter {
    shards: [Mutex<HashMap<String, Window>>; Category::COUNT],
    max_identities: usize,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(max_identities: usize) -> Self {
        Self::with_clock(max_identities, Arc::new(SystemClock))
    }

    pub fn with_clock(max_identities: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            shards: std::array::from_fn(|_| Mutex::new(HashMap::new())),
            max_identities,
            clock,
        }
    }

    /// Count one request for (category, identity) and decide whether it may
    /// proceed. A rejected attempt keeps its increment: hammering a limited
    /// endpoint does not shorten the wait.
    pub fn check(&self, category: Category, identity: &str) -> Result<(), AuthError> {
        let now = self.clock.now();
        let (limit, interval) = category.limit();

        let mut windows = self.shards[category.index()]
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if windows.len() >= self.max_identities && !windows.contains_key(identity) {
            Self::evict_stalest(&mut windows);
        }

        let window = windows
            .entry(identity.to_string())
            .or_insert_with(|| Window::new(now));

        if now - window.window_start >= interval {
            window.count = 0;
            window.window_start = now;
        }

        window.count += 1;
        window.last_seen = now;

        if window.count > limit {
            return Err(AuthError::RateLimited);
        }
        Ok(())
    }

    fn evict_stalest(windows: &mut HashMap<String, Window>) {
        let stalest = windows
            .iter()
            .min_by_key(|(_, w)| w.last_seen)
            .map(|(identity, _)| identity.clone());
        if let Some(identity) = stalest {
            windows.remove(&identity);
        }
    }
}
