use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use sqlplay_types::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Number of arguments a toolkit function accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    fn accepts(&self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == *n,
            Arity::AtLeast(n) => count >= *n,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FunctionSpec {
    pub name: &'static str,
    pub arity: Arity,
    pub summary: &'static str,
}

/// Every function scripts can call as `$name(...)`.
pub const FUNCTIONS: &[FunctionSpec] = &[
    FunctionSpec { name: "uuid", arity: Arity::Exact(0), summary: "random version 4 UUID" },
    FunctionSpec { name: "name", arity: Arity::Exact(0), summary: "full name" },
    FunctionSpec { name: "first_name", arity: Arity::Exact(0), summary: "first name" },
    FunctionSpec { name: "last_name", arity: Arity::Exact(0), summary: "last name" },
    FunctionSpec { name: "email", arity: Arity::Exact(0), summary: "unique email address" },
    FunctionSpec { name: "word", arity: Arity::Exact(0), summary: "one lowercase word" },
    FunctionSpec { name: "sentence", arity: Arity::Exact(0), summary: "short sentence" },
    FunctionSpec { name: "int", arity: Arity::Exact(2), summary: "integer in [min, max]" },
    FunctionSpec { name: "real", arity: Arity::Exact(2), summary: "real number in [min, max)" },
    FunctionSpec { name: "bool", arity: Arity::Exact(0), summary: "true or false" },
    FunctionSpec { name: "date", arity: Arity::Exact(0), summary: "date within the last year" },
    FunctionSpec { name: "timestamp", arity: Arity::Exact(0), summary: "timestamp within the last year" },
    FunctionSpec { name: "pick", arity: Arity::AtLeast(1), summary: "one of the arguments" },
];

const FIRST_NAMES: &[&str] = &[
    "Ada", "Alan", "Barbara", "Dennis", "Edsger", "Frances", "Grace", "Guido", "John", "Ken",
    "Linus", "Margaret", "Niklaus", "Radia", "Shafi", "Tim",
];

const LAST_NAMES: &[&str] = &[
    "Allen", "Backus", "Hamilton", "Hopper", "Kernighan", "Knuth", "Lamport", "Liskov",
    "Lovelace", "McCarthy", "Perlman", "Ritchie", "Thompson", "Torvalds", "Turing", "Wirth",
];

const WORDS: &[&str] = &[
    "amber", "anchor", "binary", "bright", "canvas", "cedar", "cluster", "delta", "ember",
    "fabric", "forest", "harbor", "index", "lantern", "matrix", "meadow", "orbit", "pebble",
    "quartz", "river", "schema", "signal", "summit", "thread", "vector", "willow",
];

/// Fake-data generator shared by every file of a run. Seeded toolkits
/// produce the same values in the same order.
#[derive(Debug)]
pub struct Toolkit {
    rng: Mutex<SmallRng>,
    sequence: AtomicU64,
    reference: DateTime<Utc>,
}

impl Default for Toolkit {
    fn default() -> Self {
        Self::from_rng(SmallRng::from_entropy())
    }
}

impl Toolkit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same seed, same values.
    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(SmallRng::seed_from_u64(seed))
    }

    fn from_rng(rng: SmallRng) -> Self {
        Self {
            rng: Mutex::new(rng),
            sequence: AtomicU64::new(1),
            reference: Utc::now(),
        }
    }

    /// Anchors `$date()` and `$timestamp()` to a fixed point in time.
    pub fn with_reference(mut self, reference: DateTime<Utc>) -> Self {
        self.reference = reference;
        self
    }

    pub fn spec(name: &str) -> Option<&'static FunctionSpec> {
        FUNCTIONS.iter().find(|f| f.name == name)
    }

    /// Calls `$name(args)`.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, String> {
        let spec = Self::spec(name).ok_or_else(|| format!("unknown toolkit function `${}`", name))?;
        if !spec.arity.accepts(args.len()) {
            let expected = match spec.arity {
                Arity::Exact(n) => format!("{}", n),
                Arity::AtLeast(n) => format!("at least {}", n),
            };
            return Err(format!(
                "`${}` takes {} argument(s), got {}",
                name,
                expected,
                args.len()
            ));
        }

        let mut rng = self.rng();
        let value = match name {
            "uuid" => {
                let bytes: [u8; 16] = rng.r#gen();
                Value::Text(uuid::Builder::from_random_bytes(bytes).into_uuid().to_string())
            }
            "name" => {
                let first = pick_str(&mut rng, FIRST_NAMES);
                let last = pick_str(&mut rng, LAST_NAMES);
                Value::Text(format!("{} {}", first, last))
            }
            "first_name" => Value::from(pick_str(&mut rng, FIRST_NAMES)),
            "last_name" => Value::from(pick_str(&mut rng, LAST_NAMES)),
            "email" => {
                let first = pick_str(&mut rng, FIRST_NAMES).to_ascii_lowercase();
                let last = pick_str(&mut rng, LAST_NAMES).to_ascii_lowercase();
                let n = self.sequence.fetch_add(1, Ordering::Relaxed);
                Value::Text(format!("{}.{}{}@example.com", first, last, n))
            }
            "word" => Value::from(pick_str(&mut rng, WORDS)),
            "sentence" => {
                let len = rng.gen_range(4..=8);
                let words: Vec<&str> = (0..len).map(|_| pick_str(&mut rng, WORDS)).collect();
                let mut sentence = words.join(" ");
                if let Some(first) = sentence.get_mut(0..1) {
                    first.make_ascii_uppercase();
                }
                sentence.push('.');
                Value::Text(sentence)
            }
            "int" => {
                let (min, max) = (int_arg(&args[0], name)?, int_arg(&args[1], name)?);
                if min > max {
                    return Err(format!("`$int` range is empty: {} > {}", min, max));
                }
                Value::Integer(rng.gen_range(min..=max))
            }
            "real" => {
                let (min, max) = (real_arg(&args[0], name)?, real_arg(&args[1], name)?);
                if min >= max {
                    return Err(format!("`$real` range is empty: {} >= {}", min, max));
                }
                if !(max - min).is_finite() {
                    return Err(format!("`$real` range is too wide: {} to {}", min, max));
                }
                Value::Real(rng.gen_range(min..max))
            }
            "bool" => Value::Bool(rng.gen_bool(0.5)),
            "date" => {
                let days = rng.gen_range(0..365);
                let date = self.reference.date_naive() - Duration::days(days);
                Value::Text(date.format("%Y-%m-%d").to_string())
            }
            "timestamp" => {
                let seconds = rng.gen_range(0..365 * 24 * 60 * 60);
                let at = self.reference - Duration::seconds(seconds);
                Value::Text(at.to_rfc3339_opts(SecondsFormat::Secs, true))
            }
            "pick" => args.choose(&mut *rng).cloned().unwrap_or_default(),
            _ => return Err(format!("unknown toolkit function `${}`", name)),
        };
        Ok(value)
    }

    /// Suspends the run for `ms` milliseconds.
    pub fn delay(&self, ms: u64) {
        if ms > 0 {
            std::thread::sleep(std::time::Duration::from_millis(ms));
        }
    }

    fn rng(&self) -> MutexGuard<'_, SmallRng> {
        self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn pick_str(rng: &mut SmallRng, items: &[&'static str]) -> &'static str {
    items.choose(rng).copied().unwrap_or_default()
}

fn int_arg(value: &Value, function: &str) -> Result<i64, String> {
    value
        .as_i64()
        .ok_or_else(|| format!("`${}` expects integers, got {}", function, value.type_name()))
}

fn real_arg(value: &Value, function: &str) -> Result<f64, String> {
    match value {
        Value::Integer(n) => Ok(*n as f64),
        Value::Real(r) if r.is_finite() => Ok(*r),
        Value::Real(r) => Err(format!("`${}` expects finite numbers, got {}", function, r)),
        other => Err(format!("`${}` expects numbers, got {}", function, other.type_name())),
    }
}
