use chrono::{Local, NaiveDate, NaiveDateTime};

/// Local wall-clock source. Injected so check-in rules can be driven by tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

#[cfg(test)]
pub use fixed::FixedClock;

#[cfg(test)]
mod fixed {
    use super::Clock;
    use chrono::NaiveDateTime;
    use std::sync::Mutex;

    /// Clock pinned to a settable instant.
    pub struct FixedClock(Mutex<NaiveDateTime>);

    impl FixedClock {
        /// Parses `YYYY-MM-DD HH:MM`.
        pub fn at(s: &str) -> Self {
            Self(Mutex::new(parse(s)))
        }

        pub fn set(&self, s: &str) {
            *self.0.lock().unwrap() = parse(s);
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> NaiveDateTime {
            *self.0.lock().unwrap()
        }
    }

    pub fn parse(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }
}
