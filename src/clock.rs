use chrono::{DateTime, FixedOffset, Local};

/// Source of "now" for attendance stamps, in the server's local offset.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

#[cfg(test)]
pub use fixed::FixedClock;

#[cfg(test)]
mod fixed {
    use super::Clock;
    use chrono::{DateTime, Duration, FixedOffset};
    use std::sync::Mutex;

    pub struct FixedClock(Mutex<DateTime<FixedOffset>>);

    impl FixedClock {
        pub fn at(rfc3339: &str) -> Self {
            Self(Mutex::new(
                DateTime::parse_from_rfc3339(rfc3339).expect("valid RFC 3339 timestamp"),
            ))
        }

        pub fn advance(&self, by: Duration) {
            let mut now = self.0.lock().unwrap();
            *now = *now + by;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<FixedOffset> {
            *self.0.lock().unwrap()
        }
    }
}
