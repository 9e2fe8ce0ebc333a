/// Tilefetch timestamp.
///
/// Internally i64 microseconds from unix epoch. Item data carries the start
/// and end stamp of the fetch that produced it, and placeholder detection
/// only needs ordering, so nothing heavier than this is required.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Construct a new timestamp of "now".
    pub fn now() -> Self {
        std::time::SystemTime::now().into()
    }

    /// Construct a timestamp from i64 microseconds since unix epoch.
    pub fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    /// Get the i64 microseconds since unix epoch.
    pub fn as_micros(&self) -> i64 {
        self.0
    }

    /// The duration elapsed from `earlier` to this timestamp,
    /// or None if `earlier` is actually later.
    pub fn checked_since(
        &self,
        earlier: Timestamp,
    ) -> Option<std::time::Duration> {
        if self.0 < earlier.0 {
            None
        } else {
            Some(std::time::Duration::from_micros((self.0 - earlier.0) as u64))
        }
    }
}

impl std::ops::Add<std::time::Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: std::time::Duration) -> Self::Output {
        Timestamp(self.0 + rhs.as_micros() as i64)
    }
}

impl std::ops::AddAssign<std::time::Duration> for Timestamp {
    fn add_assign(&mut self, rhs: std::time::Duration) {
        self.0 += rhs.as_micros() as i64;
    }
}

impl From<std::time::SystemTime> for Timestamp {
    fn from(t: std::time::SystemTime) -> Self {
        Self(
            t.duration_since(std::time::SystemTime::UNIX_EPOCH)
                .expect("invalid system time")
                .as_micros() as i64,
        )
    }
}

impl From<Timestamp> for std::time::SystemTime {
    fn from(t: Timestamp) -> Self {
        std::time::SystemTime::UNIX_EPOCH
            + std::time::Duration::from_micros(t.0 as u64)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    #[test]
    fn add_and_since() {
        let a = Timestamp::from_micros(1_000);
        let b = a + Duration::from_micros(500);
        assert_eq!(1_500, b.as_micros());
        assert_eq!(Some(Duration::from_micros(500)), b.checked_since(a));
        assert_eq!(None, a.checked_since(b));
    }

    #[test]
    fn now_is_ordered() {
        let a = Timestamp::now();
        let b = a + Duration::from_secs(1);
        assert!(a < b);
    }
}
