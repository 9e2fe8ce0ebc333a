//! The data produced for a single item by a page fetch.

use crate::*;

/// Data fetched for one item.
///
/// Created only as the output of a successfully completed, non-cancelled
/// page fetch, one per item in the page. Never mutated after creation;
/// shared read-only as `Arc<ItemData>` by the cache and every fan-out
/// delivery thereafter.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ItemData {
    /// The item this data belongs to.
    pub item: ItemId,

    /// The page fetch that produced this data.
    pub page: PageId,

    /// When the producing fetch started.
    pub fetch_started_at: Timestamp,

    /// When the producing fetch completed.
    pub fetch_completed_at: Timestamp,

    /// Opaque payload bytes.
    #[serde(with = "crate::serde_bytes_base64")]
    pub payload: bytes::Bytes,
}

impl ItemData {
    /// Placeholder data reports an end stamp earlier than its start stamp.
    ///
    /// Placeholders are what a caller shows before real data arrives; any
    /// data a caller constructs with an inverted stamp pair is recognized
    /// as one.
    pub fn is_placeholder(&self) -> bool {
        self.fetch_completed_at < self.fetch_started_at
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn placeholder_detection() {
        let p = ItemData {
            item: ItemId::new("c", 3),
            page: ItemId::new("c", 3).page(),
            fetch_started_at: Timestamp::from_micros(i64::MAX),
            fetch_completed_at: Timestamp::from_micros(0),
            payload: bytes::Bytes::new(),
        };
        assert!(p.is_placeholder());

        let start = Timestamp::now();
        let real = ItemData {
            item: ItemId::new("c", 3),
            page: ItemId::new("c", 3).page(),
            fetch_started_at: start,
            fetch_completed_at: start
                + std::time::Duration::from_millis(250),
            payload: bytes::Bytes::from_static(b"tile"),
        };
        assert!(!real.is_placeholder());
    }

    #[test]
    fn data_serde_round_trip() {
        let start = Timestamp::from_micros(1_000);
        let data = ItemData {
            item: ItemId::new("c", 9),
            page: ItemId::new("c", 9).page(),
            fetch_started_at: start,
            fetch_completed_at: start
                + std::time::Duration::from_millis(10),
            payload: bytes::Bytes::from_static(b"payload"),
        };
        let enc = serde_json::to_string(&data).unwrap();
        let dec: ItemData = serde_json::from_str(&enc).unwrap();
        assert_eq!(data, dec);
    }
}
