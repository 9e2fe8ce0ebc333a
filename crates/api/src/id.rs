//! Types identifying items and the page-sized batches that fetch them.
//!
//! Data is fetched at the page level: any item id (collection id plus item
//! index) must be turned into a page id to fetch data. Two item ids in the
//! same collection whose indexes land in the same page derive equal
//! [PageId]s, which is what lets concurrent requests coalesce onto a single
//! page fetch.

use std::sync::{Arc, OnceLock};

macro_rules! imp_deref {
    ($i:ty, $t:ty) => {
        impl std::ops::Deref for $i {
            type Target = $t;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }
    };
}

macro_rules! imp_from {
    ($a:ty, $b:ty, $i:ident => $e:expr) => {
        impl From<$b> for $a {
            fn from($i: $b) -> Self {
                $e
            }
        }
    };
}

const DEFAULT_PAGE_SIZE: u32 = 8;

static PAGE_SIZE: OnceLock<u32> = OnceLock::new();

/// Get the process-wide page size.
///
/// Defaults to 8. Every [PageId] derivation in the process uses this one
/// value, so it is fixed the first time it is read.
pub fn page_size() -> u32 {
    *PAGE_SIZE.get_or_init(|| DEFAULT_PAGE_SIZE)
}

/// Set the process-wide page size for the duration of this process.
///
/// Must be called before any page id has been derived. If anything read the
/// page size earlier, the default will have been fixed and cannot be changed.
/// Returns false if the value was unable to be set.
///
/// A size of zero is a caller contract violation and panics.
pub fn set_global_page_size(size: u32) -> bool {
    if size == 0 {
        panic!("page size must be a positive constant");
    }
    PAGE_SIZE.set(size).is_ok()
}

/// Identifies one item collection (one scrollable band of tiles).
///
/// Cheap to clone, compared and hashed by content.
#[derive(
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(from = "String", into = "String")]
pub struct CollectionId(pub Arc<str>);

imp_deref!(CollectionId, str);
imp_from!(CollectionId, String, s => CollectionId(s.into()));
imp_from!(CollectionId, &str, s => CollectionId(s.into()));

impl From<CollectionId> for String {
    fn from(c: CollectionId) -> Self {
        c.0.to_string()
    }
}

impl std::fmt::Display for CollectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Debug for CollectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies a single item within a collection.
///
/// Created by the UI layer per visible or prefetchable tile, never mutated.
#[derive(
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct ItemId {
    /// The owning collection.
    pub collection: CollectionId,

    /// Zero-based index of the item within the collection.
    pub item_index: u32,
}

impl ItemId {
    /// Construct a new ItemId.
    pub fn new(collection: impl Into<CollectionId>, item_index: u32) -> Self {
        Self {
            collection: collection.into(),
            item_index,
        }
    }

    /// Derive the id of the page that fetches this item.
    pub fn page(&self) -> PageId {
        PageId::from_item(self)
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.collection, self.item_index)
    }
}

impl std::fmt::Debug for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.collection, self.item_index)
    }
}

/// Identifies one page-sized batch fetch.
///
/// Derived from an [ItemId] or an explicit page index, never constructed
/// from whole cloth. Task deduplication is keyed by this type.
#[derive(
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct PageId {
    /// The owning collection.
    pub collection: CollectionId,

    /// Zero-based index of the page within the collection.
    pub page_index: u32,
}

impl PageId {
    /// Construct a PageId from an explicit page index.
    pub fn new(collection: impl Into<CollectionId>, page_index: u32) -> Self {
        Self {
            collection: collection.into(),
            page_index,
        }
    }

    /// Derive the PageId owning the given item.
    pub fn from_item(item: &ItemId) -> Self {
        Self {
            collection: item.collection.clone(),
            page_index: item.item_index / page_size(),
        }
    }

    /// Index of the first item in this page.
    pub fn offset(&self) -> u32 {
        self.page_index * page_size()
    }

    /// Number of items fetched per page.
    pub fn limit(&self) -> u32 {
        page_size()
    }

    /// One past the index of the last item in this page.
    pub fn end(&self) -> u32 {
        self.offset() + self.limit()
    }

    /// The ids of every item in this page, in ascending index order.
    ///
    /// Always yields exactly [page_size] entries regardless of how many
    /// items were actually requested.
    pub fn item_ids(&self) -> Vec<ItemId> {
        (self.offset()..self.end())
            .map(|item_index| ItemId {
                collection: self.collection.clone(),
                item_index,
            })
            .collect()
    }
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@page{}", self.collection, self.page_index)
    }
}

impl std::fmt::Debug for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@page{}", self.collection, self.page_index)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn page_derivation_fixtures() {
        // default page size of 8
        let item = ItemId::new("carousel-a", 13);
        let page = item.page();
        assert_eq!(1, page.page_index);
        assert_eq!(8, page.offset());
        assert_eq!(8, page.limit());
        assert_eq!(16, page.end());

        let ids = page.item_ids();
        assert_eq!(8, ids.len());
        assert_eq!(
            (8..16).collect::<Vec<_>>(),
            ids.iter().map(|i| i.item_index).collect::<Vec<_>>(),
        );
        assert!(ids.contains(&item));
    }

    #[test]
    fn first_page_starts_at_zero() {
        let page = ItemId::new("c", 0).page();
        assert_eq!(0, page.page_index);
        assert_eq!(0, page.offset());
        assert_eq!(
            (0..8).collect::<Vec<_>>(),
            page.item_ids()
                .iter()
                .map(|i| i.item_index)
                .collect::<Vec<_>>(),
        );
    }

    #[test]
    fn same_page_coalesces() {
        let a = ItemId::new("c", 8).page();
        let b = ItemId::new("c", 15).page();
        assert_eq!(a, b);

        // next page and other collections differ
        assert_ne!(a, ItemId::new("c", 16).page());
        assert_ne!(a, ItemId::new("d", 8).page());
    }

    #[test]
    fn item_ids_always_full_width() {
        // page ids near u32 boundaries still produce a full page
        for index in [0, 7, 63, 1_000_000] {
            assert_eq!(
                page_size() as usize,
                ItemId::new("c", index).page().item_ids().len(),
            );
        }
    }

    #[test]
    fn id_serde_round_trip() {
        let item = ItemId::new("featured", 42);
        let enc = serde_json::to_string(&item).unwrap();
        assert_eq!(
            r#"{"collection":"featured","item_index":42}"#,
            enc.as_str()
        );
        let dec: ItemId = serde_json::from_str(&enc).unwrap();
        assert_eq!(item, dec);
    }

    #[test]
    fn display_fixtures() {
        assert_eq!("featured#3", ItemId::new("featured", 3).to_string());
        assert_eq!("featured@page2", PageId::new("featured", 2).to_string());
    }
}
