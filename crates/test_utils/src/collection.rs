//! Test tools associated with tilefetch collections.

use tilefetch_api::ItemId;

/// A test collection id.
pub const TEST_COLLECTION: &str = "test_collection";

/// An item id within the test collection.
pub fn test_item(item_index: u32) -> ItemId {
    ItemId::new(TEST_COLLECTION, item_index)
}
