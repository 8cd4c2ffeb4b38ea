//! Posting list operations using Roaring bitmaps.

use roaring::RoaringBitmap;

/// Union posting lists (OR operation).
///
/// Returns an empty bitmap if there are no inputs.
pub fn union<'a, I>(lists: I) -> RoaringBitmap
where
    I: IntoIterator<Item = &'a RoaringBitmap>,
{
    let mut result = RoaringBitmap::new();
    for list in lists {
        result |= list;
    }
    result
}

/// Every document id below `count`.
pub fn all_documents(count: u32) -> RoaringBitmap {
    let mut result = RoaringBitmap::new();
    result.insert_range(0..count);
    result
}
