//! Sequential identifier allocation.
//!
//! Every entity class (tag definitions, field definitions, items, field
//! instances) owns its own [`UidAllocator`]. The classes start at different
//! offsets so that ids are easy to tell apart when reading a dump, but nothing
//! relies on the ranges being disjoint: uniqueness is only enforced within a
//! class.
//!
//! Allocators are plain values owned by the table or store that mints ids.
//! Dropping the store drops its allocators, so loading a second database
//! always starts from a clean slate.

use crate::error::{PwdbError, Result};
use std::collections::HashSet;

/// Identifier type shared by all entity classes.
pub type Uid = u64;

pub const FIRST_TAG_UID: Uid = 10;
pub const FIRST_FIELD_DEF_UID: Uid = 100;
pub const FIRST_ITEM_UID: Uid = 1000;
pub const FIRST_FIELD_UID: Uid = 5000;

#[derive(Debug, Clone)]
pub struct UidAllocator {
    next: Uid,
    issued: HashSet<Uid>,
}

impl UidAllocator {
    pub fn new(first: Uid) -> Self {
        Self {
            next: first,
            issued: HashSet::new(),
        }
    }

    /// Returns the current counter value and advances it.
    pub fn next(&mut self) -> Result<Uid> {
        let uid = self.next;
        if self.issued.contains(&uid) {
            return Err(PwdbError::DuplicateIdentifier(uid));
        }
        let following = uid.checked_add(1).ok_or(PwdbError::UidOverflow(uid))?;
        self.issued.insert(uid);
        self.next = following;
        Ok(uid)
    }

    /// Records an id that was minted elsewhere (e.g. read from disk).
    ///
    /// The counter is raised past `uid` so that [`next`](Self::next) never
    /// hands it out again.
    pub fn register(&mut self, uid: Uid) -> Result<()> {
        if self.issued.contains(&uid) {
            return Err(PwdbError::DuplicateIdentifier(uid));
        }
        let following = uid.checked_add(1).ok_or(PwdbError::UidOverflow(uid))?;
        self.issued.insert(uid);
        self.next = self.next.max(following);
        Ok(())
    }

    pub fn is_issued(&self, uid: Uid) -> bool {
        self.issued.contains(&uid)
    }

    pub fn peek(&self) -> Uid {
        self.next
    }

    pub fn clear(&mut self) {
        self.next = 0;
        self.issued.clear();
    }

    pub fn reset(&mut self, value: Uid) {
        self.next = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_is_sequential_from_offset() {
        let mut alloc = UidAllocator::new(FIRST_ITEM_UID);
        assert_eq!(alloc.next().unwrap(), 1000);
        assert_eq!(alloc.next().unwrap(), 1001);
        assert_eq!(alloc.peek(), 1002);
    }

    #[test]
    fn register_raises_high_water_mark() {
        let mut alloc = UidAllocator::new(FIRST_TAG_UID);
        alloc.register(42).unwrap();
        assert_eq!(alloc.next().unwrap(), 43);
    }

    #[test]
    fn register_below_counter_keeps_counter() {
        let mut alloc = UidAllocator::new(FIRST_FIELD_UID);
        alloc.next().unwrap();
        alloc.register(7).unwrap();
        assert_eq!(alloc.next().unwrap(), 5001);
    }

    #[test]
    fn duplicate_register_fails() {
        let mut alloc = UidAllocator::new(0);
        alloc.register(5).unwrap();
        assert!(matches!(
            alloc.register(5),
            Err(PwdbError::DuplicateIdentifier(5))
        ));
    }

    #[test]
    fn largest_uid_is_rejected_without_side_effects() {
        let mut alloc = UidAllocator::new(FIRST_TAG_UID);
        assert!(matches!(
            alloc.register(Uid::MAX),
            Err(PwdbError::UidOverflow(Uid::MAX))
        ));
        assert!(!alloc.is_issued(Uid::MAX));
        assert_eq!(alloc.peek(), FIRST_TAG_UID);

        alloc.reset(Uid::MAX);
        assert!(matches!(alloc.next(), Err(PwdbError::UidOverflow(_))));
        assert!(!alloc.is_issued(Uid::MAX));
    }

    #[test]
    fn reset_onto_issued_value_is_detected() {
        let mut alloc = UidAllocator::new(0);
        alloc.next().unwrap();
        alloc.next().unwrap();
        alloc.reset(1);
        assert!(matches!(
            alloc.next(),
            Err(PwdbError::DuplicateIdentifier(1))
        ));
    }

    #[test]
    fn never_returns_same_id_twice() {
        let mut alloc = UidAllocator::new(FIRST_FIELD_DEF_UID);
        alloc.register(150).unwrap();
        let mut seen = HashSet::new();
        for _ in 0..100 {
            let uid = alloc.next().unwrap();
            assert_ne!(uid, 150);
            assert!(seen.insert(uid));
        }
    }

    #[test]
    fn clear_forgets_everything() {
        let mut alloc = UidAllocator::new(10);
        alloc.next().unwrap();
        alloc.clear();
        assert_eq!(alloc.next().unwrap(), 0);
        assert_eq!(alloc.next().unwrap(), 1);
    }
}
