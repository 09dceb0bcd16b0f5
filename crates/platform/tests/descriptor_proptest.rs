//! Property-based tests for descriptor bit packing.
//! Verifies invariants hold for ALL valid inputs, not just fixed examples.

use platform::{DmaDescriptor, Owner};

proptest::proptest! {
    /// Setting one field never disturbs the others.
    #[test]
    fn descriptor_fields_are_independent(
        size in 0usize..=0x0FFF,
        length in 0usize..=0x0FFF,
        eof in proptest::bool::ANY,
        dma in proptest::bool::ANY,
    ) {
        let owner = if dma { Owner::Dma } else { Owner::Cpu };
        let mut d = DmaDescriptor::EMPTY;
        d.set_owner(owner);
        d.set_eof(eof);
        d.set_size(size);
        d.set_length(length);

        assert_eq!(d.size(), size);
        assert_eq!(d.length(), length);
        assert_eq!(d.is_eof(), eof);
        assert_eq!(d.owner(), owner);
        assert!(!d.is_sof());
    }
}
