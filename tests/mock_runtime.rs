//! Geometry mutation against a multi-device runtime

mod common;

use common::{MockDevice, MockRuntime};
use numr_geometry::prelude::*;
use numr_geometry::tensor::{all_32bit_indexable, all_contiguous, all_same_device};

type T = Tensor<MockRuntime>;

fn on(device: usize, sizes: &[usize]) -> T {
    T::empty(sizes, DType::F32, &MockDevice::new(device)).unwrap()
}

// ============================================================================
// Resize
// ============================================================================

#[test]
fn test_identical_resize_does_nothing() {
    MockRuntime::reset();
    let mut t = on(1, &[2, 3]);
    let allocations = MockRuntime::allocations();

    t.resize(&[2, 3], None).unwrap();
    t.resize(&[2, 3], Some(&[3, 1])).unwrap();

    assert_eq!(MockRuntime::allocations(), allocations);
    assert_eq!(MockRuntime::switches(), 0);
}

#[test]
fn test_resize_enters_device_and_restores() {
    MockRuntime::reset();
    let mut t = on(2, &[2]);

    t.resize(&[8], None).unwrap();
    assert_eq!(MockRuntime::switches(), 2);
    assert_eq!(MockRuntime::current_id(), 0);
    assert_eq!(t.storage().unwrap().len(), 8);
}

#[test]
fn test_resize_on_current_device_does_not_switch() {
    MockRuntime::reset();
    let mut t = on(0, &[2]);
    t.resize(&[16], None).unwrap();
    assert_eq!(MockRuntime::switches(), 0);
}

#[test]
fn test_resize_as_skips_guard() {
    MockRuntime::reset();
    let mut t = on(3, &[2]);
    let template = on(3, &[4, 4]);

    t.resize_as(&template).unwrap();
    assert_eq!(t.sizes().as_slice(), &[4, 4]);
    assert_eq!(MockRuntime::switches(), 0);
}

#[test]
fn test_growth_visible_through_views() {
    MockRuntime::reset();
    let mut a = on(0, &[4]);
    let b = a.clone();

    a.resize(&[4, 4], None).unwrap();
    assert_eq!(b.storage().unwrap().len(), 16);
    assert_eq!(b.sizes().as_slice(), &[4]);
    assert_eq!(a.data_ptr().unwrap(), b.data_ptr().unwrap());
}

#[test]
fn test_shrinking_resize_keeps_capacity() {
    MockRuntime::reset();
    let mut t = on(0, &[10]);
    let allocations = MockRuntime::allocations();

    t.resize(&[3], None).unwrap();
    assert_eq!(t.storage().unwrap().len(), 10);
    assert_eq!(MockRuntime::allocations(), allocations);
}

#[test]
fn test_zero_size_with_strides_needs_nothing() {
    MockRuntime::reset();
    let device = MockDevice::new(0);
    let mut t = T::unbound(DType::F32, &device);
    t.rebind(Some(Storage::empty(DType::F32, &device))).unwrap();

    t.resize(&[0, 5], Some(&[100, 1])).unwrap();
    assert_eq!(t.storage().unwrap().len(), 0);
    assert_eq!(t.numel(), 0);
    assert_eq!(MockRuntime::allocations(), 0);
}

// ============================================================================
// Binding
// ============================================================================

#[test]
fn test_rebind_device_mismatch() {
    MockRuntime::reset();
    let mut t = on(0, &[2]);
    let original = t.storage().unwrap().clone();
    let foreign = Storage::<MockRuntime>::new(2, DType::F32, &MockDevice::new(1)).unwrap();

    let err = t.rebind(Some(foreign)).unwrap_err();
    assert!(matches!(err, Error::DeviceMismatch { .. }));
    assert!(t.storage().unwrap().ptr_eq(&original));
}

#[test]
fn test_set_shares_storage_without_switching() {
    MockRuntime::reset();
    let src = on(1, &[3, 4]);
    let mut dst = on(1, &[1]);

    dst.set_(&src).unwrap();
    assert!(dst.storage().unwrap().ptr_eq(src.storage().unwrap()));
    assert_eq!(dst.sizes(), src.sizes());
    assert_eq!(dst.strides(), src.strides());
    assert_eq!(MockRuntime::switches(), 0);
}

#[test]
fn test_squeeze_from_source_leaves_source_alone() {
    MockRuntime::reset();
    let src = on(0, &[1, 4, 1]);
    let mut out = on(0, &[7]);

    out.squeeze_dim(Some(&src), 2).unwrap();
    assert_eq!(out.sizes().as_slice(), &[1, 4]);
    assert_eq!(src.sizes().as_slice(), &[1, 4, 1]);
    assert!(out.storage().unwrap().ptr_eq(src.storage().unwrap()));
}

// ============================================================================
// Aggregate predicates
// ============================================================================

#[test]
fn test_all_predicates() {
    MockRuntime::reset();
    let a = on(0, &[2, 3]);
    let b = on(0, &[6]);
    let c = on(1, &[6]);

    assert!(all_contiguous(&[&a, &b]).unwrap());
    assert!(all_same_device(&[&a, &b]).unwrap());
    assert!(!all_same_device(&[&a, &b, &c]).unwrap());

    let mut transposed = a.clone();
    transposed.resize(&[3, 2], Some(&[1, 3])).unwrap();
    assert!(!all_contiguous(&[&a, &transposed]).unwrap());
}

#[test]
fn test_all_predicates_reject_empty_input() {
    let none: [&T; 0] = [];
    assert!(all_contiguous(&none).is_err());
    assert!(all_same_device(&none).is_err());
    assert!(all_32bit_indexable(&none, INDEX_32BIT_LIMIT).is_err());
}

#[test]
fn test_device_index_limit() {
    MockRuntime::reset();
    let device = MockDevice::with_index_limit(0, 64);
    let small = T::empty(&[8, 7], DType::F32, &device).unwrap();
    let large = T::empty(&[8, 8], DType::F32, &device).unwrap();
    let limit = device.max_32bit_index();

    assert!(all_32bit_indexable(&[&small], limit).unwrap());
    assert!(!all_32bit_indexable(&[&small, &large], limit).unwrap());
}

// ============================================================================
// Memory formats
// ============================================================================

#[test]
fn test_output_follows_channels_last_input() {
    MockRuntime::reset();
    let mut input = on(0, &[2, 3, 4, 5]);
    input.resize(&[2, 3, 4, 5], Some(&[60, 1, 15, 3])).unwrap();

    let format = input.geometry().suggest_memory_format();
    assert_eq!(format, MemoryFormat::ChannelsLast);

    let out = T::empty_like(&input, format).unwrap();
    assert_eq!(out.strides(), input.strides());
    assert!(!out.is_contiguous());
}

#[test]
fn test_resize_as_self_is_noop() {
    MockRuntime::reset();
    let mut t = on(0, &[4, 3]);
    t.resize(&[3, 4], Some(&[1, 3])).unwrap();
    let snapshot = t.clone();
    let allocations = MockRuntime::allocations();

    t.resize_as(&snapshot).unwrap();
    assert_eq!(t.sizes().as_slice(), &[3, 4]);
    assert_eq!(t.strides().as_slice(), &[1, 3]);
    assert_eq!(MockRuntime::allocations(), allocations);
}
