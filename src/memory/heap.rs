//! Global allocator backed by a fixed kernel heap region.
//!
//! The kernel heap is a static BSS region handed to `linked_list_allocator`.
//! Task control blocks and task stacks are the main consumers.

use core::ptr::addr_of_mut;

use linked_list_allocator::LockedHeap;

/// Size of the kernel heap region.
pub const HEAP_SIZE: usize = 4 * 1024 * 1024;

#[repr(align(16))]
struct HeapRegion([u8; HEAP_SIZE]);

/// Backing storage for the kernel heap.
static mut HEAP_REGION: HeapRegion = HeapRegion([0; HEAP_SIZE]);

#[global_allocator]
static ALLOCATOR: LockedHeap = LockedHeap::empty();

/// Initialize the kernel heap.
///
/// Must be called exactly once, before the first allocation.
pub fn init() {
    // SAFETY:
    // - `HEAP_REGION` is a dedicated static region, never aliased elsewhere.
    // - This is the single initialization point, called before any allocation.
    unsafe {
        ALLOCATOR
            .lock()
            .init(addr_of_mut!(HEAP_REGION) as *mut u8, HEAP_SIZE);
    }
}
