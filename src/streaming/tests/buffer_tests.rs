//! Tests for the buffer recycler and the allocated set.

use super::super::buffers::*;
use super::*;

#[test]
fn test_recycler_miss_creates_device_buffer() {
    let device = MockDevice::default();
    let recycler = BufferRecycler::new();

    let buffer = recycler.acquire(&device);

    assert_eq!(device.generated(), vec![buffer.handle()]);
    assert_eq!(buffer.size(), 0);
    assert_eq!(buffer.voice(), None);

    let stats = recycler.stats();
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.available, 0);
}

#[test]
fn test_recycler_hit_reuses_buffer() {
    let device = MockDevice::default();
    let recycler = BufferRecycler::new();

    let first = recycler.acquire(&device);
    let handle = first.handle();
    recycler.recycle(first);
    assert_eq!(recycler.len(), 1);

    let second = recycler.acquire(&device);
    assert_eq!(second.handle(), handle);
    assert!(recycler.is_empty());
    assert_eq!(device.generated().len(), 1, "a pool hit must not create a buffer");

    let stats = recycler.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hit_rate(), 0.5);
}

#[test]
fn test_bind_copies_chunk_and_uploads() {
    let device = MockDevice::default();
    let recycler = BufferRecycler::new();
    let mut buffer = recycler.acquire(&device);

    let mut source = create_chunk(8, 3);
    buffer.bind(&device, &source[2..6], PcmFormat::Mono16, 22_050);
    source.fill(0);

    assert_eq!(buffer.data(), &[5, 6, 7, 8]);
    assert_eq!(buffer.size(), 4);
    assert_eq!(buffer.format(), PcmFormat::Mono16);
    assert_eq!(buffer.sample_rate(), 22_050);

    let bound = device.bound();
    assert_eq!(bound.len(), 1);
    assert_eq!(bound[0].buffer, buffer.handle());
    assert_eq!(bound[0].data, vec![5, 6, 7, 8]);
}

#[test]
fn test_rebinding_replaces_previous_data() {
    let device = MockDevice::default();
    let recycler = BufferRecycler::new();
    let mut buffer = recycler.acquire(&device);

    buffer.bind(&device, &create_chunk(16, 0), PcmFormat::Stereo16, 48_000);
    buffer.bind(&device, &create_chunk(4, 100), PcmFormat::Mono16, 8_000);

    assert_eq!(buffer.data(), &[100, 101, 102, 103]);
    assert_eq!(buffer.format(), PcmFormat::Mono16);
    assert_eq!(buffer.sample_rate(), 8_000);
}

#[test]
fn test_release_deletes_device_buffer() {
    let device = MockDevice::default();
    let recycler = BufferRecycler::new();
    let buffer = recycler.acquire(&device);
    let handle = buffer.handle();

    buffer.release(&device);

    assert_eq!(device.deleted(), vec![handle]);
}

#[test]
fn test_allocated_set_is_fifo() {
    let device = MockDevice::default();
    let recycler = BufferRecycler::new();
    let allocated = AllocatedSet::new();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let buffer = recycler.acquire(&device);
            let handle = buffer.handle();
            allocated.push(buffer);
            handle
        })
        .collect();
    assert_eq!(allocated.len(), 4);

    let popped: Vec<_> = std::iter::from_fn(|| allocated.pop_oldest())
        .map(|buffer| buffer.handle())
        .collect();
    assert_eq!(popped, handles);
    assert!(allocated.is_empty());
    assert!(allocated.pop_oldest().is_none());
}

#[test]
fn test_drain_empties_both_sets() {
    let device = MockDevice::default();
    let recycler = BufferRecycler::new();
    let allocated = AllocatedSet::new();

    for _ in 0..2 {
        allocated.push(recycler.acquire(&device));
    }
    let spare = recycler.acquire(&device);
    recycler.recycle(spare);

    let drained = allocated.drain().count() + recycler.drain().count();

    assert_eq!(drained, 3);
    assert!(allocated.is_empty());
    assert!(recycler.is_empty());
}

#[test]
fn test_recycler_stats_hit_rate_empty() {
    assert_eq!(RecyclerStats::default().hit_rate(), 0.0);
}
