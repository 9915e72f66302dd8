//! Core tuning constants shared across the ring buffer and wait strategies.

/// Default ring buffer size (must be a power of two).
pub const DEFAULT_RING_BUFFER_SIZE: usize = 1024 * 1024; // 1M slots

/// Maximum ring buffer size the library will construct.
pub const MAX_RING_BUFFER_SIZE: usize = 4 * 1024 * 1024; // 4M slots

/// Cache line size for padding (64 bytes on most x86_64/aarch64 parts).
pub const CACHE_LINE_SIZE: usize = 64;

/// Coherency granularity to pad to on ISAs with wider cache lines (some ARM server parts).
pub const WIDE_CACHE_LINE_SIZE: usize = 128;

/// Iteration count the yielding/sleeping wait strategies busy-spin before backing off.
pub const DEFAULT_SPIN_TRIES: usize = 100;

/// Iteration count the yielding wait strategy spends yielding before sleeping.
pub const DEFAULT_YIELD_TRIES: usize = 10;

/// Starting sleep duration (nanoseconds) for the sleeping wait strategy's backoff.
pub const DEFAULT_SLEEP_START_NANOS: u64 = 100;

/// Cap on the sleeping wait strategy's exponential backoff.
pub const DEFAULT_SLEEP_MAX_NANOS: u64 = 1_000_000; // 1ms

/// Padding entries added to each side of an availability buffer to avoid false sharing
/// between the last/first real slot and neighboring heap data.
pub const ARRAY_PADDING: usize = 32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_buffer_sizes_are_powers_of_two() {
        assert!(DEFAULT_RING_BUFFER_SIZE.is_power_of_two());
        assert!(MAX_RING_BUFFER_SIZE.is_power_of_two());
    }

    #[test]
    fn test_cache_line_sizes_are_powers_of_two() {
        assert!(CACHE_LINE_SIZE.is_power_of_two());
        assert!(WIDE_CACHE_LINE_SIZE.is_power_of_two());
    }
}
