//! Slot ring buffer handing audio packets from the capture callback to playback

use parking_lot::Mutex;
use tracing::trace;

/// Number of packet slots in the ring
pub const AUDIO_SLOTS: usize = 4;

#[derive(Default)]
struct AudioSlot {
    data: Vec<u8>,
    /// 0 = nothing to play in this slot
    byte_size: usize,
}

struct RingState {
    slots: [AudioSlot; AUDIO_SLOTS],
    write_index: usize,
    read_index: usize,
    overruns: u64,
}

impl RingState {
    fn new() -> Self {
        Self {
            slots: Default::default(),
            write_index: 0,
            // Reader starts one slot behind the writer so it never races
            // the very first, not yet written, slot.
            read_index: AUDIO_SLOTS - 1,
            overruns: 0,
        }
    }
}

/// Fixed-depth, lossy ring of audio packets
///
/// Single producer (capture callback) and single consumer (playback loop).
/// The producer never waits: if the consumer falls behind, unread slots are
/// overwritten. Both indices only move forward and only under the lock.
pub struct AudioRingBuffer {
    state: Mutex<RingState>,
}

impl AudioRingBuffer {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RingState::new()),
        }
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        AUDIO_SLOTS
    }

    /// Copy a packet into the next write slot
    pub fn push(&self, data: &[u8]) {
        let mut state = self.state.lock();
        let w = state.write_index;
        state.write_index = (w + 1) % AUDIO_SLOTS;

        if state.slots[w].byte_size != 0 {
            state.overruns += 1;
            trace!("Audio slot {} overwritten before playback", w);
        }

        let slot = &mut state.slots[w];
        if slot.data.len() != data.len() {
            slot.data.resize(data.len(), 0);
        }
        slot.data.copy_from_slice(data);
        slot.byte_size = data.len();
    }

    /// Copy the next packet into `scratch`
    ///
    /// Returns the packet size, or `None` if the slot at the read index held
    /// nothing. The read index advances either way, so callers poll again.
    pub fn pop_into(&self, scratch: &mut Vec<u8>) -> Option<usize> {
        let mut state = self.state.lock();
        let r = state.read_index;
        state.read_index = (r + 1) % AUDIO_SLOTS;

        let slot = &mut state.slots[r];
        if slot.byte_size == 0 {
            return None;
        }

        let size = slot.byte_size;
        scratch.clear();
        scratch.extend_from_slice(&slot.data[..size]);
        slot.byte_size = 0;
        Some(size)
    }

    /// Mark all slots empty and re-seed the indices
    pub fn reset(&self) {
        let mut state = self.state.lock();
        for slot in state.slots.iter_mut() {
            slot.byte_size = 0;
        }
        state.write_index = 0;
        state.read_index = AUDIO_SLOTS - 1;
    }

    /// Packets overwritten before they were played
    pub fn overruns(&self) -> u64 {
        self.state.lock().overruns
    }

    /// Current (write, read) indices
    pub fn indices(&self) -> (usize, usize) {
        let state = self.state.lock();
        (state.write_index, state.read_index)
    }
}

impl Default for AudioRingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(ring: &AudioRingBuffer) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        let mut scratch = Vec::new();
        for _ in 0..AUDIO_SLOTS {
            if ring.pop_into(&mut scratch).is_some() {
                out.push(scratch.clone());
            }
        }
        out
    }

    #[test]
    fn test_empty_ring_pops_nothing() {
        let ring = AudioRingBuffer::new();
        let mut scratch = vec![1, 2, 3];
        for _ in 0..AUDIO_SLOTS * 2 {
            assert_eq!(ring.pop_into(&mut scratch), None);
        }
        assert_eq!(scratch, vec![1, 2, 3]);
    }

    #[test]
    fn test_fifo_order_within_capacity() {
        let ring = AudioRingBuffer::new();
        let packets: Vec<Vec<u8>> = (1..=3u8).map(|i| vec![i; i as usize * 10]).collect();
        for packet in &packets {
            ring.push(packet);
        }

        assert_eq!(drain(&ring), packets);
        assert_eq!(ring.overruns(), 0);
    }

    #[test]
    fn test_full_ring_before_first_pop_starts_at_last_slot() {
        let ring = AudioRingBuffer::new();
        let packets: Vec<Vec<u8>> = (0..4u8).map(|i| vec![i; 8]).collect();
        for packet in &packets {
            ring.push(packet);
        }

        // The reader starts one slot behind the writer, so a ring filled
        // before anyone pops yields the last packet first
        let expected = vec![
            packets[3].clone(),
            packets[0].clone(),
            packets[1].clone(),
            packets[2].clone(),
        ];
        assert_eq!(drain(&ring), expected);
    }

    #[test]
    fn test_full_ring_round_with_polling_consumer() {
        let ring = AudioRingBuffer::new();
        let mut scratch = Vec::new();

        // A consumer that is already polling has moved past its starting slot
        assert_eq!(ring.pop_into(&mut scratch), None);

        let packets: Vec<Vec<u8>> = (0..4u8).map(|i| vec![i; 8]).collect();
        for packet in &packets {
            ring.push(packet);
        }
        assert_eq!(drain(&ring), packets);
    }

    #[test]
    fn test_overrun_overwrites_oldest() {
        let ring = AudioRingBuffer::new();
        for i in 1..=6u8 {
            ring.push(&[i; 4]);
        }

        assert_eq!(ring.overruns(), 2);
        // Slots now hold 5, 6, 3, 4; reader starts at the last slot
        assert_eq!(drain(&ring), vec![vec![4; 4], vec![5; 4], vec![6; 4], vec![3; 4]]);

        let mut scratch = Vec::new();
        assert_eq!(ring.pop_into(&mut scratch), None);

        // Ring still behaves after the overrun
        ring.push(&[9; 2]);
        let (w, _) = ring.indices();
        assert_eq!(w, 3);
        let mut found = None;
        for _ in 0..AUDIO_SLOTS {
            if let Some(n) = ring.pop_into(&mut scratch) {
                found = Some(scratch[..n].to_vec());
            }
        }
        assert_eq!(found, Some(vec![9; 2]));
    }

    #[test]
    fn test_slot_grows_for_larger_packet() {
        let ring = AudioRingBuffer::new();
        let mut scratch = Vec::new();

        ring.push(&[1; 4]);
        assert_eq!(ring.pop_into(&mut scratch), None);
        assert_eq!(ring.pop_into(&mut scratch), Some(4));

        // Writer wraps around to slot 0 with a larger packet
        let packets: Vec<Vec<u8>> = (0..4u8).map(|i| vec![i; 64]).collect();
        for packet in &packets {
            ring.push(packet);
        }
        assert_eq!(drain(&ring), packets);
    }

    #[test]
    fn test_reset() {
        let ring = AudioRingBuffer::new();
        ring.push(&[1, 2]);
        ring.push(&[3, 4]);
        ring.reset();

        assert_eq!(ring.indices(), (0, AUDIO_SLOTS - 1));
        assert!(drain(&ring).is_empty());
    }
}
