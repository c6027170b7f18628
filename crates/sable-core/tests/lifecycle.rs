use pretty_assertions::assert_eq;
use sable_core::{
    memory::{self, AllocEvent, AllocHook, HeapStats},
    prelude::*,
};

#[test]
fn init_then_free_touches_nothing() {
    memory::reset_stats();
    let mut chunk = Chunk::new();
    chunk.free();

    assert_eq!((chunk.len(), chunk.capacity()), (0, 0));
    assert_eq!((chunk.constants().len(), chunk.constants().capacity()), (0, 0));
    assert_eq!(memory::stats(), HeapStats::new());
}

#[test]
fn constant_return_program() {
    let mut chunk = Chunk::new();
    assert_eq!(chunk.add_constant(42.0), 0);
    chunk.write_op(OpCode::Constant, 1);
    chunk.write_byte(0, 1);
    chunk.write_op(OpCode::Return, 2);

    assert_eq!(chunk.code().collect::<Vec<_>>(), vec![OpCode::Constant as u8, 0, OpCode::Return as u8]);
    assert_eq!(chunk.lines().collect::<Vec<_>>(), vec![1, 1, 2]);
    assert_eq!(chunk.constants().as_slice(), &[Value::new(42.0)]);
    assert_eq!(validate_chunk(&chunk), Ok(()));
}

#[test]
fn constants_read_back_in_order() {
    let mut chunk = Chunk::new();
    for x in [1.0, 2.5, -3.0] {
        chunk.add_constant(x);
    }
    let read: Vec<Value> = (0..3).map(|i| chunk.constant(i).expect("in range")).collect();
    assert_eq!(read, vec![Value::new(1.0), Value::new(2.5), Value::new(-3.0)]);
}

#[test]
fn nine_appends_are_two_growth_events() {
    memory::reset_stats();
    let mut chunk = Chunk::new();
    let mut capacities = Vec::new();
    for _ in 0..9 {
        chunk.write_op(OpCode::Return, 1);
        capacities.push(chunk.capacity());
    }
    assert_eq!(capacities, vec![8, 8, 8, 8, 8, 8, 8, 8, 16]);
    assert_eq!(memory::stats().growth_events(), 2);
}

#[test]
fn dropping_a_chunk_releases_everything() {
    memory::reset_stats();
    {
        let mut chunk = Chunk::new();
        for i in 0..20u8 {
            let idx = chunk.add_constant(f64::from(i));
            chunk.write_op(OpCode::Constant, u32::from(i));
            chunk.write_byte(u8::try_from(idx).expect("fits"), u32::from(i));
        }
        assert!(memory::stats().bytes_allocated > 0);
    }
    let s = memory::stats();
    assert_eq!(s.bytes_allocated, 0);
    assert_eq!(s.live_blocks(), 0);
    assert_eq!(s.frees, 2);
}

#[test]
fn free_twice_then_reuse() {
    let mut chunk = Chunk::new();
    chunk.write_op(OpCode::Return, 3);
    chunk.free();
    chunk.free();
    assert_eq!(chunk, Chunk::new());

    chunk.write_op(OpCode::Return, 5);
    assert_eq!(chunk.units(), &[CodeUnit { byte: OpCode::Return as u8, line: 5 }]);
}

/// Refuses nothing, but records the heap level each growth would reach.
struct Pressure {
    threshold: usize,
    crossings: std::rc::Rc<std::cell::Cell<u32>>,
}

impl AllocHook for Pressure {
    fn on_reallocate(&mut self, event: AllocEvent, stats: &HeapStats) {
        if event.delta() > 0 && stats.bytes_allocated > self.threshold {
            self.crossings.set(self.crossings.get() + 1);
        }
    }
}

#[test]
fn collector_hook_observes_heap_pressure() {
    memory::reset_stats();
    let crossings = std::rc::Rc::new(std::cell::Cell::new(0));
    memory::install_hook(Box::new(Pressure { threshold: 256, crossings: crossings.clone() }));

    let mut chunk = Chunk::new();
    for i in 0..100u8 {
        chunk.write_byte(i, 1);
    }
    memory::take_hook();

    // 8 -> 16 -> 32 -> 64 -> 128 code units of 8 bytes; only 64 and 128 exceed 256 bytes.
    assert_eq!(chunk.capacity(), 128);
    assert_eq!(crossings.get(), 2);
}
