//! Basic uthread demo
//!
//! Boots the scheduler, spawns two busy workers and lets the virtual
//! timer slice between them. Exercises: bootstrap identity, quantum
//! accounting, round-robin progress of every ready thread.

use anyhow::{ensure, Result};
use std::sync::atomic::{AtomicU32, Ordering};
use uthread::ThreadId;

/// Work performed per thread id, bumped from inside the workers
static WORK: [AtomicU32; 4] = [const { AtomicU32::new(0) }; 4];
static RECORDED_TID: AtomicU32 = AtomicU32::new(u32::MAX);

fn worker() {
    let me = uthread::current_id();
    RECORDED_TID.store(me.as_u32(), Ordering::SeqCst);
    loop {
        WORK[me.as_usize()].fetch_add(1, Ordering::Relaxed);
        std::hint::spin_loop();
    }
}

fn main() -> Result<()> {
    println!("=== uthread basic demo ===\n");

    uthread::init(10_000)?; // 10ms quantum

    ensure!(uthread::current_id() == ThreadId::BOOTSTRAP);
    ensure!(uthread::total_quantums() == 1, "init counts as one dispatch");
    println!(
        "booted: tid={} total_quantums={}",
        uthread::current_id(),
        uthread::total_quantums()
    );

    let t1 = uthread::spawn(worker)?;
    let t2 = uthread::spawn(worker)?;
    println!("spawned workers: {} and {}", t1, t2);
    ensure!(t1.as_u32() == 1 && t2.as_u32() == 2, "smallest free ids");

    // burn CPU until both workers have had a few quanta
    while uthread::quantums(t1)? < 3 || uthread::quantums(t2)? < 3 {
        std::hint::spin_loop();
    }

    let q1 = uthread::quantums(t1)?;
    let q2 = uthread::quantums(t2)?;
    println!(
        "\nafter slicing: q({})={} q({})={} total={}",
        t1,
        q1,
        t2,
        q2,
        uthread::total_quantums()
    );

    ensure!(RECORDED_TID.load(Ordering::SeqCst) <= 2, "worker saw its own tid");
    ensure!(WORK[1].load(Ordering::Relaxed) > 0, "worker 1 made progress");
    ensure!(WORK[2].load(Ordering::Relaxed) > 0, "worker 2 made progress");

    // round-robin keeps the two workers within one quantum of each other
    let gap = q1.abs_diff(q2);
    ensure!(gap <= 1, "round-robin fairness, got gap {}", gap);

    println!("\nok; terminating the bootstrap thread ends the process");
    uthread::terminate(ThreadId::BOOTSTRAP)?;
    unreachable!("terminate(0) exits the process");
}
