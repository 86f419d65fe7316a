//! Sync ordering demo
//!
//! One thread syncs on another: the waiter must come back only after
//! the target's next dispatch, not after its block or termination.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use uthread::ThreadId;

static TARGET_ID: AtomicU32 = AtomicU32::new(u32::MAX);
static TARGET_QUANTA_BEFORE: AtomicU32 = AtomicU32::new(0);
static TARGET_QUANTA_AFTER: AtomicU32 = AtomicU32::new(0);
static RELEASED: AtomicBool = AtomicBool::new(false);

fn target() {
    loop {
        std::hint::spin_loop();
    }
}

fn waiter() {
    let target = ThreadId::new(TARGET_ID.load(Ordering::SeqCst));

    let before = uthread::quantums(target).unwrap_or(0);
    TARGET_QUANTA_BEFORE.store(before, Ordering::SeqCst);

    // parks us off the ready queue until `target` runs again
    uthread::sync(target).expect("sync on a live thread");

    let after = uthread::quantums(target).unwrap_or(0);
    TARGET_QUANTA_AFTER.store(after, Ordering::SeqCst);
    RELEASED.store(true, Ordering::SeqCst);

    loop {
        std::hint::spin_loop();
    }
}

fn main() {
    println!("=== uthread sync demo ===\n");

    uthread::init(5_000).expect("init");

    let t1 = uthread::spawn(target).expect("spawn target");
    TARGET_ID.store(t1.as_u32(), Ordering::SeqCst);
    let t2 = uthread::spawn(waiter).expect("spawn waiter");

    // sync from the bootstrap thread is refused
    assert!(uthread::sync(t1).is_err());

    while !RELEASED.load(Ordering::SeqCst) {
        std::hint::spin_loop();
    }

    let before = TARGET_QUANTA_BEFORE.load(Ordering::SeqCst);
    let after = TARGET_QUANTA_AFTER.load(Ordering::SeqCst);
    println!(
        "waiter {} slept across target {}'s dispatch: {} -> {} quanta",
        t2, t1, before, after
    );

    // the waiter resumed only after at least one more dispatch of t1
    assert!(after > before, "sync released before the target ran");

    println!("\nok");
    uthread::terminate(ThreadId::BOOTSTRAP).expect("shutdown");
    unreachable!("terminate(0) exits the process");
}
