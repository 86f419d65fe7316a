//! Block / resume / terminate demo
//!
//! Exercises: a blocked thread's quantum count freezes until resume,
//! a thread terminating itself disappears and its id is reused by the
//! next spawn, and terminating the bootstrap thread exits cleanly with
//! status 0.

use anyhow::{ensure, Result};
use std::sync::atomic::{AtomicU32, Ordering};
use uthread::ThreadId;

static ONE_SHOT_RAN_AS: AtomicU32 = AtomicU32::new(u32::MAX);

fn busy() {
    loop {
        std::hint::spin_loop();
    }
}

/// Records its id and terminates itself on its first quantum
fn one_shot() {
    let me = uthread::current_id();
    ONE_SHOT_RAN_AS.store(me.as_u32(), Ordering::SeqCst);
    let _ = uthread::terminate(me);
}

fn spin_quanta(n: u32) {
    let start = uthread::total_quantums();
    while uthread::total_quantums() < start + n {
        std::hint::spin_loop();
    }
}

fn main() -> Result<()> {
    println!("=== uthread block/resume demo ===\n");

    uthread::init(5_000)?;

    let t1 = uthread::spawn(busy)?;
    let t2 = uthread::spawn(busy)?;

    // let both get going
    while uthread::quantums(t1)? < 1 || uthread::quantums(t2)? < 1 {
        std::hint::spin_loop();
    }

    // -- block freezes the quantum count --------------------------------
    uthread::block(t1)?;
    let frozen = uthread::quantums(t1)?;
    println!("blocked {} at {} quanta", t1, frozen);

    spin_quanta(8);
    ensure!(
        uthread::quantums(t1)? == frozen,
        "blocked thread must not be dispatched"
    );
    ensure!(uthread::quantums(t2)? > 1, "unblocked thread keeps running");

    // blocking again is a success no-op
    uthread::block(t1)?;

    uthread::resume(t1)?;
    while uthread::quantums(t1)? == frozen {
        std::hint::spin_loop();
    }
    println!("resumed {}, count grows again", t1);

    // -- self-terminate and id reuse ------------------------------------
    let t3 = uthread::spawn(one_shot)?;
    while uthread::quantums(t3).is_ok() {
        std::hint::spin_loop();
    }
    ensure!(
        ONE_SHOT_RAN_AS.load(Ordering::SeqCst) == t3.as_u32(),
        "one-shot saw its own id"
    );

    let t4 = uthread::spawn(busy)?;
    ensure!(t4 == t3, "terminated id is the smallest free slot again");
    println!("{} terminated itself; spawn reused id {}", t3, t4);

    // -- misuse is refused without touching state -----------------------
    ensure!(uthread::block(ThreadId::BOOTSTRAP).is_err());
    ensure!(uthread::terminate(ThreadId::new(99)).is_err());
    ensure!(uthread::quantums(ThreadId::new(57)).is_err());

    println!("\nok; bootstrap terminate exits 0 with threads still live");
    uthread::terminate(ThreadId::BOOTSTRAP)?;
    unreachable!("terminate(0) exits the process");
}
