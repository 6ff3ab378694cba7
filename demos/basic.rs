use logring::fs::StdFs;
use logring::{LogRing, RingConfig};
use std::io::Read;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("logring Basic Example");
    println!("======================\n");

    let dir = tempfile::tempdir().expect("create scratch directory");
    println!("Storage root: {}\n", dir.path().display());

    const CAPACITY: usize = 4;
    let fs = StdFs::new(dir.path());
    let mut ring = LogRing::open(fs, RingConfig::new("demo.ctl", b'd').with_capacity(CAPACITY))
        .expect("open ring");

    println!("Configuration:");
    println!("  Capacity: {}", CAPACITY);
    println!("  Initial head: {}", ring.head());
    println!("  Initial tail: {}\n", ring.tail());

    println!("Inserting {} entries (one more than capacity)...", CAPACITY + 1);
    for i in 0..=CAPACITY {
        ring.insert(None).expect("insert");
        println!("  [{}] head={} tail={}", i, ring.head(), ring.tail());
    }
    println!("Oldest entry was evicted to keep the ring at capacity.\n");

    println!("Peeking at the head entry (names the next, unwritten slot)...");
    println!("  peek_head -> {:?}\n", ring.peek_head().expect("peek_head").is_some());

    println!("Peeking at the oldest live entry...");
    if let Some(mut tail_file) = ring.peek_tail().expect("peek_tail") {
        let mut contents = String::new();
        tail_file.read_to_string(&mut contents).expect("read tail");
        println!("  tail contents: {:?} ({} bytes)\n", contents, contents.len());
    }

    println!("Popping every live entry...");
    let mut popped = 0;
    while let Some(name) = ring.pop().expect("pop") {
        println!("  popped -> {}", name);
        popped += 1;
    }
    println!("Popped {} entries. Ring is now empty: {}", popped, ring.pop().unwrap().is_none());
}
