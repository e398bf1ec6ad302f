//! End-to-end scenarios run against a real [`Stm`] with real OS threads.
//!
//! One `mod` per scenario class, small helpers up top, a stress test at
//! the bottom.

use std::sync::{Arc, Barrier};
use std::thread;

use wbctl_core::{AbortReason, Stm, TxnAttr, FULL_MASK};

fn stm(word_count: usize) -> Arc<Stm> {
    Arc::new(Stm::with_defaults(word_count))
}

mod single_transaction {
    use super::*;

    #[test]
    fn uncontended_write_is_visible_after_commit() {
        let stm = stm(4);
        let mut tx = stm.begin(TxnAttr::new());
        stm.write(&mut tx, 0, 123, FULL_MASK).unwrap();
        stm.commit(&mut tx).unwrap();
        assert_eq!(stm.peek(0), 123);
    }

    #[test]
    fn read_after_write_extends_snapshot_across_unrelated_commits() {
        let stm = stm(8);

        let mut reader = stm.begin(TxnAttr::new());
        assert_eq!(stm.read(&mut reader, 0).unwrap(), 0);

        // An unrelated commit on a different stripe should not disturb
        // the reader's snapshot.
        let mut writer = stm.begin(TxnAttr::new());
        stm.write(&mut writer, 4, 99, FULL_MASK).unwrap();
        stm.commit(&mut writer).unwrap();

        assert_eq!(stm.read(&mut reader, 1).unwrap(), 0);
        stm.commit(&mut reader).unwrap();
    }

    #[test]
    fn partial_mask_write_then_whole_read_observes_spliced_bits() {
        let stm = stm(4);
        {
            let mut seed = stm.begin(TxnAttr::new());
            stm.write(&mut seed, 0, 0xAAAA, FULL_MASK).unwrap();
            stm.commit(&mut seed).unwrap();
        }
        let mut tx = stm.begin(TxnAttr::new());
        stm.write(&mut tx, 0, 0x00FF, 0x00FF).unwrap();
        let observed = stm.read(&mut tx, 0).unwrap();
        stm.commit(&mut tx).unwrap();
        assert_eq!(observed, 0xAAFF);
        assert_eq!(stm.peek(0), 0xAAFF);
    }
}

mod conflicts {
    use super::*;

    #[test]
    fn doomed_read_then_unrelated_write_fails_at_commit_validation() {
        let stm = stm(8);

        let mut t1 = stm.begin(TxnAttr::new());
        stm.read(&mut t1, 1).unwrap();

        let mut t2 = stm.begin(TxnAttr::new());
        stm.write(&mut t2, 1, 7, FULL_MASK).unwrap();
        stm.commit(&mut t2).unwrap();

        stm.write(&mut t1, 0, 1, FULL_MASK).unwrap();
        let result = stm.commit(&mut t1);
        assert_eq!(result, Err(AbortReason::ValCommit));
    }

    #[test]
    fn two_writers_on_the_same_address_only_one_commits() {
        let stm = stm(4);

        let barrier = Arc::new(Barrier::new(2));

        let run = |stm: Arc<Stm>, barrier: Arc<Barrier>, value: usize| {
            move || {
                let mut tx = stm.begin(TxnAttr::new());
                stm.write(&mut tx, 0, value, FULL_MASK).unwrap();
                barrier.wait();
                stm.commit(&mut tx)
            }
        };

        let h1 = thread::spawn(run(Arc::clone(&stm), Arc::clone(&barrier), 1));
        let h2 = thread::spawn(run(Arc::clone(&stm), Arc::clone(&barrier), 2));

        let r1 = h1.join().unwrap();
        let r2 = h2.join().unwrap();

        let outcomes = [r1.is_ok(), r2.is_ok()];
        assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
        assert!(stm.peek(0) == 1 || stm.peek(0) == 2);
    }

    #[test]
    fn stripe_collision_within_one_transaction_does_not_self_deadlock() {
        use wbctl_core::StmConfig;

        let config = StmConfig {
            lock_table_size: 2,
            stripe_shift: 0,
            ..StmConfig::default()
        };
        let stm = Arc::new(Stm::new(8, config));

        let mut tx = stm.begin(TxnAttr::new());
        stm.write(&mut tx, 0, 0x10, FULL_MASK).unwrap();
        stm.write(&mut tx, 2, 0x20, FULL_MASK).unwrap();
        stm.write(&mut tx, 4, 0x30, FULL_MASK).unwrap();
        stm.commit(&mut tx).unwrap();

        assert_eq!(stm.peek(0), 0x10);
        assert_eq!(stm.peek(2), 0x20);
        assert_eq!(stm.peek(4), 0x30);
    }
}

mod retry_helper {
    use super::*;
    use wbctl_core::with_retry;

    #[test]
    fn concurrent_counter_increments_are_never_lost() {
        let stm = stm(1);
        let threads = 16;
        let increments_per_thread = 50;

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let stm = Arc::clone(&stm);
                thread::spawn(move || {
                    for _ in 0..increments_per_thread {
                        with_retry(&stm, TxnAttr::new(), |stm, tx| {
                            let current = stm.read(tx, 0)?;
                            stm.write(tx, 0, current + 1, FULL_MASK)?;
                            Ok(())
                        });
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(stm.peek(0), threads * increments_per_thread);
    }
}

mod stress {
    use super::*;

    #[test]
    fn many_threads_hammering_a_small_shared_array_stay_consistent() {
        use wbctl_core::with_retry;

        const WORDS: usize = 8;
        const THREADS: usize = 12;
        const ROUNDS: usize = 200;

        let stm = stm(WORDS);
        let barrier = Arc::new(Barrier::new(THREADS));

        // Seed all the "money" onto word 0 so every transfer has
        // something to move without ever going negative.
        const TOTAL: usize = 10_000;
        {
            let mut seed = stm.begin(TxnAttr::new());
            stm.write(&mut seed, 0, TOTAL, FULL_MASK).unwrap();
            stm.commit(&mut seed).unwrap();
        }

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let stm = Arc::clone(&stm);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for round in 0..ROUNDS {
                        let src = (t + round) % WORDS;
                        let dst = (t + round + 1) % WORDS;
                        if src == dst {
                            continue;
                        }
                        with_retry(&stm, TxnAttr::new(), |stm, tx| {
                            let a = stm.read(tx, src)?;
                            if a == 0 {
                                return Ok(());
                            }
                            let b = stm.read(tx, dst)?;
                            stm.write(tx, src, a - 1, FULL_MASK)?;
                            stm.write(tx, dst, b + 1, FULL_MASK)?;
                            Ok(())
                        });
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        // Every transaction moves exactly one unit from one word to
        // another, so the sum across all words is invariant.
        let total: usize = (0..WORDS).map(|a| stm.peek(a)).sum();
        assert_eq!(total, TOTAL);
    }

    #[test]
    fn random_transfers_between_random_words_preserve_the_total() {
        use rand::prelude::*;
        use wbctl_core::with_retry;

        const WORDS: usize = 16;
        const THREADS: usize = 8;
        const ROUNDS: usize = 150;
        const TOTAL: usize = 50_000;

        let stm = stm(WORDS);
        {
            let mut seed = stm.begin(TxnAttr::new());
            stm.write(&mut seed, 0, TOTAL, FULL_MASK).unwrap();
            stm.commit(&mut seed).unwrap();
        }

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let stm = Arc::clone(&stm);
                thread::spawn(move || {
                    let mut rng = rand::thread_rng();
                    for _ in 0..ROUNDS {
                        let src = rng.gen_range(0..WORDS);
                        let dst = rng.gen_range(0..WORDS);
                        if src == dst {
                            continue;
                        }
                        with_retry(&stm, TxnAttr::new(), |stm, tx| {
                            let a = stm.read(tx, src)?;
                            if a == 0 {
                                return Ok(());
                            }
                            let b = stm.read(tx, dst)?;
                            stm.write(tx, src, a - 1, FULL_MASK)?;
                            stm.write(tx, dst, b + 1, FULL_MASK)?;
                            Ok(())
                        });
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        let total: usize = (0..WORDS).map(|a| stm.peek(a)).sum();
        assert_eq!(total, TOTAL);
    }
}
