//! Many threads hitting the coordinator at once.

mod common;

use std::sync::Barrier;
use std::thread;

use awards_store::VoteBalance;
use awards_voting::{VoteView, VotingError};
use common::null_fixture;

const THREADS: usize = 16;

/// Run `op` on `n` threads released together and collect the results.
fn race<T: Send>(n: usize, op: impl Fn(usize) -> T + Sync) -> Vec<T> {
    let barrier = Barrier::new(n);
    thread::scope(|s| {
        let handles: Vec<_> = (0..n)
            .map(|i| {
                let barrier = &barrier;
                let op = &op;
                s.spawn(move || {
                    barrier.wait();
                    op(i)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("worker panicked"))
            .collect()
    })
}

fn successes(results: &[Result<VoteView, VotingError>]) -> usize {
    results.iter().filter(|r| r.is_ok()).count()
}

#[test]
fn concurrent_free_votes_same_category_one_wins() {
    let f = null_fixture();
    let results = race(THREADS, |_| {
        f.coordinator
            .cast_vote(&f.user, &f.nominee, &f.category, false)
    });

    assert_eq!(successes(&results), 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        // Losers that debited before the winner's insert may briefly have
        // drained the pool for those behind them.
        assert!(
            matches!(
                err,
                VotingError::AlreadyVotedWithFreeVote | VotingError::NoFreeVotesAvailable
            ),
            "unexpected error: {err}"
        );
    }
    assert_eq!(f.store.free_votes_in(&f.user, &f.category), 1);
    assert_eq!(f.balance(), (2, 0));
}

#[test]
fn last_free_vote_goes_to_one_category() {
    let f = null_fixture();
    let second = f.extra_category("Best Song");
    f.store.seed_balance(&f.user, VoteBalance::new(1, 0));

    let categories = [f.category, second];
    let results = race(THREADS, |i| {
        f.coordinator
            .cast_vote(&f.user, &f.nominee, &categories[i % 2], false)
    });

    assert_eq!(successes(&results), 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(
            matches!(
                err,
                VotingError::NoFreeVotesAvailable | VotingError::AlreadyVotedWithFreeVote
            ),
            "unexpected error: {err}"
        );
    }
    assert_eq!(f.balance(), (0, 0));
    assert_eq!(f.coordinator.get_all_votes().unwrap().len(), 1);
}

#[test]
fn paid_pool_never_overspent() {
    let f = null_fixture();
    f.coordinator.top_up_paid(&f.user, 10).unwrap();

    let results = race(THREADS * 2, |_| {
        f.coordinator
            .cast_vote(&f.user, &f.nominee, &f.category, true)
    });

    assert_eq!(successes(&results), 10);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, VotingError::NoPaidVotesAvailable)));
    assert_eq!(f.balance(), (3, 0));
    assert_eq!(f.coordinator.get_user_votes(&f.user).unwrap().len(), 10);
}

#[test]
fn concurrent_deletes_credit_once() {
    let f = null_fixture();
    let vote = f
        .coordinator
        .cast_vote(&f.user, &f.nominee, &f.category, false)
        .unwrap();

    let results = race(THREADS, |_| f.coordinator.delete_vote(&vote.vote_id));

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(f.balance(), (3, 0));
}

#[test]
fn users_vote_independently() {
    let f = null_fixture();
    let users: Vec<_> = (0..THREADS)
        .map(|i| {
            f.coordinator
                .registry()
                .register_user(&format!("Voter {i}"), &format!("voter{i}@example.com"))
                .unwrap()
                .id
        })
        .collect();

    let results = race(THREADS, |i| {
        f.coordinator
            .cast_vote(&users[i], &f.nominee, &f.category, false)
    });

    assert_eq!(successes(&results), THREADS);
    for user in &users {
        assert_eq!(f.coordinator.get_available_votes(user).unwrap().free, 2);
    }
    let results = f
        .coordinator
        .analytics()
        .category_vote_stats(&f.category)
        .unwrap();
    assert_eq!(results[0].free_votes, THREADS as u64);
}

#[test]
fn mixed_cast_and_delete_keep_books_balanced() {
    let f = null_fixture();
    f.coordinator.top_up_paid(&f.user, 50).unwrap();

    race(THREADS, |i| {
        for _ in 0..5 {
            let vote = f
                .coordinator
                .cast_vote(&f.user, &f.nominee, &f.category, true)
                .expect("paid vote");
            if i % 2 == 0 {
                f.coordinator.delete_vote(&vote.vote_id).expect("delete");
            }
        }
    });

    let live = f.coordinator.get_user_votes(&f.user).unwrap().len() as u32;
    assert_eq!(live, 40);
    assert_eq!(f.balance(), (3, 50 - live));
}
