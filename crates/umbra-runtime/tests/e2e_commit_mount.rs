//! End-to-end commit → diff → pull → mount coverage for one surface,
//! plus the cross-thread ordering guarantees:
//!
//! 1. **Insert/update/delete round trip** — a leaf's full lifecycle
//!    reaches the mounting layer as exactly one mutation per commit.
//! 2. **Commit-against-latest** — two racing commits both land; neither
//!    overwrites the other, because each transform runs against the root
//!    as it stands after the commit lock is acquired.
//! 3. **Pull-queue FIFO** — transactions from concurrent producers are
//!    pulled in exact commit order.
//! 4. **Registry exclusivity** — concurrent `add` of one surface id
//!    succeeds exactly once.
//! 5. **Telemetry monotonicity** — the cumulative accumulator equals the
//!    sum of per-transaction counts, and commit numbers advance by one
//!    per successful commit only.

use std::sync::{Arc, Barrier};
use std::thread;

use umbra_core::{
    ComponentDescriptorRegistry, LayoutConstraints, LayoutContext, NoopLayoutEngine, PropValue,
    RawProps, ShadowNodeFamily, ShadowNodeFragment, SharedProps, SharedRootShadowNode,
    SharedShadowNode, SurfaceId, Tag, ViewComponentDescriptor,
};
use umbra_mount::Mutation;
use umbra_runtime::{CommitError, CommitOptions, Scheduler, ShadowTree, ShadowTreeRegistry};

fn scheduler() -> Scheduler {
    let descriptors = ComponentDescriptorRegistry::new();
    descriptors
        .register(Arc::new(ViewComponentDescriptor::new("Text")))
        .expect("fresh registry");
    Scheduler::new(
        Arc::new(ShadowTreeRegistry::new()),
        Arc::new(descriptors),
        Arc::new(NoopLayoutEngine),
    )
}

fn text_props(value: &str) -> SharedProps {
    Arc::new(RawProps::parse(vec![("text".to_owned(), PropValue::text(value))]).expect("parse"))
}

fn leaf(tag: u64, surface: SurfaceId) -> SharedShadowNode {
    let family = ShadowNodeFamily::new(Tag::new(tag), surface, "View");
    umbra_core::ShadowNode::new(family, ShadowNodeFragment::default()).into_shared()
}

fn append_child(
    root: &SharedRootShadowNode,
    child: SharedShadowNode,
) -> Result<Option<SharedRootShadowNode>, CommitError> {
    let mut children = root.children().as_ref().clone();
    children.push(child);
    Ok(Some(Arc::new(root.clone_with(
        ShadowNodeFragment::with_children(Arc::new(children)),
    ))))
}

#[test]
fn leaf_lifecycle_reaches_the_mounting_layer() {
    let scheduler = scheduler();
    let surface = SurfaceId::new(1);
    scheduler
        .start_surface(surface, LayoutConstraints::default(), LayoutContext::default())
        .expect("surface starts");

    let node = scheduler
        .descriptors()
        .create_node(
            "Text",
            Tag::new(100),
            surface,
            ShadowNodeFragment::with_props(text_props("a")),
        )
        .expect("Text is registered");
    let family = Arc::clone(node.family());

    // Commit 1: mount the leaf.
    scheduler
        .commit(surface, CommitOptions::default(), |root| {
            append_child(root, Arc::clone(&node))
        })
        .expect("insert commit succeeds");

    let controller = scheduler
        .telemetry_controller(surface)
        .expect("surface registered");
    let coordinator = Arc::clone(controller.coordinator());

    let transaction = coordinator.pull_transaction().expect("one pending");
    assert_eq!(transaction.number(), 1);
    match transaction.mutations() {
        [Mutation::Insert { child, index: 0, .. }] => {
            assert_eq!(child.tag(), Tag::new(100));
            assert_eq!(child.props().text_prop("text"), Ok(Some("a")));
        }
        other => panic!("expected a single insert, got {other:?}"),
    }

    // Commit 2: change the leaf's props.
    scheduler
        .commit(surface, CommitOptions::default(), |root| {
            let next = root
                .clone_tree(&family, |node| {
                    node.clone_with(ShadowNodeFragment::with_props(text_props("b")))
                })
                .expect("leaf is mounted");
            Ok(Some(Arc::new(next)))
        })
        .expect("update commit succeeds");

    let transaction = coordinator.pull_transaction().expect("one pending");
    assert_eq!(transaction.number(), 2);
    match transaction.mutations() {
        [Mutation::Update { old, new }] => {
            assert_eq!(old.props().text_prop("text"), Ok(Some("a")));
            assert_eq!(new.props().text_prop("text"), Ok(Some("b")));
        }
        other => panic!("expected a single update, got {other:?}"),
    }

    // Commit 3: unmount the leaf.
    scheduler
        .commit(surface, CommitOptions::default(), |root| {
            Ok(Some(Arc::new(root.clone_with(
                ShadowNodeFragment::with_children(Arc::new(Vec::new())),
            ))))
        })
        .expect("delete commit succeeds");

    let transaction = coordinator.pull_transaction().expect("one pending");
    assert_eq!(transaction.number(), 3);
    match transaction.mutations() {
        [Mutation::Delete { child, .. }] => assert_eq!(child.tag(), Tag::new(100)),
        other => panic!("expected a single delete, got {other:?}"),
    }

    assert!(coordinator.pull_transaction().is_none());
}

#[test]
fn racing_commits_both_land() {
    let surface = SurfaceId::new(1);
    let tree = Arc::new(ShadowTree::new(
        surface,
        LayoutConstraints::default(),
        LayoutContext::default(),
    ));

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = [10_u64, 20]
        .into_iter()
        .map(|tag| {
            let tree = Arc::clone(&tree);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                tree.commit(CommitOptions::default(), |root| {
                    append_child(root, leaf(tag, surface))
                })
                .expect("append commit succeeds")
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("no panics");
    }

    // Whichever commit went second saw the first one's child already in
    // place; neither revision was lost.
    assert_eq!(tree.commit_number(), 2);
    let tags: Vec<u64> = tree
        .root()
        .children()
        .iter()
        .map(|c| c.tag().value())
        .collect();
    assert_eq!(tags.len(), 2);
    assert!(tags.contains(&10) && tags.contains(&20));
}

#[test]
fn transactions_pull_in_commit_order_under_concurrent_producers() {
    let surface = SurfaceId::new(1);
    let tree = Arc::new(ShadowTree::new(
        surface,
        LayoutConstraints::default(),
        LayoutContext::default(),
    ));

    const PRODUCERS: usize = 4;
    const COMMITS_PER_PRODUCER: usize = 25;

    let barrier = Arc::new(Barrier::new(PRODUCERS));
    let handles: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let tree = Arc::clone(&tree);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..COMMITS_PER_PRODUCER {
                    let tag = (producer * COMMITS_PER_PRODUCER + i + 1) as u64;
                    tree.commit(CommitOptions::default(), |root| {
                        append_child(root, leaf(tag, surface))
                    })
                    .expect("append commit succeeds");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("no panics");
    }

    let coordinator = tree.mounting_coordinator();
    let mut numbers = Vec::new();
    while let Some(transaction) = coordinator.pull_transaction() {
        numbers.push(transaction.number());
    }
    let expected: Vec<u64> = (1..=(PRODUCERS * COMMITS_PER_PRODUCER) as u64).collect();
    assert_eq!(numbers, expected);
}

#[test]
fn concurrent_registration_of_one_surface_succeeds_exactly_once() {
    let registry = Arc::new(ShadowTreeRegistry::new());
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let tree = Arc::new(ShadowTree::new(
                    SurfaceId::new(1),
                    LayoutConstraints::default(),
                    LayoutContext::default(),
                ));
                barrier.wait();
                registry.add(tree).is_ok()
            })
        })
        .collect();

    let outcomes: Vec<bool> = handles
        .into_iter()
        .map(|h| h.join().expect("no panics"))
        .collect();
    assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
}

#[test]
fn cumulative_telemetry_matches_the_sum_of_pulled_transactions() {
    let surface = SurfaceId::new(1);
    let tree = ShadowTree::new(
        surface,
        LayoutConstraints::default(),
        LayoutContext::default(),
    );

    // Aborted commits advance nothing.
    tree.commit(CommitOptions::default(), |_| Ok(None))
        .expect("abort is not an error");
    assert_eq!(tree.commit_number(), 0);

    const COMMITS: u64 = 5;
    for i in 0..COMMITS {
        tree.commit(CommitOptions::default(), |root| {
            append_child(root, leaf(i + 1, surface))
        })
        .expect("append commit succeeds");
    }
    assert_eq!(tree.commit_number(), COMMITS);

    let controller = tree.telemetry_controller();
    let mut pulled_mutations = 0_u64;
    let mut pulls = 0_u64;
    loop {
        let saw = std::cell::Cell::new(0_u64);
        let expected_before = pulls;
        let expected_total = pulled_mutations;
        let pulled = controller.pull_transaction(
            |metadata| {
                // Pre-mount snapshot lags by exactly this transaction.
                assert_eq!(metadata.surface_telemetry.commit_count, expected_before);
            },
            |mutations| saw.set(mutations.len() as u64),
            |metadata| {
                assert_eq!(metadata.surface_telemetry.commit_count, expected_before + 1);
                assert_eq!(
                    metadata.surface_telemetry.mutation_count,
                    expected_total + saw.get()
                );
                assert!(metadata.telemetry.mount_duration().is_some());
            },
        );
        if !pulled {
            break;
        }
        pulls += 1;
        pulled_mutations += saw.get();
    }

    assert_eq!(pulls, COMMITS);
    assert_eq!(pulled_mutations, COMMITS);
    let cumulative = controller.coordinator().surface_telemetry();
    assert_eq!(cumulative.commit_count, COMMITS);
    assert_eq!(cumulative.mutation_count, COMMITS);
}
