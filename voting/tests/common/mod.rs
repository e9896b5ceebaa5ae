#![allow(dead_code)]

use std::sync::Arc;

use awards_nullables::{NullClock, NullStore};
use awards_store::EntityStore;
use awards_types::{CategoryId, Clock, NomineeId, UserId, VotingParams};
use awards_voting::VotingCoordinator;

/// One user with the default allocation, one active category and one active
/// nominee assigned to it.
pub struct Fixture<S> {
    pub store: Arc<S>,
    pub clock: Arc<NullClock>,
    pub coordinator: VotingCoordinator<S>,
    pub user: UserId,
    pub category: CategoryId,
    pub nominee: NomineeId,
}

pub fn null_fixture() -> Fixture<NullStore> {
    fixture_over(Arc::new(NullStore::new()))
}

pub fn fixture_over<S: EntityStore>(store: Arc<S>) -> Fixture<S> {
    let clock = Arc::new(NullClock::new(1_000));
    let coordinator = VotingCoordinator::with_clock(
        Arc::clone(&store),
        VotingParams::default(),
        Arc::clone(&clock) as Arc<dyn Clock>,
    );
    let registry = coordinator.registry();
    let user = registry
        .register_user("Ada", "ada@example.com")
        .expect("register user")
        .id;
    let category = registry
        .create_category("Best Album", "")
        .expect("create category")
        .id;
    let nominee = registry.create_nominee("Artist", "").expect("create nominee").id;
    registry
        .assign_nominee(&nominee, &category)
        .expect("assign nominee");
    Fixture {
        store,
        clock,
        coordinator,
        user,
        category,
        nominee,
    }
}

impl<S: EntityStore> Fixture<S> {
    /// Another active category with the fixture's nominee assigned.
    pub fn extra_category(&self, name: &str) -> CategoryId {
        let registry = self.coordinator.registry();
        let id = registry.create_category(name, "").expect("create category").id;
        registry
            .assign_nominee(&self.nominee, &id)
            .expect("assign nominee");
        id
    }

    /// Another active nominee assigned to the fixture's category.
    pub fn extra_nominee(&self, name: &str) -> NomineeId {
        let registry = self.coordinator.registry();
        let id = registry.create_nominee(name, "").expect("create nominee").id;
        registry
            .assign_nominee(&id, &self.category)
            .expect("assign nominee");
        id
    }

    pub fn balance(&self) -> (u32, u32) {
        let available = self
            .coordinator
            .get_available_votes(&self.user)
            .expect("balance");
        (available.free, available.paid)
    }
}
