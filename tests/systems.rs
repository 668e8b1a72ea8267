//! System execution: queries, sequential runs, and fork-join parallel runs.

use ecs_core::{Entity, EntityCoordinator, EntityId, FnSystem, Query, System, WorldView};

struct Position {
    x: f32,
}

struct Velocity {
    dx: f32,
}

struct Tag;

fn spawn_mover(world: &EntityCoordinator, x: f32, dx: f32) -> Entity {
    let entity = world.spawn();
    entity.add(Position { x }).add(Velocity { dx });
    entity
}

struct Integrate {
    query: Query,
}

impl Integrate {
    fn new(world: &EntityCoordinator) -> Self {
        Self {
            query: world.query().with::<Position>().with::<Velocity>().build(),
        }
    }
}

impl System for Integrate {
    fn query(&self) -> Query {
        self.query
    }

    fn process(&self, view: WorldView<'_>, entity: EntityId) {
        let dx = view.get::<Velocity>(entity).dx;
        view.get_mut::<Position>(entity).x += dx;
    }
}

#[test]
fn sequential_run_updates_every_match() {
    let world = EntityCoordinator::new();
    let movers: Vec<_> = (0..10).map(|i| spawn_mover(&world, 0.0, i as f32)).collect();
    let still = world.spawn();
    still.add(Position { x: 100.0 });

    world.run(&Integrate::new(&world));

    for (i, mover) in movers.iter().enumerate() {
        assert_eq!(mover.get::<Position>().x, i as f32);
    }
    // Missing Velocity, so the integrator never touched it.
    assert_eq!(still.get::<Position>().x, 100.0);
}

#[test]
fn matches_are_visited_in_ascending_id_order() {
    let world = EntityCoordinator::new();
    let movers: Vec<_> = (0..6).map(|_| spawn_mover(&world, 0.0, 0.0)).collect();

    let query = world.query().with::<Position>().build();
    let visited = std::sync::Mutex::new(Vec::new());
    let recorder = FnSystem::new(query, |_: WorldView<'_>, entity| {
        visited.lock().unwrap().push(entity);
    });
    world.run(&recorder);

    let visited = visited.into_inner().unwrap();
    let expected: Vec<_> = movers.iter().map(|m| m.id()).collect();
    assert_eq!(visited, expected);
}

#[test]
fn parallel_run_matches_sequential_results() {
    let sequential = EntityCoordinator::new();
    let parallel = EntityCoordinator::new();
    let seq_movers: Vec<_> = (0..200)
        .map(|i| spawn_mover(&sequential, i as f32, 0.5))
        .collect();
    let par_movers: Vec<_> = (0..200)
        .map(|i| spawn_mover(&parallel, i as f32, 0.5))
        .collect();

    sequential.run(&Integrate::new(&sequential));
    parallel.run_parallel(&Integrate::new(&parallel));

    for (s, p) in seq_movers.iter().zip(&par_movers) {
        assert_eq!(s.get::<Position>().x, p.get::<Position>().x);
    }
}

#[test]
fn query_matches_supersets_of_its_requirements() {
    let world = EntityCoordinator::new();
    let mover = spawn_mover(&world, 0.0, 0.0);
    let tagged = world.spawn();
    tagged.add(Position { x: 0.0 }).add(Tag);

    let positions = world.query().with::<Position>().build();
    let matched = world.matching(&positions);
    assert!(matched.contains(&mover.id()));
    assert!(matched.contains(&tagged.id()));

    let tagged_only = world.query().with::<Tag>().build();
    assert_eq!(world.matching(&tagged_only), vec![tagged.id()]);
}

#[test]
fn composition_changes_between_runs_are_respected() {
    let world = EntityCoordinator::new();
    let mover = spawn_mover(&world, 0.0, 1.0);
    let integrate = Integrate::new(&world);

    world.run(&integrate);
    assert_eq!(mover.get::<Position>().x, 1.0);

    mover.remove::<Velocity>();
    world.run(&integrate);
    assert_eq!(mover.get::<Position>().x, 1.0);

    mover.add(Velocity { dx: 2.0 });
    world.run(&integrate);
    assert_eq!(mover.get::<Position>().x, 3.0);
}
