use criterion::{black_box, criterion_group, criterion_main, Criterion};
use telos_data::ecs::{Component, EntitySupervisor, FilterSpec};

#[derive(Debug, Clone, Copy, Default)]
struct Position(u32);
impl Component for Position {}

#[derive(Debug, Clone, Copy, Default)]
struct Velocity(u32);
impl Component for Velocity {}

#[derive(Debug, Clone, Copy, Default)]
struct Frozen;
impl Component for Frozen {}

fn bench_filters(c: &mut Criterion) {
    let mut world = EntitySupervisor::new();
    let moving = world.filter(
        FilterSpec::new().include::<Position>().include::<Velocity>(),
    );

    // Setup 10,000 entities, half of them matching the filter.
    for i in 0..10_000u32 {
        let entity = world.create_entity();
        world.add_component::<Position>(entity).0 = i;
        if i % 2 == 0 {
            world.add_component::<Velocity>(entity).0 = 1;
        }
    }

    let mut group = c.benchmark_group("Filter maintenance");

    group.bench_function("Iterate 5k matching entities", |b| {
        b.iter(|| {
            let mut sum = 0u32;
            for (index, _entity) in moving.iter().enumerate() {
                sum += world.filter_component::<Position>(&moving, index).0;
                black_box(sum);
            }
        });
    });

    group.bench_function("Component churn through one entity", |b| {
        let entity = world.create_entity();
        world.add_component::<Position>(entity);
        b.iter(|| {
            // Toggling Velocity moves the entity in and out of the filter,
            // exercising mask updates, notifications and slot recycling.
            world.add_component::<Velocity>(entity);
            world.remove_component::<Velocity>(entity);
        });
    });

    group.bench_function("Exclusion re-evaluation", |b| {
        let entity = world.create_entity();
        world.add_component::<Position>(entity);
        world.add_component::<Velocity>(entity);
        let _parked = world.filter(
            FilterSpec::new().include::<Position>().exclude::<Frozen>(),
        );
        b.iter(|| {
            world.add_component::<Frozen>(entity);
            world.remove_component::<Frozen>(entity);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_filters);
criterion_main!(benches);
