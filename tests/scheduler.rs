use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    thread,
    time::Duration,
};

use spherebox::{world::lock_world, NewSphere, SimulationWorld, SteppingScheduler, Vector3};

fn budget(rate_hz: u32) -> Duration {
    Duration::from_secs(1) / rate_hz
}

fn shared_world() -> Arc<Mutex<SimulationWorld>> {
    let world = Arc::new(Mutex::new(SimulationWorld::new(
        Vector3::new(-15.0, -10.0, -15.0),
        Vector3::new(15.0, 10.0, 15.0),
    )));
    lock_world(&world).add(NewSphere::with_unit_density(
        Vector3::ZERO,
        Vector3::new(2.0, 0.0, 0.0),
        0.5,
    ));
    world
}

#[test]
fn scheduler_steps_and_moves_spheres() {
    let world = shared_world();
    let handle = SteppingScheduler::new(world.clone(), budget(60)).spawn().unwrap();
    thread::sleep(Duration::from_millis(250));
    handle.shutdown();

    let x = lock_world(&world).spheres()[0].position.x;
    assert!(x > 0.0, "sphere should have advanced, x = {x}");
}

#[test]
fn cadence_is_bounded_by_the_frame_budget() {
    let world = shared_world();
    let handle = SteppingScheduler::new(world, budget(50)).spawn().unwrap();
    thread::sleep(Duration::from_millis(300));
    let steps = handle.steps();
    handle.shutdown();

    // 50 Hz over 300 ms is ~15 steps; never anywhere near free-running
    assert!(steps >= 1, "no steps ran");
    assert!(steps <= 40, "ran {steps} steps, budget not respected");
}

#[test]
fn hook_sees_every_step_in_order() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let handle = SteppingScheduler::new(shared_world(), budget(120))
        .with_hook(move |step, world| {
            assert_eq!(world.len(), 1);
            sink.lock().unwrap().push(step);
        })
        .spawn()
        .unwrap();
    thread::sleep(Duration::from_millis(100));
    handle.shutdown();

    let seen = seen.lock().unwrap();
    assert!(!seen.is_empty());
    let expected: Vec<u64> = (1..=seen.len() as u64).collect();
    assert_eq!(*seen, expected);
}

#[test]
fn panicking_step_does_not_stop_the_loop() {
    let world = shared_world();
    let calls = Arc::new(AtomicU64::new(0));
    let counter = calls.clone();
    let handle = SteppingScheduler::new(world.clone(), budget(200))
        .with_hook(move |step, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            if step == 1 {
                panic!("first step fails");
            }
        })
        .spawn()
        .unwrap();
    thread::sleep(Duration::from_millis(150));
    assert!(handle.is_running());
    handle.shutdown();

    assert!(calls.load(Ordering::SeqCst) >= 2);
    assert_eq!(lock_world(&world).len(), 1);
}

#[test]
fn no_steps_after_shutdown() {
    let world = shared_world();
    let handle = SteppingScheduler::new(world.clone(), budget(200)).spawn().unwrap();
    thread::sleep(Duration::from_millis(30));
    handle.shutdown();

    let before = lock_world(&world).spheres()[0].clone();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(lock_world(&world).spheres()[0], before);
}

#[test]
fn external_mutation_interleaves_with_stepping() {
    let world = shared_world();
    let handle = SteppingScheduler::new(world.clone(), budget(120)).spawn().unwrap();

    let mut added = Vec::new();
    for i in 0..20 {
        let id = lock_world(&world).add(NewSphere::with_unit_density(
            Vector3::new(-10.0 + i as f64, 0.0, 5.0),
            Vector3::new(0.0, 1.0, 0.0),
            0.3,
        ));
        added.push(id);
        thread::sleep(Duration::from_millis(2));
    }
    for id in &added {
        assert!(lock_world(&world).remove_by_id(*id));
    }
    handle.shutdown();

    assert_eq!(lock_world(&world).len(), 1);
}
