//! Single precision keys must never lose an overlapping row.

use ember::common::RowId;
use ember::geometry::{Envelope, GeometryValue};
use ember_int_test::test_util::{cleanup, create_test_context, run_test, sorted_keys, Engine};
use ember_spatial::KeyRect;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_coordinate(rng: &mut StdRng) -> f64 {
    match rng.gen_range(0..4) {
        0 => rng.gen_range(-1.0..1.0),
        1 => rng.gen_range(-1e7..1e7),
        2 => rng.gen_range(-1e12..1e12),
        _ => rng.gen_range(16_777_000.0..16_777_500.0),
    }
}

fn random_envelope(rng: &mut StdRng) -> Envelope {
    let x = random_coordinate(rng);
    let y = random_coordinate(rng);
    let w = if rng.gen_bool(0.3) {
        0.0
    } else {
        rng.gen_range(0.0..x.abs().max(1.0) * 1e-6)
    };
    let h = if rng.gen_bool(0.3) {
        0.0
    } else {
        rng.gen_range(0.0..y.abs().max(1.0) * 1e-6)
    };
    Envelope::new(x, x + w, y, y + h)
}

#[test]
fn test_widened_key_contains_exact_envelope() {
    let mut rng = StdRng::seed_from_u64(2024);
    for _ in 0..10_000 {
        let envelope = random_envelope(&mut rng);
        let key = KeyRect::widened(&envelope);
        assert!(key.to_envelope().contains(&envelope), "{} -> {:?}", envelope, key);
    }
}

#[test]
fn test_no_false_negatives() {
    run_test(
        || create_test_context(Engine::Persistent),
        |ctx| {
            let index = ctx.create_index("places_shape")?;
            let mut rng = StdRng::seed_from_u64(99);
            let mut stored = Vec::new();
            for key in 0..1500 {
                let envelope = random_envelope(&mut rng);
                let shape = GeometryValue::from_envelope(&envelope, 0)?;
                let row = ctx.table().insert_geometry(key, shape);
                index.add(&row)?;
                stored.push((key, envelope));
            }

            for (stored_key, envelope) in stored.iter().step_by(15) {
                // a search box that only touches the stored box at one corner
                let corner = Envelope::of_point(envelope.max_x, envelope.max_y);
                let search = GeometryValue::from_envelope(&corner, 0)?;
                let found = sorted_keys(index.find_by_geometry(Some(&search))?)?;
                assert!(found.contains(stored_key), "row {} missed by {}", stored_key, corner);

                let expected: Vec<RowId> = stored
                    .iter()
                    .filter(|(_, e)| e.intersects(&corner))
                    .map(|(key, _)| *key)
                    .collect();
                assert!(expected.iter().all(|key| found.contains(key)));
            }
            Ok(())
        },
        cleanup,
    )
}
