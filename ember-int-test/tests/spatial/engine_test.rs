//! The shared index contract, checked on both engines.

use std::collections::BTreeSet;

use ember::common::{RowId, Value};
use ember::errors::ErrorKind;
use ember::geometry::GeometryValue;
use ember::index::ConditionMask;
use ember::table::RowStore;
use ember_int_test::test_util::{collect_keys, run_on_each_engine, sorted_keys, Engine};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[test]
fn test_row_count_follows_adds_and_removes() {
    run_on_each_engine(|ctx| {
        let index = ctx.create_index("places_shape")?;
        let mut rng = StdRng::seed_from_u64(7);
        let mut live = BTreeSet::new();
        let mut next_key: RowId = 0;

        for _ in 0..600 {
            if live.is_empty() || rng.gen_bool(0.6) {
                let x: f64 = rng.gen_range(-500.0..500.0);
                let y: f64 = rng.gen_range(-500.0..500.0);
                ctx.insert(index.as_ref(), next_key, &format!("POINT ({} {})", x, y))?;
                live.insert(next_key);
                next_key += 1;
            } else {
                let victim = *live.iter().nth(rng.gen_range(0..live.len())).unwrap();
                ctx.delete(index.as_ref(), victim)?;
                live.remove(&victim);
            }
            assert_eq!(index.row_count(), live.len() as u64);
        }

        let all: BTreeSet<RowId> = sorted_keys(index.find(None, None)?)?.into_iter().collect();
        assert_eq!(all, live);
        Ok(())
    })
}

#[test]
fn test_query_matches_brute_force() {
    run_on_each_engine(|ctx| {
        let index = ctx.create_index("places_shape")?;
        let mut rng = StdRng::seed_from_u64(42);
        let mut shapes = Vec::new();
        for key in 0..400 {
            let x: f64 = rng.gen_range(0.0..100.0);
            let y: f64 = rng.gen_range(0.0..100.0);
            let w: f64 = rng.gen_range(0.0..5.0);
            let wkt = format!("LINESTRING ({} {}, {} {})", x, y, x + w, y + w);
            let row = ctx.insert(index.as_ref(), key, &wkt)?;
            let Value::Geometry(shape) = row.value(1) else {
                unreachable!()
            };
            shapes.push((key, shape.clone()));
        }

        for _ in 0..20 {
            let x: f64 = rng.gen_range(0.0..100.0);
            let y: f64 = rng.gen_range(0.0..100.0);
            let (x2, y2) = (x + 10.0, y + 10.0);
            let search = GeometryValue::from_wkt(&format!(
                "POLYGON (({x} {y}, {x2} {y}, {x2} {y2}, {x} {y2}, {x} {y}))"
            ))?;
            let expected: Vec<RowId> = shapes
                .iter()
                .filter(|(_, shape)| shape.intersects_bounding_box(&search))
                .map(|(key, _)| *key)
                .collect();
            // the persistent engine rounds outward and may report extra rows
            let found = sorted_keys(index.find_by_geometry(Some(&search))?)?;
            match ctx.engine() {
                Engine::Memory => assert_eq!(found, expected),
                Engine::Persistent => {
                    assert!(expected.iter().all(|key| found.contains(key)));
                }
            }
        }
        Ok(())
    })
}

#[test]
fn test_unbounded_queries_scan_everything() {
    run_on_each_engine(|ctx| {
        let index = ctx.create_index("places_shape")?;
        for key in 0..30 {
            ctx.insert(index.as_ref(), key, &format!("POINT ({} {})", key * 3, key % 4))?;
        }
        let expected: Vec<RowId> = (0..30).collect();

        assert_eq!(sorted_keys(index.find(None, None)?)?, expected);
        assert_eq!(sorted_keys(index.find_by_geometry(None)?)?, expected);

        // bounds are not ordering predicates for a spatial index
        let row = ctx.table().insert(999, "POINT (1 1)")?;
        assert_eq!(sorted_keys(index.find(Some(&row), Some(&row))?)?, expected);
        Ok(())
    })
}

#[test]
fn test_first_or_last_is_structural_order() {
    run_on_each_engine(|ctx| {
        let index = ctx.create_index("places_shape")?;
        for key in 0..80 {
            ctx.insert(index.as_ref(), key, &format!("POINT ({} {})", 80 - key, key))?;
        }
        assert!(index.can_get_first_or_last());

        let forward = collect_keys(&mut index.find_first_or_last(true)?)?;
        let mut cursor = index.find_first_or_last(false)?;
        let mut backward = Vec::new();
        while cursor.previous()? {
            backward.push(cursor.current_key().unwrap());
        }
        backward.reverse();
        assert_eq!(forward.len(), 80);
        assert_eq!(forward, backward);
        assert_eq!(forward, collect_keys(&mut index.find(None, None)?)?);
        Ok(())
    })
}

#[test]
fn test_truncate_and_reuse() {
    run_on_each_engine(|ctx| {
        let index = ctx.create_index("places_shape")?;
        for key in 0..100 {
            ctx.insert(index.as_ref(), key, "POINT (1 1)")?;
        }
        index.truncate()?;
        assert_eq!(index.row_count(), 0);
        assert!(sorted_keys(index.find(None, None)?)?.is_empty());

        let row = ctx.table().get_row(5)?;
        index.add(&row)?;
        assert_eq!(sorted_keys(index.find(None, None)?)?, vec![5]);
        Ok(())
    })
}

#[test]
fn test_closed_index_is_invalid_state() {
    run_on_each_engine(|ctx| {
        let index = ctx.create_index("places_shape")?;
        let row = ctx.insert(index.as_ref(), 1, "POINT (1 1)")?;
        index.close()?;
        assert!(index.is_closed());
        index.close()?;

        let search = GeometryValue::from_wkt("POINT (1 1)")?;
        let errors = [
            index.add(&row).unwrap_err(),
            index.remove(&row).unwrap_err(),
            index.find(None, None).unwrap_err(),
            index.find_by_geometry(Some(&search)).unwrap_err(),
            index.find_first_or_last(true).unwrap_err(),
            index.truncate().unwrap_err(),
        ];
        for err in errors {
            assert_eq!(err.kind(), &ErrorKind::InvalidState);
        }
        Ok(())
    })
}

#[test]
fn test_null_and_non_geometry_values_rejected() {
    run_on_each_engine(|ctx| {
        let index = ctx.create_index("places_shape")?;
        let null_row = ember::common::Row::new(1, vec![Value::Long(1), Value::Null]);
        assert_eq!(index.add(&null_row).unwrap_err().kind(), &ErrorKind::InvalidDataType);

        let text_row = ember::common::Row::new(2, vec![Value::Long(2), Value::from("POINT (0 0)")]);
        assert_eq!(index.add(&text_row).unwrap_err().kind(), &ErrorKind::InvalidDataType);
        assert_eq!(index.row_count(), 0);
        Ok(())
    })
}

#[test]
fn test_duplicate_add_rejected() {
    run_on_each_engine(|ctx| {
        let index = ctx.create_index("places_shape")?;
        let row = ctx.insert(index.as_ref(), 1, "POLYGON ((0 0, 4 0, 4 4, 0 4, 0 0))")?;
        ctx.insert(index.as_ref(), 2, "POINT (2 2)")?;

        let err = index.add(&row).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::DuplicateRow);
        assert_eq!(index.row_count(), 2);

        index.remove(&row)?;
        assert_eq!(index.remove(&row).unwrap_err().kind(), &ErrorKind::RowNotFound);
        assert_eq!(index.row_count(), 1);

        index.add(&row)?;
        assert_eq!(sorted_keys(index.find(None, None)?)?, vec![1, 2]);
        Ok(())
    })
}

#[test]
fn test_nan_geometry_never_reaches_index() {
    run_on_each_engine(|ctx| {
        let index = ctx.create_index("places_shape")?;
        for key in 0..40 {
            ctx.insert(index.as_ref(), key, &format!("POINT ({} {})", key, key))?;
        }

        let err = ctx.insert(index.as_ref(), 100, "POINT (NaN NaN)").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::MalformedGeometry);
        assert!(ctx.table().get_row(100).is_err());

        ctx.insert(index.as_ref(), 101, "LINESTRING (0 0, INF 1)")?;
        assert_eq!(index.row_count(), 41);
        let search = GeometryValue::from_wkt("POINT (5 0.5)")?;
        assert_eq!(sorted_keys(index.find_by_geometry(Some(&search))?)?, vec![101]);
        Ok(())
    })
}

#[test]
fn test_cost_prefers_intersects_condition() {
    run_on_each_engine(|ctx| {
        let index = ctx.create_index("places_shape")?;
        let with_intersects = [ConditionMask::NONE, ConditionMask::SPATIAL_INTERSECTS];
        let without = [ConditionMask::NONE, ConditionMask::EQUALITY];

        let mut previous = 0.0;
        for key in 0..50 {
            ctx.insert(index.as_ref(), key, "POINT (0 0)")?;
            let cheap = index.cost(&with_intersects);
            let full = index.cost(&without);
            assert!(cheap <= full);
            assert!(cheap >= previous);
            assert_eq!(full, (key + 1 + 1000) as f64);
            previous = cheap;
        }
        assert!(index.need_rebuild());
        Ok(())
    })
}

#[test]
fn test_disk_space_and_drop() {
    run_on_each_engine(|ctx| {
        let index = ctx.create_index("places_shape")?;
        for key in 0..200 {
            ctx.insert(index.as_ref(), key, &format!("POINT ({} {})", key, key))?;
        }
        let file = ctx.path().join("places_shape.rtree");
        match ctx.engine() {
            Engine::Memory => {
                assert_eq!(index.disk_space_used(), 0);
                assert!(!file.exists());
            }
            Engine::Persistent => {
                assert!(index.disk_space_used() > 0);
                assert!(file.exists());
            }
        }

        assert!(ctx.indexer().drop_index("places_shape")?);
        assert!(index.is_closed());
        assert!(!file.exists());
        Ok(())
    })
}
