//! Geometry codec properties over values that pass through an index.

use ember::geometry::{GeometryCache, GeometryValue};
use ember_int_test::test_util::run_on_each_engine;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SAMPLES: &[&str] = &[
    "POINT (1 2)",
    "POINT Z (1 2 3)",
    "SRID=4326;POINT (13.4 52.5)",
    "LINESTRING (0 0, 1 1, 2 0)",
    "LINESTRING EMPTY",
    "POLYGON ((0 0, 10 0, 10 10, 0 10, 0 0), (2 2, 4 2, 4 4, 2 2))",
    "MULTIPOINT ((1 2), (3 4))",
    "MULTILINESTRING ((0 0, 1 1), (2 2, 3 3))",
    "MULTIPOLYGON (((0 0, 1 0, 1 1, 0 0)), ((5 5, 6 5, 6 6, 5 5)))",
    "GEOMETRYCOLLECTION (POINT (1 1), LINESTRING (0 0, 2 2))",
    "SRID=3857;POLYGON Z ((0 0 1, 1 0 1, 1 1 2, 0 0 1))",
];

#[test]
fn test_binary_and_text_round_trips() {
    for text in SAMPLES {
        let value = GeometryValue::from_wkt(text).unwrap();
        let from_binary = GeometryValue::from_wkb(value.to_wkb()).unwrap();
        assert_eq!(from_binary, value, "{}", text);
        assert_eq!(from_binary.to_wkb(), value.to_wkb());

        let from_text = GeometryValue::from_wkt(&value.to_wkt()).unwrap();
        assert_eq!(from_text.to_wkb(), value.to_wkb(), "{}", text);
        assert_eq!(from_text.srid(), value.srid());
        assert_eq!(from_text.dimensions(), value.dimensions());
    }
}

#[test]
fn test_random_round_trips() {
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..500 {
        let n = rng.gen_range(2..8);
        let with_z = rng.gen_bool(0.5);
        let coords: Vec<String> = (0..n)
            .map(|_| {
                let x: f64 = rng.gen_range(-1e6..1e6);
                let y: f64 = rng.gen_range(-1e6..1e6);
                if with_z {
                    let z: f64 = rng.gen_range(-100.0..100.0);
                    format!("{} {} {}", x, y, z)
                } else {
                    format!("{} {}", x, y)
                }
            })
            .collect();
        let value = GeometryValue::from_wkt(&format!("LINESTRING ({})", coords.join(", "))).unwrap();

        assert_eq!(GeometryValue::from_wkb(value.to_wkb()).unwrap(), value);
        assert_eq!(GeometryValue::from_wkt(&value.to_wkt()).unwrap(), value);
    }
}

#[test]
fn test_malformed_input_rejected() {
    let malformed = [
        "POINT (1)",
        "POLYGON ((0 0, 1 0, 1 1))",
        "LINESTRING (0 0)",
        "CIRCLE (1 1)",
        "POINT EMPTY",
    ];
    for text in malformed {
        assert!(GeometryValue::from_wkt(text).is_err(), "{}", text);
    }
    let value = GeometryValue::from_wkt("POINT (1 2)").unwrap();
    let bytes = value.to_wkb();
    assert!(GeometryValue::from_wkb(&bytes[..bytes.len() - 1]).is_err());
    let mut trailing = bytes.to_vec();
    trailing.push(0);
    assert!(GeometryValue::from_wkb(&trailing).is_err());
}

#[test]
fn test_envelope_arithmetic() {
    let big = GeometryValue::from_wkt("POLYGON ((0 0, 10 0, 10 10, 0 10, 0 0))").unwrap();
    let small = GeometryValue::from_wkt("LINESTRING (2 2, 3 3)").unwrap();
    let far = GeometryValue::from_wkt("POINT (50 50)").unwrap();

    assert!(big.envelope_intersection(&small).unwrap().ptr_eq(&small));
    assert!(small.envelope_intersection(&big).unwrap().ptr_eq(&small));
    assert!(big.envelope_intersection(&far).unwrap().is_empty());
    assert!(!big.intersects_bounding_box(&far));

    let union = small.envelope_union(&far).unwrap();
    assert_eq!(union.to_wkt(), "POLYGON ((2 2, 2 50, 50 50, 50 2, 2 2))");
}

#[test]
fn test_indexed_values_survive_lookup() {
    run_on_each_engine(|ctx| {
        let index = ctx.create_index("places_shape")?;
        let cache = GeometryCache::new(16);
        for (key, text) in SAMPLES.iter().enumerate() {
            let value = cache.from_wkt(text)?;
            let row = ctx.table().insert_geometry(key as i64, value);
            index.add(&row)?;
        }

        let mut cursor = index.find(None, None)?;
        let mut count = 0;
        for row in cursor.rows() {
            let row = row?;
            let ember::common::Value::Geometry(value) = row.value(1) else {
                panic!("row {} lost its geometry", row.key());
            };
            let original = GeometryValue::from_wkt(SAMPLES[row.key() as usize])?;
            assert_eq!(value, &original);
            count += 1;
        }
        assert_eq!(count, SAMPLES.len());
        Ok(())
    })
}
