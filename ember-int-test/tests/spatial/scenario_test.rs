//! End-to-end scenarios run against both engines.

use ember::common::{DatabaseState, Value};
use ember::errors::ErrorKind;
use ember::geometry::GeometryValue;
use ember::index::{IndexColumn, IndexDefinition, IndexType};
use ember_int_test::test_util::{
    cleanup, create_test_context, run_on_each_engine, run_test, shape_column, sorted_keys, Engine,
};

#[test]
fn test_query_returns_only_overlapping_row() {
    run_on_each_engine(|ctx| {
        let index = ctx.create_index("places_shape")?;
        ctx.insert(index.as_ref(), 1, "POLYGON ((0 0, 1 0, 1 1, 0 1, 0 0))")?;
        ctx.insert(index.as_ref(), 2, "POLYGON ((10 10, 11 10, 11 11, 10 11, 10 10))")?;

        let search = GeometryValue::from_wkt("POLYGON ((0 0, 2 0, 2 2, 0 2, 0 0))")?;
        assert_eq!(sorted_keys(index.find_by_geometry(Some(&search))?)?, vec![1]);
        Ok(())
    })
}

#[test]
fn test_mixed_dimensions_round_trip_independently() {
    run_on_each_engine(|ctx| {
        let index = ctx.create_index("places_shape")?;
        ctx.insert(index.as_ref(), 1, "POINT Z (1 2 3)")?;
        ctx.insert(index.as_ref(), 2, "POINT (4 5)")?;

        let mut cursor = index.find(None, None)?;
        let mut seen = 0;
        for row in cursor.rows() {
            let row = row?;
            let Value::Geometry(shape) = row.value(1) else {
                panic!("row {} lost its geometry", row.key());
            };
            let copy = GeometryValue::from_wkb(shape.to_wkb())?;
            assert_eq!(&copy, shape);
            match row.key() {
                1 => {
                    assert_eq!(copy.dimensions(), 3);
                    assert_eq!(copy.to_wkt(), "POINT Z (1 2 3)");
                }
                2 => {
                    assert_eq!(copy.dimensions(), 2);
                    assert_eq!(copy.to_wkt(), "POINT (4 5)");
                }
                other => panic!("unexpected row {}", other),
            }
            seen += 1;
        }
        assert_eq!(seen, 2);
        Ok(())
    })
}

#[test]
fn test_second_remove_fails() {
    run_on_each_engine(|ctx| {
        let index = ctx.create_index("places_shape")?;
        let row = ctx.insert(index.as_ref(), 7, "LINESTRING (0 0, 5 5)")?;

        index.remove(&row)?;
        let err = index.remove(&row).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::RowNotFound);
        assert_eq!(index.row_count(), 0);
        Ok(())
    })
}

#[test]
fn test_unique_index_rejected_before_insert() {
    for engine in [Engine::Memory, Engine::Persistent] {
        run_test(
            move || create_test_context(engine),
            |ctx| {
                let definition = IndexDefinition::new(
                    "places_shape",
                    "places",
                    vec![IndexColumn::new(shape_column())],
                    IndexType::spatial().with_unique(true),
                );
                let err = ctx
                    .indexer()
                    .create_index(definition, ctx.table(), DatabaseState::Open)
                    .err()
                    .unwrap();
                assert_eq!(err.kind(), &ErrorKind::UnsupportedIndexConfiguration);
                assert_eq!(err.message(), "not unique");
                assert!(ctx.indexer().get("places_shape").is_none());
                Ok(())
            },
            cleanup,
        );
    }
}
