//! Index registry behaviour.

use std::sync::Arc;

use ember::common::DatabaseState;
use ember::geometry::GeometryValue;
use ember_int_test::test_util::{
    cleanup, create_test_context, run_on_each_engine, run_test, sorted_keys, spatial_definition,
    Engine, MemoryTable,
};
use ember_spatial::{PersistentSpatialIndex, SpatialConfig, SpatialIndex};

#[test]
fn test_registry_tracks_indexes() {
    run_on_each_engine(|ctx| {
        let a = ctx.create_index("a_shape")?;
        ctx.create_index("b_shape")?;
        assert_eq!(ctx.indexer().index_names(), vec!["a_shape", "b_shape"]);
        assert!(ctx.create_index("a_shape").is_err());

        ctx.insert(a.as_ref(), 1, "POINT (0 0)")?;
        let same = ctx.indexer().get("a_shape").unwrap();
        assert_eq!(same.row_count(), 1);

        assert!(ctx.indexer().drop_index("b_shape")?);
        assert!(ctx.indexer().get("b_shape").is_none());

        ctx.indexer().close()?;
        assert!(a.is_closed());
        assert!(ctx.indexer().index_names().is_empty());
        Ok(())
    })
}

#[test]
fn test_geometry_cache_shares_values() {
    run_on_each_engine(|ctx| {
        let cache = ctx.indexer().geometry_cache();
        let first = cache.from_wkt("POINT (3 4)")?;
        let second = cache.from_wkt("POINT (3 4)")?;
        assert!(first.ptr_eq(&second));
        assert_eq!(cache.capacity(), ctx.indexer().config().geometry_cache_capacity());

        let index = ctx.create_index("places_shape")?;
        let row = ctx.table().insert_geometry(1, second);
        index.add(&row)?;
        assert_eq!(sorted_keys(index.find_by_geometry(Some(&first))?)?, vec![1]);
        Ok(())
    })
}

#[test]
fn test_persistent_index_rebuilt_after_reopen() {
    run_test(
        || create_test_context(Engine::Persistent),
        |ctx| {
            let config = ctx.indexer().config().clone();
            let table = Arc::new(MemoryTable::new("places"));
            for key in 0..20 {
                table.insert(key, &format!("POINT ({} {})", key, key))?;
            }

            let index = PersistentSpatialIndex::new(
                spatial_definition("reopened"),
                table.clone(),
                DatabaseState::Open,
                &config,
            )?;
            for key in 0..20 {
                index.add(&ember::table::RowStore::get_row(table.as_ref(), key)?)?;
            }
            index.close()?;

            // recovery reopens the index and repopulates it from the table
            let index = PersistentSpatialIndex::new(
                spatial_definition("reopened"),
                table.clone(),
                DatabaseState::Starting,
                &config,
            )?;
            assert!(index.need_rebuild());
            assert_eq!(index.row_count(), 0);
            for key in 0..20 {
                index.add(&ember::table::RowStore::get_row(table.as_ref(), key)?)?;
            }
            let search = GeometryValue::from_wkt("LINESTRING (5 5, 7 7)")?;
            assert_eq!(sorted_keys(index.find_by_geometry(Some(&search))?)?, vec![5, 6, 7]);
            index.close()?;
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_in_memory_pages_without_base_path() {
    let table = Arc::new(MemoryTable::new("places"));
    let index = PersistentSpatialIndex::new(
        spatial_definition("anonymous"),
        table.clone(),
        DatabaseState::Open,
        &SpatialConfig::default(),
    )
    .unwrap();
    let row = table.insert(1, "POINT (1 1)").unwrap();
    index.add(&row).unwrap();
    assert_eq!(index.row_count(), 1);
    assert!(index.stats().allocated_pages >= 2);
    index.drop_index().unwrap();
}
