//! Cursor movement over real index results.

use ember::geometry::GeometryValue;
use ember_int_test::test_util::{collect_keys, run_on_each_engine};

#[test]
fn test_next_after_exhaustion_stays_false() {
    run_on_each_engine(|ctx| {
        let index = ctx.create_index("places_shape")?;
        for key in 0..5 {
            ctx.insert(index.as_ref(), key, &format!("POINT ({} 0)", key))?;
        }

        let mut cursor = index.find(None, None)?;
        assert!(cursor.current().is_none());
        assert_eq!(collect_keys(&mut cursor)?.len(), 5);
        for _ in 0..3 {
            assert!(!cursor.next()?);
            assert!(cursor.current().is_none());
        }

        cursor.rewind(true);
        assert_eq!(collect_keys(&mut cursor)?.len(), 5);
        Ok(())
    })
}

#[test]
fn test_previous_from_end_reverses_forward_order() {
    run_on_each_engine(|ctx| {
        let index = ctx.create_index("places_shape")?;
        for key in 0..150 {
            ctx.insert(index.as_ref(), key, &format!("POINT ({} {})", key % 13, key % 7))?;
        }
        let search = GeometryValue::from_wkt("LINESTRING (2 1, 9 5)")?;

        let forward = collect_keys(&mut index.find_by_geometry(Some(&search))?)?;
        assert!(!forward.is_empty());

        let mut cursor = index.find_by_geometry(Some(&search))?;
        cursor.rewind(false);
        let mut backward = Vec::new();
        while cursor.previous()? {
            backward.push(cursor.current_key().unwrap());
        }
        backward.reverse();
        assert_eq!(forward, backward);
        Ok(())
    })
}

#[test]
fn test_cursor_reads_rows_through_table() {
    run_on_each_engine(|ctx| {
        let index = ctx.create_index("places_shape")?;
        ctx.insert(index.as_ref(), 1, "POINT (1 1)")?;
        ctx.insert(index.as_ref(), 2, "POINT (2 2)")?;

        // the row is gone from the table but still indexed
        ctx.table().delete(2);
        let results: Vec<_> = index.find(None, None)?.rows().collect();
        assert_eq!(results.len(), 2);
        assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);
        Ok(())
    })
}
