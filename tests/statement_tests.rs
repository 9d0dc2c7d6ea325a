use sqlite_veneer::{
    Cell, Connection, Misuse, Null, Result, State, StorageClass, Value, LOGIC_ERROR_CODE,
};

fn create_test_db() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch(
        r#"
        CREATE TABLE cells (
            id INTEGER PRIMARY KEY,
            txt TEXT,
            num REAL,
            data BLOB
        );
        "#,
    )?;
    Ok(conn)
}

#[test]
fn text_reads_back_unmodified() -> Result<()> {
    let conn = create_test_db()?;
    let samples = [
        "",
        "plain",
        "  padded with spaces  ",
        "tabs\tand\nnewlines\r\n",
        "ünïcødé ✓ 日本語",
        "quote ' and \" and ;",
    ];

    let mut insert = conn.prepare("INSERT INTO cells (id, txt) VALUES (?, ?)")?;
    for (id, text) in samples.iter().enumerate() {
        insert.bind(1, &(id as i64))?;
        insert.bind(2, *text)?;
        insert.execute()?;
    }

    let mut select = conn.prepare("SELECT txt FROM cells ORDER BY id")?;
    for text in samples {
        assert!(select.step()?);
        let cell = select.value(0)?;
        assert_eq!(cell.storage_class(), StorageClass::Text);
        assert_eq!(cell.as_str()?, text);
    }
    assert!(!select.step()?);
    Ok(())
}

#[test]
fn step_after_done_is_logic_error() -> Result<()> {
    let conn = create_test_db()?;
    let mut stmt = conn.prepare("SELECT id FROM cells")?;
    assert!(!stmt.step()?);
    assert_eq!(stmt.state(), State::Done);

    let err = stmt.step().unwrap_err();
    assert_eq!(err.code(), LOGIC_ERROR_CODE);
    assert_eq!(err.misuse(), Some(&Misuse::Exhausted));

    stmt.reset()?;
    assert!(!stmt.step()?);
    Ok(())
}

#[test]
fn value_without_current_row_is_logic_error() -> Result<()> {
    let conn = create_test_db()?;
    conn.execute("INSERT INTO cells (id) VALUES (1)")?;
    let mut stmt = conn.prepare("SELECT id FROM cells")?;

    let err = stmt.value(0).unwrap_err();
    assert_eq!(err.misuse(), Some(&Misuse::NoRow));
    assert_eq!(err.code(), LOGIC_ERROR_CODE);

    assert!(stmt.step()?);
    assert_eq!(stmt.value(0)?, 1);
    let err = stmt.value(3).unwrap_err();
    assert_eq!(
        err.misuse(),
        Some(&Misuse::ColumnOutOfRange { index: 3, count: 1 })
    );

    assert!(!stmt.step()?);
    assert_eq!(stmt.value(0).unwrap_err().misuse(), Some(&Misuse::Exhausted));
    Ok(())
}

#[test]
fn finalized_statement_can_be_prepared_again() -> Result<()> {
    let conn = create_test_db()?;
    let mut stmt = conn.prepare("INSERT INTO cells (id, txt) VALUES (?, ?)")?;
    stmt.finalize();
    stmt.finalize();
    assert!(!stmt.is_prepared());
    assert_eq!(stmt.bind(1, &1).unwrap_err().misuse(), Some(&Misuse::NotPrepared));
    assert_eq!(stmt.step().unwrap_err().misuse(), Some(&Misuse::NotPrepared));
    assert_eq!(stmt.reset().unwrap_err().misuse(), Some(&Misuse::NotPrepared));

    stmt.prepare()?;
    assert_eq!(stmt.state(), State::Ready);
    stmt.bind(1, &1)?;
    stmt.bind(2, "again")?;
    stmt.execute()?;
    assert_eq!(conn.last_insert_id(), 1);
    Ok(())
}

#[test]
fn bindings_survive_reset_until_cleared() -> Result<()> {
    let conn = create_test_db()?;
    let mut insert = conn.prepare("INSERT INTO cells (txt) VALUES (?)")?;
    insert.bind(1, "same")?;
    insert.execute()?;
    insert.execute()?;

    insert.clear_bindings()?;
    insert.execute()?;

    let mut stmt = conn.prepare("SELECT txt FROM cells ORDER BY id")?;
    assert!(stmt.step()?);
    assert_eq!(stmt.get::<Option<String>>(0)?, Some("same".to_string()));
    assert!(stmt.step()?);
    assert_eq!(stmt.get::<Option<String>>(0)?, Some("same".to_string()));
    assert!(stmt.step()?);
    assert_eq!(stmt.get::<Option<String>>(0)?, None);
    Ok(())
}

#[test]
fn parameter_indices_are_one_based_and_bounded() -> Result<()> {
    let conn = create_test_db()?;
    let mut stmt = conn.prepare("INSERT INTO cells (id, txt) VALUES (?, :txt)")?;
    assert_eq!(stmt.parameter_count(), 2);
    assert_eq!(stmt.parameter_index(":txt")?, Some(2));
    assert_eq!(stmt.parameter_index(":nope")?, None);

    let err = stmt.bind(0, &1).unwrap_err();
    assert_eq!(
        err.misuse(),
        Some(&Misuse::ParameterOutOfRange { index: 0, count: 2 })
    );
    let err = stmt.bind(3, &1).unwrap_err();
    assert_eq!(
        err.misuse(),
        Some(&Misuse::ParameterOutOfRange { index: 3, count: 2 })
    );

    let err = stmt.bind_all(&[&1]).unwrap_err();
    assert_eq!(
        err.misuse(),
        Some(&Misuse::ParameterCount { expected: 2, actual: 1 })
    );
    stmt.bind_all(&[&7, &"seven"])?;
    stmt.execute()?;
    assert_eq!(conn.last_insert_id(), 7);
    Ok(())
}

#[test]
fn every_bind_type_round_trips() -> Result<()> {
    let conn = create_test_db()?;
    let mut insert = conn.prepare("INSERT INTO cells (id, txt, num, data) VALUES (?, ?, ?, ?)")?;
    insert.bind(1, &i64::MAX)?;
    insert.bind(2, &String::from("owned"))?;
    insert.bind(3, &2.5)?;
    insert.bind(4, &[0u8, 1, 2, 255][..])?;
    insert.execute()?;

    insert.bind(1, &1)?;
    insert.bind(2, &Null)?;
    insert.bind(3, &Option::<f64>::None)?;
    insert.bind(4, &Value::Blob(Vec::new()))?;
    insert.execute()?;

    let mut select = conn.prepare("SELECT id, txt, num, data FROM cells ORDER BY id DESC")?;
    assert!(select.step()?);
    assert_eq!(select.value(0)?.as_i64(), i64::MAX);
    assert_eq!(select.value(1)?.storage_class(), StorageClass::Text);
    assert_eq!(select.value(2)?.as_f64(), 2.5);
    assert_eq!(select.value(2)?.storage_class(), StorageClass::Float);
    assert_eq!(select.value(3)?.as_blob().as_ref(), &[0u8, 1, 2, 255]);
    assert_eq!(select.value(3)?.storage_class(), StorageClass::Blob);

    assert!(select.step()?);
    assert_eq!(select.value(0)?.as_i32(), 1);
    assert!(select.value(1)?.is_null());
    assert!(select.value(2)?.is_null());
    assert_eq!(select.get::<Value>(2)?, Value::Null);
    assert_eq!(select.get::<Vec<u8>>(3)?, Vec::<u8>::new());
    Ok(())
}

#[test]
fn blob_comparisons_are_bytewise() -> Result<()> {
    let conn = create_test_db()?;
    let blobs: [&[u8]; 3] = [&[1, 3], &[1, 2], &[1, 2, 3]];
    let mut insert = conn.prepare("INSERT INTO cells (data) VALUES (?)")?;
    for blob in blobs {
        insert.bind(1, blob)?;
        insert.execute()?;
    }

    let mut stmt = conn.prepare("SELECT data FROM cells WHERE data = ?")?;
    stmt.bind(1, &[1u8, 2, 3][..])?;
    assert!(stmt.step()?);
    let cell = stmt.value(0)?;
    let shorter: &[u8] = &[1, 2];
    let same: &[u8] = &[1, 2, 3];
    let larger: &[u8] = &[1, 3];
    assert!(cell > shorter);
    assert!(cell == same);
    assert!(cell < larger);
    assert!(cell != shorter);
    Ok(())
}

#[test]
fn blob_and_text_views_can_be_held_together() -> Result<()> {
    let conn = create_test_db()?;
    let mut insert = conn.prepare("INSERT INTO cells (data) VALUES (?)")?;
    for len in [1usize, 126, 1198, 1214, 4096] {
        insert.bind(1, &vec![0xABu8; len])?;
        insert.execute()?;
    }

    let mut select = conn.prepare("SELECT data FROM cells ORDER BY id")?;
    for len in [1usize, 126, 1198, 1214, 4096] {
        let payload = vec![0xABu8; len];
        assert!(select.step()?);
        let cell = select.value(0)?;
        let blob = cell.as_blob();
        let text = cell.text_bytes();
        let churn: Vec<Vec<u8>> = (0..64).map(|i| vec![i as u8; len + 1]).collect();
        assert_eq!(churn.len(), 64);
        assert_eq!(blob.as_ref(), payload.as_slice());
        assert_eq!(text.as_ref(), payload.as_slice());
        assert_eq!(cell.storage_class(), StorageClass::Blob);
    }
    Ok(())
}

#[test]
fn numeric_cells_render_as_owned_text() -> Result<()> {
    let conn = create_test_db()?;
    let mut select = conn.prepare("SELECT 42, 2.5, 'txt'")?;
    assert!(select.step()?);

    let int = select.value(0)?;
    let as_text = int.text_bytes();
    let as_blob = int.as_blob();
    assert_eq!(as_text.as_ref(), b"42");
    assert_eq!(as_blob.as_ref(), b"42");
    assert_eq!(int.as_i64(), 42);

    let float = select.value(1)?;
    assert_eq!(float.as_str()?, "2.5");
    assert_eq!(float.as_f64(), 2.5);

    let text = select.value(2)?;
    let as_blob = text.as_blob();
    let as_str = text.as_str()?;
    assert_eq!(as_blob.as_ref(), b"txt");
    assert_eq!(as_str, "txt");
    Ok(())
}

#[test]
fn literal_comparisons_convert_the_cell() -> Result<()> {
    let conn = create_test_db()?;
    let mut stmt = conn.prepare("SELECT 42, 'err', 1.5, '17'")?;
    assert!(stmt.step()?);

    let int = stmt.value(0)?;
    assert!(int == 42);
    assert!(int == 42i64);
    assert!(int < 43);
    assert!(int >= 42i64);

    let text = stmt.value(1)?;
    assert!(text == "err");
    assert!(text != "erz");
    assert!(text < "erz");
    assert!(text > "abc");
    assert!(text >= "err");

    let float = stmt.value(2)?;
    assert!(float == 1.5);
    assert!(float > 1.0);

    // Numeric comparison on text converts the text.
    let numeric_text = stmt.value(3)?;
    assert!(numeric_text == 17);
    assert!(numeric_text > "1");
    Ok(())
}

#[test]
fn tail_holds_unconsumed_text() -> Result<()> {
    let conn = create_test_db()?;
    let stmt = conn.prepare("SELECT 1; SELECT 2;")?;
    assert!(stmt.has_tail());
    assert_eq!(stmt.tail().trim(), "SELECT 2;");
    assert_eq!(stmt.sql(), "SELECT 1; SELECT 2;");

    let stmt = conn.prepare("SELECT 1;   ")?;
    assert!(!stmt.has_tail());
    Ok(())
}

#[test]
fn empty_sql_produces_no_rows() -> Result<()> {
    let conn = create_test_db()?;
    let mut stmt = conn.prepare("  -- nothing here ")?;
    assert_eq!(stmt.column_count(), 0);
    assert_eq!(stmt.parameter_count(), 0);
    assert!(!stmt.step()?);
    assert!(stmt.is_exhausted());
    Ok(())
}

#[test]
fn column_names_follow_select_list() -> Result<()> {
    let conn = create_test_db()?;
    let stmt = conn.prepare("SELECT id, txt AS label FROM cells")?;
    assert_eq!(stmt.column_count(), 2);
    assert_eq!(stmt.column_name(0)?, "id");
    assert_eq!(stmt.column_name(1)?, "label");
    assert!(stmt.column_name(2).is_err());
    Ok(())
}

#[test]
fn constraint_failure_reports_extended_code() -> Result<()> {
    let conn = create_test_db()?;
    conn.execute("INSERT INTO cells (id) VALUES (1)")?;
    let mut stmt = conn.prepare("INSERT INTO cells (id) VALUES (1)")?;
    let err = stmt.step().unwrap_err();
    assert_eq!(err.kind(), sqlite_veneer::ErrorKind::Constraint);
    assert_ne!(err.code(), err.primary_code());

    // A failed statement can be reset and reused.
    stmt.reset()?;
    assert!(stmt.step().is_err());
    Ok(())
}
