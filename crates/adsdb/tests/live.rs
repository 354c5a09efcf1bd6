//! Round trips against a real server.
//!
//! Needs the `ace` feature and either `ADSDB_CONNECTION_STRING` or
//! `ADSDB_DATASOURCE`; every test passes trivially otherwise.

#![cfg(feature = "ace")]

use adsdb::{AdsConfig, Connection, Environment, NaiveDate, Param, Value};

const TABLE: &str = "adsdbtest_booze";

fn connect(env: &Environment) -> Option<Connection> {
    let config = AdsConfig::from_env()?.read_only(false);
    Some(env.connect(&config).expect("connect to test server"))
}

struct Table<'c> {
    conn: &'c Connection,
}

impl<'c> Table<'c> {
    fn create(conn: &'c Connection) -> Self {
        let mut cursor = conn.cursor().unwrap();
        cursor
            .execute(
                &format!(
                    "CREATE TABLE {TABLE} (b BLOB, i INTEGER, d DOUBLE, nc NVARCHAR(60), \
                     da DATE, ts TIMESTAMP)"
                ),
                &[],
            )
            .unwrap();
        cursor.close().unwrap();
        Self { conn }
    }
}

impl Drop for Table<'_> {
    fn drop(&mut self) {
        if let Ok(mut cursor) = self.conn.cursor() {
            let _ = cursor.execute(&format!("DROP TABLE {TABLE}"), &[]);
            let _ = cursor.close();
        }
    }
}

#[test]
fn install_info_procedure() {
    let env = Environment::native().unwrap();
    let Some(conn) = connect(&env) else {
        return;
    };
    let mut cursor = conn.cursor().unwrap();
    cursor.callproc("sp_mgGetInstallInfo", &[]).unwrap();
    assert!(cursor.description().unwrap().is_some());
    assert!(cursor.fetchone().unwrap().is_some());
    cursor.close().unwrap();
    conn.close().unwrap();
    assert_eq!(env.leak_report(), adsdb::LeakReport::default());
}

#[test]
fn values_round_trip() {
    let env = Environment::native().unwrap();
    let Some(conn) = connect(&env) else {
        return;
    };
    let table = Table::create(&conn);
    let date = NaiveDate::from_ymd_opt(2015, 12, 19).unwrap();
    let ts = date.and_hms_opt(18, 10, 0).unwrap();

    let mut cursor = conn.cursor().unwrap();
    cursor
        .execute(
            &format!("INSERT INTO {TABLE} VALUES (?, ?, ?, ?, ?, ?)"),
            &[
                Param::from(vec![0x55_u8, 0xAA]),
                Param::from(-7),
                Param::from(1.1),
                Param::from("Ça peut pas faire de mal"),
                Param::from(date),
                Param::from(ts),
            ],
        )
        .unwrap();
    assert_eq!(cursor.rowcount().unwrap(), 1);

    cursor.execute(&format!("SELECT * FROM {TABLE}"), &[]).unwrap();
    let row = cursor.fetchone().unwrap().unwrap();
    assert_eq!(
        row,
        vec![
            Value::Bytes(vec![0x55, 0xAA]),
            Value::Int(-7),
            Value::Double(1.1),
            Value::Text("Ça peut pas faire de mal".into()),
            Value::Date(date),
            Value::Timestamp(ts),
        ]
    );
    cursor.close().unwrap();
    drop(table);
    conn.close().unwrap();
}

#[test]
fn nulls_round_trip() {
    let env = Environment::native().unwrap();
    let Some(conn) = connect(&env) else {
        return;
    };
    let table = Table::create(&conn);

    let mut cursor = conn.cursor().unwrap();
    let nulls = vec![Param::Null; 6];
    cursor
        .executemany(&format!("INSERT INTO {TABLE} VALUES (?, ?, ?, ?, ?, ?)"), [&nulls, &nulls])
        .unwrap();
    assert_eq!(cursor.rowcount().unwrap(), 2);

    cursor.execute(&format!("SELECT * FROM {TABLE}"), &[]).unwrap();
    for row in cursor.fetchall().unwrap() {
        assert!(row.values().all(Value::is_null));
    }
    cursor.close().unwrap();
    drop(table);
    conn.close().unwrap();
}
