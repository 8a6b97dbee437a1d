use std::error::Error;

use bytes::BytesMut;
use log::{debug, info};
use postgres::{
    binary_copy::BinaryCopyInWriter,
    types::{to_sql_checked, IsNull, ToSql, Type},
    Client, NoTls,
};

use crate::{
    config::PgSettings,
    dataset::{ColumnType, Dataset, Value},
    db::{
        sql::{self, Dialect},
        StagingStore,
    },
    error::LoadError,
};

pub struct PostgresStore {
    client: Client,
}

impl PostgresStore {
    pub fn connect(settings: &PgSettings) -> Result<PostgresStore, LoadError> {
        debug!(
            "connecting to postgres at {}:{}/{}",
            settings.host, settings.port, settings.dbname
        );
        let client = postgres::Config::new()
            .user(&settings.user)
            .password(&settings.password)
            .dbname(&settings.dbname)
            .host(&settings.host)
            .port(settings.port)
            .connect(NoTls)?;
        Ok(PostgresStore { client })
    }
}

fn pg_type(kind: ColumnType) -> Type {
    match kind {
        ColumnType::Integer => Type::INT8,
        ColumnType::Float => Type::FLOAT8,
        ColumnType::Text => Type::TEXT,
    }
}

impl StagingStore for PostgresStore {
    fn backend(&self) -> &'static str {
        "Postgres"
    }

    /// Load into a shadow table, then drop the old table and rename the
    /// shadow over it, all in one transaction.
    fn replace_table(&mut self, table: &str, dataset: &Dataset) -> Result<u64, LoadError> {
        sql::validate_table_name(table)?;
        sql::check_columns(Dialect::Postgres, dataset.columns())?;
        let shadow = sql::shadow_table_name(table);
        let columns = dataset.columns();
        let types: Vec<Type> = columns.iter().map(|c| pg_type(c.kind)).collect();

        let mut tx = self.client.transaction()?;
        tx.batch_execute(&format!(
            "DROP TABLE IF EXISTS {}; {};",
            sql::quote_ident(&shadow),
            sql::create_table(Dialect::Postgres, &shadow, columns)
        ))?;

        let copy = format!(
            "COPY {} ({}) FROM STDIN (FORMAT BINARY)",
            sql::quote_ident(&shadow),
            sql::column_list(columns)
        );
        let sink = tx.copy_in(copy.as_str())?;
        let mut writer = BinaryCopyInWriter::new(sink, &types);
        for row in dataset.rows() {
            let values: Vec<&(dyn ToSql + Sync)> =
                row.iter().map(|v| v as &(dyn ToSql + Sync)).collect();
            writer.write(&values)?;
        }
        let n = writer.finish()?;
        debug!("copied {} rows into {}", n, shadow);

        tx.batch_execute(&format!(
            "DROP TABLE IF EXISTS {}; ALTER TABLE {} RENAME TO {};",
            sql::quote_ident(table),
            sql::quote_ident(&shadow),
            sql::quote_ident(table)
        ))?;
        tx.commit()?;
        info!("replaced table {} with {} rows", table, n);
        Ok(n)
    }

    fn row_count(&mut self, table: &str) -> Result<u64, LoadError> {
        sql::validate_table_name(table)?;
        let row = self.client.query_one(
            format!("SELECT COUNT(*) FROM {}", sql::quote_ident(table)).as_str(),
            &[],
        )?;
        Ok(row.get::<_, i64>(0) as u64)
    }
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Int(v) => v.to_sql(ty, out),
            Value::Float(v) => v.to_sql(ty, out),
            Value::Text(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(ty: &Type) -> bool {
        <i64 as ToSql>::accepts(ty) || <f64 as ToSql>::accepts(ty) || <String as ToSql>::accepts(ty)
    }

    to_sql_checked!();
}
