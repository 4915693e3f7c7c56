//! Table and column definitions for entity tables.
//!
//! Core columns are fixed identifiers; attribute columns and table names
//! come from the entity adapter.

use sea_query::Iden;

use crate::entity::{Entity, FieldDef, CORE_FIELDS};

/// Identity and audit columns present in every entity table.
#[derive(Iden, Clone, Copy)]
pub enum CoreColumn {
    #[iden = "row_id"]
    RowId,
    #[iden = "surrogate_id"]
    SurrogateId,
    #[iden = "urn"]
    Urn,
    #[iden = "name"]
    Name,
    #[iden = "created"]
    Created,
    #[iden = "modified"]
    Modified,
    #[iden = "deleted"]
    Deleted,
    #[iden = "version"]
    Version,
    #[iden = "active"]
    Active,
}

/// Every column of an entity table, in declaration order.
pub fn columns<E: Entity>() -> impl Iterator<Item = &'static FieldDef> {
    CORE_FIELDS.iter().chain(E::FIELDS.iter())
}

/// Look up a column definition by name.
pub fn column<E: Entity>(name: &str) -> Option<&'static FieldDef> {
    columns::<E>().find(|f| f.name == name)
}

/// DDL statements creating the table and its indexes, idempotently.
pub fn create_statements<E: Entity>() -> Vec<String> {
    let table = E::TABLE;
    let mut defs: Vec<String> = Vec::new();
    for field in columns::<E>() {
        let sql_type = match field.name {
            "urn" => "VARCHAR(128)",
            "name" => "VARCHAR(64)",
            _ => field.kind.sql_type(),
        };
        let mut def = format!("{} {}", field.name, sql_type);
        if field.name == "row_id" {
            def.push_str(" PRIMARY KEY");
        }
        if !field.nullable {
            def.push_str(" NOT NULL");
        }
        defs.push(def);
    }

    vec![
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            table,
            defs.join(",\n    ")
        ),
        format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS ix_{table}_id_version ON {table}(surrogate_id, version)"
        ),
        format!("CREATE INDEX IF NOT EXISTS ix_{table}_id_active ON {table}(surrogate_id, active)"),
        format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS ix_{table}_urn_version ON {table}(urn, version)"
        ),
        format!("CREATE INDEX IF NOT EXISTS ix_{table}_name ON {table}(name)"),
    ]
}
