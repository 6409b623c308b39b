//! SQLite schema definitions for the catalog database.
//!
//! Item and tag ids are AUTOINCREMENT rowids so that a deleted id is never
//! handed out again. The natural keys (item source URL, tag label) carry
//! UNIQUE constraints.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
};

/// Items table - one row per cataloged work
const ITEMS_TABLE: Table = Table {
    name: "items",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            autoincrement = true
        ),
        sqlite_column!("artist", &SqlType::Text, non_null = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("release_date", &SqlType::Text), // '2023-05-15', '2023-05', '2023'
        sqlite_column!("release_year", &SqlType::Integer),
        sqlite_column!("source_url", &SqlType::Text, non_null = true),
        sqlite_column!("item_type", &SqlType::Text), // 'album', 'single', 'compilation', ...
    ],
    indices: &[
        ("idx_items_artist", "artist"),
        ("idx_items_item_type", "item_type"),
    ],
    unique_constraints: &[&["source_url"]],
};

/// Tags table - free-form labels, BINARY collation (case-sensitive)
const TAGS_TABLE: Table = Table {
    name: "tags",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            autoincrement = true
        ),
        sqlite_column!("label", &SqlType::Text, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[&["label"]],
};

const ITEM_FK: ForeignKey = ForeignKey {
    foreign_table: "items",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const TAG_FK: ForeignKey = ForeignKey {
    foreign_table: "tags",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

/// Item <-> Tag association
const ITEM_TAGS_TABLE: Table = Table {
    name: "item_tags",
    columns: &[
        sqlite_column!(
            "item_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ITEM_FK)
        ),
        sqlite_column!(
            "tag_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&TAG_FK)
        ),
    ],
    indices: &[("idx_item_tags_tag", "tag_id")],
    unique_constraints: &[&["item_id", "tag_id"]],
};

pub const CATALOG_SCHEMA: VersionedSchema = VersionedSchema {
    version: 0,
    tables: &[ITEMS_TABLE, TAGS_TABLE, ITEM_TAGS_TABLE],
};
