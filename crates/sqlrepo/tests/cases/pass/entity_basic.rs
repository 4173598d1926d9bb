// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

use sqlrepo::prelude::*;

#[derive(SqlEntity)]
#[sql_entity(table = "notes")]
pub struct Note {
    #[sql(id)]
    pub id: i64,
    pub title: String,
    #[sql(column = "body_text")]
    pub body: Option<String>,
    pub pinned: bool,
    #[sql(readonly)]
    pub created_at: String,
}

fn main() {
    assert_eq!(Note::TABLE, "notes");
    assert_eq!(Note::COLUMNS.len(), 5);
    assert_eq!(Note::COLUMNS[2].name, "body_text");
    assert!(Note::COLUMNS[3].boolean);
    assert!(!Note::COLUMNS[4].insertable);
}
