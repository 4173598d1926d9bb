// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

use sqlrepo::prelude::*;

#[derive(SqlEntity)]
#[sql_entity(table = "users")]
pub struct User {
    #[sql(id)]
    pub id: i64,
    pub name: String,
    pub score: Option<i64>,
    #[sql(column = "is_active")]
    pub active: bool,
}

#[repository(entity = User, table = "users", dialect = "postgres")]
pub trait UserRepo {
    #[sql("SELECT {{columns}} FROM {{table}} WHERE {{pk}} = @id")]
    async fn get_by_id(&self, id: i64) -> Result<Option<User>, RepoError>;

    #[sql("SELECT {{columns}} FROM {{table}} ORDER BY {{pk}} {{limit}} {{offset}}")]
    async fn get_slice(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<User>, RepoError>;

    #[sql("SELECT {{columns}} FROM {{table}} WHERE is_active = {{bool_true}} {{limit:small}}")]
    async fn recently_active(&self) -> Result<Vec<User>, RepoError>;

    #[sql("SELECT {{columns}} FROM {{table}} {{where @predicate}}")]
    async fn search(
        &self,
        predicate: Predicate,
        token: CancellationToken,
    ) -> Result<Vec<User>, RepoError>;

    #[sql("UPDATE {{table}} SET score = @score, touched_at = {{current_timestamp}} WHERE {{pk}} = @id")]
    async fn touch(&self, id: i64, score: Option<i64>) -> Result<u64, RepoError>;

    #[sql("SELECT COUNT(*) FROM {{table}} WHERE name = 'a@b.com'")]
    async fn count_literal_at(&self) -> Result<i64, RepoError>;

    #[sql("INSERT INTO {{table}} ({{columns}}) VALUES {{batch_values}}")]
    #[returning_id]
    async fn insert_get_id(&self, entity: User) -> Result<i64, RepoError>;
}

fn main() {}
