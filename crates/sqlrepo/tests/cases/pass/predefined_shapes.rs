// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

use sqlrepo::prelude::*;

#[derive(SqlEntity)]
#[sql_entity(table = "events")]
pub struct Event {
    #[sql(id)]
    pub id: i64,
    pub kind: String,
    pub payload: Option<String>,
    pub weight: f64,
}

#[repository(
    entity = Event,
    table = "events",
    dialect = "sqlite",
    max_batch_size = 50,
    limit_presets(feed = 25),
    shapes(
        crud,
        query,
        command,
        batch,
        aggregate,
        partial_update,
        expression_update,
        advanced,
        maintenance
    )
)]
pub trait EventStore {
    #[sql("SELECT {{columns}} FROM {{table}} WHERE kind = @kind {{limit:feed}}")]
    async fn feed(&self, kind: String) -> Result<Vec<Event>, RepoError>;
}

fn main() {}
