use rocket_db_pools::{Database, sqlx};

#[derive(Database)]
#[database("vidtube_db")]
pub struct VidtubeDb(sqlx::PgPool);
