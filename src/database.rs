use mongodb::{Client, Database};
use std::sync::OnceLock;

static DB: OnceLock<Database> = OnceLock::new();

pub async fn connect(uri: String, name: &str) {
    let client = Client::with_uri_str(uri)
        .await
        .expect("Failed to connect to database");
    if DB.set(client.database(name)).is_err() {
        panic!("Database is already connected");
    }
}

pub fn get_db() -> Database {
    DB.get().expect("Database is not available yet!").clone()
}
