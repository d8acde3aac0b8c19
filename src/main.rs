use actix_cors::Cors;
use actix_web::{App, HttpServer};
use std::io;
use tracing_subscriber::EnvFilter;

mod database;
mod error;
mod models;
mod routes;
mod storage;
mod variance;

#[actix_web::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let db_uri: String =
        std::env::var("MONGODB_URI").unwrap_or_else(|_| String::from("mongodb://localhost:27017"));
    let db_name: String =
        std::env::var("DATABASE_NAME").unwrap_or_else(|_| String::from("remtrack"));
    let bind_addr: String =
        std::env::var("BIND_ADDR").unwrap_or_else(|_| String::from("127.0.0.1:8000"));

    models::user::load_keys();
    database::connect(db_uri, &db_name).await;

    tracing::info!(address = %bind_addr, "starting remediation operations server");

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(models::user::UserAuthenticationMiddlewareFactory)
            .service(routes::get_file)
            .service(routes::job_completion::get_completion)
            .service(routes::job_completion::create_completion)
            .service(routes::job_completion::update_completion)
            .service(routes::job_completion::submit_completion)
            .service(routes::job_completion::approve_completion)
            .service(routes::job_completion::reject_completion)
            .service(routes::time_entry::get_time_entries)
            .service(routes::time_entry::create_time_entry)
            .service(routes::time_entry::update_time_entry)
            .service(routes::time_entry::delete_time_entry)
            .service(routes::material_usage::get_material_usage)
            .service(routes::material_usage::create_material_usage)
            .service(routes::material_usage::update_material_usage)
            .service(routes::material_usage::delete_material_usage)
            .service(routes::completion_photo::get_photos)
            .service(routes::completion_photo::create_photo)
            .service(routes::completion_photo::upload_photo_file)
            .service(routes::completion_photo::delete_photo)
            .service(routes::checklist::initialize_checklist)
            .service(routes::checklist::get_checklist)
            .service(routes::checklist::get_checklist_progress)
            .service(routes::checklist::update_checklist_item)
            .service(routes::summary::get_completion_summary)
    })
    .bind(bind_addr.as_str())?
    .run()
    .await
}
