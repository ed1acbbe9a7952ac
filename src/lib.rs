#[macro_use]
extern crate rocket;

pub mod boot;
pub mod client;
pub mod client_info;
pub mod config;
pub mod db;
pub mod models;
pub mod routes;

#[cfg(test)]
mod tests;

use rocket::fairing::{AdHoc, Fairing, Info, Kind};
use rocket::fs::{FileServer, Options};
use rocket::http::{Header, Status};
use rocket::{Build, Rocket};

use config::AppConfig;
use db::Db;
use routes::status::Uptime;

/// Echoes allowed origins back with the CORS headers a browser needs.
pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "CORS",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, req: &'r rocket::Request<'_>, res: &mut rocket::Response<'r>) {
        let origin = match req.headers().get_one("Origin") {
            Some(origin) => origin,
            None => return,
        };
        let allowed = req
            .rocket()
            .state::<AppConfig>()
            .map(|c| c.allows_origin(origin))
            .unwrap_or(false);
        if !allowed {
            return;
        }

        res.set_header(Header::new("Access-Control-Allow-Origin", origin.to_string()));
        res.set_header(Header::new("Vary", "Origin"));
        res.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "GET, POST, PUT, DELETE, OPTIONS",
        ));
        res.set_header(Header::new(
            "Access-Control-Allow-Headers",
            "Content-Type, Authorization",
        ));
        res.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

/// Preflight requests get an empty 204; the fairing adds the headers.
#[options("/<_..>")]
fn preflight() -> Status {
    Status::NoContent
}

/// Assembles the application. `main` and the HTTP tests share this.
pub fn build_rocket(config: AppConfig, db: Db) -> Rocket<Build> {
    let static_dir = config.static_dir.clone();

    rocket::build()
        .manage(db)
        .manage(config)
        .manage(Uptime::start())
        .attach(Cors)
        .attach(AdHoc::on_shutdown("Database pool", |rocket| {
            Box::pin(async move {
                if let Some(db) = rocket.state::<Db>() {
                    log::info!(
                        "[db] releasing pool ({} open connection(s))",
                        db.open_connections()
                    );
                }
            })
        }))
        .mount("/", routes![preflight])
        .mount("/", routes::status::root_routes())
        .mount("/", FileServer::new(static_dir, Options::Missing | Options::Index).rank(10))
        .mount("/api", routes::status::routes())
        .mount("/api", routes::gallery::routes())
        .mount("/api", routes::birthday::routes())
        .mount("/api", routes::wishes::routes())
        .mount("/api", routes::visitors::routes())
        .mount("/api", routes::analytics::routes())
        .register("/", routes::catchers())
}
