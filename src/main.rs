use std::process;

use birthday_board::config::AppConfig;
use birthday_board::db::Db;
use birthday_board::{boot, build_rocket};

#[rocket::launch]
fn rocket() -> _ {
    env_logger::init();

    let config = AppConfig::from_figment(&rocket::Config::figment());

    // Boot check: create the database directory, warn about a missing frontend build
    boot::run(&config);

    let db = Db::open(&config.database_path);
    if let Err(e) = db.run_migrations() {
        log::error!("[db] migrations failed: {}", e);
        process::exit(1);
    }
    log::info!("[db] ready at {}", config.database_path);

    build_rocket(config, db)
}
