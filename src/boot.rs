use log::{error, info, warn};
use std::fs;
use std::path::Path;
use std::process;

use crate::config::AppConfig;

/// Run all boot checks. Call this before Rocket launches.
/// Creates the database directory if missing, warns about a missing frontend
/// build, and aborts if the database location is unusable.
pub fn run(config: &AppConfig) {
    info!("[boot] checks starting...");

    let (warnings, errors) = check(config);

    if errors > 0 {
        error!(
            "[boot] FAILED: {} error(s), {} warning(s). Aborting.",
            errors, warnings
        );
        process::exit(1);
    }

    if warnings > 0 {
        warn!(
            "[boot] passed with {} warning(s). Some features may not work correctly.",
            warnings
        );
    } else {
        info!("[boot] passed. All systems go.");
    }
}

/// Returns `(warnings, errors)`.
pub fn check(config: &AppConfig) -> (u32, u32) {
    let mut warnings = 0u32;
    let mut errors = 0u32;

    // ── 1. Database directory ──────────────────────────
    let db_dir = Path::new(&config.database_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = db_dir {
        if !dir.exists() {
            match fs::create_dir_all(dir) {
                Ok(_) => info!("[boot]   Created directory: {}", dir.display()),
                Err(e) => {
                    error!("[boot]   FAILED to create directory {}: {}", dir.display(), e);
                    errors += 1;
                }
            }
        }

        // ── 2. Database directory writable ─────────────
        if dir.exists() {
            let test_file = dir.join(".write_test");
            match fs::write(&test_file, "test") {
                Ok(_) => {
                    let _ = fs::remove_file(&test_file);
                }
                Err(e) => {
                    error!("[boot]   Database directory not writable: {}", e);
                    errors += 1;
                }
            }
        }
    }

    // ── 3. Frontend build ──────────────────────────────
    let static_dir = Path::new(&config.static_dir);
    if !static_dir.is_dir() {
        warn!(
            "[boot]   Static directory {} not found (only the API will be served)",
            config.static_dir
        );
        warnings += 1;
    } else if !static_dir.join("index.html").exists() {
        warn!("[boot]   {}/index.html missing", config.static_dir);
        warnings += 1;
    }

    // ── 4. Rocket.toml exists ──────────────────────────
    if !Path::new("Rocket.toml").exists() {
        warn!("[boot]   Rocket.toml not found, using default config");
        warnings += 1;
    }

    (warnings, errors)
}
