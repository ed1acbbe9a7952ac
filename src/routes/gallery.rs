use rocket::serde::json::Json;
use chrono::Utc;
use rocket::State;
use serde_json::json;

use super::{bad_request, created, failure, not_found, ok, required, ApiResponse};
use crate::config::AppConfig;
use crate::db::Db;
use crate::models::gallery::{GalleryForm, GalleryImage, GalleryPatch};

#[get("/gallery")]
pub fn list_images(db: &State<Db>, config: &State<AppConfig>) -> ApiResponse {
    match GalleryImage::list_active(db) {
        Ok(images) => ok(json!({
            "count": images.len(),
            "images": images,
            "timestamp": Utc::now().to_rfc3339(),
        })),
        Err(e) => failure(config, "Failed to fetch gallery images", &e),
    }
}

#[get("/gallery/stats")]
pub fn image_stats(db: &State<Db>, config: &State<AppConfig>) -> ApiResponse {
    match GalleryImage::stats(db) {
        Ok(stats) => ok(json!({ "stats": stats })),
        Err(e) => failure(config, "Failed to fetch gallery statistics", &e),
    }
}

#[get("/gallery/category/<category>")]
pub fn images_by_category(
    db: &State<Db>,
    config: &State<AppConfig>,
    category: &str,
) -> ApiResponse {
    match GalleryImage::by_category(db, category) {
        Ok(images) => ok(json!({
            "category": category,
            "count": images.len(),
            "images": images,
        })),
        Err(e) => failure(config, "Failed to fetch gallery images", &e),
    }
}

#[get("/gallery/<id>")]
pub fn get_image(db: &State<Db>, config: &State<AppConfig>, id: &str) -> ApiResponse {
    match GalleryImage::find_by_id(db, id) {
        Ok(Some(image)) => ok(json!({ "image": image })),
        Ok(None) => not_found("Image not found"),
        Err(e) => failure(config, "Failed to fetch image", &e),
    }
}

#[post("/gallery", data = "<body>")]
pub fn create_image(
    db: &State<Db>,
    config: &State<AppConfig>,
    body: Json<GalleryPatch>,
) -> ApiResponse {
    let body = body.into_inner();
    let src = match required(&body.src) {
        Some(src) => src.to_string(),
        None => return bad_request("Image source is required"),
    };

    let form = GalleryForm {
        src,
        alt: body.alt,
        metadata: body.metadata,
        display_order: body.display_order,
        file_size: body.file_size,
        mime_type: body.mime_type,
        width: body.width,
        height: body.height,
    };

    match GalleryImage::create(db, &form) {
        Ok(image) => created(json!({
            "image": image,
            "message": "Image added successfully",
        })),
        Err(e) => failure(config, "Failed to add image", &e),
    }
}

#[put("/gallery/<id>", data = "<body>")]
pub fn update_image(
    db: &State<Db>,
    config: &State<AppConfig>,
    id: &str,
    body: Json<GalleryPatch>,
) -> ApiResponse {
    if matches!(body.src.as_deref().map(str::trim), Some("")) {
        return bad_request("Image source cannot be empty");
    }
    if let Err(e) = GalleryImage::update(db, id, &body) {
        return failure(config, "Failed to update image", &e);
    }

    match GalleryImage::find_by_id(db, id) {
        Ok(Some(image)) => ok(json!({
            "image": image,
            "message": "Image updated successfully",
        })),
        Ok(None) => not_found("Image not found"),
        Err(e) => failure(config, "Failed to fetch image", &e),
    }
}

#[delete("/gallery/<id>")]
pub fn delete_image(db: &State<Db>, config: &State<AppConfig>, id: &str) -> ApiResponse {
    match GalleryImage::soft_delete(db, id) {
        Ok(summary) if summary.affected == 0 => not_found("Image not found"),
        Ok(_) => ok(json!({ "message": "Image deleted successfully" })),
        Err(e) => failure(config, "Failed to delete image", &e),
    }
}

#[delete("/gallery/<id>/permanent")]
pub fn purge_image(db: &State<Db>, config: &State<AppConfig>, id: &str) -> ApiResponse {
    match GalleryImage::permanent_delete(db, id) {
        Ok(summary) if summary.affected == 0 => not_found("Image not found"),
        Ok(_) => ok(json!({ "message": "Image permanently deleted" })),
        Err(e) => failure(config, "Failed to delete image", &e),
    }
}

pub fn routes() -> Vec<rocket::Route> {
    routes![
        list_images,
        image_stats,
        images_by_category,
        get_image,
        create_image,
        update_image,
        delete_image,
        purge_image
    ]
}
