// src/web/handlers/profile_handlers.rs
use crate::database::Database;
use crate::models::{Profile, User};
use crate::web::types::*;

use rocket::serde::json::Json;
use rocket::State;

pub async fn list_users_handler(db: &State<Database>) -> ApiResult<Vec<User>> {
    let users = db.users().get_all_users().await.map_err(database_error)?;
    Ok(Json(DataResponse::success(
        format!("Found {} users", users.len()),
        users,
    )))
}

pub async fn get_user_handler(id: i64, db: &State<Database>) -> ApiResult<User> {
    let user = db
        .users()
        .get_user_by_id(id)
        .await
        .map_err(database_error)?
        .ok_or_else(|| not_found("User"))?;
    Ok(Json(DataResponse::success("User found", user)))
}

pub async fn list_profiles_handler(db: &State<Database>) -> ApiResult<Vec<Profile>> {
    let profiles = db
        .profiles()
        .get_all_profiles()
        .await
        .map_err(database_error)?;
    Ok(Json(DataResponse::success(
        format!("Found {} profiles", profiles.len()),
        profiles,
    )))
}

pub async fn get_profile_handler(id: i64, db: &State<Database>) -> ApiResult<Profile> {
    let profile = db
        .profiles()
        .get_profile_by_id(id)
        .await
        .map_err(database_error)?
        .ok_or_else(|| not_found("Profile"))?;
    Ok(Json(DataResponse::success("Profile found", profile)))
}
