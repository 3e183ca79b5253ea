// src/database/profiles.rs
use crate::models::{NewProfile, Profile, User};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::info;

// ===== Users =====

pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_all_users(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, name, email, created_at, updated_at FROM users ORDER BY id ASC",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(users)
    }

    pub async fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, created_at, updated_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }

    pub async fn create_user(&self, name: &str, email: &str) -> Result<User> {
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO users (name, email, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(name)
        .bind(email)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await
        .with_context(|| format!("Failed to create user {}", email))?;

        info!("Created user {} <{}>", name, email);
        Ok(User {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            email: email.to_string(),
            created_at: now,
            updated_at: now,
        })
    }
}

// ===== Profiles =====

/// Row shape of `profiles`; keywords are stored as a JSON array
#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: i64,
    user_id: i64,
    name: String,
    keywords: String,
    location: Option<String>,
    additional_context: Option<String>,
    resume: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = anyhow::Error;

    fn try_from(row: ProfileRow) -> Result<Self> {
        let keywords = serde_json::from_str(&row.keywords)
            .with_context(|| format!("Invalid keywords stored for profile {}", row.id))?;
        Ok(Profile {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            keywords,
            location: row.location,
            additional_context: row.additional_context,
            resume: row.resume,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const PROFILE_COLUMNS: &str = "id, user_id, name, keywords, location, additional_context, \
                               resume, created_at, updated_at";

pub struct ProfileRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ProfileRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_all_profiles(&self) -> Result<Vec<Profile>> {
        sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {} FROM profiles ORDER BY id ASC",
            PROFILE_COLUMNS
        ))
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(Profile::try_from)
        .collect()
    }

    pub async fn get_profile_by_id(&self, id: i64) -> Result<Option<Profile>> {
        sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {} FROM profiles WHERE id = ?",
            PROFILE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .map(Profile::try_from)
        .transpose()
    }

    pub async fn get_profile_by_name(&self, name: &str) -> Result<Option<Profile>> {
        sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {} FROM profiles WHERE name = ? ORDER BY id ASC LIMIT 1",
            PROFILE_COLUMNS
        ))
        .bind(name)
        .fetch_optional(self.pool)
        .await?
        .map(Profile::try_from)
        .transpose()
    }

    pub async fn create_profile(&self, profile: &NewProfile) -> Result<Profile> {
        let now = Utc::now();
        let keywords = serde_json::to_string(&profile.keywords)?;

        let result = sqlx::query(
            r#"
            INSERT INTO profiles (user_id, name, keywords, location, additional_context, resume,
                                  created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(profile.user_id)
        .bind(&profile.name)
        .bind(&keywords)
        .bind(&profile.location)
        .bind(&profile.additional_context)
        .bind(&profile.resume)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await
        .with_context(|| format!("Failed to create profile {}", profile.name))?;

        info!("Created profile {} for user {}", profile.name, profile.user_id);
        Ok(Profile {
            id: result.last_insert_rowid(),
            user_id: profile.user_id,
            name: profile.name.clone(),
            keywords: profile.keywords.clone(),
            location: profile.location.clone(),
            additional_context: profile.additional_context.clone(),
            resume: profile.resume.clone(),
            created_at: now,
            updated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::database::testing::{memory_db, seed_profile};
    use crate::models::NewProfile;

    #[tokio::test]
    async fn test_profile_keywords_round_trip_through_json() {
        let db = memory_db().await;
        let (user, profile) = seed_profile(&db).await;

        let loaded = db
            .profiles()
            .get_profile_by_id(profile.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.user_id, user.id);
        assert_eq!(loaded.keywords, vec!["Rust", "Backend Developer"]);
        assert_eq!(loaded.location.as_deref(), Some("105149290"));

        let by_name = db.profiles().get_profile_by_name("backend").await.unwrap();
        assert_eq!(by_name.map(|p| p.id), Some(profile.id));
        assert!(db.profiles().get_profile_by_name("frontend").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_profile_requires_existing_user() {
        let db = memory_db().await;
        let result = db
            .profiles()
            .create_profile(&NewProfile {
                user_id: 42,
                name: "orphan".to_string(),
                keywords: Vec::new(),
                location: None,
                additional_context: None,
                resume: None,
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_users_listing() {
        let db = memory_db().await;
        seed_profile(&db).await;
        db.users().create_user("Grace Hopper", "grace@example.com").await.unwrap();

        let users = db.users().get_all_users().await.unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[1].email, "grace@example.com");
        assert!(db.users().get_user_by_id(99).await.unwrap().is_none());
        assert!(db
            .users()
            .create_user("Dup", "grace@example.com")
            .await
            .is_err());
    }
}
