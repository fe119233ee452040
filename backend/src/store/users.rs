use diesel::prelude::*;
use shared::{CreateMechanic, RegisterMechanic, Role, Session};

use super::{now_stamp, require_admin, required, Store};
use crate::db::schema::{login_logs, users};
use crate::error::{conflict_on_unique, GarageError, GarageResult};
use crate::models::{LoginLog, NewLoginLog, NewUser, User};

const DUPLICATE_USERNAME: &str = "Username already exists";

impl Store {
    pub(super) fn seed_admin(&mut self, password: &str) -> GarageResult<()> {
        let admins: i64 = users::table
            .filter(users::role.eq(Role::Admin.as_str()))
            .count()
            .get_result(&mut self.conn)?;
        if admins > 0 {
            return Ok(());
        }

        let taken: i64 = users::table
            .filter(users::username.eq("admin"))
            .count()
            .get_result(&mut self.conn)?;
        if taken > 0 {
            tracing::warn!("no administrator exists and username 'admin' is held by a mechanic");
            return Ok(());
        }

        self.create_user("admin", password, Role::Admin, Some("Administrator"))?;
        tracing::info!("seeded default administrator account");
        Ok(())
    }

    /// Check a username/password pair and record the login.
    ///
    /// Unknown usernames and wrong passwords produce the same error.
    pub fn authenticate(&mut self, username: &str, password: &str) -> GarageResult<Session> {
        let username = username.trim();
        let user = users::table
            .filter(users::username.eq(username))
            .select(User::as_select())
            .first(&mut self.conn)
            .optional()?;

        let Some(user) = user else {
            tracing::debug!(username, "login attempt for unknown user");
            return Err(GarageError::InvalidCredentials);
        };

        if !self.password_matches(&user, password)? {
            tracing::debug!(username, "login attempt with wrong password");
            return Err(GarageError::InvalidCredentials);
        }

        let role = user.role().unwrap_or(Role::Mechanic);
        diesel::insert_into(login_logs::table)
            .values(&NewLoginLog {
                username: Some(user.username.clone()),
                role: Some(role.as_str().to_string()),
                login_time: Some(now_stamp()),
            })
            .execute(&mut self.conn)?;
        tracing::info!(username, role = role.as_str(), "user logged in");

        Ok(Session {
            user_id: user.id,
            username: user.username.clone(),
            full_name: user.display_name().to_string(),
            role,
        })
    }

    /// Session for an existing account without a password check or a login
    /// record. Used by trusted local tooling.
    pub fn session_for(&mut self, username: &str) -> GarageResult<Session> {
        let username = username.trim();
        let user = users::table
            .filter(users::username.eq(username))
            .select(User::as_select())
            .first(&mut self.conn)
            .optional()?
            .ok_or_else(|| GarageError::not_found(format!("No user named '{username}'")))?;
        Ok(Session {
            user_id: user.id,
            username: user.username.clone(),
            full_name: user.display_name().to_string(),
            role: user.role().unwrap_or(Role::Mechanic),
        })
    }

    /// Databases created before hashing stored passwords as plain text; a
    /// successful login against one of those rewrites it as a bcrypt hash.
    fn password_matches(&mut self, user: &User, password: &str) -> GarageResult<bool> {
        match bcrypt::verify(password, &user.password) {
            Ok(matches) => Ok(matches),
            Err(_) if user.password == password => {
                let hashed = bcrypt::hash(password, self.bcrypt_cost)?;
                diesel::update(users::table.find(user.id))
                    .set(users::password.eq(hashed))
                    .execute(&mut self.conn)?;
                tracing::info!(username = %user.username, "upgraded legacy plain-text password");
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    pub fn create_user(
        &mut self,
        username: &str,
        password: &str,
        role: Role,
        full_name: Option<&str>,
    ) -> GarageResult<shared::User> {
        let username = required(username, "Username")?;
        if password.is_empty() {
            return Err(GarageError::validation("Password is required"));
        }
        let full_name = full_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        let taken: i64 = users::table
            .filter(users::username.eq(&username))
            .count()
            .get_result(&mut self.conn)?;
        if taken > 0 {
            return Err(GarageError::Conflict(DUPLICATE_USERNAME.to_string()));
        }

        let new_user = NewUser {
            username,
            password: bcrypt::hash(password, self.bcrypt_cost)?,
            role: role.as_str().to_string(),
            full_name,
        };
        let user = diesel::insert_into(users::table)
            .values(&new_user)
            .returning(User::as_returning())
            .get_result(&mut self.conn)
            .map_err(conflict_on_unique(DUPLICATE_USERNAME))?;

        tracing::info!(username = %user.username, role = role.as_str(), "created user");
        Ok(user.into())
    }

    /// Self-service sign-up from the login screen. Always creates a mechanic.
    pub fn register_mechanic(&mut self, req: &RegisterMechanic) -> GarageResult<shared::User> {
        let full_name = required(&req.full_name, "Full name")?;
        required(&req.username, "Username")?;
        required(&req.password, "Password")?;
        required(&req.confirm_password, "Password confirmation")?;
        if req.password != req.confirm_password {
            return Err(GarageError::validation("Passwords do not match"));
        }
        self.create_user(&req.username, &req.password, Role::Mechanic, Some(&full_name))
    }

    pub fn add_mechanic(
        &mut self,
        actor: &Session,
        req: &CreateMechanic,
    ) -> GarageResult<shared::User> {
        require_admin(actor, "add mechanics")?;
        let full_name = required(&req.full_name, "Full name")?;
        required(&req.password, "Password")?;
        self.create_user(&req.username, &req.password, Role::Mechanic, Some(&full_name))
    }

    pub fn list_users(&mut self) -> GarageResult<Vec<shared::User>> {
        let rows = users::table
            .order(users::id.asc())
            .select(User::as_select())
            .load(&mut self.conn)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub fn list_mechanics(&mut self) -> GarageResult<Vec<shared::User>> {
        let rows = users::table
            .filter(users::role.eq(Role::Mechanic.as_str()))
            .order(users::username.asc())
            .select(User::as_select())
            .load(&mut self.conn)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Whether `name` is how some mechanic is identified on repairs and
    /// schedules: their full name, or their username when that is blank.
    pub(crate) fn is_mechanic_name(&mut self, name: &str) -> GarageResult<bool> {
        let candidates = users::table
            .filter(users::role.eq(Role::Mechanic.as_str()))
            .filter(
                users::full_name
                    .eq(name)
                    .or(users::username.eq(name).nullable()),
            )
            .select(User::as_select())
            .load(&mut self.conn)?;
        Ok(candidates.iter().any(|user| user.display_name() == name))
    }

    pub fn remove_mechanic(&mut self, actor: &Session, username: &str) -> GarageResult<()> {
        require_admin(actor, "remove mechanics")?;
        let username = username.trim();
        let user = users::table
            .filter(users::username.eq(username))
            .select(User::as_select())
            .first(&mut self.conn)
            .optional()?
            .ok_or_else(|| GarageError::not_found(format!("No mechanic named '{username}'")))?;

        if user.role() == Some(Role::Admin) {
            return Err(GarageError::forbidden("Administrators cannot be removed"));
        }

        diesel::delete(users::table.find(user.id)).execute(&mut self.conn)?;
        tracing::info!(username, removed_by = %actor.username, "removed mechanic");
        Ok(())
    }

    pub fn login_logs(&mut self, actor: &Session, limit: i64) -> GarageResult<Vec<shared::LoginLog>> {
        require_admin(actor, "view login history")?;
        let rows = login_logs::table
            .order(login_logs::id.desc())
            .limit(limit)
            .select(LoginLog::as_select())
            .load(&mut self.conn)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing;
    use super::*;

    #[test]
    fn seeded_admin_can_log_in() {
        let mut store = testing::store();
        let session = store.authenticate("admin", "admin").unwrap();
        assert_eq!(session.role, Role::Admin);
        assert_eq!(session.full_name, "Administrator");
    }

    #[test]
    fn bad_password_and_unknown_user_look_the_same() {
        let mut store = testing::store();
        let wrong = store.authenticate("admin", "nope").unwrap_err();
        let missing = store.authenticate("ghost", "admin").unwrap_err();
        assert_eq!(wrong.to_string(), missing.to_string());
        assert!(matches!(wrong, GarageError::InvalidCredentials));
    }

    #[test]
    fn passwords_are_not_stored_in_clear() {
        let mut store = testing::store();
        let stored: String = users::table
            .filter(users::username.eq("admin"))
            .select(users::password)
            .first(&mut store.conn)
            .unwrap();
        assert_ne!(stored, "admin");
        assert!(stored.starts_with("$2"));
    }

    #[test]
    fn legacy_plain_text_password_is_upgraded_on_login() {
        let mut store = testing::store();
        diesel::insert_into(users::table)
            .values(&NewUser {
                username: "old".to_string(),
                password: "secret".to_string(),
                role: "mechanic".to_string(),
                full_name: Some("Old Timer".to_string()),
            })
            .execute(&mut store.conn)
            .unwrap();

        store.authenticate("old", "secret").unwrap();
        let stored: String = users::table
            .filter(users::username.eq("old"))
            .select(users::password)
            .first(&mut store.conn)
            .unwrap();
        assert!(stored.starts_with("$2"));
        store.authenticate("old", "secret").unwrap();
    }

    #[test]
    fn register_checks_confirmation_and_duplicates() {
        let mut store = testing::store();
        let mut req = RegisterMechanic {
            full_name: "Dana Wrench".to_string(),
            username: "dana".to_string(),
            password: "pw".to_string(),
            confirm_password: "pw2".to_string(),
        };
        assert!(matches!(
            store.register_mechanic(&req),
            Err(GarageError::Validation(_))
        ));

        req.confirm_password = "pw".to_string();
        let user = store.register_mechanic(&req).unwrap();
        assert_eq!(user.role, Role::Mechanic);

        let err = store.register_mechanic(&req).unwrap_err();
        assert!(matches!(err, GarageError::Conflict(ref m) if m == DUPLICATE_USERNAME));
    }

    #[test]
    fn only_admins_manage_mechanics() {
        let mut store = testing::store();
        let mechanic = testing::mechanic(&mut store, "sam", "Sam Spanner");
        let req = CreateMechanic {
            full_name: "Eve".to_string(),
            username: "eve".to_string(),
            password: "pw".to_string(),
        };
        assert!(matches!(
            store.add_mechanic(&mechanic, &req),
            Err(GarageError::Forbidden(_))
        ));
        assert!(matches!(
            store.remove_mechanic(&mechanic, "sam"),
            Err(GarageError::Forbidden(_))
        ));
    }

    #[test]
    fn remove_mechanic_rules() {
        let mut store = testing::store();
        let admin = testing::admin(&mut store);
        testing::mechanic(&mut store, "sam", "Sam Spanner");

        assert!(matches!(
            store.remove_mechanic(&admin, "nobody"),
            Err(GarageError::NotFound(_))
        ));
        assert!(matches!(
            store.remove_mechanic(&admin, "admin"),
            Err(GarageError::Forbidden(_))
        ));

        store.remove_mechanic(&admin, "sam").unwrap();
        assert!(store.list_mechanics().unwrap().is_empty());
    }

    #[test]
    fn session_for_skips_the_login_log() {
        let mut store = testing::store();
        let admin = store.session_for("admin").unwrap();
        assert!(admin.is_admin());
        assert!(store.login_logs(&admin, 10).unwrap().is_empty());
        assert!(matches!(
            store.session_for("ghost"),
            Err(GarageError::NotFound(_))
        ));
    }

    #[test]
    fn logins_are_logged_newest_first() {
        let mut store = testing::store();
        testing::mechanic(&mut store, "sam", "Sam Spanner");
        let admin = testing::admin(&mut store);

        let logs = store.login_logs(&admin, 10).unwrap();
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[0].username.as_deref(), Some("admin"));
        assert_eq!(logs[1].username.as_deref(), Some("sam"));
        assert_eq!(logs[1].role.as_deref(), Some("mechanic"));

        assert_eq!(store.login_logs(&admin, 1).unwrap().len(), 1);
    }
}
