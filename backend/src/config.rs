use crate::store::StoreOptions;

pub const DEFAULT_DB_PATH: &str = "cosmic_garage.db";

#[derive(Clone)]
pub struct AppConfig {
    pub database_path: String,
    pub jwt_secret: String,
    pub dev_mode: bool,
    pub port: u16,
    pub bcrypt_cost: u32,
    pub admin_password: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let dev_mode = std::env::var("DEV_MODE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Self {
            database_path: std::env::var("GARAGE_DB")
                .unwrap_or_else(|_| DEFAULT_DB_PATH.to_string()),
            jwt_secret: std::env::var("JWT_SECRET").unwrap_or_else(|_| {
                tracing::warn!("JWT_SECRET not set; sessions will not survive a restart");
                random_secret()
            }),
            dev_mode,
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            bcrypt_cost: std::env::var("BCRYPT_COST")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(bcrypt::DEFAULT_COST),
            admin_password: std::env::var("GARAGE_ADMIN_PASSWORD")
                .unwrap_or_else(|_| "admin".to_string()),
        }
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            bcrypt_cost: self.bcrypt_cost,
            admin_password: self.admin_password.clone(),
        }
    }
}

fn random_secret() -> String {
    rand::random::<[u8; 32]>()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
