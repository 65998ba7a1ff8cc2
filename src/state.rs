use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::activity::ActivityHub;
use crate::config::Config;
use crate::db;
use crate::storage::ImageStore;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub images: ImageStore,
    pub activities: ActivityHub,
}

impl AppState {
    /// Open the database, apply migrations and prepare the image directory.
    pub fn init(config: Config) -> anyhow::Result<Self> {
        let images = ImageStore::new(config.images_path());
        std::fs::create_dir_all(images.dir())?;

        let pool = db::create_pool(&config.db_path())?;
        db::run_migrations(&pool)?;

        let activities = ActivityHub::new(config.activity.channel_capacity);

        Ok(Self {
            db: pool,
            config,
            images,
            activities,
        })
    }
}
