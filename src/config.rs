use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct FoodSearchConfig {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VisionConfig {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub food_search: FoodSearchConfig,
    pub vision: VisionConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let food_search = FoodSearchConfig {
            base_url: std::env::var("FDC_API_BASE")
                .unwrap_or_else(|_| "https://api.nal.usda.gov/fdc".into()),
            // DEMO_KEY works for light use; real deployments set FDC_API_KEY.
            api_key: std::env::var("FDC_API_KEY").unwrap_or_else(|_| "DEMO_KEY".into()),
        };
        let vision = VisionConfig {
            base_url: std::env::var("VISION_API_BASE")
                .unwrap_or_else(|_| "https://vision.googleapis.com".into()),
            api_key: std::env::var("VISION_API_KEY").unwrap_or_default(),
        };
        Ok(Self {
            database_url,
            food_search,
            vision,
        })
    }
}
