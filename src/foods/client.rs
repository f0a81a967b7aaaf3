use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::FoodSearchConfig;
use crate::error::AppError;
use crate::types::Macros;

/// One candidate food from the composition database, with per-unit values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodHit {
    pub name: String,
    #[serde(flatten)]
    pub per_unit: Macros,
}

/// Free-text lookup against the food-composition service.
#[async_trait]
pub trait FoodCatalog: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<FoodHit>, AppError>;
}

/// FoodData Central client.
pub struct FdcClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FdcClient {
    pub fn new(config: &FoodSearchConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl FoodCatalog for FdcClient {
    async fn search(&self, query: &str) -> Result<Vec<FoodHit>, AppError> {
        let url = format!("{}/v1/foods/search", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("query", query),
                ("pageSize", "10"),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;
        let body: Value = response
            .json()
            .await
            .map_err(|_| AppError::Parse("food search"))?;
        parse_search_response(&body)
    }
}

/// Extract hits from a search response body.
///
/// Only the four tracked nutrients are kept, matched by their exact names in
/// the feed; values are truncated to whole numbers. Foods without a nutrient
/// array come back with zeroed macros rather than being dropped.
pub(crate) fn parse_search_response(body: &Value) -> Result<Vec<FoodHit>, AppError> {
    let foods = body
        .get("foods")
        .and_then(Value::as_array)
        .ok_or(AppError::Parse("food search"))?;
    Ok(foods.iter().map(hit_from_json).collect())
}

fn hit_from_json(food: &Value) -> FoodHit {
    let name = food
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let mut per_unit = Macros::ZERO;
    if let Some(nutrients) = food.get("foodNutrients").and_then(Value::as_array) {
        for nutrient in nutrients {
            let value = nutrient.get("value").and_then(Value::as_f64).unwrap_or(0.0) as i64;
            match nutrient.get("nutrientName").and_then(Value::as_str) {
                Some("Energy") => per_unit.calories = value,
                Some("Protein") => per_unit.protein = value,
                Some("Total lipid (fat)") => per_unit.fat = value,
                Some("Carbohydrate, by difference") => per_unit.carbs = value,
                _ => {}
            }
        }
    }

    FoodHit { name, per_unit }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_tracked_nutrients_by_name() {
        let body = json!({
            "foods": [{
                "description": "Banana, raw",
                "foodNutrients": [
                    {"nutrientName": "Energy", "value": 89.0},
                    {"nutrientName": "Protein", "value": 1.1},
                    {"nutrientName": "Carbohydrate, by difference", "value": 22.8},
                    {"nutrientName": "Total lipid (fat)", "value": 0.3},
                    {"nutrientName": "Fiber, total dietary", "value": 2.6}
                ]
            }]
        });

        let hits = parse_search_response(&body).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Banana, raw");
        // Values truncate, they do not round.
        assert_eq!(hits[0].per_unit, Macros::new(89, 1, 22, 0));
    }

    #[test]
    fn food_without_nutrients_yields_zeroed_macros() {
        let body = json!({
            "foods": [{"description": "Mystery item"}]
        });
        let hits = parse_search_response(&body).unwrap();
        assert_eq!(hits[0].name, "Mystery item");
        assert_eq!(hits[0].per_unit, Macros::ZERO);
    }

    #[test]
    fn empty_foods_array_is_an_empty_result() {
        let hits = parse_search_response(&json!({"foods": []})).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn missing_foods_key_is_a_parse_failure() {
        let err = parse_search_response(&json!({"totalHits": 0})).unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
    }

    #[test]
    fn hit_serializes_with_flat_macros() {
        let hit = FoodHit {
            name: "Egg".into(),
            per_unit: Macros::new(70, 6, 1, 5),
        };
        let json = serde_json::to_value(&hit).unwrap();
        assert_eq!(json["name"], "Egg");
        assert_eq!(json["calories"], 70);
    }
}
