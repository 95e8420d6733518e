// crates/server/src/catalog.rs
//! Static exercise catalog and the single plan template built from it.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use coach_types::{plan_doc_id, Category, DailyTrainingPlan, Drill, PlanTemplate};

const DEFAULT_CATALOG: &str = include_str!("../catalog/default.json");

pub const DEFAULT_TEMPLATE_ID: &str = "default";

#[derive(Debug, Clone)]
pub struct Catalog {
    template: PlanTemplate,
}

impl Catalog {
    /// The catalog compiled into the binary.
    pub fn embedded() -> Result<Self, serde_json::Error> {
        Self::from_json(DEFAULT_CATALOG)
    }

    /// Parse a JSON array of categories.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let categories: Vec<Category> = serde_json::from_str(json)?;
        Ok(Self::from_categories(categories))
    }

    pub fn from_categories(categories: impl IntoIterator<Item = Category>) -> Self {
        let categories: BTreeMap<String, Category> = categories
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();
        Self {
            template: PlanTemplate {
                id: DEFAULT_TEMPLATE_ID.to_string(),
                categories,
            },
        }
    }

    /// Every category, drills omitted.
    pub fn categories(&self) -> Vec<Category> {
        self.template
            .categories
            .values()
            .map(Category::summary)
            .collect()
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.template.categories.get(id)
    }

    pub fn drills(&self) -> impl Iterator<Item = &Drill> {
        self.template
            .categories
            .values()
            .flat_map(|c| c.drills.values())
    }

    pub fn drill(&self, id: &str) -> Option<&Drill> {
        self.template
            .categories
            .values()
            .find_map(|c| c.drills.get(id))
    }

    pub fn template_ids(&self) -> Vec<&str> {
        vec![self.template.id.as_str()]
    }

    pub fn template(&self, id: &str) -> Option<&PlanTemplate> {
        (id == self.template.id).then_some(&self.template)
    }

    /// Fresh plan for `user` on `date` from the default template.
    pub fn new_plan(&self, user: &str, date: NaiveDate, now: DateTime<Utc>) -> DailyTrainingPlan {
        DailyTrainingPlan::from_template(plan_doc_id(user, date), &self.template, date, now)
    }
}
