//! Exercise catalog entities and the per-day training plan document.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Calendar-day format used in plan ids and the `date` field.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A group of drills (e.g. back, shoulder).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub drills: BTreeMap<String, Drill>,
}

impl Category {
    /// Copy of the category without its drills, for listing endpoints.
    pub fn summary(&self) -> Self {
        Self {
            drills: BTreeMap::new(),
            ..self.clone()
        }
    }
}

/// A single exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drill {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub category_id: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub target_repetition: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanTemplate {
    pub id: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub categories: BTreeMap<String, Category>,
}

/// Progress on one drill for one day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Achievement {
    pub repetition: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub note: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// The training plan of one user for one day.
///
/// Stored under `"{user}-{date}"`. Also used as the body of partial
/// updates, which is why every field has a default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DailyTrainingPlan {
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub template_id: String,
    pub date: String,
    /// Conversation session mirrored from the agent runtime.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// category id -> drill id -> achievement
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub repetitions: BTreeMap<String, BTreeMap<String, Achievement>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl DailyTrainingPlan {
    /// Fresh plan for `date` with every drill of `template` at zero.
    pub fn from_template(
        id: impl Into<String>,
        template: &PlanTemplate,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Self {
        let repetitions = template
            .categories
            .values()
            .map(|category| {
                let drills = category
                    .drills
                    .keys()
                    .map(|drill_id| {
                        (
                            drill_id.clone(),
                            Achievement {
                                created_at: Some(now),
                                updated_at: Some(now),
                                ..Achievement::default()
                            },
                        )
                    })
                    .collect();
                (category.id.clone(), drills)
            })
            .collect();

        Self {
            id: id.into(),
            template_id: template.id.clone(),
            date: date.format(DATE_FORMAT).to_string(),
            session_id: None,
            repetitions,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    /// Merge a partial update into the stored plan.
    ///
    /// Repetition and note of every listed drill are overwritten; drills
    /// not listed are left alone. An empty `session_id` never clears the
    /// stored one.
    pub fn apply_update(&mut self, update: &DailyTrainingPlan, now: DateTime<Utc>) {
        for (category_id, drills) in &update.repetitions {
            let stored = self.repetitions.entry(category_id.clone()).or_default();
            for (drill_id, achievement) in drills {
                let entry = stored
                    .entry(drill_id.clone())
                    .or_insert_with(|| Achievement {
                        created_at: Some(now),
                        ..Achievement::default()
                    });
                entry.repetition = achievement.repetition;
                entry.note = achievement.note.clone();
                entry.updated_at = Some(now);
            }
        }

        if let Some(session_id) = update.session_id.as_deref().filter(|s| !s.is_empty()) {
            self.session_id = Some(session_id.to_string());
        }
        self.updated_at = Some(now);
    }
}

/// Document id of a user's plan for a day.
pub fn plan_doc_id(user: &str, date: NaiveDate) -> String {
    format!("{}-{}", user, date.format(DATE_FORMAT))
}

fn is_zero(v: &u32) -> bool {
    *v == 0
}
