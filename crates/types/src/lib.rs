//! Shared data model for the coach backend and the wrapper gateway.
//!
//! Both services speak the same JSON shapes: daily plans and catalog
//! entities on the REST side, the `{action, data, source}` envelope on the
//! event stream, and the agent runtime's session/run payloads.

pub mod agent;
pub mod config;
pub mod event;
pub mod identity;
pub mod plan;

pub use agent::{AgentEvent, AgentSession, Content, InlineData, Part, RunEvent, RunRequest};
pub use config::{ConfigError, Env};
pub use event::{EventAction, EventSource, PlanUpdateEvent};
pub use identity::{IdentityError, UserResolver, USER_EMAIL_HEADER};
pub use plan::{
    plan_doc_id, Achievement, Category, DailyTrainingPlan, Drill, PlanTemplate, DATE_FORMAT,
};
