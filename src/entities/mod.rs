//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod category;
pub mod line_item;
pub mod period;
pub mod period_template;
pub mod plan;
pub mod template;
pub mod template_item;

pub use category::Category;

// Re-export specific types to avoid conflicts
pub use line_item::{Column as LineItemColumn, Entity as LineItem, Model as LineItemModel};
pub use period::{Column as PeriodColumn, Entity as Period, Model as PeriodModel};
pub use period_template::{
    Column as PeriodTemplateColumn, Entity as PeriodTemplate, Model as PeriodTemplateModel,
};
pub use plan::{Column as PlanColumn, Entity as Plan, Model as PlanModel};
pub use template::{Column as TemplateColumn, Entity as Template, Model as TemplateModel};
pub use template_item::{
    Column as TemplateItemColumn, Entity as TemplateItem, Model as TemplateItemModel,
};
