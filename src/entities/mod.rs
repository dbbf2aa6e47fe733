//! Entity module - Contains all SeaORM entity definitions for the store.
//! Each table has an integer surrogate key plus a unique natural key; the
//! composite natural-key indexes are created in [`crate::config::database`].

pub mod action;
pub mod action_detail;
pub mod action_result;
pub mod analysis;
pub mod analysis_property;
pub mod analysis_property_result;
pub mod baseline;
pub mod baseline_result;
pub mod computer;
pub mod computer_group;
pub mod computer_group_member;
pub mod site;

// Re-export specific types to avoid conflicts
pub use action::Entity as Action;
pub use action_detail::Entity as ActionDetail;
pub use action_result::Entity as ActionResult;
pub use analysis::Entity as Analysis;
pub use analysis_property::Entity as AnalysisProperty;
pub use analysis_property_result::Entity as AnalysisPropertyResult;
pub use baseline::Entity as Baseline;
pub use baseline_result::Entity as BaselineResult;
pub use computer::Entity as Computer;
pub use computer_group::Entity as ComputerGroup;
pub use computer_group_member::Entity as ComputerGroupMember;
pub use site::{Entity as Site, SiteType};
