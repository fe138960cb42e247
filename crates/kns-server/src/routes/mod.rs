pub mod approvals;
pub mod confirm;
pub mod groups;
pub mod notifications;
pub mod profiles;
pub mod settings;
pub mod skills;
