use thiserror::Error;

#[derive(Debug, Error)]
pub enum KnsError {
    #[error("not initialized: run 'kns init'")]
    NotInitialized,

    #[error("profile not found: {0}")]
    ProfileNotFound(String),

    #[error("a profile already exists with email: {0}")]
    ProfileEmailExists(String),

    #[error("group not found: {0}")]
    GroupNotFound(String),

    #[error("group already exists: {0}")]
    GroupExists(String),

    #[error("invalid slug '{0}': must be lowercase alphanumeric with hyphens")]
    InvalidSlug(String),

    #[error("invalid role: {0}")]
    InvalidRole(String),

    #[error("profile {profile} is already a member of group '{group}'")]
    AlreadyGroupMember { profile: String, group: String },

    #[error("profile {0} is not a member of any group")]
    NotAGroupMember(String),

    #[error("approval not found: {0}")]
    ApprovalNotFound(String),

    #[error("approval {0} has already been handled")]
    AlreadyProcessed(String),

    #[error("approval {0} has expired")]
    ApprovalExpired(String),

    #[error("invalid approval status: {0}")]
    InvalidApprovalStatus(String),

    #[error("{actor} is not permitted to decide approval {id}")]
    NotPermitted { id: String, actor: String },

    #[error("notification not found: {0}")]
    NotificationNotFound(String),

    #[error("{recipient} is not a recipient of notification {id}")]
    NotARecipient { id: String, recipient: String },

    #[error("invalid notification kind: {0}")]
    InvalidNotificationKind(String),

    #[error("invalid setting: {0}")]
    InvalidSetting(String),

    #[error("skill limit reached: at most {0} skills per profile")]
    SkillLimitReached(u32),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, KnsError>;
