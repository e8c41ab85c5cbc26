pub mod database;
pub mod store;
pub mod auth;
pub mod ledger;
pub mod notification;
pub mod realtime;
pub mod user;
pub mod course;
pub mod resource;

// 重新导出常用类型
pub use database::Database;
pub use auth::AuthService;
pub use ledger::ProgressLedger;
pub use notification::NotificationService;
pub use realtime::NotificationHub;
pub use user::UserService;
pub use course::CourseService;
pub use resource::ResourceService;
