pub mod badge;
pub mod certificate;
pub mod course;
pub mod notification;
pub mod progress;
pub mod resource;
pub mod response;
pub mod toast;
pub mod user;
