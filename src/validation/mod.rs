pub mod grant_application;

pub use grant_application::{Submission, HTTP_URL};
